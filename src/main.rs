fn main() {
    if let Err(err) = data_laser::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
