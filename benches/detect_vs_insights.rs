use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use data_laser::{
    Row,
    insights::generate_insights,
    load,
    schema::{DetectionConfig, detect_column_types, detect_column_types_with},
};
use encoding_rs::UTF_8;
use tempfile::TempDir;

fn generate_survey(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("survey.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(file, "respondent,channel,age,income,satisfaction,completion").expect("header");
    for i in 0..rows {
        let channel = match i % 3 {
            0 => "Web",
            1 => "Phone",
            _ => "Store",
        };
        let satisfaction = match i % 5 {
            0 => "Very Satisfied",
            1 => "Satisfied",
            2 => "Neutral",
            3 => "Dissatisfied",
            _ => "Very Dissatisfied",
        };
        let age = 18 + (i % 60);
        let income = 20_000 + age * 900 + (i % 7) * 1_000;
        let completion = 40 + (i % 61);
        writeln!(
            file,
            "{i},{channel},{age},{income},{satisfaction},{completion}%"
        )
        .expect("row");
    }
    (temp_dir, csv_path)
}

fn load_rows(rows: usize) -> (Vec<String>, Vec<Row>) {
    let (temp_dir, csv_path) = generate_survey(rows);
    let loaded = load::read_dataset(&csv_path, b',', UTF_8).expect("read survey");
    drop(temp_dir);
    loaded
}

fn bench_detect_vs_insights(c: &mut Criterion) {
    let (headers, rows) = load_rows(50_000);
    let columns = detect_column_types(&rows, &headers);
    let exhaustive = DetectionConfig {
        sample_size: 0,
        ..DetectionConfig::default()
    };

    let mut group = c.benchmark_group("analysis");

    group.bench_function("detect_sampled", |b| {
        b.iter(|| detect_column_types(&rows, &headers));
    });

    group.bench_function("detect_exhaustive", |b| {
        b.iter(|| detect_column_types_with(&rows, &headers, &exhaustive));
    });

    group.bench_function("generate_insights", |b| {
        b.iter_batched(
            || columns.clone(),
            |columns| generate_insights(&rows, &columns),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_detect_vs_insights);
criterion_main!(benches);
