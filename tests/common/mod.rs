#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use data_laser::{Dataset, Row, Value};
use tempfile::{TempDir, tempdir};

pub const SURVEY_FILE: &str = "survey.csv";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// The survey fixture loaded and type-detected with default settings.
pub fn survey_dataset() -> Dataset {
    let path = fixture_path(SURVEY_FILE);
    let (headers, rows) =
        data_laser::load::read_dataset(&path, b',', encoding_rs::UTF_8).expect("read survey");
    Dataset::new(headers, rows)
}

/// Builds rows from `(column, value)` pairs.
pub fn row<const N: usize>(cells: [(&str, Value); N]) -> Row {
    cells.into_iter().collect()
}

pub fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
