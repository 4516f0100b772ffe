//! Delimited-file ingestion for the command-line harness and tests.
//!
//! Fields are decoded through `encoding_rs` and typed dynamically: empty
//! cells become missing, plain decimal literals become numbers, everything
//! else stays text. The `-` path reads standard input.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::LazyLock,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use log::debug;
use regex::Regex;

use crate::data::{Row, Value};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

static DECIMAL_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
        .expect("decimal literal pattern compiles")
});

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Dynamic typing of one raw field.
pub fn infer_cell(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Missing;
    }
    let trimmed = raw.trim();
    if DECIMAL_LITERAL.is_match(trimmed)
        && let Ok(number) = trimmed.parse::<f64>()
        && number.is_finite()
    {
        return Value::Number(number);
    }
    Value::Text(raw.to_string())
}

/// Headers and typed rows from any reader.
pub fn read_rows<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<(Vec<String>, Vec<Row>)>
where
    R: Read,
{
    let headers = decode_record(reader.byte_headers()?, encoding)?
        .into_iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", idx + 2))?;
        let fields = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", idx + 2))?;
        if fields.iter().all(|field| field.is_empty()) {
            skipped += 1;
            continue;
        }
        let row = headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let cell = fields
                    .get(col)
                    .map(|field| infer_cell(field))
                    .unwrap_or_default();
                (header.clone(), cell)
            })
            .collect::<Row>();
        rows.push(row);
    }
    if skipped > 0 {
        debug!("Skipped {skipped} empty record(s)");
    }
    Ok((headers, rows))
}

pub fn read_dataset(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<(Vec<String>, Vec<Row>)> {
    let mut reader = open_csv_reader_from_path(path, delimiter)?;
    read_rows(&mut reader, encoding).with_context(|| format!("Reading {path:?}"))
}
