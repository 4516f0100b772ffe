use serde::{Deserialize, Serialize};

use crate::{
    data::Row,
    frequency::FrequencyAccumulator,
    schema::{ColumnMeta, ColumnType},
    stats::{compute_column_stats, round_to},
};

pub const SUMMARY_SAMPLE_ROWS: usize = 5;
pub const SUMMARY_TOP_VALUES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericSummary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopValue {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub unique_values: usize,
    pub missing_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<NumericSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_values: Option<Vec<TopValue>>,
}

/// Compact description of a dataset used to prime the conversational agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub file_name: String,
    pub row_count: usize,
    pub columns: Vec<ColumnSummary>,
    pub sample_rows: Vec<Row>,
}

pub fn build_dataset_summary(file_name: &str, rows: &[Row], columns: &[ColumnMeta]) -> DatasetSummary {
    DatasetSummary {
        file_name: file_name.to_string(),
        row_count: rows.len(),
        columns: columns
            .iter()
            .map(|column| summarize_column(rows, column))
            .collect(),
        sample_rows: rows.iter().take(SUMMARY_SAMPLE_ROWS).cloned().collect(),
    }
}

fn summarize_column(rows: &[Row], column: &ColumnMeta) -> ColumnSummary {
    let column_type = column.effective_type();
    let stats = column_type.is_numeric().then(|| {
        let stats = compute_column_stats(rows, &column.name);
        NumericSummary {
            mean: round_to(stats.mean, 2),
            median: round_to(stats.median, 2),
            min: stats.min,
            max: stats.max,
            std_dev: round_to(stats.std_dev, 2),
        }
    });
    let top_values = column_type.is_categorical().then(|| {
        FrequencyAccumulator::from_column(rows, &column.name)
            .ranked()
            .into_iter()
            .take(SUMMARY_TOP_VALUES)
            .map(|(value, count)| TopValue { value, count })
            .collect()
    });
    ColumnSummary {
        name: column.name.clone(),
        column_type,
        unique_values: column.unique_values,
        missing_percent: round_to(column.missing_percent, 1),
        stats,
        top_values,
    }
}
