//! Rule-based observations about data quality and notable statistical
//! structure. Every rule is evaluated independently; rules within one
//! category follow column order.

use serde::{Deserialize, Serialize};

use crate::{
    correlation::{compute_correlation_matrix, strongest_correlations},
    data::Row,
    frequency::FrequencyAccumulator,
    schema::ColumnMeta,
    stats::{self, ColumnStats, round_to},
};

pub const SMALL_SAMPLE_ROWS: usize = 50;
pub const MISSING_NOTABLE_PERCENT: f64 = 10.0;
pub const MISSING_WARNING_PERCENT: f64 = 30.0;
pub const STRONG_CORRELATION: f64 = 0.7;
pub const VERY_STRONG_CORRELATION: f64 = 0.9;
pub const SKEW_THRESHOLD: f64 = 1.0;
pub const IQR_FENCE_MULTIPLIER: f64 = 1.5;
pub const OUTLIER_WARNING_PERCENT: f64 = 10.0;
pub const DOMINANCE_NOTABLE_PERCENT: f64 = 60.0;
pub const DOMINANCE_WARNING_PERCENT: f64 = 80.0;
pub const INSIGHT_CORRELATION_PAIRS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Correlation,
    Distribution,
    Outlier,
    Pattern,
    Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Notable,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Notable => "notable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Insight {
    fn new(
        kind: InsightKind,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            description: description.into(),
            severity,
        }
    }
}

pub fn generate_insights(rows: &[Row], columns: &[ColumnMeta]) -> Vec<Insight> {
    if rows.is_empty() {
        return vec![Insight::new(
            InsightKind::Quality,
            "No data available",
            "The dataset contains no rows. Analysis cannot be performed.",
            Severity::Warning,
        )];
    }

    let mut insights = Vec::new();
    if rows.len() < SMALL_SAMPLE_ROWS {
        insights.push(Insight::new(
            InsightKind::Quality,
            "Small sample size",
            format!(
                "The dataset contains only {} rows. Statistical results may not be reliable with fewer than {SMALL_SAMPLE_ROWS} observations.",
                rows.len()
            ),
            Severity::Warning,
        ));
    }

    insights.extend(missing_data_insights(rows.len(), columns));

    let numeric = columns
        .iter()
        .filter(|column| column.effective_type().is_numeric())
        .collect::<Vec<_>>();
    insights.extend(correlation_insights(rows, &numeric));

    let numeric_stats = numeric
        .iter()
        .map(|column| stats::compute_column_stats(rows, &column.name))
        .collect::<Vec<_>>();
    insights.extend(numeric_stats.iter().filter_map(skew_insight));
    insights.extend(
        numeric_stats
            .iter()
            .filter_map(|column_stats| outlier_insight(rows, column_stats)),
    );

    insights.extend(
        columns
            .iter()
            .filter(|column| column.effective_type().is_categorical())
            .filter_map(|column| dominance_insight(rows, &column.name)),
    );
    insights
}

fn missing_data_insights(row_count: usize, columns: &[ColumnMeta]) -> Vec<Insight> {
    columns
        .iter()
        .filter(|column| column.missing_percent > MISSING_NOTABLE_PERCENT)
        .map(|column| {
            Insight::new(
                InsightKind::Quality,
                format!("High missing data: {}", column.name),
                format!(
                    "Column \"{}\" has {:.1}% missing values ({} of {row_count} rows). This may affect analysis reliability.",
                    column.name, column.missing_percent, column.missing_count
                ),
                if column.missing_percent > MISSING_WARNING_PERCENT {
                    Severity::Warning
                } else {
                    Severity::Notable
                },
            )
        })
        .collect()
}

fn correlation_insights(rows: &[Row], numeric: &[&ColumnMeta]) -> Vec<Insight> {
    if numeric.len() < 2 {
        return Vec::new();
    }
    let names = numeric
        .iter()
        .map(|column| column.name.clone())
        .collect::<Vec<_>>();
    let result = compute_correlation_matrix(rows, &names);
    strongest_correlations(&result.matrix, &names, INSIGHT_CORRELATION_PAIRS)
        .into_iter()
        .filter(|pair| pair.r.abs() > STRONG_CORRELATION)
        .map(|pair| {
            let very_strong = pair.r.abs() > VERY_STRONG_CORRELATION;
            let direction = if pair.r > 0.0 { "positive" } else { "negative" };
            let strength = if very_strong { "very strong" } else { "strong" };
            Insight::new(
                InsightKind::Correlation,
                format!("{strength} {direction} correlation"),
                format!(
                    "\"{}\" and \"{}\" have a {strength} {direction} correlation (r = {:.3}). Changes in one variable are closely associated with changes in the other.",
                    pair.col_a, pair.col_b, pair.r
                ),
                if very_strong {
                    Severity::Notable
                } else {
                    Severity::Info
                },
            )
        })
        .collect()
}

/// Pearson's second skewness coefficient, `3 * (mean - median) / stdDev`.
fn skew_insight(column_stats: &ColumnStats) -> Option<Insight> {
    if column_stats.count < 3 || column_stats.std_dev == 0.0 {
        return None;
    }
    let skewness = 3.0 * (column_stats.mean - column_stats.median) / column_stats.std_dev;
    if skewness.abs() <= SKEW_THRESHOLD {
        return None;
    }
    let direction = if skewness > 0.0 {
        "right (positively)"
    } else {
        "left (negatively)"
    };
    Some(Insight::new(
        InsightKind::Distribution,
        format!("Skewed distribution: {}", column_stats.column),
        format!(
            "Column \"{}\" is skewed {direction} (skewness coefficient: {skewness:.2}). The mean ({:.2}) differs notably from the median ({:.2}). Consider using the median for central tendency.",
            column_stats.column, column_stats.mean, column_stats.median
        ),
        Severity::Info,
    ))
}

fn outlier_insight(rows: &[Row], column_stats: &ColumnStats) -> Option<Insight> {
    if column_stats.count < 4 {
        return None;
    }
    let iqr = column_stats.iqr();
    if iqr == 0.0 {
        return None;
    }
    let lower = column_stats.q1 - IQR_FENCE_MULTIPLIER * iqr;
    let upper = column_stats.q3 + IQR_FENCE_MULTIPLIER * iqr;
    let values = stats::numeric_values(rows, &column_stats.column);
    let outliers = values
        .iter()
        .filter(|value| **value < lower || **value > upper)
        .count();
    if outliers == 0 {
        return None;
    }
    // Severity compares the same one-decimal figure that is reported.
    let percent = round_to(outliers as f64 / values.len() as f64 * 100.0, 1);
    let plural = if outliers == 1 { "" } else { "s" };
    Some(Insight::new(
        InsightKind::Outlier,
        format!("Outliers detected: {}", column_stats.column),
        format!(
            "Column \"{}\" has {outliers} potential outlier{plural} ({percent:.1}% of values) outside the interquartile range [{lower:.2}, {upper:.2}].",
            column_stats.column
        ),
        if percent > OUTLIER_WARNING_PERCENT {
            Severity::Warning
        } else {
            Severity::Info
        },
    ))
}

fn dominance_insight(rows: &[Row], column: &str) -> Option<Insight> {
    let frequencies = FrequencyAccumulator::from_column(rows, column);
    let total = frequencies.total_valid();
    let (label, count) = frequencies.most_common()?;
    let share = count as f64 / total as f64 * 100.0;
    if share <= DOMINANCE_NOTABLE_PERCENT {
        return None;
    }
    Some(Insight::new(
        InsightKind::Pattern,
        format!("Dominant value: {column}"),
        format!(
            "In column \"{column}\", the value \"{label}\" accounts for {share:.1}% of responses ({count} of {total}). This low variability may limit analytical usefulness."
        ),
        if share > DOMINANCE_WARNING_PERCENT {
            Severity::Warning
        } else {
            Severity::Notable
        },
    ))
}
