//! Descriptive statistics and pairwise Pearson correlation over numeric cells.

use serde::{Deserialize, Serialize};

use crate::{
    data::Row,
    normalize,
    schema::ColumnMeta,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: Option<f64>,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
}

impl ColumnStats {
    fn empty(column: &str) -> Self {
        Self {
            column: column.to_string(),
            count: 0,
            mean: 0.0,
            median: 0.0,
            mode: None,
            std_dev: 0.0,
            min: 0.0,
            max: 0.0,
            q1: 0.0,
            q3: 0.0,
        }
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Numeric interpretations of `column` across `rows`, skipping missing and
/// unparseable cells.
pub fn numeric_values(rows: &[Row], column: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| normalize::to_number(row.get(column)))
        .collect()
}

pub fn compute_column_stats(rows: &[Row], column: &str) -> ColumnStats {
    let values = numeric_values(rows, column);
    if values.is_empty() {
        return ColumnStats::empty(column);
    }

    let mut sorted = values;
    sorted.sort_by(f64::total_cmp);
    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let variance = sorted
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / count as f64;

    let middle = median(&sorted);
    let mid = count / 2;
    let lower = &sorted[..mid];
    let upper = if count % 2 == 0 {
        &sorted[mid..]
    } else {
        &sorted[mid + 1..]
    };

    ColumnStats {
        column: column.to_string(),
        count,
        mean,
        median: middle,
        mode: mode(&sorted),
        std_dev: variance.sqrt(),
        min: sorted[0],
        max: sorted[count - 1],
        // A lone value leaves both halves empty; its quartiles collapse onto it.
        q1: if lower.is_empty() { middle } else { median(lower) },
        q3: if upper.is_empty() { middle } else { median(upper) },
    }
}

/// Statistics for every column whose effective type is numeric or percentage.
pub fn compute_all_stats(rows: &[Row], columns: &[ColumnMeta]) -> Vec<ColumnStats> {
    columns
        .iter()
        .filter(|column| column.effective_type().is_numeric())
        .map(|column| compute_column_stats(rows, &column.name))
        .collect()
}

/// Pearson product-moment correlation over rows where both cells are numeric.
/// Returns 0 for fewer than two pairs or when either side has zero variance.
pub fn compute_correlation(rows: &[Row], column_a: &str, column_b: &str) -> f64 {
    let pairs = rows
        .iter()
        .filter_map(|row| {
            let a = normalize::to_number(row.get(column_a))?;
            let b = normalize::to_number(row.get(column_b))?;
            Some((a, b))
        })
        .collect::<Vec<_>>();
    if pairs.len() < 2 {
        return 0.0;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut sum_sq_a = 0.0;
    let mut sum_sq_b = 0.0;
    for (a, b) in &pairs {
        let diff_a = a - mean_a;
        let diff_b = b - mean_b;
        numerator += diff_a * diff_b;
        sum_sq_a += diff_a * diff_a;
        sum_sq_b += diff_b * diff_b;
    }

    let denominator = (sum_sq_a * sum_sq_b).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    numerator / denominator
}

/// Midpoint median of an ascending slice; 0 when empty.
pub fn median(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Most frequent value of an ascending slice, smallest on ties; `None` when
/// every value occurs exactly once.
fn mode(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    let mut index = 0;
    while index < sorted.len() {
        let value = sorted[index];
        let run = sorted[index..]
            .iter()
            .take_while(|candidate| **candidate == value)
            .count()
            .max(1);
        if best.is_none_or(|(_, count)| run > count) {
            best = Some((value, run));
        }
        index += run;
    }
    best.filter(|(_, count)| *count > 1).map(|(value, _)| value)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn column_rows(column: &str, values: &[Value]) -> Vec<Row> {
        values
            .iter()
            .map(|value| [(column, value.clone())].into_iter().collect())
            .collect()
    }

    fn numbers(column: &str, values: &[f64]) -> Vec<Row> {
        column_rows(
            column,
            &values.iter().map(|v| Value::Number(*v)).collect::<Vec<_>>(),
        )
    }

    #[test]
    fn empty_selection_yields_zero_filled_stats() {
        let rows = column_rows("x", &[Value::Missing, Value::from("n/a")]);
        let stats = compute_column_stats(&rows, "x");
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mode, None);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.q3, 0.0);
    }

    #[test]
    fn unit_suffixed_cells_are_counted() {
        let rows = column_rows(
            "weight",
            &[Value::from("12 kg"), Value::from("15 kg"), Value::from("9 kg")],
        );
        let stats = compute_column_stats(&rows, "weight");
        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, 12.0);
        assert_eq!(stats.min, 9.0);
        assert_eq!(stats.max, 15.0);
    }

    #[test]
    fn odd_count_uses_split_at_midpoint_quartiles() {
        let rows = numbers("x", &[7.0, 1.0, 3.0, 5.0, 9.0]);
        let stats = compute_column_stats(&rows, "x");
        assert_eq!(stats.count, 5);
        assert_eq!(stats.median, 5.0);
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.q3, 8.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.mean, 5.0);
        assert!((stats.std_dev - 8f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn even_count_averages_middle_pair() {
        let rows = numbers("x", &[4.0, 1.0, 2.0, 3.0]);
        let stats = compute_column_stats(&rows, "x");
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.q1, 1.5);
        assert_eq!(stats.q3, 3.5);
    }

    #[test]
    fn single_value_collapses_quartiles() {
        let stats = compute_column_stats(&numbers("x", &[42.0]), "x");
        assert_eq!(stats.q1, 42.0);
        assert_eq!(stats.median, 42.0);
        assert_eq!(stats.q3, 42.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn mode_prefers_smallest_on_ties_and_is_absent_when_unique() {
        let tied = compute_column_stats(&numbers("x", &[3.0, 1.0, 3.0, 1.0, 2.0]), "x");
        assert_eq!(tied.mode, Some(1.0));
        let unique = compute_column_stats(&numbers("x", &[1.0, 2.0, 3.0]), "x");
        assert_eq!(unique.mode, None);
    }

    #[test]
    fn percent_and_grouped_strings_feed_statistics() {
        let rows = column_rows(
            "x",
            &[Value::from("45%"), Value::from("1,000"), Value::from(""), Value::from("abc")],
        );
        let stats = compute_column_stats(&rows, "x");
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 45.0);
        assert_eq!(stats.max, 1000.0);
    }

    #[test]
    fn correlation_of_linear_columns_is_one() {
        let rows: Vec<Row> = (1..=5)
            .map(|i| {
                [("a", Value::Number(i as f64)), ("b", Value::Number(i as f64 * 2.0 + 1.0))]
                    .into_iter()
                    .collect()
            })
            .collect();
        assert!((compute_correlation(&rows, "a", "b") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_skips_unpaired_rows_and_guards_zero_variance() {
        let rows: Vec<Row> = vec![
            [("a", Value::Number(1.0)), ("b", Value::Number(3.0))].into_iter().collect(),
            [("a", Value::Number(2.0)), ("b", Value::Missing)].into_iter().collect(),
            [("a", Value::Number(3.0)), ("b", Value::Number(1.0))].into_iter().collect(),
        ];
        assert!((compute_correlation(&rows, "a", "b") + 1.0).abs() < 1e-12);

        let flat = numbers("a", &[2.0, 2.0, 2.0]);
        assert_eq!(compute_correlation(&flat, "a", "a"), 0.0);
        assert_eq!(compute_correlation(&rows[..1], "a", "b"), 0.0);
    }

    #[test]
    fn round_to_handles_decimal_places() {
        assert_eq!(round_to(0.98765, 3), 0.988);
        assert_eq!(round_to(12.345, 1), 12.3);
    }
}
