use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Row, Value},
    normalize,
    stats::round_to,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
    /// Share of valid values, rounded to one decimal.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCounts {
    pub column: String,
    pub total_valid: usize,
    pub missing: usize,
    pub unique_values: usize,
    pub values: Vec<ValueCount>,
}

/// Label frequencies for one column, remembering the order in which labels
/// were first seen.
#[derive(Debug, Default, Clone)]
pub struct FrequencyAccumulator {
    order: Vec<String>,
    counts: HashMap<String, usize>,
    total_valid: usize,
    missing: usize,
}

impl FrequencyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_column(rows: &[Row], column: &str) -> Self {
        let mut accumulator = Self::new();
        for row in rows {
            accumulator.ingest(row.get(column));
        }
        accumulator
    }

    pub fn ingest(&mut self, value: &Value) {
        let Some(label) = normalize::label(value) else {
            self.missing += 1;
            return;
        };
        self.total_valid += 1;
        match self.counts.get_mut(&label) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(label.clone(), 1);
                self.order.push(label);
            }
        }
    }

    pub fn total_valid(&self) -> usize {
        self.total_valid
    }

    pub fn missing(&self) -> usize {
        self.missing
    }

    pub fn unique(&self) -> usize {
        self.order.len()
    }

    fn count_of(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// The most frequent label; on ties the one seen first wins.
    pub fn most_common(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for label in &self.order {
            let count = self.count_of(label);
            if best.is_none_or(|(_, top)| count > top) {
                best = Some((label.as_str(), count));
            }
        }
        best
    }

    /// Labels by descending count; equal counts keep first-seen order.
    pub fn ranked(&self) -> Vec<(String, usize)> {
        self.order
            .iter()
            .map(|label| (label.clone(), self.count_of(label)))
            .sorted_by(|a, b| b.1.cmp(&a.1))
            .collect()
    }
}

/// Frequency table of the trimmed, non-empty labels in `column`. `top_n` of
/// `None` or `Some(0)` keeps every label.
pub fn compute_value_counts(rows: &[Row], column: &str, top_n: Option<usize>) -> ValueCounts {
    let accumulator = FrequencyAccumulator::from_column(rows, column);
    let total = accumulator.total_valid();
    let mut values = accumulator
        .ranked()
        .into_iter()
        .map(|(value, count)| ValueCount {
            value,
            count,
            percent: round_to(count as f64 / total as f64 * 100.0, 1),
        })
        .collect::<Vec<_>>();
    if let Some(limit) = top_n
        && limit > 0
    {
        values.truncate(limit);
    }
    ValueCounts {
        column: column.to_string(),
        total_valid: total,
        missing: accumulator.missing(),
        unique_values: accumulator.unique(),
        values,
    }
}
