use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{data::Row, normalize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTabResult {
    pub row_variable: String,
    pub col_variable: String,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
    pub row_totals: Vec<usize>,
    pub col_totals: Vec<usize>,
    pub grand_total: usize,
}

impl CrossTabResult {
    fn empty(row_column: &str, col_column: &str) -> Self {
        Self {
            row_variable: row_column.to_string(),
            col_variable: col_column.to_string(),
            row_labels: Vec::new(),
            col_labels: Vec::new(),
            counts: Vec::new(),
            row_totals: Vec::new(),
            col_totals: Vec::new(),
            grand_total: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty() || self.col_labels.is_empty()
    }
}

/// Contingency table of two label columns. Rows where either side is missing
/// or blank after trimming are skipped; both axes are sorted lexicographically.
pub fn compute_cross_tab(rows: &[Row], row_column: &str, col_column: &str) -> CrossTabResult {
    let pairs = rows
        .iter()
        .filter_map(|row| {
            let row_label = normalize::label(row.get(row_column))?;
            let col_label = normalize::label(row.get(col_column))?;
            Some((row_label, col_label))
        })
        .collect::<Vec<_>>();
    if pairs.is_empty() {
        return CrossTabResult::empty(row_column, col_column);
    }

    let row_labels = pairs
        .iter()
        .map(|(r, _)| r.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    let col_labels = pairs
        .iter()
        .map(|(_, c)| c.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    let row_index = index_of(&row_labels);
    let col_index = index_of(&col_labels);

    let mut counts = vec![vec![0usize; col_labels.len()]; row_labels.len()];
    for (row_label, col_label) in &pairs {
        counts[row_index[row_label.as_str()]][col_index[col_label.as_str()]] += 1;
    }

    let row_totals = counts
        .iter()
        .map(|cells| cells.iter().sum())
        .collect::<Vec<usize>>();
    let col_totals = (0..col_labels.len())
        .map(|j| counts.iter().map(|cells| cells[j]).sum())
        .collect::<Vec<usize>>();
    let grand_total = row_totals.iter().sum();

    CrossTabResult {
        row_variable: row_column.to_string(),
        col_variable: col_column.to_string(),
        row_labels,
        col_labels,
        counts,
        row_totals,
        col_totals,
        grand_total,
    }
}

fn index_of(labels: &[String]) -> BTreeMap<&str, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(idx, label)| (label.as_str(), idx))
        .collect()
}
