use serde::{Deserialize, Serialize};

use crate::{data::Row, stats::compute_correlation};

pub const DEFAULT_TOP_CORRELATIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    #[serde(rename = "colA")]
    pub col_a: String,
    #[serde(rename = "colB")]
    pub col_b: String,
    pub r: f64,
}

/// Symmetric Pearson matrix with a unit diagonal. Each unordered pair is
/// computed once and mirrored.
pub fn compute_correlation_matrix(rows: &[Row], columns: &[String]) -> CorrelationMatrix {
    let n = columns.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = compute_correlation(rows, &columns[i], &columns[j]);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    CorrelationMatrix {
        columns: columns.to_vec(),
        matrix,
    }
}

/// The `top_n` off-diagonal pairs (i < j) by descending |r|.
pub fn strongest_correlations(
    matrix: &[Vec<f64>],
    columns: &[String],
    top_n: usize,
) -> Vec<CorrelationPair> {
    let mut pairs = Vec::new();
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            let r = matrix
                .get(i)
                .and_then(|row| row.get(j))
                .copied()
                .unwrap_or(0.0);
            pairs.push(CorrelationPair {
                col_a: columns[i].clone(),
                col_b: columns[j].clone(),
                r,
            });
        }
    }
    pairs.sort_by(|a, b| b.r.abs().total_cmp(&a.r.abs()));
    pairs.truncate(top_n);
    pairs
}
