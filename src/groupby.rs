use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{data::Row, normalize, stats};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub label: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupByResult {
    pub group_column: String,
    pub value_column: String,
    pub groups: Vec<GroupStats>,
}

/// Partitions rows by the trimmed label of `group_column` and summarises the
/// numeric cells of `value_column` within each group. Groups are ordered by
/// label; a group without numeric values is kept with zeroed statistics.
pub fn compute_group_by(rows: &[Row], group_column: &str, value_column: &str) -> GroupByResult {
    let mut partitions: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let Some(label) = normalize::label(row.get(group_column)) else {
            continue;
        };
        let values = partitions.entry(label).or_default();
        if let Some(value) = normalize::to_number(row.get(value_column)) {
            values.push(value);
        }
    }

    let groups = partitions
        .into_iter()
        .map(|(label, values)| summarize(label, values))
        .collect();

    GroupByResult {
        group_column: group_column.to_string(),
        value_column: value_column.to_string(),
        groups,
    }
}

fn summarize(label: String, mut values: Vec<f64>) -> GroupStats {
    if values.is_empty() {
        return GroupStats {
            label,
            count: 0,
            mean: 0.0,
            median: 0.0,
            min: 0.0,
            max: 0.0,
        };
    }
    values.sort_by(f64::total_cmp);
    let count = values.len();
    GroupStats {
        label,
        count,
        mean: values.iter().sum::<f64>() / count as f64,
        median: stats::median(&values),
        min: values[0],
        max: values[count - 1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn sale(region: &str, sales: Value) -> Row {
        [("region", Value::from(region)), ("sales", sales)]
            .into_iter()
            .collect()
    }

    #[test]
    fn groups_are_sorted_and_summarised() {
        let rows = vec![
            sale("South", Value::Number(50.0)),
            sale("North", Value::Number(100.0)),
            sale("North", Value::Number(200.0)),
        ];
        let result = compute_group_by(&rows, "region", "sales");
        assert_eq!(result.groups.len(), 2);
        let north = &result.groups[0];
        assert_eq!(north.label, "North");
        assert_eq!(north.count, 2);
        assert_eq!(north.mean, 150.0);
        assert_eq!(north.median, 150.0);
        assert_eq!((north.min, north.max), (100.0, 200.0));
        assert_eq!(result.groups[1].label, "South");
        assert_eq!(result.groups[1].count, 1);
    }

    #[test]
    fn groups_without_numbers_are_zero_filled() {
        let rows = vec![
            sale("East", Value::from("n/a")),
            sale("", Value::Number(5.0)),
            sale("West", Value::Number(5.0)),
        ];
        let result = compute_group_by(&rows, "region", "sales");
        let labels: Vec<&str> = result.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["East", "West"]);
        assert_eq!(result.groups[0].count, 0);
        assert_eq!(result.groups[0].mean, 0.0);
    }
}
