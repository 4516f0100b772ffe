//! Chart specifications for the presentation layer: validation of agent
//! supplied charts and aggregation of rows into chart series.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    str::FromStr,
};

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    data::{Row, Value},
    normalize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartType {
    #[default]
    Bar,
    HorizontalBar,
    GroupedBar,
    StackedBar,
    Line,
    Pie,
    Doughnut,
    Scatter,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::HorizontalBar => "horizontalBar",
            ChartType::GroupedBar => "groupedBar",
            ChartType::StackedBar => "stackedBar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Doughnut => "doughnut",
            ChartType::Scatter => "scatter",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "bar",
            "horizontalBar",
            "groupedBar",
            "stackedBar",
            "line",
            "pie",
            "doughnut",
            "scatter",
        ]
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().replace(['-', '_'], "").to_ascii_lowercase();
        ChartType::variants()
            .iter()
            .position(|name| name.to_ascii_lowercase() == wanted)
            .and_then(|idx| ALL_CHART_TYPES.get(idx).copied())
            .ok_or_else(|| {
                anyhow!(
                    "Unknown chart type '{value}'. Supported types: {}",
                    ChartType::variants().join(", ")
                )
            })
    }
}

const ALL_CHART_TYPES: [ChartType; 8] = [
    ChartType::Bar,
    ChartType::HorizontalBar,
    ChartType::GroupedBar,
    ChartType::StackedBar,
    ChartType::Line,
    ChartType::Pie,
    ChartType::Doughnut,
    ChartType::Scatter,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    #[serde(deserialize_with = "scalar_as_text")]
    pub label: String,
    pub data: Vec<f64>,
}

/// Marker that lets the presentation layer recognise a chart payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartMarker {
    #[default]
    #[serde(rename = "chart")]
    Chart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "_type", default)]
    pub marker: ChartMarker,
    pub chart_type: ChartType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(deserialize_with = "scalars_as_text")]
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

impl ChartSpec {
    /// Checks the shape the renderer relies on: at least one dataset and, for
    /// everything except scatter plots, one data point per label.
    pub fn validate(self) -> Result<Self> {
        if self.datasets.is_empty() {
            bail!("Chart requires at least one dataset");
        }
        if self.chart_type != ChartType::Scatter {
            for dataset in &self.datasets {
                if dataset.data.len() != self.labels.len() {
                    bail!(
                        "Dataset '{}' has {} values but the chart has {} labels",
                        dataset.label,
                        dataset.data.len(),
                        self.labels.len()
                    );
                }
            }
        }
        Ok(self)
    }
}

fn scalar_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_display())
}

fn scalars_as_text<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values.iter().map(Value::as_display).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub x_column: String,
    /// `None` plots row counts per x label instead of the mean of y.
    pub y_column: Option<String>,
    pub group_by_column: Option<String>,
    #[serde(default)]
    pub chart_type: ChartType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

impl ChartData {
    pub fn into_spec(self, chart_type: ChartType, title: Option<String>) -> ChartSpec {
        ChartSpec {
            marker: ChartMarker::Chart,
            chart_type,
            title,
            labels: self.labels,
            datasets: self.datasets,
        }
    }
}

/// Per-label observations in first-seen label order.
#[derive(Debug, Default)]
struct Series {
    order: Vec<String>,
    values: HashMap<String, Vec<f64>>,
    counts: HashMap<String, usize>,
}

impl Series {
    fn observe(&mut self, label: &str, value: Option<f64>, counting: bool) {
        if counting {
            self.touch(label);
            *self.counts.entry(label.to_string()).or_default() += 1;
        } else if let Some(value) = value {
            self.touch(label);
            self.values.entry(label.to_string()).or_default().push(value);
        }
    }

    fn touch(&mut self, label: &str) {
        if !self.counts.contains_key(label) && !self.values.contains_key(label) {
            self.order.push(label.to_string());
        }
    }

    fn aggregate(&self, label: &str, counting: bool) -> f64 {
        if counting {
            return self.counts.get(label).copied().unwrap_or(0) as f64;
        }
        match self.values.get(label) {
            Some(values) if !values.is_empty() => {
                values.iter().sum::<f64>() / values.len() as f64
            }
            _ => 0.0,
        }
    }
}

fn chart_label(value: &Value) -> String {
    value.as_display()
}

/// Aggregates rows into chart series: counts per x label when no y column is
/// configured, otherwise the mean of numeric y values. With a group column
/// each group becomes one dataset aligned to the shared x labels.
pub fn build_chart_data(rows: &[Row], config: &ChartConfig) -> Option<ChartData> {
    if rows.is_empty() || config.x_column.is_empty() {
        return None;
    }
    let counting = config.y_column.is_none();
    let y_value = |row: &Row| {
        config
            .y_column
            .as_deref()
            .and_then(|column| normalize::to_number(row.get(column)))
    };

    let Some(group_column) = config.group_by_column.as_deref() else {
        let mut series = Series::default();
        for row in rows {
            series.observe(&chart_label(row.get(&config.x_column)), y_value(row), counting);
        }
        let data = series
            .order
            .iter()
            .map(|label| series.aggregate(label, counting))
            .collect();
        return Some(ChartData {
            labels: series.order.clone(),
            datasets: vec![ChartDataset {
                label: config
                    .y_column
                    .clone()
                    .unwrap_or_else(|| "Count".to_string()),
                data,
            }],
        });
    };

    let mut x_labels: Vec<String> = Vec::new();
    let mut seen_x: HashSet<String> = HashSet::new();
    let mut group_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Series> = HashMap::new();
    for row in rows {
        let x = chart_label(row.get(&config.x_column));
        let group = chart_label(row.get(group_column));
        if seen_x.insert(x.clone()) {
            x_labels.push(x.clone());
        }
        if !groups.contains_key(&group) {
            group_order.push(group.clone());
        }
        groups
            .entry(group)
            .or_default()
            .observe(&x, y_value(row), counting);
    }

    let datasets = group_order
        .iter()
        .map(|group| ChartDataset {
            label: group.clone(),
            data: x_labels
                .iter()
                .map(|x| {
                    groups
                        .get(group)
                        .map_or(0.0, |series| series.aggregate(x, counting))
                })
                .collect(),
        })
        .collect();
    Some(ChartData {
        labels: x_labels,
        datasets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sales() -> Vec<Row> {
        [
            ("North", "A", Value::Number(10.0)),
            ("South", "A", Value::Number(4.0)),
            ("North", "B", Value::Number(20.0)),
            ("North", "A", Value::from("n/a")),
        ]
        .into_iter()
        .map(|(region, product, amount)| {
            [
                ("region", Value::from(region)),
                ("product", Value::from(product)),
                ("amount", amount),
            ]
            .into_iter()
            .collect()
        })
        .collect()
    }

    fn config(y: Option<&str>, group: Option<&str>) -> ChartConfig {
        ChartConfig {
            x_column: "region".to_string(),
            y_column: y.map(str::to_string),
            group_by_column: group.map(str::to_string),
            chart_type: ChartType::Bar,
        }
    }

    #[test]
    fn counts_rows_per_label_in_first_seen_order() {
        let data = build_chart_data(&sales(), &config(None, None)).expect("chart");
        assert_eq!(data.labels, vec!["North", "South"]);
        assert_eq!(data.datasets[0].label, "Count");
        assert_eq!(data.datasets[0].data, vec![3.0, 1.0]);
    }

    #[test]
    fn averages_numeric_y_values() {
        let data = build_chart_data(&sales(), &config(Some("amount"), None)).expect("chart");
        assert_eq!(data.datasets[0].label, "amount");
        assert_eq!(data.datasets[0].data, vec![15.0, 4.0]);
    }

    #[test]
    fn grouped_series_fill_gaps_with_zero() {
        let data =
            build_chart_data(&sales(), &config(Some("amount"), Some("product"))).expect("chart");
        assert_eq!(data.labels, vec!["North", "South"]);
        assert_eq!(data.datasets.len(), 2);
        assert_eq!(data.datasets[0].label, "A");
        assert_eq!(data.datasets[0].data, vec![10.0, 4.0]);
        assert_eq!(data.datasets[1].label, "B");
        assert_eq!(data.datasets[1].data, vec![20.0, 0.0]);
    }

    #[test]
    fn grouped_series_scale_to_many_distinct_labels() {
        let rows: Vec<Row> = (0..20_000)
            .map(|i| {
                [
                    ("region", Value::from(format!("site-{i}"))),
                    ("product", Value::from(if i % 2 == 0 { "A" } else { "B" })),
                    ("amount", Value::Number(i as f64)),
                ]
                .into_iter()
                .collect()
            })
            .collect();
        let data =
            build_chart_data(&rows, &config(Some("amount"), Some("product"))).expect("chart");
        assert_eq!(data.labels.len(), 20_000);
        assert_eq!(data.labels[0], "site-0");
        assert_eq!(data.labels[19_999], "site-19999");
        assert_eq!(data.datasets.len(), 2);
        assert_eq!(data.datasets[0].data[2], 2.0);
        assert_eq!(data.datasets[0].data[3], 0.0);
        assert_eq!(data.datasets[1].data[3], 3.0);
    }

    #[test]
    fn empty_rows_produce_no_chart() {
        assert!(build_chart_data(&[], &config(None, None)).is_none());
    }

    #[test]
    fn chart_spec_round_trips_agent_payload() {
        let spec: ChartSpec = serde_json::from_value(json!({
            "chart_type": "horizontalBar",
            "labels": ["a", 2],
            "datasets": [{"label": "n", "data": [1, 2.5]}]
        }))
        .expect("spec");
        let spec = spec.validate().expect("valid");
        assert_eq!(spec.labels, vec!["a", "2"]);
        let encoded = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(encoded["_type"], "chart");
        assert_eq!(encoded["chart_type"], "horizontalBar");
        assert!(encoded.get("title").is_none());
    }

    #[test]
    fn chart_spec_rejects_mismatched_series() {
        let spec: ChartSpec = serde_json::from_value(json!({
            "chart_type": "bar",
            "labels": ["a", "b"],
            "datasets": [{"label": "n", "data": [1]}]
        }))
        .expect("spec");
        assert!(spec.validate().is_err());
        assert!(
            serde_json::from_value::<ChartSpec>(json!({
                "chart_type": "radar",
                "labels": [],
                "datasets": []
            }))
            .is_err()
        );
    }

    #[test]
    fn chart_type_parses_loosely() {
        assert_eq!("horizontal-bar".parse::<ChartType>().unwrap(), ChartType::HorizontalBar);
        assert_eq!("PIE".parse::<ChartType>().unwrap(), ChartType::Pie);
        assert!("radar".parse::<ChartType>().is_err());
    }
}
