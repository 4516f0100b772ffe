//! Column semantics: the [`ColumnType`] taxonomy, per-column [`ColumnMeta`],
//! and the detection engine that classifies a column from sampled values and
//! its header name.
//!
//! ## Detection order
//!
//! Structural tests run first, each accepted when at least
//! [`STRUCTURAL_MATCH_THRESHOLD`] of the sampled non-missing values match:
//! percentage, then date, then numeric (re-labelled Likert when the values
//! form a bounded 1–5 / 1–7 scale). When no structural test passes the column
//! falls through Likert labels, demographic header keywords, the categorical
//! cardinality cap, and finally `text`.

use std::{collections::HashSet, fmt, str::FromStr};

use anyhow::anyhow;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Row, Value},
    normalize,
};

pub const TYPE_DETECTION_SAMPLE_SIZE: usize = 1000;
pub const STRUCTURAL_MATCH_THRESHOLD: f64 = 0.9;
pub const CATEGORICAL_MAX_UNIQUE: usize = 20;
pub const CATEGORICAL_MAX_RATIO: f64 = 0.5;
pub const SAMPLE_VALUES_LIMIT: usize = 5;
pub const LIKERT_MIN_LABEL_MATCHES: usize = 3;
pub const LIKERT_NUMERIC_MIN_POINTS: usize = 3;
pub const LIKERT_NUMERIC_MAX_POINTS: usize = 7;

pub const DEMOGRAPHIC_KEYWORDS: &[&str] = &[
    "age",
    "gender",
    "sex",
    "income",
    "education",
    "region",
    "ethnicity",
    "race",
    "occupation",
    "employment",
    "marital",
    "religion",
    "social_grade",
    "social grade",
    "socioeconomic",
    "class",
    "constituency",
    "country",
    "county",
    "city",
    "postcode",
    "zip",
];

pub const LIKERT_PATTERNS: &[&[&str]] = &[
    &[
        "strongly agree",
        "agree",
        "neutral",
        "disagree",
        "strongly disagree",
    ],
    &[
        "strongly agree",
        "agree",
        "neither agree nor disagree",
        "disagree",
        "strongly disagree",
    ],
    &[
        "very satisfied",
        "satisfied",
        "neutral",
        "dissatisfied",
        "very dissatisfied",
    ],
    &[
        "very likely",
        "likely",
        "neutral",
        "unlikely",
        "very unlikely",
    ],
    &["very good", "good", "fair", "poor", "very poor"],
    &["excellent", "good", "fair", "poor", "terrible"],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Categorical,
    Date,
    Text,
    Percentage,
    LikertScale,
    Demographic,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
            ColumnType::Date => "date",
            ColumnType::Text => "text",
            ColumnType::Percentage => "percentage",
            ColumnType::LikertScale => "likert_scale",
            ColumnType::Demographic => "demographic",
        }
    }

    /// Human-facing label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "Numeric",
            ColumnType::Categorical => "Categorical",
            ColumnType::Date => "Date",
            ColumnType::Text => "Text",
            ColumnType::Percentage => "Percentage",
            ColumnType::LikertScale => "Likert Scale",
            ColumnType::Demographic => "Demographic",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "numeric",
            "categorical",
            "date",
            "text",
            "percentage",
            "likert_scale",
            "demographic",
        ]
    }

    /// Types whose cells feed numeric statistics and correlations.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Numeric | ColumnType::Percentage)
    }

    /// Types summarised by label frequencies.
    pub fn is_categorical(&self) -> bool {
        matches!(
            self,
            ColumnType::Categorical | ColumnType::Demographic | ColumnType::LikertScale
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "numeric" | "number" => Ok(ColumnType::Numeric),
            "categorical" | "category" => Ok(ColumnType::Categorical),
            "date" => Ok(ColumnType::Date),
            "text" | "string" => Ok(ColumnType::Text),
            "percentage" | "percent" => Ok(ColumnType::Percentage),
            "likert_scale" | "likert" => Ok(ColumnType::LikertScale),
            "demographic" => Ok(ColumnType::Demographic),
            _ => Err(anyhow!(
                "Unknown column type '{value}'. Supported types: {}",
                ColumnType::variants().join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMeta {
    pub name: String,
    pub detected_type: ColumnType,
    pub overridden_type: Option<ColumnType>,
    pub unique_values: usize,
    pub missing_count: usize,
    pub missing_percent: f64,
    pub sample_values: Vec<Value>,
}

impl ColumnMeta {
    /// The user override when present, otherwise the detected type. All
    /// downstream consumers go through this rather than `detected_type`.
    pub fn effective_type(&self) -> ColumnType {
        self.overridden_type.unwrap_or(self.detected_type)
    }
}

/// Tunable detection thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Upper bound on rows inspected per column (0 inspects every row).
    pub sample_size: usize,
    pub structural_threshold: f64,
    pub categorical_max_unique: usize,
    pub categorical_max_ratio: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sample_size: TYPE_DETECTION_SAMPLE_SIZE,
            structural_threshold: STRUCTURAL_MATCH_THRESHOLD,
            categorical_max_unique: CATEGORICAL_MAX_UNIQUE,
            categorical_max_ratio: CATEGORICAL_MAX_RATIO,
        }
    }
}

/// Evenly spaced stride sample starting at row 0.
pub fn sample_rows(rows: &[Row], max_sample: usize) -> Vec<&Row> {
    if max_sample == 0 || rows.len() <= max_sample {
        return rows.iter().collect();
    }
    let step = rows.len() / max_sample;
    rows.iter().step_by(step).take(max_sample).collect()
}

pub fn detect_column_types(rows: &[Row], headers: &[String]) -> Vec<ColumnMeta> {
    detect_column_types_with(rows, headers, &DetectionConfig::default())
}

pub fn detect_column_types_with(
    rows: &[Row],
    headers: &[String],
    config: &DetectionConfig,
) -> Vec<ColumnMeta> {
    let sampled = sample_rows(rows, config.sample_size);
    debug!(
        "Detecting {} column(s) from {} sampled of {} row(s)",
        headers.len(),
        sampled.len(),
        rows.len()
    );
    headers
        .iter()
        .map(|header| detect_column(rows, &sampled, header, config))
        .collect()
}

fn detect_column(
    rows: &[Row],
    sampled: &[&Row],
    header: &str,
    config: &DetectionConfig,
) -> ColumnMeta {
    let mut missing_count = 0usize;
    let mut distinct: HashSet<String> = HashSet::new();
    for row in rows {
        let value = row.get(header);
        if value.is_missing() {
            missing_count += 1;
        } else if let Some(label) = normalize::label(value) {
            distinct.insert(label);
        }
    }

    let present = sampled
        .iter()
        .map(|row| row.get(header))
        .filter(|value| !value.is_missing())
        .collect::<Vec<_>>();

    let detected_type = classify_column(header, &present, distinct.len(), rows.len(), config);
    debug!("Column '{header}' detected as {detected_type}");

    let missing_percent = if rows.is_empty() {
        0.0
    } else {
        missing_count as f64 / rows.len() as f64 * 100.0
    };

    ColumnMeta {
        name: header.to_string(),
        detected_type,
        overridden_type: None,
        unique_values: distinct.len(),
        missing_count,
        missing_percent,
        sample_values: present
            .iter()
            .take(SAMPLE_VALUES_LIMIT)
            .map(|value| (*value).clone())
            .collect(),
    }
}

/// Classifies one column given its sampled non-missing values, the number of
/// distinct labels across every row, and the total row count.
pub fn classify_column(
    name: &str,
    values: &[&Value],
    unique_count: usize,
    total_rows: usize,
    config: &DetectionConfig,
) -> ColumnType {
    if values.is_empty() {
        return ColumnType::Text;
    }

    let candidate = TypeCandidate::observe(values);
    let threshold = config.structural_threshold;

    if candidate.meets(candidate.percentage_matches, threshold) {
        return ColumnType::Percentage;
    }
    if candidate.meets(candidate.date_matches, threshold) {
        return ColumnType::Date;
    }
    if candidate.meets(candidate.numeric_matches, threshold) {
        return if is_likert_column(values) {
            ColumnType::LikertScale
        } else {
            ColumnType::Numeric
        };
    }
    if is_likert_column(values) {
        return ColumnType::LikertScale;
    }
    if is_demographic_name(name) {
        return ColumnType::Demographic;
    }
    if total_rows > 0
        && unique_count <= config.categorical_max_unique
        && unique_count as f64 / total_rows as f64 <= config.categorical_max_ratio
    {
        return ColumnType::Categorical;
    }
    ColumnType::Text
}

/// Case-insensitive substring match against [`DEMOGRAPHIC_KEYWORDS`].
pub fn is_demographic_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    DEMOGRAPHIC_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Likert heuristic over a column's values.
///
/// Text values match when at least [`LIKERT_MIN_LABEL_MATCHES`] distinct
/// lower-cased values each contain a label of one single pattern. Native
/// numbers match when their distinct values are 3–7 integers spanning 1 to
/// exactly 5 or 7.
pub fn is_likert_column(values: &[&Value]) -> bool {
    let labels = values
        .iter()
        .filter_map(|value| match value {
            Value::Text(text) => Some(text.trim().to_lowercase()),
            _ => None,
        })
        .unique()
        .collect::<Vec<_>>();

    if !labels.is_empty() {
        let label_match = LIKERT_PATTERNS.iter().any(|pattern| {
            labels
                .iter()
                .filter(|label| pattern.iter().any(|entry| label.contains(entry)))
                .count()
                >= LIKERT_MIN_LABEL_MATCHES
        });
        if label_match {
            return true;
        }
    }

    let mut points = values
        .iter()
        .filter_map(|value| match value {
            Value::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        })
        .collect::<Vec<_>>();
    if points.is_empty() {
        return false;
    }
    points.sort_by(f64::total_cmp);
    points.dedup();

    let bounded = (LIKERT_NUMERIC_MIN_POINTS..=LIKERT_NUMERIC_MAX_POINTS).contains(&points.len());
    let integral = points.iter().all(|point| point.fract() == 0.0);
    match (points.first(), points.last()) {
        (Some(&min), Some(&max)) => {
            bounded && integral && min == 1.0 && (max == 5.0 || max == 7.0)
        }
        _ => false,
    }
}

/// Structural match counts over a column's sampled non-missing values.
#[derive(Debug, Clone, Default)]
struct TypeCandidate {
    non_empty: usize,
    percentage_matches: usize,
    date_matches: usize,
    numeric_matches: usize,
}

impl TypeCandidate {
    fn observe(values: &[&Value]) -> Self {
        let mut candidate = Self::default();
        for value in values {
            candidate.update(value);
        }
        candidate
    }

    fn update(&mut self, value: &Value) {
        self.non_empty += 1;
        if normalize::is_percentage(value) {
            self.percentage_matches += 1;
        }
        if normalize::is_date_like(value) {
            self.date_matches += 1;
        }
        if normalize::is_numeric_like(value) {
            self.numeric_matches += 1;
        }
    }

    fn meets(&self, count: usize, threshold: f64) -> bool {
        self.non_empty > 0 && count as f64 / self.non_empty as f64 >= threshold
    }
}
