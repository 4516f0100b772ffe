//! Row predicates: the interactive filter set that narrows the active
//! dataset, and the conjunctive conditions accepted by `filter_data` and the
//! command-line `--filter` option.

use anyhow::{Result, anyhow};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Row, Value},
    normalize,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FilterPredicate {
    /// Exact match on the cell's string form.
    Equals(String),
    /// Case-insensitive substring match; missing cells never match.
    Contains(String),
    /// Inclusive numeric bounds.
    Range(f64, f64),
    In(Vec<String>),
    /// Inclusive date bounds.
    DateRange(NaiveDateTime, NaiveDateTime),
}

impl FilterPredicate {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FilterPredicate::Equals(expected) => value.as_display() == *expected,
            FilterPredicate::Contains(needle) => {
                !value.is_missing()
                    && value
                        .as_display()
                        .to_lowercase()
                        .contains(&needle.to_lowercase())
            }
            FilterPredicate::Range(min, max) => {
                normalize::to_number(value).is_some_and(|n| n >= *min && n <= *max)
            }
            FilterPredicate::In(allowed) => {
                let display = value.as_display();
                allowed.iter().any(|candidate| *candidate == display)
            }
            FilterPredicate::DateRange(start, end) => {
                normalize::to_date(value).is_some_and(|date| date >= *start && date <= *end)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveFilter {
    pub column: String,
    pub predicate: FilterPredicate,
}

impl ActiveFilter {
    pub fn new(column: impl Into<String>, predicate: FilterPredicate) -> Self {
        Self {
            column: column.into(),
            predicate,
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.predicate.matches(row.get(&self.column))
    }
}

/// At most one filter per column, applied conjunctively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    filters: Vec<ActiveFilter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `filter`, replacing any existing filter on the same column.
    pub fn set(&mut self, filter: ActiveFilter) {
        match self
            .filters
            .iter_mut()
            .find(|existing| existing.column == filter.column)
        {
            Some(existing) => *existing = filter,
            None => self.filters.push(filter),
        }
    }

    pub fn remove(&mut self, column: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|filter| filter.column != column);
        self.filters.len() != before
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveFilter> {
        self.filters.iter()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    pub fn apply(&self, rows: &[Row]) -> Vec<Row> {
        rows.iter()
            .filter(|row| self.matches(row))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
    In,
}

impl ConditionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not_equals",
            ConditionOperator::GreaterThan => "greater_than",
            ConditionOperator::LessThan => "less_than",
            ConditionOperator::GreaterOrEqual => "greater_or_equal",
            ConditionOperator::LessOrEqual => "less_or_equal",
            ConditionOperator::Contains => "contains",
            ConditionOperator::In => "in",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "equals",
            "not_equals",
            "greater_than",
            "less_than",
            "greater_or_equal",
            "less_or_equal",
            "contains",
            "in",
        ]
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            ConditionOperator::GreaterThan
                | ConditionOperator::LessThan
                | ConditionOperator::GreaterOrEqual
                | ConditionOperator::LessOrEqual
        )
    }
}

/// One `column <operator> value` condition as the agent sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

/// A condition whose operand has been checked and lower-cased once.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCondition {
    column: String,
    operator: ConditionOperator,
    operand: Operand,
}

impl FilterCondition {
    pub fn new(
        column: impl Into<String>,
        operator: ConditionOperator,
        value: serde_json::Value,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }

    pub fn compile(&self) -> Result<CompiledCondition> {
        let operand = match self.operator {
            ConditionOperator::In => {
                let items = self.value.as_array().ok_or_else(|| {
                    anyhow!(
                        "Operator 'in' on column '{}' expects an array of values",
                        self.column
                    )
                })?;
                Operand::List(items.iter().map(operand_text).collect())
            }
            op if op.is_numeric() => {
                let number = normalize::to_number(&Value::from(self.value.clone()))
                    .ok_or_else(|| {
                        anyhow!(
                            "Operator '{}' on column '{}' expects a numeric value, got {}",
                            op.as_str(),
                            self.column,
                            self.value
                        )
                    })?;
                Operand::Number(number)
            }
            _ => Operand::Text(operand_text(&self.value)),
        };
        Ok(CompiledCondition {
            column: self.column.clone(),
            operator: self.operator,
            operand,
        })
    }
}

impl CompiledCondition {
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Missing cells fail every numeric comparison; text comparisons see them
    /// as the empty string.
    pub fn matches(&self, row: &Row) -> bool {
        let value = row.get(&self.column);
        match (&self.operand, self.operator) {
            (Operand::Number(rhs), op) => {
                let Some(lhs) = normalize::to_number(value) else {
                    return false;
                };
                match op {
                    ConditionOperator::GreaterThan => lhs > *rhs,
                    ConditionOperator::LessThan => lhs < *rhs,
                    ConditionOperator::GreaterOrEqual => lhs >= *rhs,
                    _ => lhs <= *rhs,
                }
            }
            (Operand::List(allowed), _) => {
                let text = cell_text(value);
                allowed.iter().any(|candidate| *candidate == text)
            }
            (Operand::Text(expected), ConditionOperator::NotEquals) => {
                cell_text(value) != *expected
            }
            (Operand::Text(needle), ConditionOperator::Contains) => {
                cell_text(value).contains(needle.as_str())
            }
            (Operand::Text(expected), _) => cell_text(value) == *expected,
        }
    }
}

fn cell_text(value: &Value) -> String {
    value.as_display().to_lowercase()
}

fn operand_text(value: &serde_json::Value) -> String {
    Value::from(value.clone()).as_display().to_lowercase()
}

pub fn compile_conditions(conditions: &[FilterCondition]) -> Result<Vec<CompiledCondition>> {
    conditions.iter().map(FilterCondition::compile).collect()
}

/// Rows satisfying every condition, in their original order.
pub fn filter_rows<'a>(rows: &'a [Row], conditions: &[FilterCondition]) -> Result<Vec<&'a Row>> {
    let compiled = compile_conditions(conditions)?;
    Ok(rows
        .iter()
        .filter(|row| compiled.iter().all(|condition| condition.matches(row)))
        .collect())
}

pub fn parse_filters(filters: &[String]) -> Result<Vec<FilterCondition>> {
    filters.iter().map(|f| parse_filter(f)).collect()
}

/// Parses `column<op>value` where op is one of `= == != > >= < <=`, or the
/// word forms `column contains value` and `column in a|b|c`.
fn parse_filter(filter: &str) -> Result<FilterCondition> {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty filter expression"));
    }

    let lowered = trimmed.to_ascii_lowercase();
    if let Some(idx) = lowered.find(" contains ") {
        let right = trimmed[idx + " contains ".len()..].trim();
        return Ok(FilterCondition::new(
            column_part(&trimmed[..idx], trimmed)?,
            ConditionOperator::Contains,
            serde_json::Value::String(unquote(right).to_string()),
        ));
    }
    if let Some(idx) = lowered.find(" in ") {
        let right = trimmed[idx + " in ".len()..].trim();
        let items = unquote(right)
            .split(['|', ','])
            .map(|item| serde_json::Value::String(unquote(item.trim()).to_string()))
            .collect();
        return Ok(FilterCondition::new(
            column_part(&trimmed[..idx], trimmed)?,
            ConditionOperator::In,
            serde_json::Value::Array(items),
        ));
    }

    for (needle, op) in [
        ("!=", ConditionOperator::NotEquals),
        (">=", ConditionOperator::GreaterOrEqual),
        ("<=", ConditionOperator::LessOrEqual),
        ("==", ConditionOperator::Equals),
        ("=", ConditionOperator::Equals),
        (">", ConditionOperator::GreaterThan),
        ("<", ConditionOperator::LessThan),
    ] {
        if let Some(idx) = trimmed.find(needle) {
            let right = trimmed[idx + needle.len()..].trim();
            return Ok(FilterCondition::new(
                column_part(&trimmed[..idx], trimmed)?,
                op,
                serde_json::Value::String(unquote(right).to_string()),
            ));
        }
    }

    Err(anyhow!("Failed to parse filter expression '{trimmed}'"))
}

fn column_part(left: &str, expression: &str) -> Result<String> {
    let column = unquote(left.trim());
    if column.is_empty() {
        return Err(anyhow!("Filter expression '{expression}' is missing a column name"));
    }
    Ok(column.to_string())
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    fn people() -> Vec<Row> {
        vec![
            [("name", Value::from("Ann")), ("age", Value::Number(34.0)), ("city", Value::from("Leeds"))]
                .into_iter()
                .collect(),
            [("name", Value::from("Bob")), ("age", Value::Missing), ("city", Value::from("York"))]
                .into_iter()
                .collect(),
            [("name", Value::from("Cat")), ("age", Value::from("28")), ("city", Value::from("leeds"))]
                .into_iter()
                .collect(),
        ]
    }

    fn names(rows: &[&Row]) -> Vec<String> {
        rows.iter().map(|row| row.get("name").as_display()).collect()
    }

    #[test]
    fn conditions_are_conjunctive_and_case_insensitive() {
        let rows = people();
        let conditions = vec![
            FilterCondition::new("city", ConditionOperator::Equals, json!("LEEDS")),
            FilterCondition::new("age", ConditionOperator::GreaterThan, json!(30)),
        ];
        let matched = filter_rows(&rows, &conditions).expect("filter");
        assert_eq!(names(&matched), vec!["Ann"]);
    }

    #[test]
    fn missing_cells_fail_numeric_comparisons() {
        let rows = people();
        let conditions = vec![FilterCondition::new(
            "age",
            ConditionOperator::LessOrEqual,
            json!("40"),
        )];
        let matched = filter_rows(&rows, &conditions).expect("filter");
        assert_eq!(names(&matched), vec!["Ann", "Cat"]);
    }

    #[test]
    fn in_and_contains_operators() {
        let rows = people();
        let within = vec![FilterCondition::new(
            "name",
            ConditionOperator::In,
            json!(["ann", "BOB"]),
        )];
        assert_eq!(names(&filter_rows(&rows, &within).unwrap()), vec!["Ann", "Bob"]);

        let contains = vec![FilterCondition::new("city", ConditionOperator::Contains, json!("OR"))];
        assert_eq!(names(&filter_rows(&rows, &contains).unwrap()), vec!["Bob"]);

        let not_equals = vec![FilterCondition::new("city", ConditionOperator::NotEquals, json!("leeds"))];
        assert_eq!(names(&filter_rows(&rows, &not_equals).unwrap()), vec!["Bob"]);
    }

    #[test]
    fn malformed_operands_are_rejected() {
        let rows = people();
        let bad_number = vec![FilterCondition::new("age", ConditionOperator::GreaterThan, json!("old"))];
        assert!(filter_rows(&rows, &bad_number).is_err());
        let bad_list = vec![FilterCondition::new("name", ConditionOperator::In, json!("Ann"))];
        assert!(filter_rows(&rows, &bad_list).is_err());
    }

    #[test]
    fn conditions_deserialize_from_agent_json() {
        let condition: FilterCondition = serde_json::from_value(json!({
            "column": "age",
            "operator": "greater_or_equal",
            "value": 28
        }))
        .expect("condition");
        assert_eq!(condition.operator, ConditionOperator::GreaterOrEqual);
        assert!(serde_json::from_value::<FilterCondition>(json!({
            "column": "age",
            "operator": "between",
            "value": 1
        }))
        .is_err());
    }

    #[test]
    fn parse_filters_supports_symbols_and_words() {
        let parsed = parse_filters(&[
            "age>=30".to_string(),
            "city == 'Leeds'".to_string(),
            "name in Ann|Bob".to_string(),
            "city contains ee".to_string(),
            "age != 3".to_string(),
        ])
        .expect("parse");
        assert_eq!(parsed[0].operator, ConditionOperator::GreaterOrEqual);
        assert_eq!(parsed[0].value, json!("30"));
        assert_eq!(parsed[1].operator, ConditionOperator::Equals);
        assert_eq!(parsed[1].value, json!("Leeds"));
        assert_eq!(parsed[2].value, json!(["Ann", "Bob"]));
        assert_eq!(parsed[3].operator, ConditionOperator::Contains);
        assert_eq!(parsed[4].operator, ConditionOperator::NotEquals);
        assert!(parse_filters(&["=5".to_string()]).is_err());
        assert!(parse_filters(&["no operator".to_string()]).is_err());
    }

    #[test]
    fn filter_set_replaces_per_column_and_applies_all() {
        let rows = people();
        let mut filters = FilterSet::new();
        filters.set(ActiveFilter::new("city", FilterPredicate::Contains("LEE".into())));
        filters.set(ActiveFilter::new("age", FilterPredicate::Range(0.0, 30.0)));
        assert_eq!(filters.len(), 2);
        let kept = filters.apply(&rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("name"), &Value::from("Cat"));

        filters.set(ActiveFilter::new("age", FilterPredicate::Range(30.0, 40.0)));
        assert_eq!(filters.len(), 2);
        assert_eq!(filters.apply(&rows)[0].get("name"), &Value::from("Ann"));

        assert!(filters.remove("age"));
        assert!(!filters.remove("age"));
        filters.clear();
        assert_eq!(filters.apply(&rows).len(), 3);
    }

    #[test]
    fn predicates_cover_equals_in_and_dates() {
        assert!(FilterPredicate::Equals("34".into()).matches(&Value::Number(34.0)));
        assert!(!FilterPredicate::Contains("x".into()).matches(&Value::Missing));
        assert!(FilterPredicate::In(vec!["a".into(), "b".into()]).matches(&Value::from("b")));
        let day = |d| {
            NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_time(NaiveTime::MIN)
        };
        let range = FilterPredicate::DateRange(day(1), day(31));
        assert!(range.matches(&Value::from("2024-01-15")));
        assert!(!range.matches(&Value::from("2024-02-01")));
        assert!(!range.matches(&Value::from("not a date")));
    }

    #[test]
    fn predicates_serialize_with_type_and_value() {
        let filter = ActiveFilter::new("score", FilterPredicate::Range(1.0, 5.0));
        let encoded = serde_json::to_value(&filter).expect("serialize");
        assert_eq!(
            encoded,
            json!({"column": "score", "predicate": {"type": "range", "value": [1.0, 5.0]}})
        );
    }
}
