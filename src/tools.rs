//! Analyst tool registry and the JSON dispatch boundary used by the
//! conversational agent.
//!
//! Every call returns a serialized JSON body. Failures, including panics
//! inside an analysis routine, are turned into `{"error": "..."}` payloads so
//! nothing escapes to the calling loop.

use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use thiserror::Error;

use crate::{
    chart::{ChartSpec, ChartType},
    correlation::{DEFAULT_TOP_CORRELATIONS, compute_correlation_matrix, strongest_correlations},
    crosstab::compute_cross_tab,
    data::Row,
    filter::{ConditionOperator, FilterCondition, filter_rows},
    frequency::compute_value_counts,
    groupby::compute_group_by,
    schema::ColumnMeta,
    stats::{compute_column_stats, compute_correlation, round_to},
};

pub const DEFAULT_SAMPLE_ROWS: usize = 5;
pub const MAX_SAMPLE_ROWS: usize = 20;
pub const FILTER_SAMPLE_ROWS: usize = 5;

pub const TOOL_NAMES: &[&str] = &[
    "compute_stats",
    "compute_correlation",
    "correlation_matrix",
    "cross_tab",
    "group_by",
    "get_value_counts",
    "filter_data",
    "get_sample_rows",
    "create_chart",
];

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Column '{0}' not found in dataset")]
    UnknownColumn(String),
    #[error("Invalid input for {tool}: {message}")]
    InvalidInput { tool: String, message: String },
    #[error("Failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    fn invalid(tool: &str, message: impl ToString) -> Self {
        ToolError::InvalidInput {
            tool: tool.to_string(),
            message: message.to_string(),
        }
    }

    /// The message placed in the `error` field of the payload.
    pub fn payload_message(&self) -> String {
        match self {
            ToolError::UnknownTool(_) => self.to_string(),
            other => format!("Tool execution failed: {other}"),
        }
    }

    pub fn to_payload(&self) -> String {
        json!({ "error": self.payload_message() }).to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: serde_json::Value,
}

/// The capabilities advertised to the agent, with JSON-schema inputs.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "compute_stats",
            description: "Compute descriptive statistics (count, mean, median, mode, std dev, min, max, Q1, Q3) for one or more numeric columns.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "columns": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Column names to compute statistics for."
                    }
                },
                "required": ["columns"]
            }),
        },
        ToolDefinition {
            name: "compute_correlation",
            description: "Compute the Pearson correlation coefficient between two numeric columns. Returns a value from -1 to 1.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "column_a": { "type": "string", "description": "First numeric column name." },
                    "column_b": { "type": "string", "description": "Second numeric column name." }
                },
                "required": ["column_a", "column_b"]
            }),
        },
        ToolDefinition {
            name: "correlation_matrix",
            description: "Compute a full Pearson correlation matrix for all numeric columns, and return the strongest correlations.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "top_n": {
                        "type": "number",
                        "description": format!("Number of strongest correlations to return. Default {DEFAULT_TOP_CORRELATIONS}.")
                    }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "cross_tab",
            description: "Compute a cross-tabulation (contingency table) between two categorical columns. Shows frequency counts for each combination.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "row_column": { "type": "string", "description": "Categorical column for rows." },
                    "col_column": { "type": "string", "description": "Categorical column for columns." }
                },
                "required": ["row_column", "col_column"]
            }),
        },
        ToolDefinition {
            name: "group_by",
            description: "Group data by a categorical column and compute statistics (count, mean, median, min, max) for a numeric column within each group.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "group_column": { "type": "string", "description": "Categorical column to group by." },
                    "value_column": { "type": "string", "description": "Numeric column to compute statistics for." }
                },
                "required": ["group_column", "value_column"]
            }),
        },
        ToolDefinition {
            name: "get_value_counts",
            description: "Get the frequency distribution (value counts) for a categorical column. Returns each unique value and its count, sorted by frequency.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "column": { "type": "string", "description": "Column name." },
                    "top_n": { "type": "number", "description": "Max number of values to return. Default all." }
                },
                "required": ["column"]
            }),
        },
        ToolDefinition {
            name: "filter_data",
            description: "Filter the dataset by conditions and return a summary of the filtered subset. Use for questions like 'How many rows have age > 30?'",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "conditions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "column": { "type": "string" },
                                "operator": { "type": "string", "enum": ConditionOperator::variants() },
                                "value": { "description": "The value to compare against. For 'in' operator, provide an array of strings." }
                            },
                            "required": ["column", "operator", "value"]
                        },
                        "description": "Array of filter conditions. All conditions are ANDed together."
                    }
                },
                "required": ["conditions"]
            }),
        },
        ToolDefinition {
            name: "get_sample_rows",
            description: "Return a sample of rows from the dataset. Useful for inspecting actual values.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "count": {
                        "type": "number",
                        "description": format!("Number of rows to return. Default {DEFAULT_SAMPLE_ROWS}, max {MAX_SAMPLE_ROWS}.")
                    },
                    "columns": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Specific columns to include. Default all."
                    }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "create_chart",
            description: "Create an inline chart that will be rendered in the chat. Use this when a visual representation would help the user understand the data.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "chart_type": {
                        "type": "string",
                        "enum": ChartType::variants(),
                        "description": "Type of chart to create."
                    },
                    "title": { "type": "string", "description": "Chart title." },
                    "labels": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "X-axis labels or category names."
                    },
                    "datasets": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "label": { "type": "string" },
                                "data": { "type": "array", "items": { "type": "number" } }
                            },
                            "required": ["label", "data"]
                        },
                        "description": "One or more datasets to plot."
                    }
                },
                "required": ["chart_type", "labels", "datasets"]
            }),
        },
    ]
}

/// A serialized tool call. `structured_input` is accepted as an alias for
/// `input`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    pub tool_name: String,
    #[serde(default, alias = "structured_input")]
    pub input: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ComputeStatsInput {
    columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CorrelationInput {
    column_a: String,
    column_b: String,
}

#[derive(Debug, Default, Deserialize)]
struct MatrixInput {
    #[serde(default)]
    top_n: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CrossTabInput {
    row_column: String,
    col_column: String,
}

#[derive(Debug, Deserialize)]
struct GroupByInput {
    group_column: String,
    value_column: String,
}

#[derive(Debug, Deserialize)]
struct ValueCountsInput {
    column: String,
    #[serde(default)]
    top_n: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FilterInput {
    conditions: Vec<FilterCondition>,
}

#[derive(Debug, Default, Deserialize)]
struct SampleInput {
    #[serde(default)]
    count: Option<f64>,
    #[serde(default)]
    columns: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct CorrelationOutput<'a> {
    column_a: &'a str,
    column_b: &'a str,
    correlation: f64,
}

#[derive(Debug, Serialize)]
struct FilterOutput<'a> {
    original_count: usize,
    filtered_count: usize,
    percent: f64,
    sample_rows: Vec<&'a Row>,
}

/// Runs one tool and returns its JSON body, or an error payload.
pub fn execute_tool(
    tool_name: &str,
    input: &serde_json::Value,
    rows: &[Row],
    columns: &[ColumnMeta],
) -> String {
    debug!("Executing tool '{tool_name}' over {} row(s)", rows.len());
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        dispatch(tool_name, input, rows, columns)
    }));
    let result = outcome.unwrap_or_else(|cause| Err(ToolError::Internal(panic_message(&*cause))));
    match result {
        Ok(body) => body,
        Err(err) => {
            warn!("Tool '{tool_name}' failed: {err}");
            err.to_payload()
        }
    }
}

/// Parses a `{tool_name, input}` request and executes it.
pub fn execute_request(request: &str, rows: &[Row], columns: &[ColumnMeta]) -> String {
    match serde_json::from_str::<ToolRequest>(request) {
        Ok(request) => execute_tool(&request.tool_name, &request.input, rows, columns),
        Err(err) => {
            let err = ToolError::invalid("request", err);
            warn!("Rejected tool request: {err}");
            err.to_payload()
        }
    }
}

fn dispatch(
    tool_name: &str,
    input: &serde_json::Value,
    rows: &[Row],
    columns: &[ColumnMeta],
) -> Result<String, ToolError> {
    match tool_name {
        "compute_stats" => {
            let params: ComputeStatsInput = parse_input(tool_name, input)?;
            require_columns(columns, &params.columns)?;
            let stats = params
                .columns
                .iter()
                .map(|column| compute_column_stats(rows, column))
                .collect::<Vec<_>>();
            render(&stats)
        }
        "compute_correlation" => {
            let params: CorrelationInput = parse_input(tool_name, input)?;
            require_column(columns, &params.column_a)?;
            require_column(columns, &params.column_b)?;
            let r = compute_correlation(rows, &params.column_a, &params.column_b);
            render(&CorrelationOutput {
                column_a: &params.column_a,
                column_b: &params.column_b,
                correlation: round_to(r, 3),
            })
        }
        "correlation_matrix" => {
            let params: MatrixInput = parse_input(tool_name, input)?;
            let top_n = positive_count(params.top_n).unwrap_or(DEFAULT_TOP_CORRELATIONS);
            let numeric = columns
                .iter()
                .filter(|column| column.effective_type().is_numeric())
                .map(|column| column.name.clone())
                .collect::<Vec<_>>();
            let result = compute_correlation_matrix(rows, &numeric);
            let mut strongest = strongest_correlations(&result.matrix, &numeric, top_n);
            for pair in &mut strongest {
                pair.r = round_to(pair.r, 3);
            }
            let matrix = result
                .matrix
                .iter()
                .map(|cells| cells.iter().map(|r| round_to(*r, 3)).collect::<Vec<_>>())
                .collect::<Vec<_>>();
            render(&json!({
                "columns": numeric,
                "matrix": matrix,
                "strongest_correlations": strongest,
            }))
        }
        "cross_tab" => {
            let params: CrossTabInput = parse_input(tool_name, input)?;
            require_column(columns, &params.row_column)?;
            require_column(columns, &params.col_column)?;
            render(&compute_cross_tab(rows, &params.row_column, &params.col_column))
        }
        "group_by" => {
            let params: GroupByInput = parse_input(tool_name, input)?;
            require_column(columns, &params.group_column)?;
            require_column(columns, &params.value_column)?;
            render(&compute_group_by(rows, &params.group_column, &params.value_column))
        }
        "get_value_counts" => {
            let params: ValueCountsInput = parse_input(tool_name, input)?;
            require_column(columns, &params.column)?;
            render(&compute_value_counts(
                rows,
                &params.column,
                positive_count(params.top_n),
            ))
        }
        "filter_data" => {
            let params: FilterInput = parse_input(tool_name, input)?;
            for condition in &params.conditions {
                require_column(columns, &condition.column)?;
            }
            let matched = filter_rows(rows, &params.conditions)
                .map_err(|err| ToolError::invalid(tool_name, err))?;
            let percent = if rows.is_empty() {
                0.0
            } else {
                round_to(matched.len() as f64 / rows.len() as f64 * 100.0, 1)
            };
            render(&FilterOutput {
                original_count: rows.len(),
                filtered_count: matched.len(),
                percent,
                sample_rows: matched.into_iter().take(FILTER_SAMPLE_ROWS).collect(),
            })
        }
        "get_sample_rows" => {
            let params: SampleInput = parse_input(tool_name, input)?;
            let count = positive_count(params.count)
                .unwrap_or(DEFAULT_SAMPLE_ROWS)
                .min(MAX_SAMPLE_ROWS);
            let projection = params.columns.unwrap_or_default();
            require_columns(columns, &projection)?;
            let sample = rows
                .iter()
                .take(count)
                .map(|row| {
                    if projection.is_empty() {
                        row.clone()
                    } else {
                        row.project(&projection)
                    }
                })
                .collect::<Vec<_>>();
            render(&sample)
        }
        "create_chart" => {
            let spec: ChartSpec = parse_input(tool_name, input)?;
            let spec = spec
                .validate()
                .map_err(|err| ToolError::invalid(tool_name, err))?;
            render(&spec)
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

fn parse_input<T: DeserializeOwned>(tool: &str, input: &serde_json::Value) -> Result<T, ToolError> {
    let input = if input.is_null() {
        json!({})
    } else {
        input.clone()
    };
    serde_json::from_value(input).map_err(|err| ToolError::invalid(tool, err))
}

fn render<T: Serialize + ?Sized>(value: &T) -> Result<String, ToolError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn require_column(columns: &[ColumnMeta], name: &str) -> Result<(), ToolError> {
    if columns.iter().any(|column| column.name == name) {
        Ok(())
    } else {
        Err(ToolError::UnknownColumn(name.to_string()))
    }
}

fn require_columns(columns: &[ColumnMeta], names: &[String]) -> Result<(), ToolError> {
    names.iter().try_for_each(|name| require_column(columns, name))
}

/// Agent-supplied counts arrive as JSON numbers; zero, negative and
/// non-finite values mean "use the default".
fn positive_count(value: Option<f64>) -> Option<usize> {
    value
        .filter(|n| n.is_finite() && *n >= 1.0)
        .map(|n| n.floor() as usize)
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = cause.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.clone()
    } else {
        "analysis routine panicked".to_string()
    }
}
