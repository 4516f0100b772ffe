use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{chart::ChartType, schema::TYPE_DETECTION_SAMPLE_SIZE};

#[derive(Debug, Parser)]
#[command(author, version, about = "Explore tabular survey and business data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect column types, missing data and distinct counts
    Probe(ProbeArgs),
    /// Descriptive statistics for numeric columns
    Stats(StatsArgs),
    /// Strongest pairwise correlations among numeric columns
    Correlate(CorrelateArgs),
    /// Contingency table between two categorical columns
    Crosstab(CrosstabArgs),
    /// Numeric summary of one column per group of another
    Groupby(GroupbyArgs),
    /// Value counts for one or more columns
    Frequency(FrequencyArgs),
    /// Automatically generated data quality and pattern insights
    Insights(SourceArgs),
    /// Dataset summary as handed to the analyst agent
    Summary(SourceArgs),
    /// Aggregate rows into chart series
    Chart(ChartArgs),
    /// Invoke an analyst tool exactly as the agent would
    Tool(ToolArgs),
    /// List the analyst tools and their input schemas
    Tools,
}

/// Input options shared by every command that reads a dataset.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Input CSV/TSV file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Row filter such as `age>30`, `region=North` or `city in Leeds|York` (repeatable)
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
    /// Override a detected column type, e.g. `score=categorical` (repeatable)
    #[arg(long = "override", action = clap::ArgAction::Append)]
    pub overrides: Vec<String>,
    /// Rows sampled per column for type detection (0 inspects every row)
    #[arg(long = "sample-rows", default_value_t = TYPE_DETECTION_SAMPLE_SIZE)]
    pub sample_rows: usize,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Emit column metadata as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Columns to summarise (defaults to every numeric column)
    #[arg(short = 'C', long = "columns", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub columns: Vec<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CorrelateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Number of strongest pairs to list
    #[arg(long, default_value_t = crate::correlation::DEFAULT_TOP_CORRELATIONS)]
    pub top: usize,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CrosstabArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Column whose labels form the table rows
    #[arg(long = "rows")]
    pub row_column: String,
    /// Column whose labels form the table columns
    #[arg(long = "cols")]
    pub col_column: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct GroupbyArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Column to group by
    #[arg(long = "group")]
    pub group_column: String,
    /// Numeric column summarised within each group
    #[arg(long = "value")]
    pub value_column: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct FrequencyArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Columns to count (defaults to every categorical column)
    #[arg(short = 'C', long = "columns", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub columns: Vec<String>,
    /// Maximum values listed per column (0 lists all)
    #[arg(long, default_value_t = 0)]
    pub top: usize,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Column providing the x-axis labels
    #[arg(long = "x")]
    pub x_column: String,
    /// Numeric column averaged per label (omit to count rows)
    #[arg(long = "y")]
    pub y_column: Option<String>,
    /// Column splitting the series into one dataset per group
    #[arg(long = "group")]
    pub group_column: Option<String>,
    #[arg(long = "chart-type", value_parser = parse_chart_type, default_value = "bar")]
    pub chart_type: ChartType,
    /// Optional chart title
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Debug, Args)]
pub struct ToolArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Tool name, e.g. `get_value_counts`
    pub name: String,
    /// Tool input as a JSON object
    #[arg(long = "args", default_value = "{}")]
    pub tool_input: String,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

fn parse_chart_type(value: &str) -> Result<ChartType, String> {
    value.parse::<ChartType>().map_err(|err| err.to_string())
}
