//! Analysis core for tabular survey and business data: column type
//! detection, descriptive statistics, correlation, cross-tabulation,
//! group-by aggregation, automatic insights, and the analyst tool
//! dispatcher consumed by a conversational agent.
//!
//! Every analysis function is a pure function over already-parsed rows and
//! column metadata. The `load`, `cli`, `commands` and `table` modules form
//! the command-line harness around that core.

pub mod chart;
pub mod cli;
pub mod commands;
pub mod correlation;
pub mod crosstab;
pub mod data;
pub mod filter;
pub mod frequency;
pub mod groupby;
pub mod insights;
pub mod load;
pub mod normalize;
pub mod schema;
pub mod stats;
pub mod summary;
pub mod table;
pub mod tools;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    data::{Dataset, Row, Value},
    schema::{ColumnMeta, ColumnType},
    tools::{execute_request, execute_tool},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("data_laser", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => commands::execute_probe(&args),
        Commands::Stats(args) => commands::execute_stats(&args),
        Commands::Correlate(args) => commands::execute_correlate(&args),
        Commands::Crosstab(args) => commands::execute_crosstab(&args),
        Commands::Groupby(args) => commands::execute_groupby(&args),
        Commands::Frequency(args) => commands::execute_frequency(&args),
        Commands::Insights(args) => commands::execute_insights(&args),
        Commands::Summary(args) => commands::execute_summary(&args),
        Commands::Chart(args) => commands::execute_chart(&args),
        Commands::Tool(args) => commands::execute_tool(&args),
        Commands::Tools => commands::execute_list_tools(),
    }
}
