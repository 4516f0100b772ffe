//! Command handlers for the `data-laser` binary. Each handler loads the
//! source dataset, runs one analysis and prints a table or JSON.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use serde::Serialize;

use crate::{
    chart::{ChartConfig, build_chart_data},
    cli::{
        ChartArgs, CorrelateArgs, CrosstabArgs, FrequencyArgs, GroupbyArgs, ProbeArgs, SourceArgs,
        StatsArgs, ToolArgs,
    },
    correlation::{compute_correlation_matrix, strongest_correlations},
    crosstab::compute_cross_tab,
    data::Dataset,
    filter,
    frequency::compute_value_counts,
    groupby::compute_group_by,
    insights::generate_insights,
    load,
    schema::{ColumnType, DetectionConfig},
    stats::compute_column_stats,
    summary::build_dataset_summary,
    table::{self, format_number, format_optional},
    tools,
};

/// Reads, detects, applies type overrides, then narrows by `--filter`.
/// Detection always sees the full file.
pub fn load_source(args: &SourceArgs) -> Result<Dataset> {
    let delimiter = load::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = load::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Reading '{}' with delimiter '{}'",
        args.input.display(),
        load::printable_delimiter(delimiter)
    );
    let (headers, rows) = load::read_dataset(&args.input, delimiter, encoding)?;
    let config = DetectionConfig {
        sample_size: args.sample_rows,
        ..DetectionConfig::default()
    };
    let mut dataset = Dataset::with_config(headers, rows, &config);

    for spec in &args.overrides {
        let (column, ty) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("Type override '{spec}' must look like column=type"))?;
        let ty = ty.trim().parse::<ColumnType>()?;
        debug!("Overriding '{}' as {ty}", column.trim());
        dataset = dataset.with_type_override(column.trim(), Some(ty))?;
    }

    let conditions = filter::parse_filters(&args.filters)?;
    if conditions.is_empty() {
        return Ok(dataset);
    }
    for condition in &conditions {
        require_column(&dataset, &condition.column)?;
    }
    let total = dataset.row_count();
    let rows = filter::filter_rows(&dataset.rows, &conditions)?
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    info!("Filters kept {} of {total} row(s)", rows.len());
    Ok(Dataset { rows, ..dataset })
}

fn require_column(dataset: &Dataset, name: &str) -> Result<()> {
    if dataset.column(name).is_none() {
        bail!("Column '{name}' not found in dataset");
    }
    Ok(())
}

fn selected_columns(
    dataset: &Dataset,
    requested: &[String],
    fallback: impl Fn(ColumnType) -> bool,
) -> Result<Vec<String>> {
    let requested = requested
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if requested.is_empty() {
        return Ok(dataset.column_names_where(fallback));
    }
    for name in &requested {
        require_column(dataset, name)?;
    }
    Ok(requested)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing output")?;
    println!("{rendered}");
    Ok(())
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

pub fn execute_probe(args: &ProbeArgs) -> Result<()> {
    let dataset = load_source(&args.source)?;
    info!(
        "Detected {} column(s) across {} row(s)",
        dataset.columns.len(),
        dataset.row_count()
    );
    if args.json {
        return print_json(&dataset.columns);
    }
    let rows = dataset
        .columns
        .iter()
        .map(|column| {
            vec![
                column.name.clone(),
                column.effective_type().to_string(),
                column.detected_type.to_string(),
                column.unique_values.to_string(),
                column.missing_count.to_string(),
                format!("{:.1}%", column.missing_percent),
                column
                    .sample_values
                    .iter()
                    .map(|value| value.as_display())
                    .collect::<Vec<_>>()
                    .join(", "),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(
        &headers(&["column", "type", "detected", "unique", "missing", "missing %", "samples"]),
        &rows,
    );
    Ok(())
}

pub fn execute_stats(args: &StatsArgs) -> Result<()> {
    let dataset = load_source(&args.source)?;
    let columns = selected_columns(&dataset, &args.columns, |ty| ty.is_numeric())?;
    if columns.is_empty() {
        bail!("No numeric columns available. Supply --columns to continue.");
    }
    let stats = columns
        .iter()
        .map(|column| compute_column_stats(&dataset.rows, column))
        .collect::<Vec<_>>();
    info!("Computed statistics for {} column(s)", stats.len());
    if args.json {
        return print_json(&stats);
    }
    let rows = stats
        .iter()
        .map(|s| {
            vec![
                s.column.clone(),
                s.count.to_string(),
                format_number(s.mean),
                format_number(s.median),
                format_optional(s.mode),
                format_number(s.std_dev),
                format_number(s.min),
                format_number(s.max),
                format_number(s.q1),
                format_number(s.q3),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(
        &headers(&[
            "column", "count", "mean", "median", "mode", "std_dev", "min", "max", "q1", "q3",
        ]),
        &rows,
    );
    Ok(())
}

pub fn execute_correlate(args: &CorrelateArgs) -> Result<()> {
    let dataset = load_source(&args.source)?;
    let numeric = dataset.column_names_where(|ty| ty.is_numeric());
    if numeric.len() < 2 {
        bail!("Correlation needs at least two numeric columns, found {}", numeric.len());
    }
    let result = compute_correlation_matrix(&dataset.rows, &numeric);
    let strongest = strongest_correlations(&result.matrix, &numeric, args.top);
    info!(
        "Correlated {} numeric column(s); listing {} pair(s)",
        numeric.len(),
        strongest.len()
    );
    if args.json {
        return print_json(&serde_json::json!({
            "columns": result.columns,
            "matrix": result.matrix,
            "strongest": strongest,
        }));
    }
    let rows = strongest
        .iter()
        .map(|pair| vec![pair.col_a.clone(), pair.col_b.clone(), format!("{:.3}", pair.r)])
        .collect::<Vec<_>>();
    table::print_table(&headers(&["column_a", "column_b", "r"]), &rows);
    Ok(())
}

pub fn execute_crosstab(args: &CrosstabArgs) -> Result<()> {
    let dataset = load_source(&args.source)?;
    require_column(&dataset, &args.row_column)?;
    require_column(&dataset, &args.col_column)?;
    let result = compute_cross_tab(&dataset.rows, &args.row_column, &args.col_column);
    info!(
        "Cross-tabulated {} x {} label(s) over {} pair(s)",
        result.row_labels.len(),
        result.col_labels.len(),
        result.grand_total
    );
    if args.json {
        return print_json(&result);
    }

    let mut header = vec![result.row_variable.clone()];
    header.extend(result.col_labels.iter().cloned());
    header.push("Total".to_string());
    let mut rows = result
        .row_labels
        .iter()
        .zip(&result.counts)
        .zip(&result.row_totals)
        .map(|((label, counts), total)| {
            let mut line = vec![label.clone()];
            line.extend(counts.iter().map(usize::to_string));
            line.push(total.to_string());
            line
        })
        .collect::<Vec<_>>();
    let mut totals = vec!["Total".to_string()];
    totals.extend(result.col_totals.iter().map(usize::to_string));
    totals.push(result.grand_total.to_string());
    rows.push(totals);
    table::print_table(&header, &rows);
    Ok(())
}

pub fn execute_groupby(args: &GroupbyArgs) -> Result<()> {
    let dataset = load_source(&args.source)?;
    require_column(&dataset, &args.group_column)?;
    require_column(&dataset, &args.value_column)?;
    let result = compute_group_by(&dataset.rows, &args.group_column, &args.value_column);
    info!(
        "Grouped '{}' by '{}' into {} group(s)",
        args.value_column,
        args.group_column,
        result.groups.len()
    );
    if args.json {
        return print_json(&result);
    }
    let rows = result
        .groups
        .iter()
        .map(|group| {
            vec![
                group.label.clone(),
                group.count.to_string(),
                format_number(group.mean),
                format_number(group.median),
                format_number(group.min),
                format_number(group.max),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(
        &headers(&[args.group_column.as_str(), "count", "mean", "median", "min", "max"]),
        &rows,
    );
    Ok(())
}

pub fn execute_frequency(args: &FrequencyArgs) -> Result<()> {
    let dataset = load_source(&args.source)?;
    let columns = selected_columns(&dataset, &args.columns, |ty| ty.is_categorical())?;
    if columns.is_empty() {
        bail!("No categorical columns available. Supply --columns to continue.");
    }
    let counts = columns
        .iter()
        .map(|column| compute_value_counts(&dataset.rows, column, Some(args.top)))
        .collect::<Vec<_>>();
    info!("Counted values for {} column(s)", counts.len());
    if args.json {
        return print_json(&counts);
    }
    let rows = counts
        .iter()
        .flat_map(|column| {
            column.values.iter().map(|entry| {
                vec![
                    column.column.clone(),
                    entry.value.clone(),
                    entry.count.to_string(),
                    format!("{:.1}%", entry.percent),
                ]
            })
        })
        .collect::<Vec<_>>();
    table::print_table(&headers(&["column", "value", "count", "percent"]), &rows);
    Ok(())
}

pub fn execute_insights(args: &SourceArgs) -> Result<()> {
    let dataset = load_source(args)?;
    let insights = generate_insights(&dataset.rows, &dataset.columns);
    info!("Generated {} insight(s)", insights.len());
    for insight in &insights {
        println!("[{}] {}", insight.severity.as_str(), insight.title);
        println!("    {}", insight.description);
    }
    Ok(())
}

pub fn execute_summary(args: &SourceArgs) -> Result<()> {
    let dataset = load_source(args)?;
    let file_name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stdin".to_string());
    print_json(&build_dataset_summary(&file_name, &dataset.rows, &dataset.columns))
}

pub fn execute_chart(args: &ChartArgs) -> Result<()> {
    let dataset = load_source(&args.source)?;
    require_column(&dataset, &args.x_column)?;
    for column in [&args.y_column, &args.group_column].into_iter().flatten() {
        require_column(&dataset, column)?;
    }
    let config = ChartConfig {
        x_column: args.x_column.clone(),
        y_column: args.y_column.clone(),
        group_by_column: args.group_column.clone(),
        chart_type: args.chart_type,
    };
    let data = build_chart_data(&dataset.rows, &config)
        .ok_or_else(|| anyhow!("No rows available to chart"))?;
    info!(
        "Built {} chart with {} label(s) and {} dataset(s)",
        args.chart_type,
        data.labels.len(),
        data.datasets.len()
    );
    print_json(&data.into_spec(args.chart_type, args.title.clone()))
}

pub fn execute_tool(args: &ToolArgs) -> Result<()> {
    let input: serde_json::Value = serde_json::from_str(&args.tool_input)
        .with_context(|| format!("Parsing tool input for '{}'", args.name))?;
    let dataset = load_source(&args.source)?;
    info!("Invoking tool '{}'", args.name);
    println!(
        "{}",
        tools::execute_tool(&args.name, &input, &dataset.rows, &dataset.columns)
    );
    Ok(())
}

pub fn execute_list_tools() -> Result<()> {
    print_json(&tools::tool_definitions())
}
