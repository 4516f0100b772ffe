mod common;

use common::{row, survey_dataset};
use data_laser::{
    Row, Value,
    correlation::{compute_correlation_matrix, strongest_correlations},
    crosstab::compute_cross_tab,
    filter::{ActiveFilter, FilterPredicate, FilterSet},
    frequency::compute_value_counts,
    groupby::compute_group_by,
    insights::{InsightKind, Severity, generate_insights},
    stats::{compute_all_stats, compute_column_stats, compute_correlation},
};
use proptest::prelude::*;

fn paired_rows(pairs: &[(f64, f64)]) -> Vec<Row> {
    pairs
        .iter()
        .map(|(a, b)| row([("a", Value::from(*a)), ("b", Value::from(*b))]))
        .collect()
}

fn labelled_rows(pairs: &[(u8, u8)]) -> Vec<Row> {
    pairs
        .iter()
        .map(|(x, y)| {
            row([
                ("left", Value::from(format!("L{x}"))),
                ("right", Value::from(format!("R{y}"))),
            ])
        })
        .collect()
}

#[test]
fn group_by_matches_worked_example() {
    let rows = vec![
        row([("region", Value::from("North")), ("sales", Value::from(100.0))]),
        row([("region", Value::from("North")), ("sales", Value::from(200.0))]),
        row([("region", Value::from("South")), ("sales", Value::from(50.0))]),
    ];
    let result = compute_group_by(&rows, "region", "sales");
    assert_eq!(result.groups.len(), 2);

    let north = &result.groups[0];
    assert_eq!(north.label, "North");
    assert_eq!(north.count, 2);
    assert_eq!(north.mean, 150.0);
    assert_eq!(north.median, 150.0);
    assert_eq!(north.min, 100.0);
    assert_eq!(north.max, 200.0);

    let south = &result.groups[1];
    assert_eq!(south.label, "South");
    assert_eq!(south.count, 1);
    assert_eq!(south.mean, 50.0);
    assert_eq!(south.min, 50.0);
    assert_eq!(south.max, 50.0);
}

#[test]
fn cross_tab_matches_worked_example() {
    let rows = vec![
        row([("a", Value::from("X")), ("b", Value::from("P"))]),
        row([("a", Value::from("X")), ("b", Value::from("Q"))]),
        row([("a", Value::from("Y")), ("b", Value::from("P"))]),
    ];
    let result = compute_cross_tab(&rows, "a", "b");
    assert_eq!(result.row_labels, vec!["X", "Y"]);
    assert_eq!(result.col_labels, vec!["P", "Q"]);
    assert_eq!(result.counts, vec![vec![1, 1], vec![1, 0]]);
    assert_eq!(result.row_totals, vec![2, 1]);
    assert_eq!(result.col_totals, vec![2, 1]);
    assert_eq!(result.grand_total, 3);
}

#[test]
fn cross_tab_without_pairs_is_an_explicit_empty_result() {
    let rows = vec![
        row([("a", Value::from("X")), ("b", Value::Missing)]),
        row([("a", Value::Missing), ("b", Value::from("P"))]),
    ];
    let result = compute_cross_tab(&rows, "a", "b");
    assert!(result.is_empty());
    assert_eq!(result.grand_total, 0);
    assert!(result.counts.is_empty());
}

#[test]
fn survey_statistics_cover_numeric_and_percentage_columns() {
    let dataset = survey_dataset();
    let stats = compute_all_stats(&dataset.rows, &dataset.columns);
    let names = stats.iter().map(|s| s.column.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["respondent", "age", "income", "completion"]);

    let completion = compute_column_stats(&dataset.rows, "completion");
    assert_eq!(completion.count, 10);
    assert_eq!(completion.min, 40.0);
    assert_eq!(completion.max, 95.0);

    let age = compute_column_stats(&dataset.rows, "age");
    assert_eq!(age.count, 9);
    assert_eq!(age.median, 38.0);
}

#[test]
fn survey_income_tracks_age() {
    let dataset = survey_dataset();
    let r = compute_correlation(&dataset.rows, "age", "income");
    assert!(r > 0.9, "expected a strong positive correlation, got {r}");

    let numeric = dataset.column_names_where(|ty| ty.is_numeric());
    let matrix = compute_correlation_matrix(&dataset.rows, &numeric);
    let strongest = strongest_correlations(&matrix.matrix, &numeric, 1);
    assert_eq!(strongest.len(), 1);
    assert!(strongest[0].r.abs() >= r.abs() - 1e-12);
}

#[test]
fn survey_value_counts_rank_by_frequency() {
    let dataset = survey_dataset();
    let counts = compute_value_counts(&dataset.rows, "channel", None);
    assert_eq!(counts.total_valid, 10);
    assert_eq!(counts.missing, 0);
    assert_eq!(counts.unique_values, 3);
    assert_eq!(counts.values[0].value, "Web");
    assert_eq!(counts.values[0].count, 6);
    assert_eq!(counts.values[0].percent, 60.0);
}

#[test]
fn survey_insights_flag_small_sample_and_correlation() {
    let dataset = survey_dataset();
    let insights = generate_insights(&dataset.rows, &dataset.columns);
    assert!(!insights.is_empty());
    assert!(insights.iter().any(|insight| insight.severity == Severity::Warning
        && insight.title.to_lowercase().contains("sample")));
    assert!(insights
        .iter()
        .any(|insight| insight.kind == InsightKind::Correlation));
}

#[test]
fn filtered_snapshot_keeps_detected_metadata() {
    let dataset = survey_dataset();
    let mut filters = FilterSet::new();
    filters.set(ActiveFilter::new("channel", FilterPredicate::Equals("Web".to_string())));
    filters.set(ActiveFilter::new("age", FilterPredicate::Range(30.0, 50.0)));
    let filtered = dataset.filtered(&filters);
    // Web rows aged 30..=50: respondents 1, 3, 7 and 9.
    assert_eq!(filtered.row_count(), 4);
    assert_eq!(filtered.columns, dataset.columns);

    let result = compute_group_by(&filtered.rows, "region", "income");
    let labels = result.groups.iter().map(|g| g.label.as_str()).collect::<Vec<_>>();
    assert_eq!(labels, vec!["East", "North", "South", "West"]);

    filters.set(ActiveFilter::new("channel", FilterPredicate::In(vec!["Store".to_string()])));
    assert_eq!(dataset.filtered(&filters).row_count(), 0);
    assert!(filters.remove("age"));
    assert_eq!(dataset.filtered(&filters).row_count(), 2);
}

proptest! {
    #[test]
    fn correlation_is_symmetric_and_bounded(
        pairs in prop::collection::vec((-1000.0f64..1000.0, -1000.0f64..1000.0), 0..40)
    ) {
        let rows = paired_rows(&pairs);
        let ab = compute_correlation(&rows, "a", "b");
        let ba = compute_correlation(&rows, "b", "a");
        prop_assert!((ab - ba).abs() < 1e-9);
        prop_assert!(ab.is_finite());
        prop_assert!(ab.abs() <= 1.0 + 1e-9);
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal(
        pairs in prop::collection::vec((-50.0f64..50.0, -50.0f64..50.0), 0..30)
    ) {
        let rows = paired_rows(&pairs);
        let columns = vec!["a".to_string(), "b".to_string()];
        let result = compute_correlation_matrix(&rows, &columns);
        for i in 0..2 {
            prop_assert_eq!(result.matrix[i][i], 1.0);
            for j in 0..2 {
                prop_assert_eq!(result.matrix[i][j], result.matrix[j][i]);
            }
        }
    }

    #[test]
    fn quartiles_bracket_the_median(
        values in prop::collection::vec(-1.0e6f64..1.0e6, 1..60)
    ) {
        let rows = values
            .iter()
            .map(|value| row([("x", Value::from(*value))]))
            .collect::<Vec<_>>();
        let stats = compute_column_stats(&rows, "x");
        prop_assert_eq!(stats.count, values.len());
        prop_assert!(stats.min <= stats.q1);
        prop_assert!(stats.q1 <= stats.median);
        prop_assert!(stats.median <= stats.q3);
        prop_assert!(stats.q3 <= stats.max);
        prop_assert!(stats.std_dev >= 0.0);
    }

    #[test]
    fn cross_tab_totals_agree(
        pairs in prop::collection::vec((0u8..4, 0u8..5), 0..50)
    ) {
        let rows = labelled_rows(&pairs);
        let result = compute_cross_tab(&rows, "left", "right");
        prop_assert_eq!(result.grand_total, pairs.len());
        for (counts, total) in result.counts.iter().zip(&result.row_totals) {
            prop_assert_eq!(counts.iter().sum::<usize>(), *total);
        }
        for (col, total) in result.col_totals.iter().enumerate() {
            let column_sum = result.counts.iter().map(|counts| counts[col]).sum::<usize>();
            prop_assert_eq!(column_sum, *total);
        }
        prop_assert_eq!(result.row_totals.iter().sum::<usize>(), result.grand_total);
        prop_assert_eq!(result.col_totals.iter().sum::<usize>(), result.grand_total);
    }

    #[test]
    fn group_counts_never_exceed_row_count(
        entries in prop::collection::vec((0u8..5, prop::option::of(-100.0f64..100.0)), 0..50)
    ) {
        let rows = entries
            .iter()
            .map(|(group, value)| {
                row([
                    ("group", Value::from(format!("G{group}"))),
                    ("value", value.map(Value::from).unwrap_or_default()),
                ])
            })
            .collect::<Vec<_>>();
        let result = compute_group_by(&rows, "group", "value");
        let total = result.groups.iter().map(|group| group.count).sum::<usize>();
        prop_assert!(total <= rows.len());
        let labels = result.groups.iter().map(|group| group.label.clone()).collect::<Vec<_>>();
        let mut sorted = labels.clone();
        sorted.sort();
        prop_assert_eq!(labels, sorted);
        for group in &result.groups {
            prop_assert!(group.min <= group.max);
        }
    }
}
