/// Property tests for grouping and tick formatting.
use bench_graphs::aggregate::aggregate;
use bench_graphs::axis::format_tick;
use bench_graphs::labels::LabelMap;
use bench_graphs::table::{Table, Value};
use proptest::prelude::*;
use std::collections::HashSet;

const VARIANTS: [&str; 3] = ["single", "mrv-flex-vector", "pr-array"];
const WORKERS: [f64; 4] = [1.0, 2.0, 4.0, 8.0];

type Row = (usize, usize, u32);

fn rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec((0..VARIANTS.len(), 0..WORKERS.len(), 0u32..1_000_000), 1..40)
}

fn table(rows: &[Row]) -> Table {
    let columns = ["benchmark", "workers", "throughput (ops/s)"]
        .iter()
        .map(|name| name.to_string())
        .collect();
    let cells = rows
        .iter()
        .map(|(variant, workers, throughput)| {
            vec![
                Value::Text(VARIANTS[*variant].to_string()),
                Value::Number(WORKERS[*workers]),
                Value::Number(*throughput as f64),
            ]
        })
        .collect();
    Table::from_rows(columns, cells)
}

proptest! {
    #[test]
    fn one_row_per_observed_group(rows in rows()) {
        let grouped = aggregate(
            &table(&rows),
            "benchmark",
            "workers",
            &["throughput (ops/s)"],
            &LabelMap::structure(),
        )
        .unwrap();
        let distinct: HashSet<(usize, usize)> = rows.iter().map(|(v, w, _)| (*v, *w)).collect();
        prop_assert_eq!(grouped.len(), distinct.len());
    }

    #[test]
    fn row_order_does_not_change_the_result(
        (rows, shuffled) in rows().prop_flat_map(|rows| (Just(rows.clone()), Just(rows).prop_shuffle()))
    ) {
        let labels = LabelMap::structure();
        let metrics = ["throughput (ops/s)"];
        let a = aggregate(&table(&rows), "benchmark", "workers", &metrics, &labels).unwrap();
        let b = aggregate(&table(&shuffled), "benchmark", "workers", &metrics, &labels).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn thousands_read_as_k(value in 1_000u32..1_000_000) {
        prop_assert!(format_tick(value as f64).ends_with('k'));
    }
}
