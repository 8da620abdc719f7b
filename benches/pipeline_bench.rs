/// Criterion benchmarks for bench-graphs.
///
/// Input tables are generated in memory, so nothing touches the disk and no
/// fonts are needed.
///
/// Benchmark groups:
///   • load         – CSV text → typed table
///   • aggregate    – per (variant, workers) means
///   • alignment    – pivot, swaps, differences and booktabs text
///   • chart_plan   – client overview preset up to the chart plan
use bench_graphs::aggregate::aggregate;
use bench_graphs::catalog::{build_chart, build_table, ChartKind, ChartRequest, TableKind};
use bench_graphs::chart::plan;
use bench_graphs::labels::LabelMap;
use bench_graphs::table::Table;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const VARIANTS: [&str; 4] = ["single", "mrv-flex-vector", "pr-array", "mrv-flex-vector.aligned"];
const SIZES: [usize; 3] = [100, 1_000, 10_000];

// ---------------------------------------------------------------------------
// Helper: a client sweep with `rows` rows and deterministic values
// ---------------------------------------------------------------------------
fn client_csv(rows: usize) -> String {
    let mut csv = String::from("benchmark,workers,throughput (ops/s),abort rate\n");
    for i in 0..rows {
        let variant = VARIANTS[i % VARIANTS.len()];
        let workers = 1 << (i / VARIANTS.len() % 7);
        let throughput = 1_000 + (i * 7_919) % 50_000;
        let abort_rate = (i % 100) as f64 / 100.0;
        csv.push_str(&format!("{variant},{workers},{throughput},{abort_rate}\n"));
    }
    csv
}

fn client_table(rows: usize) -> Table {
    Table::from_reader(client_csv(rows).as_bytes()).unwrap()
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------
fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");

    for rows in SIZES {
        let csv = client_csv(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &csv, |b, csv| {
            b.iter(|| Table::from_reader(csv.as_bytes()).unwrap());
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// aggregate
// ---------------------------------------------------------------------------
fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let labels = LabelMap::standard();

    for rows in SIZES {
        let table = client_table(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &table, |b, table| {
            b.iter(|| {
                aggregate(
                    table,
                    "benchmark",
                    "workers",
                    &["throughput (ops/s)", "abort rate"],
                    &labels,
                )
                .unwrap()
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// alignment table
// ---------------------------------------------------------------------------
fn bench_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("alignment");

    for rows in SIZES {
        let table = client_table(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &table, |b, table| {
            b.iter(|| build_table(table, TableKind::Alignment).unwrap());
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// chart plan
// ---------------------------------------------------------------------------
fn bench_chart_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("chart_plan");
    let request = ChartRequest::new(ChartKind::ClientOverview);

    for rows in SIZES {
        let table = client_table(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &table, |b, table| {
            b.iter(|| {
                let (data, directive) = build_chart(table, &request).unwrap();
                plan(&data, &directive).unwrap()
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------
criterion_group!(
    benches,
    bench_load,
    bench_aggregate,
    bench_alignment,
    bench_chart_plan,
);
criterion_main!(benches);
