//! The chart and table presets: which columns, labels, axes and styling each
//! kind of benchmark result is shown with.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::aggregate::{aggregate, aggregate_by_variant, Series};
use crate::axis::{AxisSpec, RangePolicy, TickFormat, TickPolicy};
use crate::booktabs::{render_table, Precision, TableLayout};
use crate::chart::{
    render, Artifact, ChartBody, ChartData, ChartDirective, ChartDirectiveBuilder, ImageFormat,
};
use crate::derive::DerivedMetric;
use crate::error::{Error, Result};
use crate::labels::{LabelMap, UNRANKED};
use crate::sink::{output_path, write_artifact};
use crate::table::{Table, Value};

/// Column holding the benchmark variant id.
pub const VARIANT_COLUMN: &str = "benchmark";

const THROUGHPUT: &str = "throughput (ops/s)";
const WRITE_THROUGHPUT: &str = "write throughput (ops/s)";
const READ_THROUGHPUT: &str = "read throughput (ops/s)";
const ABORT_RATE: &str = "abort rate";
const EXECUTION_TIME: &str = "execution time (s)";
const PHASE_INTERVAL: &str = "avg phase interval (ms)";
const ADJUST_INTERVAL: &str = "avg adjust interval (ms)";
const BALANCE_INTERVAL: &str = "avg balance interval (ms)";
const ENERGY: &str = "energy consumption (J)";
const WRITES: &str = "writes";
const READS: &str = "reads";
const OCCURRENCES: &str = "occurrences";

const WORKERS: &str = "workers";
const PADDING: &str = "padding";
const RECORDS: &str = "records";
const READ_PERCENTAGE: &str = "read percentage";
const TYPE: &str = "type";

/// Operations per run in the power benchmarks.
const POWER_OPERATIONS: f64 = 4_194_304.0;

/// One entry per chart the benchmark suite produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ChartKind {
    ClientOverview,
    ClientThroughput,
    ClientAbortRate,
    ClientExecutionTime,
    ClientPhaseTime,
    ClientAdjustTime,
    PaddingThroughput,
    PaddingAbortRate,
    PaddingTypeThroughput,
    ReadPercentageAbortRate,
    ReadPercentagePhaseTime,
    ReadPercentageTypeThroughput,
    RecordAbortRate,
    RecordBalanceTime,
    RecordTypeThroughput,
    PowerOperations,
    PowerExecutionTime,
    RngDistribution,
}

impl ChartKind {
    pub const ALL: [ChartKind; 18] = [
        ChartKind::ClientOverview,
        ChartKind::ClientThroughput,
        ChartKind::ClientAbortRate,
        ChartKind::ClientExecutionTime,
        ChartKind::ClientPhaseTime,
        ChartKind::ClientAdjustTime,
        ChartKind::PaddingThroughput,
        ChartKind::PaddingAbortRate,
        ChartKind::PaddingTypeThroughput,
        ChartKind::ReadPercentageAbortRate,
        ChartKind::ReadPercentagePhaseTime,
        ChartKind::ReadPercentageTypeThroughput,
        ChartKind::RecordAbortRate,
        ChartKind::RecordBalanceTime,
        ChartKind::RecordTypeThroughput,
        ChartKind::PowerOperations,
        ChartKind::PowerExecutionTime,
        ChartKind::RngDistribution,
    ];

    /// Whether the chart plots one of several throughput columns.
    pub fn takes_throughput_type(self) -> bool {
        matches!(
            self,
            ChartKind::PaddingTypeThroughput
                | ChartKind::ReadPercentageTypeThroughput
                | ChartKind::RecordTypeThroughput
        )
    }

    fn sweep(self) -> &'static str {
        match self {
            ChartKind::ClientOverview
            | ChartKind::ClientThroughput
            | ChartKind::ClientAbortRate
            | ChartKind::ClientExecutionTime
            | ChartKind::ClientPhaseTime
            | ChartKind::ClientAdjustTime => WORKERS,
            ChartKind::PaddingThroughput
            | ChartKind::PaddingAbortRate
            | ChartKind::PaddingTypeThroughput => PADDING,
            ChartKind::ReadPercentageAbortRate
            | ChartKind::ReadPercentagePhaseTime
            | ChartKind::ReadPercentageTypeThroughput => READ_PERCENTAGE,
            ChartKind::RecordAbortRate
            | ChartKind::RecordBalanceTime
            | ChartKind::RecordTypeThroughput => RECORDS,
            ChartKind::PowerOperations | ChartKind::PowerExecutionTime => TYPE,
            ChartKind::RngDistribution => "",
        }
    }

    fn labels(self) -> LabelMap {
        match self {
            ChartKind::RecordAbortRate
            | ChartKind::RecordBalanceTime
            | ChartKind::RecordTypeThroughput => LabelMap::balance(),
            ChartKind::RngDistribution => LabelMap::new(),
            _ => LabelMap::structure(),
        }
    }
}

/// Which throughput column a typed chart shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ThroughputType {
    #[default]
    Generic,
    Write,
    Read,
}

impl ThroughputType {
    pub const ALL: [ThroughputType; 3] = [
        ThroughputType::Generic,
        ThroughputType::Write,
        ThroughputType::Read,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ThroughputType::Generic => "generic",
            ThroughputType::Write => "write",
            ThroughputType::Read => "read",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            ThroughputType::Generic => THROUGHPUT,
            ThroughputType::Write => WRITE_THROUGHPUT,
            ThroughputType::Read => READ_THROUGHPUT,
        }
    }

    fn axis_label(self) -> &'static str {
        match self {
            ThroughputType::Generic => "Throughput (ops/s)",
            ThroughputType::Write => "Write throughput (ops/s)",
            ThroughputType::Read => "Read throughput (ops/s)",
        }
    }
}

/// One chart to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub throughput: ThroughputType,
    pub format: ImageFormat,
}

impl ChartRequest {
    pub fn new(kind: ChartKind) -> Self {
        ChartRequest {
            kind,
            throughput: ThroughputType::default(),
            format: ImageFormat::default(),
        }
    }

    pub fn throughput(mut self, throughput: ThroughputType) -> Self {
        self.throughput = throughput;
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Every request worth trying for a kind: one per throughput type for
    /// typed charts, the request itself otherwise.
    pub fn expand(kind: ChartKind, format: ImageFormat) -> Vec<ChartRequest> {
        let base = ChartRequest::new(kind).format(format);
        if kind.takes_throughput_type() {
            ThroughputType::ALL
                .iter()
                .map(|throughput| base.throughput(*throughput))
                .collect()
        } else {
            vec![base]
        }
    }

    /// File name suffix, e.g. `record-write-throughput`.
    pub fn descriptor(&self) -> String {
        let t = self.throughput.name();
        match self.kind {
            ChartKind::ClientOverview => "client-overview".into(),
            ChartKind::ClientThroughput => "client-throughput".into(),
            ChartKind::ClientAbortRate => "client-abort-rate".into(),
            ChartKind::ClientExecutionTime => "client-execution-time".into(),
            ChartKind::ClientPhaseTime => "client-phase-time".into(),
            ChartKind::ClientAdjustTime => "client-adjust-time".into(),
            ChartKind::PaddingThroughput => "padding-throughput".into(),
            ChartKind::PaddingAbortRate => "padding-abort-rate".into(),
            ChartKind::PaddingTypeThroughput => format!("padding-{t}-throughput"),
            ChartKind::ReadPercentageAbortRate => "read-percentage-abort-rate".into(),
            ChartKind::ReadPercentagePhaseTime => "read-percentage-phase-time".into(),
            ChartKind::ReadPercentageTypeThroughput => format!("read-percentage-{t}-throughput"),
            ChartKind::RecordAbortRate => "record-abort-rate".into(),
            ChartKind::RecordBalanceTime => "record-balance-time".into(),
            ChartKind::RecordTypeThroughput => format!("record-{t}-throughput"),
            ChartKind::PowerOperations => "power-operations".into(),
            ChartKind::PowerExecutionTime => "power-execution-time".into(),
            ChartKind::RngDistribution => "rng-dist".into(),
        }
    }

    /// Columns the chart reads.
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut columns = match self.kind {
            ChartKind::RngDistribution => return vec![OCCURRENCES],
            _ => vec![VARIANT_COLUMN, self.kind.sweep()],
        };
        columns.extend(self.metrics());
        columns
    }

    /// Whether `table` has every column this chart reads.
    pub fn applies_to(&self, table: &Table) -> bool {
        self.required_columns()
            .iter()
            .all(|column| table.has_column(column))
    }

    fn metrics(&self) -> Vec<&'static str> {
        match self.kind {
            ChartKind::ClientOverview => vec![ABORT_RATE, THROUGHPUT],
            ChartKind::ClientThroughput | ChartKind::PaddingThroughput => vec![THROUGHPUT],
            ChartKind::ClientAbortRate
            | ChartKind::PaddingAbortRate
            | ChartKind::ReadPercentageAbortRate
            | ChartKind::RecordAbortRate => vec![ABORT_RATE],
            ChartKind::ClientExecutionTime => vec![EXECUTION_TIME],
            ChartKind::ClientPhaseTime | ChartKind::ReadPercentagePhaseTime => {
                vec![PHASE_INTERVAL]
            }
            ChartKind::ClientAdjustTime => vec![ADJUST_INTERVAL],
            ChartKind::RecordBalanceTime => vec![BALANCE_INTERVAL],
            ChartKind::PaddingTypeThroughput
            | ChartKind::ReadPercentageTypeThroughput
            | ChartKind::RecordTypeThroughput => vec![self.throughput.column()],
            ChartKind::PowerOperations => {
                vec![WRITES, READS, WRITE_THROUGHPUT, READ_THROUGHPUT, ENERGY]
            }
            ChartKind::PowerExecutionTime => vec![ENERGY, EXECUTION_TIME],
            ChartKind::RngDistribution => vec![OCCURRENCES],
        }
    }
}

/// Explicit read-percentage ticks: the write family never reaches 100%, the
/// read family never starts at 0%.
fn read_percentage_ticks(throughput: ThroughputType) -> Vec<f64> {
    match throughput {
        ThroughputType::Write => vec![0.0, 25.0, 50.0, 75.0, 95.0],
        _ => vec![5.0, 25.0, 50.0, 75.0, 100.0],
    }
}

fn clients_axis() -> AxisSpec {
    AxisSpec::log("Clients").with_ticks(TickPolicy::Observed)
}

fn padding_axis() -> AxisSpec {
    AxisSpec::log("Padding").with_ticks(TickPolicy::Observed)
}

fn records_axis() -> AxisSpec {
    AxisSpec::log("Records").with_ticks(TickPolicy::Observed)
}

fn read_percentage_axis(ticks: Vec<f64>) -> AxisSpec {
    AxisSpec::linear("Read percentage (%)").with_ticks(TickPolicy::Explicit(ticks))
}

/// Aggregate, collect the series and assemble the directive for one chart.
pub fn build_chart(table: &Table, request: &ChartRequest) -> Result<(ChartData, ChartDirective)> {
    match request.kind {
        ChartKind::RngDistribution => rng_distribution(table, request.format),
        ChartKind::PowerOperations | ChartKind::PowerExecutionTime => power(table, request),
        _ => lines(table, request),
    }
}

fn lines(table: &Table, request: &ChartRequest) -> Result<(ChartData, ChartDirective)> {
    let kind = request.kind;
    let labels = kind.labels();
    let metrics = request.metrics();

    let filtered;
    let table = match kind {
        ChartKind::ReadPercentageTypeThroughput => {
            filtered = match request.throughput {
                ThroughputType::Write => table.filter(READ_PERCENTAGE, |p| p < 100.0)?,
                _ => table.filter(READ_PERCENTAGE, |p| p > 0.0)?,
            };
            &filtered
        }
        _ => table,
    };

    let mut grouped = aggregate(table, VARIANT_COLUMN, kind.sweep(), &metrics, &labels)?;
    if kind == ChartKind::RecordBalanceTime {
        grouped = grouped.exclude("None");
    }

    let data = match kind {
        ChartKind::ClientOverview => ChartData::new(grouped.series(ABORT_RATE)?)
            .with_secondary(grouped.series(THROUGHPUT)?),
        _ => ChartData::new(grouped.series(metrics[0])?),
    };

    debug!(descriptor = %request.descriptor(), series = data.primary.len(), "chart built");
    Ok((data, line_directive(request).build()))
}

fn line_directive(request: &ChartRequest) -> ChartDirectiveBuilder {
    let throughput = request.throughput;
    let builder = ChartDirective::builder().format(request.format);
    match request.kind {
        ChartKind::ClientOverview => builder
            .size(6.4, 4.8)
            .x_axis(clients_axis())
            .y_axis(AxisSpec::fraction("Abort rate"))
            .dashed(true)
            .primary_legend(false)
            .secondary_y(AxisSpec::linear("Throughput (ops/s)").with_format(TickFormat::Compact)),
        ChartKind::ClientThroughput => builder
            .size(5.0, 3.5)
            .x_axis(clients_axis())
            .y_axis(AxisSpec::linear("Throughput (ops/s)")),
        ChartKind::ClientAbortRate => builder
            .x_axis(clients_axis())
            .y_axis(AxisSpec::fraction("Abort rate")),
        ChartKind::ClientExecutionTime => builder
            .size(3.5, 3.5)
            .x_axis(clients_axis())
            .y_axis(AxisSpec::linear("Execution time (s)").with_range(RangePolicy::Bottom(0.0))),
        ChartKind::ClientPhaseTime => builder
            .x_axis(clients_axis())
            .y_axis(AxisSpec::log("Phase time (ms)"))
            .threshold(20.0),
        ChartKind::ClientAdjustTime => builder
            .size(3.5, 3.5)
            .x_axis(clients_axis())
            .y_axis(AxisSpec::log("Adjust time (ms)"))
            .threshold(1000.0),
        ChartKind::PaddingThroughput => builder
            .x_axis(padding_axis())
            .y_axis(AxisSpec::linear("Throughput (ops/s)").with_format(TickFormat::Thousands)),
        ChartKind::PaddingAbortRate => builder
            .x_axis(padding_axis().with_format(TickFormat::Compact))
            .y_axis(AxisSpec::fraction("Abort rate")),
        ChartKind::PaddingTypeThroughput => builder
            .x_axis(padding_axis().with_format(TickFormat::Compact))
            .y_axis(AxisSpec::linear(throughput.axis_label()).with_format(TickFormat::Compact)),
        ChartKind::ReadPercentageAbortRate => builder
            .size(3.0, 3.0)
            .x_axis(read_percentage_axis(vec![0.0, 25.0, 50.0, 75.0, 100.0]))
            .y_axis(AxisSpec::fraction("Abort rate")),
        ChartKind::ReadPercentagePhaseTime => builder
            .x_axis(read_percentage_axis(vec![0.0, 25.0, 50.0, 75.0, 100.0]))
            .y_axis(AxisSpec::log("Phase time (ms)"))
            .threshold(20.0)
            .legend(false),
        ChartKind::ReadPercentageTypeThroughput => builder
            .size(3.0, 3.0)
            .x_axis(read_percentage_axis(read_percentage_ticks(throughput)))
            .y_axis(AxisSpec::linear(throughput.axis_label()).with_format(TickFormat::Compact)),
        ChartKind::RecordAbortRate => builder
            .size(5.25, 3.0)
            .x_axis(records_axis())
            .y_axis(AxisSpec::linear("Abort rate").with_range(RangePolicy::Bottom(0.0))),
        ChartKind::RecordBalanceTime => builder
            .size(4.0, 3.0)
            .x_axis(records_axis())
            .y_axis(AxisSpec::linear("Balance time (ms)").with_range(RangePolicy::Bottom(-0.2))),
        ChartKind::RecordTypeThroughput => builder
            .size(4.0, 4.4)
            .x_axis(records_axis())
            .y_axis(
                AxisSpec::linear(throughput.axis_label())
                    .with_range(RangePolicy::Bottom(0.0))
                    .with_format(TickFormat::Compact),
            ),
        // bar and distribution charts assemble their own directive
        ChartKind::PowerOperations | ChartKind::PowerExecutionTime | ChartKind::RngDistribution => {
            builder
        }
    }
}

/// Grouped bars of energy efficiency per operation type.
fn power(table: &Table, request: &ChartRequest) -> Result<(ChartData, ChartDirective)> {
    let labels = request.kind.labels();
    let mut grouped = aggregate(table, VARIANT_COLUMN, TYPE, &request.metrics(), &labels)?;

    if request.kind == ChartKind::PowerOperations {
        grouped.derive_all(&[
            DerivedMetric::sum("total_operations", WRITES, READS),
            DerivedMetric::sum("total_throughput", WRITE_THROUGHPUT, READ_THROUGHPUT),
            DerivedMetric::ratio("efficiency", "total_operations", ENERGY),
        ])?;
    } else {
        grouped.derive(&DerivedMetric::constant_ratio("efficiency", POWER_OPERATIONS, ENERGY))?;
    }

    let categories = grouped.sweep_values();
    let names: Vec<String> = categories.iter().map(Value::to_string).collect();
    let series: Vec<Series> = grouped
        .variants()
        .into_iter()
        .map(|variant| {
            let points = categories
                .iter()
                .enumerate()
                .filter_map(|(slot, category)| {
                    grouped
                        .get(variant, category, "efficiency")
                        .map(|value| (slot as f64, value))
                })
                .collect();
            Series::new(variant, labels.canonical_order(variant), points)
        })
        .collect();

    let slots = categories.len() as f64;
    let directive = ChartDirective::builder()
        .format(request.format)
        .body(ChartBody::Bars)
        .x_axis(
            AxisSpec::linear("Type")
                .with_range(RangePolicy::Fixed(-0.5, slots - 0.5))
                .with_ticks(TickPolicy::Explicit((0..categories.len()).map(|i| i as f64).collect()))
                .with_format(TickFormat::Categories(names)),
        )
        .y_axis(
            AxisSpec::linear("Efficiency (ops/J)")
                .with_range(RangePolicy::Bottom(0.0))
                .with_format(TickFormat::Compact),
        )
        .build();

    Ok((ChartData::new(series), directive))
}

/// One line per row of `;`-separated bucket counts.
fn rng_distribution(table: &Table, format: ImageFormat) -> Result<(ChartData, ChartDirective)> {
    let cells = table.column(OCCURRENCES)?;
    let names = if table.has_column(VARIANT_COLUMN) {
        Some(table.column(VARIANT_COLUMN)?)
    } else {
        None
    };

    let mut series = Vec::with_capacity(cells.len());
    for (row, cell) in cells.iter().enumerate() {
        let text = cell.to_string();
        let counts = text
            .split(';')
            .map(|count| {
                count.trim().parse::<f64>().map_err(|_| Error::Type {
                    column: OCCURRENCES.to_string(),
                    row: row + 1,
                    value: text.clone(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        let label = match &names {
            Some(names) => names[row].to_string(),
            None => format!("row {}", row + 1),
        };
        let points = counts
            .into_iter()
            .enumerate()
            .map(|(bucket, count)| (bucket as f64, count))
            .collect();
        series.push(Series::new(label, UNRANKED, points));
    }

    let directive = ChartDirective::builder()
        .format(format)
        .x_axis(AxisSpec::linear("Number"))
        .y_axis(AxisSpec::linear("Occurrences"))
        .legend(false)
        .build();
    Ok((ChartData::new(series), directive))
}

/// Build and render one chart in memory.
pub fn render_chart(table: &Table, request: &ChartRequest) -> Result<Artifact> {
    let (data, directive) = build_chart(table, request)?;
    render(&data, &directive)
}

/// Load `input`, render the chart and write it beside the input.
pub fn chart_file(input: &Path, request: &ChartRequest) -> Result<PathBuf> {
    let table = Table::from_path(input)?;
    chart_from_table(&table, input, request)
}

/// Same as [`chart_file`] for an already loaded table.
pub fn chart_from_table(table: &Table, input: &Path, request: &ChartRequest) -> Result<PathBuf> {
    let artifact = render_chart(table, request)?;
    let path = output_path(input, &request.descriptor(), artifact.format.extension());
    write_artifact(&path, &artifact.bytes)?;
    info!(path = %path.display(), "chart written");
    Ok(path)
}

/// The table presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TableKind {
    /// Per-variant means of the balance benchmarks.
    BalanceAnalysis,
    /// Throughput per worker count with pairwise percentage differences.
    Alignment,
}

impl TableKind {
    pub const ALL: [TableKind; 2] = [TableKind::BalanceAnalysis, TableKind::Alignment];

    pub fn descriptor(self) -> &'static str {
        match self {
            TableKind::BalanceAnalysis => "balance-analysis",
            TableKind::Alignment => "alignment",
        }
    }

    pub fn required_columns(self, table: &Table) -> Vec<&'static str> {
        match self {
            TableKind::BalanceAnalysis => vec![
                VARIANT_COLUMN,
                balance_result_column(table),
                ABORT_RATE,
                BALANCE_INTERVAL,
            ],
            TableKind::Alignment => vec![VARIANT_COLUMN, WORKERS, THROUGHPUT],
        }
    }

    pub fn applies_to(self, table: &Table) -> bool {
        self.required_columns(table)
            .iter()
            .all(|column| table.has_column(column))
    }
}

/// Mixed read/write runs report write throughput, the others execution time.
fn balance_result_column(table: &Table) -> &'static str {
    if table.has_column(READ_PERCENTAGE) {
        WRITE_THROUGHPUT
    } else {
        EXECUTION_TIME
    }
}

/// Aggregate and render one table preset as booktabs text.
pub fn build_table(table: &Table, kind: TableKind) -> Result<String> {
    // raw ids on purpose: these tables are read against the run logs
    let labels = LabelMap::new();
    match kind {
        TableKind::BalanceAnalysis => {
            let result = balance_result_column(table);
            let grouped = aggregate_by_variant(
                table,
                VARIANT_COLUMN,
                &[result, ABORT_RATE, BALANCE_INTERVAL],
                &labels,
            )?;
            let mut frame = grouped.metric_frame(VARIANT_COLUMN);
            frame.sort_index();
            let layout = TableLayout::new(vec![
                Precision::Fixed(1),
                Precision::Percent(2),
                Precision::Fixed(2),
            ]);
            render_table(&frame, &layout)
        }
        TableKind::Alignment => {
            let grouped = aggregate(table, VARIANT_COLUMN, WORKERS, &[THROUGHPUT], &labels)?;
            let mut frame = grouped.pivot(THROUGHPUT)?;
            frame.sort_columns();
            if frame.columns.len() < 4 {
                return Err(Error::Config(format!(
                    "alignment needs four benchmarks, found {}",
                    frame.columns.len()
                )));
            }
            let layout = TableLayout::new(vec![
                Precision::Fixed(1),
                Precision::Fixed(1),
                Precision::Fixed(2),
                Precision::Fixed(1),
                Precision::Fixed(1),
                Precision::Fixed(2),
            ])
            .with_swap(0, 1)
            .with_swap(2, 3)
            .with_diff("diff_perc_1_2", 0, 1, 2)
            .with_diff("diff_perc_3_4", 2, 3, 5);
            render_table(&frame, &layout)
        }
    }
}

/// Load `input` and render a table preset.
pub fn table_file(input: &Path, kind: TableKind) -> Result<String> {
    let table = Table::from_path(input)?;
    build_table(&table, kind)
}
