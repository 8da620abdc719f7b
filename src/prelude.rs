// Re-export the common pipeline pieces for easier use
pub use crate::aggregate::{aggregate, aggregate_by_variant, Frame, GroupedTable, Series};
pub use crate::axis::{format_tick, AxisSpec, RangePolicy, Scale, TickFormat, TickPolicy};
pub use crate::booktabs::{render_table, Precision, TableLayout};
pub use crate::catalog::{
    build_chart, build_table, chart_file, table_file, ChartKind, ChartRequest, TableKind,
    ThroughputType,
};
pub use crate::chart::{
    plan, render, Artifact, ChartData, ChartDirective, ChartDirectiveBuilder, ImageFormat,
};
pub use crate::derive::{percent_diff, DerivedMetric};
pub use crate::error::{Error, Result};
pub use crate::labels::LabelMap;
pub use crate::sink::{output_path, write_artifact};
pub use crate::table::{Table, Value};
pub use crate::summarize;
