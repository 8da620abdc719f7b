//! Turn benchmark result tables into comparison charts and booktabs tables.
//!
//! A run goes load → label → aggregate → derive → render → write:
//! [`table::Table`] reads the CSV, [`labels::LabelMap`] names and orders the
//! variants, [`aggregate::aggregate`] averages every (variant, sweep value)
//! group, [`derive`] adds computed columns, and [`chart`] or [`booktabs`]
//! renders the result. [`catalog`] holds the ready-made presets.

use std::path::Path;

use aggregate::GroupedTable;
use labels::LabelMap;
use table::Table;

pub mod aggregate;
pub mod axis;
pub mod booktabs;
pub mod catalog;
pub mod chart;
pub mod derive;
pub mod error;
pub mod labels;
pub mod prelude;
pub mod sink;
pub mod table;
pub mod utils;

pub use error::{Error, Result};

/// Load a result table and average `metrics` per (benchmark, `sweep`) group,
/// with the standard display labels.
///
/// # Example
/// ```no_run
/// let grouped = bench_graphs::summarize("results/client.csv", "workers", &["throughput (ops/s)"])?;
/// bench_graphs::utils::print_grouped(&grouped);
/// # Ok::<(), bench_graphs::Error>(())
/// ```
pub fn summarize(
    path: impl AsRef<Path>,
    sweep: &str,
    metrics: &[&str],
) -> Result<GroupedTable> {
    let table = Table::from_path(path)?;
    aggregate::aggregate(
        &table,
        catalog::VARIANT_COLUMN,
        sweep,
        metrics,
        &LabelMap::standard(),
    )
}
