use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::labels::LabelMap;
use crate::table::{Table, Value, ValueKey};

/// Mean of every requested metric over one (variant, sweep value) group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRow {
    variant: String,
    rank: usize,
    sweep: Value,
    values: Vec<f64>,
}

impl GroupedRow {
    /// Display label of the variant.
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Canonical rank of the variant's display label.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Sweep value of the group; [`Value::Missing`] when grouped by variant only.
    pub fn sweep(&self) -> &Value {
        &self.sweep
    }

    /// Metric values, in the order of [`GroupedTable::metrics`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Aggregated statistics keyed by (display label, sweep value).
///
/// Rows are ordered by canonical rank, then by the order in which variants
/// were first seen, then by ascending sweep value. Keys are unique and only
/// observed combinations appear.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedTable {
    sweep_column: Option<String>,
    metrics: Vec<String>,
    rows: Vec<GroupedRow>,
}

/// One variant's points, ascending by sweep value.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub rank: usize,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn new(label: impl Into<String>, rank: usize, points: Vec<(f64, f64)>) -> Self {
        Series {
            label: label.into(),
            rank,
            points,
        }
    }
}

/// Group `table` by (`variant_column`, `sweep_column`) and average each metric.
pub fn aggregate(
    table: &Table,
    variant_column: &str,
    sweep_column: &str,
    metrics: &[&str],
    labels: &LabelMap,
) -> Result<GroupedTable> {
    group(table, variant_column, Some(sweep_column), metrics, labels)
}

/// Group `table` by `variant_column` alone and average each metric.
pub fn aggregate_by_variant(
    table: &Table,
    variant_column: &str,
    metrics: &[&str],
    labels: &LabelMap,
) -> Result<GroupedTable> {
    group(table, variant_column, None, metrics, labels)
}

struct Accumulator {
    variant: String,
    first_seen: usize,
    sweep: Value,
    samples: Vec<Vec<f64>>,
}

fn group(
    table: &Table,
    variant_column: &str,
    sweep_column: Option<&str>,
    metrics: &[&str],
    labels: &LabelMap,
) -> Result<GroupedTable> {
    let variants = table.column(variant_column)?;
    let sweeps = match sweep_column {
        Some(column) => Some(table.column(column)?),
        None => None,
    };
    let columns = metrics
        .iter()
        .map(|metric| table.numeric(metric))
        .collect::<Result<Vec<_>>>()?;

    let mut variant_order: HashMap<String, usize> = HashMap::new();
    let mut index: HashMap<(String, ValueKey), usize> = HashMap::new();
    let mut groups: Vec<Accumulator> = Vec::new();

    let mut skipped = 0;
    for (row, raw) in variants.iter().enumerate() {
        let sweep = match &sweeps {
            Some(sweeps) => sweeps[row].clone(),
            None => Value::Missing,
        };
        // rows without a group key belong to no group
        if raw.is_missing() || (sweeps.is_some() && sweep.is_missing()) {
            skipped += 1;
            continue;
        }

        let raw = raw.to_string();
        let variant = labels.normalize(&raw).to_string();
        if !labels.is_mapped(&raw) && !variant_order.contains_key(&variant) {
            debug!(variant = %raw, "no display label, passing through");
        }
        let next = variant_order.len();
        let first_seen = *variant_order.entry(variant.clone()).or_insert(next);

        let slot = *index
            .entry((variant.clone(), sweep.key()))
            .or_insert_with(|| {
                groups.push(Accumulator {
                    variant,
                    first_seen,
                    sweep,
                    samples: vec![Vec::new(); metrics.len()],
                });
                groups.len() - 1
            });

        for (metric, column) in columns.iter().enumerate() {
            if let Some(value) = column[row] {
                groups[slot].samples[metric].push(value);
            }
        }
    }

    let mut rows: Vec<(usize, GroupedRow)> = groups
        .into_iter()
        .map(|group| {
            let rank = labels.canonical_order(&group.variant);
            let values = group.samples.into_iter().map(mean).collect();
            (
                group.first_seen,
                GroupedRow {
                    variant: group.variant,
                    rank,
                    sweep: group.sweep,
                    values,
                },
            )
        })
        .collect();

    rows.sort_by(|(seen_a, a), (seen_b, b)| {
        a.rank
            .cmp(&b.rank)
            .then(seen_a.cmp(seen_b))
            .then_with(|| a.sweep.total_cmp(&b.sweep))
    });

    debug!(
        rows = table.len(),
        skipped,
        groups = rows.len(),
        metrics = metrics.len(),
        "aggregated"
    );

    Ok(GroupedTable {
        sweep_column: sweep_column.map(str::to_string),
        metrics: metrics.iter().map(|metric| metric.to_string()).collect(),
        rows: rows.into_iter().map(|(_, row)| row).collect(),
    })
}

/// Arithmetic mean, summed in ascending order so the result does not depend
/// on the order rows arrived in. Empty input is `NaN`.
fn mean(mut samples: Vec<f64>) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    samples.sort_by(f64::total_cmp);
    samples.iter().sum::<f64>() / samples.len() as f64
}

impl GroupedTable {
    pub fn sweep_column(&self) -> Option<&str> {
        self.sweep_column.as_deref()
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn rows(&self) -> &[GroupedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn metric_index(&self, metric: &str) -> Result<usize> {
        self.metrics
            .iter()
            .position(|name| name == metric)
            .ok_or_else(|| Error::Schema {
                column: metric.to_string(),
                available: self.metrics.join(", "),
            })
    }

    /// Value of `metric` for one group, if that group was observed.
    pub fn get(&self, variant: &str, sweep: &Value, metric: &str) -> Option<f64> {
        let metric = self.metric_index(metric).ok()?;
        let key = sweep.key();
        self.rows
            .iter()
            .find(|row| row.variant == variant && row.sweep.key() == key)
            .map(|row| row.values[metric])
    }

    /// Distinct display labels in canonical order.
    pub fn variants(&self) -> Vec<&str> {
        let mut variants: Vec<&str> = Vec::new();
        for row in &self.rows {
            if variants.last() != Some(&row.variant.as_str()) {
                variants.push(&row.variant);
            }
        }
        variants
    }

    /// Distinct sweep values, ascending.
    pub fn sweep_values(&self) -> Vec<Value> {
        let mut values: Vec<Value> = Vec::new();
        for row in &self.rows {
            if !values.iter().any(|value| value.key() == row.sweep.key()) {
                values.push(row.sweep.clone());
            }
        }
        values.sort_by(Value::total_cmp);
        values
    }

    /// Drop every group of one variant.
    pub fn exclude(mut self, variant: &str) -> Self {
        self.rows.retain(|row| row.variant != variant);
        self
    }

    /// Append a column computed row by row from the existing ones.
    pub(crate) fn push_metric<F>(&mut self, name: &str, compute: F)
    where
        F: Fn(&[f64]) -> f64,
    {
        for row in &mut self.rows {
            let value = compute(&row.values);
            row.values.push(value);
        }
        self.metrics.push(name.to_string());
    }

    /// One series per variant for a numeric sweep, in canonical order.
    /// Groups whose sweep value is not a number are skipped.
    pub fn series(&self, metric: &str) -> Result<Vec<Series>> {
        let metric = self.metric_index(metric)?;
        let mut series: Vec<Series> = Vec::new();
        for row in &self.rows {
            let Some(x) = row.sweep.as_f64() else {
                continue;
            };
            match series.last_mut() {
                Some(last) if last.label == row.variant => {
                    last.points.push((x, row.values[metric]))
                }
                _ => series.push(Series::new(
                    row.variant.clone(),
                    row.rank,
                    vec![(x, row.values[metric])],
                )),
            }
        }
        Ok(series)
    }

    /// Sweep values as rows, variants as columns.
    ///
    /// Rows ascend by sweep value, columns follow canonical order; cells for
    /// unobserved combinations are `NaN`.
    pub fn pivot(&self, metric: &str) -> Result<Frame> {
        let metric_index = self.metric_index(metric)?;
        let index = self.sweep_values();
        let columns: Vec<String> = self.variants().into_iter().map(str::to_string).collect();

        let mut cells = vec![vec![f64::NAN; columns.len()]; index.len()];
        for row in &self.rows {
            let r = index
                .iter()
                .position(|value| value.key() == row.sweep.key());
            let c = columns.iter().position(|column| *column == row.variant);
            if let (Some(r), Some(c)) = (r, c) {
                cells[r][c] = row.values[metric_index];
            }
        }

        Ok(Frame {
            index_name: self.sweep_column.clone().unwrap_or_default(),
            index,
            columns,
            cells,
        })
    }

    /// Variants as rows, metrics as columns. Meant for tables grouped by
    /// variant only; with a sweep, each variant takes its first group.
    pub fn metric_frame(&self, index_name: &str) -> Frame {
        let mut index = Vec::new();
        let mut cells = Vec::new();
        for row in &self.rows {
            let label = Value::Text(row.variant.clone());
            if index.contains(&label) {
                continue;
            }
            index.push(label);
            cells.push(row.values.clone());
        }
        Frame {
            index_name: index_name.to_string(),
            index,
            columns: self.metrics.clone(),
            cells,
        }
    }
}

/// A labelled 2-D block of numbers, ready for the table renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index_name: String,
    pub index: Vec<Value>,
    pub columns: Vec<String>,
    /// Row-major, `index.len()` × `columns.len()`.
    pub cells: Vec<Vec<f64>>,
}

impl Frame {
    /// Order columns lexicographically, as a pivot table lists them.
    pub fn sort_columns(&mut self) {
        let mut order: Vec<usize> = (0..self.columns.len()).collect();
        order.sort_by(|a, b| self.columns[*a].cmp(&self.columns[*b]));
        self.reorder(&order);
    }

    /// Order rows by index value, as a grouped frame lists them.
    pub fn sort_index(&mut self) {
        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by(|a, b| self.index[*a].total_cmp(&self.index[*b]));
        self.index = order.iter().map(|&i| self.index[i].clone()).collect();
        self.cells = order.iter().map(|&i| self.cells[i].clone()).collect();
    }

    pub fn swap_columns(&mut self, a: usize, b: usize) -> Result<()> {
        let width = self.columns.len();
        if a >= width || b >= width {
            return Err(Error::Config(format!(
                "cannot swap columns {a} and {b} of a {width}-column table"
            )));
        }
        self.columns.swap(a, b);
        for row in &mut self.cells {
            row.swap(a, b);
        }
        Ok(())
    }

    pub fn insert_column(&mut self, at: usize, name: &str, values: Vec<f64>) -> Result<()> {
        if at > self.columns.len() || values.len() != self.index.len() {
            return Err(Error::Config(format!(
                "cannot insert column `{name}` at {at} of a {}-column table",
                self.columns.len()
            )));
        }
        self.columns.insert(at, name.to_string());
        for (row, value) in self.cells.iter_mut().zip(values) {
            row.insert(at, value);
        }
        Ok(())
    }

    pub fn column_values(&self, column: usize) -> Vec<f64> {
        self.cells.iter().map(|row| row[column]).collect()
    }

    fn reorder(&mut self, order: &[usize]) {
        let columns = order.iter().map(|&i| self.columns[i].clone()).collect();
        self.columns = columns;
        for row in &mut self.cells {
            let reordered = order.iter().map(|&i| row[i]).collect();
            *row = reordered;
        }
    }
}
