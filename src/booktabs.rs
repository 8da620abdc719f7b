//! Booktabs-style LaTeX tables from a pivoted [`Frame`].
//!
//! The layout follows what `tabulate`'s `latex_booktabs` format produces: one
//! alignment letter per column, `\toprule` / `\bottomrule` around the body,
//! cells padded to the column width and joined with ` & `.

use tracing::debug;

use crate::aggregate::Frame;
use crate::axis::format_non_finite;
use crate::derive::percent_diff;
use crate::error::{Error, Result};
use crate::table::Value;

/// How a number is printed in one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// `n` decimals.
    Fixed(usize),
    /// Times 100, `n` decimals, then an escaped percent sign.
    Percent(usize),
}

impl Precision {
    pub fn format(self, value: f64) -> String {
        match self {
            Precision::Fixed(decimals) => {
                if !value.is_finite() {
                    return format_non_finite(value);
                }
                format!("{value:.decimals$}")
            }
            Precision::Percent(decimals) => {
                let scaled = value * 100.0;
                let digits = if scaled.is_finite() {
                    format!("{scaled:.decimals$}")
                } else {
                    format_non_finite(scaled)
                };
                format!("{digits}\\%")
            }
        }
    }
}

/// A derived `(comparison - baseline) / baseline * 100` column.
///
/// `baseline` and `comparison` index the columns after swaps and before any
/// insertion; `at` is the final position of the new column.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentDiffColumn {
    pub name: String,
    pub baseline: usize,
    pub comparison: usize,
    pub at: usize,
}

/// Column policy for one table: precisions, reorderings and inserted
/// percentage differences.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub index_precision: Precision,
    /// One per column of the final table.
    pub precisions: Vec<Precision>,
    /// Applied in order, before the difference columns are computed.
    pub swaps: Vec<(usize, usize)>,
    /// Inserted in order.
    pub diffs: Vec<PercentDiffColumn>,
    pub header: bool,
}

impl TableLayout {
    pub fn new(precisions: Vec<Precision>) -> Self {
        TableLayout {
            index_precision: Precision::Fixed(0),
            precisions,
            swaps: Vec::new(),
            diffs: Vec::new(),
            header: false,
        }
    }

    pub fn with_index_precision(mut self, precision: Precision) -> Self {
        self.index_precision = precision;
        self
    }

    pub fn with_swap(mut self, a: usize, b: usize) -> Self {
        self.swaps.push((a, b));
        self
    }

    pub fn with_diff(mut self, name: &str, baseline: usize, comparison: usize, at: usize) -> Self {
        self.diffs.push(PercentDiffColumn {
            name: name.to_string(),
            baseline,
            comparison,
            at,
        });
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }
}

/// Apply the layout's swaps and difference columns to a copy of `frame`.
pub fn arrange(frame: &Frame, layout: &TableLayout) -> Result<Frame> {
    let mut arranged = frame.clone();
    for (a, b) in &layout.swaps {
        arranged.swap_columns(*a, *b)?;
    }

    let width = arranged.columns.len();
    let mut computed = Vec::with_capacity(layout.diffs.len());
    for diff in &layout.diffs {
        if diff.baseline >= width || diff.comparison >= width {
            return Err(Error::Config(format!(
                "difference `{}` refers past the {width} columns of the table",
                diff.name
            )));
        }
        let values: Vec<f64> = arranged
            .cells
            .iter()
            .map(|row| percent_diff(row[diff.baseline], row[diff.comparison]))
            .collect();
        computed.push((diff, values));
    }
    for (diff, values) in computed {
        arranged.insert_column(diff.at, &diff.name, values)?;
    }
    Ok(arranged)
}

/// Render `frame` as a booktabs `tabular` environment.
pub fn render_table(frame: &Frame, layout: &TableLayout) -> Result<String> {
    let frame = arrange(frame, layout)?;
    if layout.precisions.len() != frame.columns.len() {
        return Err(Error::Config(format!(
            "{} precisions given for {} columns",
            layout.precisions.len(),
            frame.columns.len()
        )));
    }

    // column 0 is the index
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(frame.index.len());
    for (key, row) in frame.index.iter().zip(&frame.cells) {
        let mut line = Vec::with_capacity(row.len() + 1);
        line.push(match key {
            Value::Number(n) => layout.index_precision.format(*n),
            other => escape_latex(&other.to_string()),
        });
        line.extend(
            row.iter()
                .zip(&layout.precisions)
                .map(|(value, precision)| precision.format(*value)),
        );
        cells.push(line);
    }

    let index_is_text = frame
        .index
        .iter()
        .any(|key| !matches!(key, Value::Number(_)));
    let mut numeric = vec![true; frame.columns.len() + 1];
    numeric[0] = !index_is_text;

    let header: Option<Vec<String>> = layout.header.then(|| {
        std::iter::once(&frame.index_name)
            .chain(&frame.columns)
            .map(|name| escape_latex(name))
            .collect()
    });

    let mut widths = vec![0; numeric.len()];
    for line in cells.iter().chain(header.as_ref()) {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let spec: String = numeric
        .iter()
        .map(|is_number| if *is_number { 'r' } else { 'l' })
        .collect();

    let mut tex = String::new();
    tex.push_str(&format!("\\begin{{tabular}}{{{spec}}}\n"));
    tex.push_str("\\toprule\n");
    if let Some(header) = &header {
        tex.push_str(&row_line(header, &widths, &numeric));
        tex.push_str("\\midrule\n");
    }
    for line in &cells {
        tex.push_str(&row_line(line, &widths, &numeric));
    }
    tex.push_str("\\bottomrule\n");
    tex.push_str("\\end{tabular}\n");

    debug!(rows = cells.len(), columns = widths.len(), "rendered table");
    Ok(tex)
}

fn row_line(cells: &[String], widths: &[usize], numeric: &[bool]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .zip(numeric)
        .map(|((cell, width), is_number)| {
            if *is_number {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .collect();
    format!(" {} \\\\\n", padded.join(" & "))
}

/// Escape the characters LaTeX treats specially in text mode.
pub fn escape_latex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '~' => escaped.push_str("\\textasciitilde{}"),
            '^' => escaped.push_str("\\^{}"),
            '\\' => escaped.push_str("\\textbackslash{}"),
            '<' => escaped.push_str("\\ensuremath{<}"),
            '>' => escaped.push_str("\\ensuremath{>}"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_escaped() {
        assert_eq!(Precision::Percent(2).format(0.12345), "12.35\\%");
        assert_eq!(Precision::Percent(2).format(f64::NAN), "nan\\%");
    }

    #[test]
    fn fixed_prints_non_finite_words() {
        assert_eq!(Precision::Fixed(1).format(f64::INFINITY), "inf");
        assert_eq!(Precision::Fixed(1).format(f64::NEG_INFINITY), "-inf");
        assert_eq!(Precision::Fixed(2).format(f64::NAN), "nan");
    }

    #[test]
    fn escapes_benchmark_ids() {
        assert_eq!(escape_latex("pr_array"), "pr\\_array");
        assert_eq!(escape_latex("a & b"), "a \\& b");
        assert_eq!(escape_latex("x\\y"), "x\\textbackslash{}y");
    }

    #[test]
    fn rows_are_padded_by_alignment() {
        let line = row_line(
            &["a".to_string(), "1.0".to_string()],
            &[3, 5],
            &[false, true],
        );
        assert_eq!(line, " a   &   1.0 \\\\\n");
    }
}
