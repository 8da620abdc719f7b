use prettytable::{Cell, Row, Table};

use crate::aggregate::GroupedTable;
use crate::axis::format_non_finite;

/// Grouped statistics as a console grid: variant, sweep value, one column per metric.
pub fn grouped_table(grouped: &GroupedTable) -> Table {
    let mut table = Table::new();

    let mut header = vec![Cell::new("Variant")];
    if let Some(sweep) = grouped.sweep_column() {
        header.push(Cell::new(sweep));
    }
    header.extend(grouped.metrics().iter().map(|metric| Cell::new(metric)));
    table.add_row(Row::new(header));

    for row in grouped.rows() {
        let mut cells = vec![Cell::new(row.variant())];
        if grouped.sweep_column().is_some() {
            cells.push(Cell::new(&row.sweep().to_string()));
        }
        cells.extend(row.values().iter().map(|value| Cell::new(&format_value(*value))));
        table.add_row(Row::new(cells));
    }

    table
}

pub fn print_grouped(grouped: &GroupedTable) {
    grouped_table(grouped).printstd();
}

pub fn print_grouped_with_title(title: &str, grouped: &GroupedTable) {
    println!("{title}");
    print_grouped(grouped);
}

fn format_value(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.3}")
    } else {
        format_non_finite(value)
    }
}
