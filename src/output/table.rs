//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, Width, object::Rows},
};

/// Cached URLs can be arbitrarily long; wider tables are cut down to this
const MAX_TABLE_WIDTH: usize = 160;

/// Format store or entry rows as a rounded table
pub fn format_table<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return "Nothing cached.".to_string();
    }

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .with(Width::truncate(MAX_TABLE_WIDTH).suffix("..."));

    table.to_string()
}
