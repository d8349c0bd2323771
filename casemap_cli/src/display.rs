use std::path::Path;

use casemap::{series::SeriesReport, COL};
use comfy_table::{presets::NOTHING, *};
use itertools::izip;

fn bordered_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

fn format_optional<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

/// Prints the first rows of a processed series.
pub fn display_series_preview(report: &SeriesReport) -> anyhow::Result<()> {
    let df = &report.preview;
    let mut table = bordered_table();
    table.set_header(
        [COL::DATE, COL::DAY, COL::CONFIRMED, COL::NEW_CASES]
            .into_iter()
            .map(|name| Cell::new(name).add_attribute(Attribute::Bold)),
    );
    for (date, day, confirmed, new_cases) in izip!(
        df.column(COL::DATE)?.str()?,
        df.column(COL::DAY)?.i64()?,
        df.column(COL::CONFIRMED)?.f64()?,
        df.column(COL::NEW_CASES)?.f64()?,
    ) {
        table.add_row(vec![
            format_optional(date),
            format_optional(day),
            format_optional(confirmed),
            format_optional(new_cases),
        ]);
    }
    for idx in 1..4 {
        if let Some(column) = table.column_mut(idx) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    println!("{}", table);
    Ok(())
}

/// Prints which metric was drawn and how much of the world it covers.
pub fn display_map_summary(
    metric: &str,
    geometry_count: usize,
    matched_count: usize,
    path: &Path,
) {
    let mut table = bordered_table();
    table
        .add_row(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            metric.into(),
        ])
        .add_row(vec![
            Cell::new("Countries drawn").add_attribute(Attribute::Bold),
            geometry_count.to_string().into(),
        ])
        .add_row(vec![
            Cell::new("Countries with data").add_attribute(Attribute::Bold),
            matched_count.to_string().into(),
        ])
        .add_row(vec![
            Cell::new("Output").add_attribute(Attribute::Bold),
            path.display().to_string().into(),
        ]);
    if let Some(column) = table.column_mut(0) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    println!("\n{}", table);
}
