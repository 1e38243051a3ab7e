use crate::cellref::{cell_reference, column_letters};
use crate::config::{HyperlinkMode, LinkConvention};
use crate::matcher::KeywordSet;
use crate::model::MatchRecord;
use crate::utils::{display_file_name, file_url, is_link_resolvable, resolve_for_link};
use anyhow::{Result, anyhow};
use std::path::Path;
use umya_spreadsheet::{
    Cell, HorizontalAlignmentValues, PatternValues, Spreadsheet, VerticalAlignmentValues,
    Worksheet,
};

pub const RESULTS_SHEET_NAME: &str = "Search Results";

pub const HEADERS: [&str; 7] = [
    "File Name",
    "Sheet",
    "Row",
    "Column",
    "Cell Value",
    "Keyword",
    "File Path",
];

const COL_FILE_NAME: u32 = 1;
const COL_CELL_VALUE: u32 = 5;
const COL_FILE_PATH: u32 = 7;

const HEADER_FILL: &str = "FF4472C4";
const HEADER_FONT: &str = "FFFFFFFF";
const LINK_FONT: &str = "FF0563C1";
const PLAIN_FONT: &str = "FF000000";
const DEFAULT_ROW_FILL: &str = "FFFFFFFF";
/// Row fills for the first three keywords; later keywords share [`DEFAULT_ROW_FILL`].
const KEYWORD_FILLS: [&str; 3] = ["FFFFE6E6", "FFE6F3FF", "FFE6FFE6"];

const MAX_COLUMN_WIDTH: usize = 50;
const COLUMN_PADDING: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub hyperlink_mode: HyperlinkMode,
    pub link_convention: LinkConvention,
}

/// Fill color for rows produced by `keyword`.
pub fn keyword_fill(keywords: &KeywordSet, keyword: &str) -> &'static str {
    keywords
        .position(keyword)
        .and_then(|idx| KEYWORD_FILLS.get(idx))
        .copied()
        .unwrap_or(DEFAULT_ROW_FILL)
}

/// Build the result workbook: a header row and one styled, hyperlinked row per record.
pub fn render_results(
    records: &[MatchRecord],
    keywords: &KeywordSet,
    options: RenderOptions,
) -> Result<Spreadsheet> {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book
        .get_sheet_mut(&0)
        .ok_or_else(|| anyhow!("new workbook has no sheet"))?;
    sheet.set_name(RESULTS_SHEET_NAME);

    let mut widths = [0usize; HEADERS.len()];
    write_header(sheet, &mut widths);

    for (idx, record) in records.iter().enumerate() {
        let row = idx as u32 + 2;
        write_record_row(sheet, row, record, keywords, options, &mut widths);
    }

    for (idx, width) in widths.iter().enumerate() {
        let col = idx as u32 + 1;
        sheet
            .get_column_dimension_by_number_mut(&col)
            .set_width(((*width + COLUMN_PADDING).min(MAX_COLUMN_WIDTH)) as f64);
    }

    Ok(book)
}

fn write_header(sheet: &mut Worksheet, widths: &mut [usize]) {
    for (idx, title) in HEADERS.iter().enumerate() {
        let col = idx as u32 + 1;
        sheet.get_cell_mut((col, 1)).set_value(*title);
        let style = sheet.get_style_mut((col, 1));
        style
            .get_fill_mut()
            .get_pattern_fill_mut()
            .set_pattern_type(PatternValues::Solid)
            .get_foreground_color_mut()
            .set_argb(HEADER_FILL);
        let font = style.get_font_mut();
        font.set_bold(true);
        font.get_color_mut().set_argb(HEADER_FONT);
        let alignment = style.get_alignment_mut();
        alignment.set_horizontal(HorizontalAlignmentValues::Center);
        alignment.set_vertical(VerticalAlignmentValues::Center);
        widths[idx] = widths[idx].max(title.chars().count());
    }
}

fn write_record_row(
    sheet: &mut Worksheet,
    row: u32,
    record: &MatchRecord,
    keywords: &KeywordSet,
    options: RenderOptions,
    widths: &mut [usize],
) {
    let source = Path::new(&record.file_reference);
    let absolute = resolve_for_link(source).display().to_string();
    let target = file_url(&absolute, options.link_convention);

    let values = [
        display_file_name(&record.source_identifier),
        record.sheet_name.clone(),
        record.row.to_string(),
        record.column.to_string(),
        record.cell_text.clone(),
        record.matched_keyword.clone(),
        record.source_identifier.clone(),
    ];
    for (idx, value) in values.iter().enumerate() {
        let col = idx as u32 + 1;
        let cell = sheet.get_cell_mut((col, row));
        match col {
            3 => {
                cell.set_value_number(record.row);
            }
            4 => {
                cell.set_value_number(record.column);
            }
            _ => {
                cell.set_value(value.as_str());
            }
        }
        widths[idx] = widths[idx].max(value.chars().count());
    }

    let file_tooltip = format!("Open file: {absolute}");
    for col in [COL_FILE_NAME, COL_FILE_PATH] {
        link_cell(sheet, col, row, &target, &file_tooltip, options.hyperlink_mode);
    }

    if is_link_resolvable(source, &absolute) {
        let reference = cell_reference(&record.sheet_name, &column_letters(record.column), record.row);
        let cell_target = format!("{target}#{reference}");
        let tooltip = format!("Jump to cell {reference}: {absolute}");
        link_cell(sheet, COL_CELL_VALUE, row, &cell_target, &tooltip, options.hyperlink_mode);
    } else {
        sheet
            .get_style_mut((COL_CELL_VALUE, row))
            .get_font_mut()
            .get_color_mut()
            .set_argb(PLAIN_FONT);
    }

    let fill = keyword_fill(keywords, &record.matched_keyword);
    for col in 1..=HEADERS.len() as u32 {
        let linked = sheet
            .get_cell((col, row))
            .is_some_and(|cell| cell.get_hyperlink().is_some());
        if matches!(col, COL_FILE_NAME | COL_CELL_VALUE | COL_FILE_PATH) && linked {
            continue;
        }
        sheet
            .get_style_mut((col, row))
            .get_fill_mut()
            .get_pattern_fill_mut()
            .set_pattern_type(PatternValues::Solid)
            .get_foreground_color_mut()
            .set_argb(fill);
    }
}

/// Attach a hyperlink and link styling; a failure leaves the cell as plain text.
fn link_cell(
    sheet: &mut Worksheet,
    col: u32,
    row: u32,
    target: &str,
    tooltip: &str,
    mode: HyperlinkMode,
) {
    let cell = sheet.get_cell_mut((col, row));
    if let Err(error) = attach_hyperlink(cell, target, tooltip, mode) {
        tracing::warn!(col, row, url = target, "failed to attach hyperlink: {error:#}");
        return;
    }
    let font = sheet.get_style_mut((col, row)).get_font_mut();
    font.get_color_mut().set_argb(LINK_FONT);
    font.set_underline("single");
}

fn attach_hyperlink(cell: &mut Cell, target: &str, tooltip: &str, mode: HyperlinkMode) -> Result<()> {
    if target.trim_start_matches("file://").trim_start_matches('/').is_empty() {
        anyhow::bail!("link target has no path");
    }
    let link = cell.get_hyperlink_mut();
    link.set_url(target);
    if mode == HyperlinkMode::Native {
        link.set_tooltip(tooltip);
    }
    Ok(())
}
