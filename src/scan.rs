use anyhow::{Context, Result, anyhow};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// A non-empty cell as seen by the search engine.
///
/// `text` is the cell's display string: numbers and dates rendered through their number format,
/// formula cells as their cached result, never the formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedCell<'a> {
    pub sheet_name: &'a str,
    pub row: u32,
    pub col: u32,
    pub text: String,
}

/// Read a workbook from disk. A reader panic on malformed package parts becomes an error.
pub fn open_workbook(path: &Path) -> Result<Spreadsheet> {
    match catch_unwind(AssertUnwindSafe(|| umya_spreadsheet::reader::xlsx::read(path))) {
        Ok(read) => read.with_context(|| format!("failed to read workbook '{}'", path.display())),
        Err(payload) => Err(anyhow!(
            "failed to read workbook '{}': malformed workbook ({})",
            path.display(),
            panic_message(payload.as_ref())
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("reader panicked")
}

/// Every non-empty cell of `book`, sheet by sheet in workbook order, then row-major.
pub fn scan_cells(book: &Spreadsheet) -> impl Iterator<Item = ScannedCell<'_>> {
    book.get_sheet_collection().iter().flat_map(scan_sheet)
}

pub fn scan_sheet(sheet: &Worksheet) -> impl Iterator<Item = ScannedCell<'_>> {
    let sheet_name = sheet.get_name();
    sheet
        .get_cell_collection_sorted()
        .into_iter()
        .filter_map(move |cell| {
            let text = cell.get_formatted_value();
            if text.is_empty() {
                return None;
            }
            let coordinate = cell.get_coordinate();
            Some(ScannedCell {
                sheet_name,
                row: *coordinate.get_row_num(),
                col: *coordinate.get_col_num(),
                text,
            })
        })
}

/// `(max_col, max_row)` of the populated area; `(0, 0)` for an empty sheet.
pub fn sheet_extent(sheet: &Worksheet) -> (u32, u32) {
    sheet.get_highest_column_and_row()
}

/// Display string of a single cell, empty when the cell is absent.
pub fn cell_text(sheet: &Worksheet, col: u32, row: u32) -> String {
    sheet
        .get_cell((col, row))
        .map(|cell| cell.get_formatted_value())
        .unwrap_or_default()
}
