use crate::errors::{InvalidInputError, NotFoundError};
use crate::model::{CellContextResponse, ContextCell, TargetCell};
use crate::scan::{cell_text, open_workbook, sheet_extent};
use anyhow::Result;
use std::path::Path;

/// A cell to show in context, as identified by a search result.
#[derive(Debug, Clone)]
pub struct CellLocator<'a> {
    pub file_path: &'a Path,
    pub sheet_name: &'a str,
    pub row: u32,
    pub col: u32,
    pub keyword: &'a str,
}

/// The target cell plus `context_rows` rows above and below it, across every populated column.
pub fn get_cell_context(locator: CellLocator<'_>, context_rows: u32) -> Result<CellContextResponse> {
    let CellLocator {
        file_path,
        sheet_name,
        row,
        col,
        keyword,
    } = locator;

    if sheet_name.is_empty() {
        return Err(InvalidInputError::new("get_cell_context", "sheet_name is required")
            .with_field("sheet_name")
            .into());
    }
    if row == 0 || col == 0 {
        return Err(InvalidInputError::new(
            "get_cell_context",
            "row and col are 1-based and must be positive",
        )
        .with_field(if row == 0 { "row" } else { "col" })
        .into());
    }
    if !file_path.is_file() {
        return Err(NotFoundError::new(format!(
            "workbook not found: {}",
            file_path.display()
        ))
        .with_detail("file_path", file_path.display().to_string())
        .into());
    }

    let book = open_workbook(file_path)?;
    let Some(sheet) = book.get_sheet_by_name(sheet_name) else {
        let available: Vec<String> = book
            .get_sheet_collection()
            .iter()
            .map(|s| s.get_name().to_string())
            .collect();
        return Err(NotFoundError::new(format!("sheet not found: {sheet_name}"))
            .with_detail("available_sheets", available)
            .into());
    };

    let (max_col, max_row) = sheet_extent(sheet);
    let max_col = max_col.max(1);
    let max_row = max_row.max(1);

    let start_row = row.saturating_sub(context_rows).max(1);
    let end_row = row.saturating_add(context_rows).min(max_row);

    let surrounding_rows = (start_row..=end_row)
        .map(|r| {
            (1..=max_col)
                .map(|c| ContextCell {
                    row: r,
                    col: c,
                    value: cell_text(sheet, c, r),
                    is_target: r == row && c == col,
                    is_header: r == 1,
                })
                .collect()
        })
        .collect();

    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(CellContextResponse {
        file_name,
        sheet_name: sheet_name.to_string(),
        target_cell: TargetCell {
            row,
            col,
            value: cell_text(sheet, col, row),
            keyword: keyword.to_string(),
        },
        surrounding_rows,
        max_row,
        max_col,
    })
}
