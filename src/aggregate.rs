use crate::matcher::KeywordSet;
use crate::model::{MatchRecord, WorkbookFailure};
use crate::scan::{open_workbook, scan_cells};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// A workbook queued for searching.
#[derive(Debug, Clone)]
pub struct WorkbookSource {
    /// Where the bytes are read from.
    pub path: PathBuf,
    /// Name reported in results.
    pub identifier: String,
    /// Path used for `file:` links.
    pub file_reference: String,
}

impl WorkbookSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = path.display().to_string();
        Self {
            path,
            identifier: display.clone(),
            file_reference: display,
        }
    }

    /// A staged upload reported under its original file name.
    pub fn staged(path: impl Into<PathBuf>, original_name: &str) -> Self {
        Self {
            path: path.into(),
            identifier: original_name.to_string(),
            file_reference: original_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub records: Vec<MatchRecord>,
    /// Workbooks attempted, including the ones that failed.
    pub files_searched: usize,
    pub failures: Vec<WorkbookFailure>,
}

/// Search a single workbook; one record per (cell, matching keyword) in scan order.
pub fn search_workbook(
    path: &Path,
    identifier: &str,
    file_reference: &str,
    keywords: &KeywordSet,
) -> Result<Vec<MatchRecord>> {
    let book = open_workbook(path)?;
    let mut records = Vec::new();
    for cell in scan_cells(&book) {
        for keyword in keywords.matches(&cell.text) {
            records.push(MatchRecord {
                source_identifier: identifier.to_string(),
                sheet_name: cell.sheet_name.to_string(),
                row: cell.row,
                column: cell.col,
                cell_text: cell.text.clone(),
                matched_keyword: keyword.to_string(),
                file_reference: file_reference.to_string(),
            });
        }
    }
    Ok(records)
}

/// Search every source in order. A workbook that cannot be read is logged and recorded as a
/// failure; the batch always runs to the end.
pub fn search_workbooks(sources: &[WorkbookSource], keywords: &KeywordSet) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();
    for source in sources {
        outcome.files_searched += 1;
        match search_workbook(
            &source.path,
            &source.identifier,
            &source.file_reference,
            keywords,
        ) {
            Ok(records) => {
                tracing::debug!(
                    file = %source.identifier,
                    matches = records.len(),
                    "workbook searched"
                );
                outcome.records.extend(records);
            }
            Err(error) => {
                tracing::warn!(file = %source.identifier, "skipping workbook: {error:#}");
                outcome.failures.push(WorkbookFailure {
                    file: source.identifier.clone(),
                    error: format!("{error:#}"),
                });
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_book(path: &Path, cells: &[(&str, &str)]) {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        for (coord, value) in cells {
            sheet.get_cell_mut(*coord).set_value(*value);
        }
        umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
    }

    #[test]
    fn corrupt_workbook_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.xlsx");
        let broken = dir.path().join("broken.xlsx");
        let third = dir.path().join("third.xlsx");
        write_book(&first, &[("A1", "alpha one")]);
        std::fs::write(&broken, b"definitely not a zip archive").unwrap();
        write_book(&third, &[("B3", "ALPHA three")]);

        let keywords = KeywordSet::new(["alpha"]).unwrap();
        let sources = [&first, &broken, &third].map(|p| WorkbookSource::from_path(p.as_path()));
        let outcome = search_workbooks(&sources, &keywords);

        assert_eq!(outcome.files_searched, 3);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].file, broken.display().to_string());
        assert_eq!(outcome.records[0].source_identifier, first.display().to_string());
        assert_eq!((outcome.records[1].row, outcome.records[1].column), (3, 2));
    }

    #[test]
    fn staged_sources_report_original_name() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("1700000000000_report.xlsx");
        write_book(&staged, &[("A1", "Invoice")]);

        let keywords = KeywordSet::new(["invoice"]).unwrap();
        let outcome = search_workbooks(
            &[WorkbookSource::staged(&staged, "report.xlsx")],
            &keywords,
        );
        assert_eq!(outcome.records[0].source_identifier, "report.xlsx");
        assert_eq!(outcome.records[0].file_reference, "report.xlsx");
    }
}
