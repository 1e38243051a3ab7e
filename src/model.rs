use serde::{Deserialize, Serialize};

/// One keyword hit in one cell.
///
/// A cell that contains several keywords yields one record per keyword, in keyword order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Workbook path as searched, or the original file name for uploads.
    #[serde(rename = "file")]
    pub source_identifier: String,
    #[serde(rename = "sheet")]
    pub sheet_name: String,
    pub row: u32,
    #[serde(rename = "col")]
    pub column: u32,
    #[serde(rename = "value")]
    pub cell_text: String,
    #[serde(rename = "keyword")]
    pub matched_keyword: String,
    /// Path used to build `file:` links in the result workbook.
    pub file_reference: String,
}

/// A workbook that could not be read during a batch; it contributed no records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbookFailure {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<MatchRecord>,
    pub total_matches: usize,
    pub files_searched: usize,
    /// File name of the result workbook inside the results directory; absent when rendering failed.
    pub output_file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<WorkbookFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCell {
    pub row: u32,
    pub col: u32,
    pub value: String,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextCell {
    pub row: u32,
    pub col: u32,
    pub value: String,
    pub is_target: bool,
    pub is_header: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellContextResponse {
    pub file_name: String,
    pub sheet_name: String,
    pub target_cell: TargetCell,
    /// Rows `max(1, row - n)..=min(max_row, row + n)`, each spanning columns `1..=max_col`.
    #[serde(rename = "context")]
    pub surrounding_rows: Vec<Vec<ContextCell>>,
    pub max_row: u32,
    pub max_col: u32,
}

/// One pattern hit inside a text file or a spreadsheet cell.
///
/// `start`/`end` are character offsets into the file content (text) or the cell text
/// (spreadsheets).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceMatch {
    /// 1-based line number for text files, row number for spreadsheets.
    pub line: u32,
    pub start: usize,
    pub end: usize,
    pub match_text: String,
    pub line_content: String,
    pub context_before: String,
    pub context_after: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileReplaceResult {
    pub file_path: String,
    pub file_name: String,
    pub matches: Vec<ReplaceMatch>,
    pub total_matches: usize,
    #[serde(default)]
    pub replaced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkReplaceResponse {
    pub results: Vec<FileReplaceResult>,
    pub total_files: usize,
    pub files_with_matches: usize,
    pub total_replacements: usize,
    pub preview_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}
