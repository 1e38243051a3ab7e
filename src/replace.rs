use crate::cellref::column_letters;
use crate::config::has_extension;
use crate::errors::{InvalidInputError, NotFoundError};
use crate::matcher::{PatternMatch, ReplacePattern};
use crate::model::{BulkReplaceResponse, FileReplaceResult, ReplaceMatch};
use crate::scan::{open_workbook, scan_sheet};
use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions searched when a request names none.
pub const DEFAULT_TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".csv", ".html", ".js", ".ts", ".tsx", ".jsx", ".py", ".json", ".xml", ".css",
];

const BACKUP_SUFFIX: &str = "bak";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum FileKind {
    Spreadsheet,
    Text,
}

#[derive(Debug, Clone)]
pub struct BulkReplaceRequest {
    pub folder: PathBuf,
    pub search_pattern: String,
    pub replace_pattern: String,
    pub use_regex: bool,
    /// Suffixes such as `.txt`; a leading dot is optional. Empty means [`DEFAULT_TEXT_EXTENSIONS`].
    pub file_extensions: Vec<String>,
    pub preview_only: bool,
}

/// Run a bulk search (and, outside preview mode, replace) across a folder tree.
///
/// `workbook_extensions` decides which files are edited cell by cell; everything else is treated
/// as UTF-8 text. A failure on one file becomes an error entry for that file.
pub fn bulk_search_replace(
    request: &BulkReplaceRequest,
    workbook_extensions: &[String],
) -> Result<BulkReplaceResponse> {
    if request.folder.as_os_str().is_empty() {
        return Err(InvalidInputError::new("search_replace", "folder_path is required")
            .with_field("folder_path")
            .into());
    }
    let pattern = ReplacePattern::compile(&request.search_pattern, request.use_regex)?;

    if !request.folder.is_dir() {
        return Err(NotFoundError::new(format!(
            "folder not found: {}",
            request.folder.display()
        ))
        .with_detail("folder_path", request.folder.display().to_string())
        .into());
    }

    let filter = extension_filter(&request.file_extensions)?;
    let targets = collect_targets(&request.folder, &filter)?;
    if targets.is_empty() {
        return Err(NotFoundError::new("no files with the requested extensions were found")
            .with_detail("folder_path", request.folder.display().to_string())
            .with_detail("file_extensions", request.file_extensions.clone())
            .into());
    }

    tracing::info!(
        folder = %request.folder.display(),
        files = targets.len(),
        preview = request.preview_only,
        "bulk search-replace started"
    );

    let mut results = Vec::new();
    let mut total_replacements = 0;
    for path in &targets {
        let kind = if has_extension(workbook_extensions, path) {
            FileKind::Spreadsheet
        } else {
            FileKind::Text
        };
        let outcome = match kind {
            FileKind::Spreadsheet => process_spreadsheet(path, &pattern, request).map(Some),
            FileKind::Text => process_text(path, &pattern, request),
        };
        match outcome {
            Ok(Some(result)) => {
                if result.replaced {
                    total_replacements += result.total_matches;
                }
                if result.total_matches > 0 {
                    results.push(result);
                }
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(path = %path.display(), %kind, "replace failed: {error:#}");
                results.push(FileReplaceResult {
                    file_path: path.display().to_string(),
                    file_name: file_name_of(path),
                    error: Some(format!("{error:#}")),
                    ..FileReplaceResult::default()
                });
            }
        }
    }

    let files_with_matches = results.iter().filter(|r| r.total_matches > 0).count();
    Ok(BulkReplaceResponse {
        results,
        total_files: targets.len(),
        files_with_matches,
        total_replacements,
        preview_only: request.preview_only,
    })
}

fn extension_filter(extensions: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let mut added = 0;
    let requested: Vec<&str> = extensions
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .collect();
    let effective: Vec<&str> = if requested.is_empty() {
        DEFAULT_TEXT_EXTENSIONS.to_vec()
    } else {
        requested
    };
    for ext in effective {
        let suffix = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        };
        let glob = GlobBuilder::new(&format!("*{suffix}"))
            .literal_separator(true)
            .build()
            .map_err(|e| {
                InvalidInputError::new("search_replace", format!("invalid extension '{ext}': {e}"))
                    .with_field("file_extensions")
            })?;
        builder.add(glob);
        added += 1;
    }
    tracing::debug!(patterns = added, "extension filter built");
    builder.build().context("failed to build extension filter")
}

/// Every matching file below `folder`, once each, in path order.
fn collect_targets(folder: &Path, filter: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut out = BTreeSet::new();
    for entry in WalkDir::new(folder) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(folder = %folder.display(), "skipping unreadable entry: {error}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if filter.is_match(entry.file_name()) {
            out.insert(entry.into_path());
        }
    }
    Ok(out.into_iter().collect())
}

fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

fn write_backup(path: &Path) -> Result<PathBuf> {
    let backup = backup_path_for(path);
    fs::copy(path, &backup)
        .with_context(|| format!("failed to back up {} to {}", path.display(), backup.display()))?;
    tracing::debug!(path = %path.display(), backup = %backup.display(), "backup written");
    Ok(backup)
}

fn process_spreadsheet(
    path: &Path,
    pattern: &ReplacePattern,
    request: &BulkReplaceRequest,
) -> Result<FileReplaceResult> {
    let mut book = open_workbook(path)?;
    let mut result = FileReplaceResult {
        file_path: path.display().to_string(),
        file_name: file_name_of(path),
        ..FileReplaceResult::default()
    };

    if !request.preview_only {
        result.backup_path = Some(write_backup(path)?.display().to_string());
    }

    for sheet in book.get_sheet_collection_mut() {
        let sheet_name = sheet.get_name().to_string();
        let cells: Vec<(u32, u32, String)> = scan_sheet(sheet)
            .map(|cell| (cell.row, cell.col, cell.text))
            .collect();

        for (row, col, text) in cells {
            let found = pattern.find_matches(&text);
            if found.is_empty() {
                continue;
            }
            let letters = column_letters(col);
            for m in &found {
                result.matches.push(ReplaceMatch {
                    line: row,
                    sheet: Some(sheet_name.clone()),
                    column: Some(letters.clone()),
                    ..match_entry(m, &text)
                });
            }
            result.total_matches += found.len();

            if !request.preview_only {
                let replaced = pattern.replace_all(&text, &request.replace_pattern);
                sheet.get_cell_mut((col, row)).set_value(replaced.into_owned());
            }
        }
    }

    if !request.preview_only && result.total_matches > 0 {
        umya_spreadsheet::writer::xlsx::write(&book, path)
            .with_context(|| format!("failed to save workbook {}", path.display()))?;
        result.replaced = true;
    }

    Ok(result)
}

/// `None` when the file has no matches.
fn process_text(
    path: &Path,
    pattern: &ReplacePattern,
    request: &BulkReplaceRequest,
) -> Result<Option<FileReplaceResult>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let content = decode_utf8_dropping_invalid(&bytes);

    let found = pattern.find_matches(&content);
    if found.is_empty() {
        return Ok(None);
    }

    let mut result = FileReplaceResult {
        file_path: path.display().to_string(),
        file_name: file_name_of(path),
        total_matches: found.len(),
        ..FileReplaceResult::default()
    };
    for m in &found {
        let line = content[..m.byte_start].matches('\n').count() as u32 + 1;
        let line_start = content[..m.byte_start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = content[m.byte_end..]
            .find('\n')
            .map_or(content.len(), |i| m.byte_end + i);
        result.matches.push(ReplaceMatch {
            line,
            line_content: content[line_start..line_end].to_string(),
            ..match_entry(m, &content)
        });
    }

    if !request.preview_only {
        let backup = write_backup(path)?;
        let replaced = pattern.replace_all(&content, &request.replace_pattern);
        fs::write(path, replaced.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        result.replaced = true;
        result.backup_path = Some(backup.display().to_string());
    }

    Ok(Some(result))
}

fn match_entry(m: &PatternMatch, line_content: &str) -> ReplaceMatch {
    ReplaceMatch {
        line: 0,
        start: m.start,
        end: m.end,
        match_text: m.text.clone(),
        line_content: line_content.to_string(),
        context_before: m.context_before.clone(),
        context_after: m.context_after.clone(),
        sheet: None,
        column: None,
    }
}

/// Decode UTF-8, silently dropping invalid byte sequences.
fn decode_utf8_dropping_invalid(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(err) => {
                let (valid, rest) = bytes.split_at(err.valid_up_to());
                // valid_up_to guarantees this prefix is UTF-8
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match err.error_len() {
                    Some(len) => bytes = &rest[len..],
                    None => return out,
                }
            }
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
