pub mod replace;

pub use replace::{BulkReplaceParams, bulk_search_replace};

use crate::aggregate::{WorkbookSource, search_workbooks};
use crate::config::ServerConfig;
use crate::context::{CellLocator, get_cell_context as read_cell_context};
use crate::errors::{InvalidInputError, NotFoundError};
use crate::matcher::KeywordSet;
use crate::model::{CellContextResponse, HealthResponse, SearchResponse};
use crate::render::render_results;
use crate::state::AppState;
use crate::uploads::{UploadedFile, stage_uploads};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File names listed in diagnostics when a folder holds no workbooks.
const FOLDER_LISTING_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// A folder whose immediate workbook children are searched.
    #[serde(default)]
    pub folder_path: Option<String>,
    /// Explicit workbook files or folders.
    #[serde(default)]
    pub workbook_paths: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchUploadedParams {
    pub files: Vec<UploadedFile>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CellContextParams {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub sheet_name: String,
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub col: u32,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub context_rows: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchResultParams {
    #[serde(default)]
    pub file_path: String,
}

#[derive(Debug, Clone)]
pub struct ResultArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DefaultFolderResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

pub async fn search(state: Arc<AppState>, params: SearchParams) -> Result<SearchResponse> {
    let keywords = KeywordSet::new(&params.keywords)?;
    let config = state.config();
    let sources = tokio::task::spawn_blocking({
        let config = config.clone();
        move || resolve_sources(&config, &params)
    })
    .await??;

    tracing::info!(
        files = sources.len(),
        keywords = keywords.len(),
        "search started"
    );
    let response =
        tokio::task::spawn_blocking(move || run_search(&state, &sources, &keywords)).await?;
    Ok(response)
}

pub async fn search_uploaded(
    state: Arc<AppState>,
    params: SearchUploadedParams,
) -> Result<SearchResponse> {
    let keywords = KeywordSet::new(&params.keywords)?;
    let config = state.config();
    tokio::task::spawn_blocking(move || {
        let batch = stage_uploads(&config, params.files)?;
        tracing::info!(
            files = batch.staged.len(),
            skipped = batch.skipped.len(),
            "upload search started"
        );
        let response = run_search(&state, &batch.sources(), &keywords);
        drop(batch);
        Ok(response)
    })
    .await?
}

pub async fn get_cell_context(
    state: Arc<AppState>,
    params: CellContextParams,
) -> Result<CellContextResponse> {
    if params.file_path.trim().is_empty() {
        return Err(InvalidInputError::new("get_cell_context", "file_path is required")
            .with_field("file_path")
            .into());
    }
    let context_rows = params
        .context_rows
        .unwrap_or(state.config().default_context_rows);
    tokio::task::spawn_blocking(move || {
        let path = PathBuf::from(params.file_path.trim());
        read_cell_context(
            CellLocator {
                file_path: &path,
                sheet_name: &params.sheet_name,
                row: params.row,
                col: params.col,
                keyword: &params.keyword,
            },
            context_rows,
        )
    })
    .await?
}

pub async fn fetch_result_artifact(
    state: Arc<AppState>,
    params: FetchResultParams,
) -> Result<ResultArtifact> {
    tokio::task::spawn_blocking(move || {
        let (artifact, bytes) = state.results().read(&params.file_path)?;
        Ok(ResultArtifact {
            file_name: artifact.file_name,
            bytes,
        })
    })
    .await?
}

pub fn health() -> HealthResponse {
    HealthResponse {
        status: "ok".to_string(),
        message: "Workbook search API is running".to_string(),
    }
}

/// The configured default search folder, when it exists on this machine.
pub fn default_search_folder(state: &AppState) -> DefaultFolderResponse {
    match state.config().default_search_folder.as_deref() {
        Some(folder) if folder.is_dir() => DefaultFolderResponse {
            success: true,
            folder_path: Some(folder.display().to_string()),
            error: None,
            suggestion: None,
        },
        Some(folder) => DefaultFolderResponse {
            success: false,
            folder_path: None,
            error: Some(format!(
                "configured default folder does not exist: {}",
                folder.display()
            )),
            suggestion: Some("enter the folder path manually".to_string()),
        },
        None => DefaultFolderResponse {
            success: false,
            folder_path: None,
            error: Some("folder selection is not available on this server".to_string()),
            suggestion: Some("enter the folder path manually".to_string()),
        },
    }
}

/// Aggregate, render and persist. A render or save failure only drops the artifact.
fn run_search(state: &AppState, sources: &[WorkbookSource], keywords: &KeywordSet) -> SearchResponse {
    let outcome = search_workbooks(sources, keywords);

    let output_file = match render_results(&outcome.records, keywords, state.render_options())
        .and_then(|book| state.results().save(&book))
    {
        Ok(artifact) => Some(artifact.file_name),
        Err(error) => {
            tracing::error!("failed to produce result workbook: {error:#}");
            None
        }
    };

    tracing::info!(
        matches = outcome.records.len(),
        files = outcome.files_searched,
        failed = outcome.failures.len(),
        "search completed"
    );

    SearchResponse {
        total_matches: outcome.records.len(),
        files_searched: outcome.files_searched,
        results: outcome.records,
        output_file,
        failed_files: outcome.failures,
    }
}

/// Expand the requested locations into workbook sources.
fn resolve_sources(config: &ServerConfig, params: &SearchParams) -> Result<Vec<WorkbookSource>> {
    let mut locations: Vec<&str> = Vec::new();
    if let Some(folder) = params.folder_path.as_deref() {
        locations.push(folder);
    }
    locations.extend(params.workbook_paths.iter().map(String::as_str));
    locations.retain(|l| !l.trim().is_empty());

    if locations.is_empty() {
        return Err(InvalidInputError::new("search", "a folder or workbook path is required")
            .with_field("folder_path")
            .with_suggestion("enter an absolute folder path")
            .into());
    }

    let mut sources = Vec::new();
    for original in locations {
        let normalized = normalize_location(original);
        if !normalized.exists() {
            tracing::warn!(
                original = original,
                normalized = %normalized.display(),
                "search location not found"
            );
            return Err(NotFoundError::new(format!("location not found: {original}"))
                .with_suggestion(
                    "check the path and use an absolute path that exists on the server",
                )
                .with_detail("original_path", original)
                .with_detail("normalized_path", normalized.display().to_string())
                .into());
        }
        if normalized.is_dir() {
            sources.extend(folder_sources(config, original, &normalized)?);
        } else if config.is_workbook_path(&normalized) {
            sources.push(WorkbookSource::from_path(normalized));
        } else {
            return Err(InvalidInputError::new(
                "search",
                format!("not a folder or workbook: {original}"),
            )
            .with_field("folder_path")
            .with_suggestion("specify a folder, not a file")
            .into());
        }
    }
    Ok(sources)
}

/// Immediate workbook children of `folder`, sorted by name.
fn folder_sources(
    config: &ServerConfig,
    original: &str,
    folder: &Path,
) -> Result<Vec<WorkbookSource>> {
    let mut workbooks = Vec::new();
    let mut other_files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if config.is_workbook_path(&path) {
            workbooks.push(path);
        } else if let Some(name) = path.file_name() {
            other_files.push(name.to_string_lossy().into_owned());
        }
    }
    workbooks.sort();

    if workbooks.is_empty() {
        other_files.sort();
        other_files.truncate(FOLDER_LISTING_LIMIT);
        return Err(NotFoundError::new(format!("no workbooks found in folder: {original}"))
            .with_suggestion(format!(
                "make sure the folder contains files with one of these extensions: {}",
                config.workbook_extensions.join(", ")
            ))
            .with_detail("folder_path", folder.display().to_string())
            .with_detail("files_in_folder", other_files)
            .into());
    }
    Ok(workbooks.into_iter().map(WorkbookSource::from_path).collect())
}

/// Trim the input and make it absolute, resolving symlinks when the path exists.
fn normalize_location(raw: &str) -> PathBuf {
    let trimmed = raw.trim().trim_matches('"');
    let path = Path::new(trimmed);
    if path.exists() {
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
    } else {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    }
}
