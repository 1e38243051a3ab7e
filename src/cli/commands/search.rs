use anyhow::Result;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::state::AppState;
use crate::tools;
use crate::tools::{CellContextParams, SearchParams};

pub async fn search(state: Arc<AppState>, keywords: Vec<String>, paths: Vec<String>) -> Result<Value> {
    let response = tools::search(
        state,
        SearchParams {
            folder_path: None,
            workbook_paths: paths,
            keywords,
        },
    )
    .await?;
    Ok(serde_json::to_value(response)?)
}

pub async fn context(
    state: Arc<AppState>,
    file: PathBuf,
    sheet: String,
    row: u32,
    col: u32,
    keyword: String,
    context_rows: Option<u32>,
) -> Result<Value> {
    let response = tools::get_cell_context(
        state,
        CellContextParams {
            file_path: file.display().to_string(),
            sheet_name: sheet,
            row,
            col,
            keyword,
            context_rows,
        },
    )
    .await?;
    Ok(serde_json::to_value(response)?)
}
