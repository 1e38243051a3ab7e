use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;

use crate::state::AppState;
use crate::tools;
use crate::tools::FetchResultParams;

pub async fn fetch(state: Arc<AppState>, id: String, out: PathBuf) -> Result<Value> {
    let artifact = tools::fetch_result_artifact(state, FetchResultParams { file_path: id }).await?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(&out, &artifact.bytes)
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;
    Ok(json!({
        "file_name": artifact.file_name,
        "path": out.display().to_string(),
        "bytes": artifact.bytes.len(),
    }))
}
