use anyhow::Result;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::state::AppState;
use crate::tools;
use crate::tools::BulkReplaceParams;

pub async fn replace(
    state: Arc<AppState>,
    folder: PathBuf,
    pattern: String,
    replacement: String,
    regex: bool,
    extensions: Vec<String>,
    apply: bool,
) -> Result<Value> {
    let response = tools::bulk_search_replace(
        state,
        BulkReplaceParams {
            folder_path: folder.display().to_string(),
            search_pattern: pattern,
            replace_pattern: replacement,
            use_regex: regex,
            file_extensions: if extensions.is_empty() {
                None
            } else {
                Some(extensions)
            },
            preview_only: !apply,
        },
    )
    .await?;
    Ok(serde_json::to_value(response)?)
}
