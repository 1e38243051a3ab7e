use crate::model::BulkReplaceResponse;
use crate::replace::{BulkReplaceRequest, bulk_search_replace as run_bulk_replace};
use crate::state::AppState;
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct BulkReplaceParams {
    #[serde(default)]
    pub folder_path: String,
    #[serde(default)]
    pub search_pattern: String,
    #[serde(default)]
    pub replace_pattern: String,
    #[serde(default)]
    pub use_regex: bool,
    /// Suffixes to include, e.g. `[".txt", ".xlsx"]`; omitted means the built-in text list.
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,
    /// Defaults to `true`: nothing is written unless a caller opts out explicitly.
    #[serde(default = "default_preview_only")]
    pub preview_only: bool,
}

impl Default for BulkReplaceParams {
    fn default() -> Self {
        Self {
            folder_path: String::new(),
            search_pattern: String::new(),
            replace_pattern: String::new(),
            use_regex: false,
            file_extensions: None,
            preview_only: default_preview_only(),
        }
    }
}

fn default_preview_only() -> bool {
    true
}

impl BulkReplaceParams {
    fn into_request(self) -> BulkReplaceRequest {
        BulkReplaceRequest {
            folder: PathBuf::from(self.folder_path.trim()),
            search_pattern: self.search_pattern,
            replace_pattern: self.replace_pattern,
            use_regex: self.use_regex,
            file_extensions: self.file_extensions.unwrap_or_default(),
            preview_only: self.preview_only,
        }
    }
}

pub async fn bulk_search_replace(
    state: Arc<AppState>,
    params: BulkReplaceParams,
) -> Result<BulkReplaceResponse> {
    let config = state.config();
    let request = params.into_request();
    tokio::task::spawn_blocking(move || run_bulk_replace(&request, &config.workbook_extensions))
        .await?
}
