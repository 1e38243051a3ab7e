use crate::aggregate::WorkbookSource;
use crate::config::ServerConfig;
use crate::errors::{NotFoundError, PayloadTooLargeError};
use crate::security::sanitize_filename_component;
use crate::utils::{display_file_name, unix_millis};
use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

/// A workbook received from a client: the name it was sent under and its bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// An upload written to the staging directory. The file is removed when this value drops.
#[derive(Debug)]
pub struct StagedUpload {
    original_name: String,
    file: NamedTempFile,
}

impl StagedUpload {
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn as_source(&self) -> WorkbookSource {
        WorkbookSource::staged(self.path(), &self.original_name)
    }
}

/// Uploads staged for one search. Dropping the batch deletes every staged file.
#[derive(Debug, Default)]
pub struct StagedBatch {
    pub staged: Vec<StagedUpload>,
    /// Names of uploads that were not workbooks.
    pub skipped: Vec<String>,
}

impl StagedBatch {
    pub fn sources(&self) -> Vec<WorkbookSource> {
        self.staged.iter().map(StagedUpload::as_source).collect()
    }
}

/// Validate and stage uploads into the configured uploads directory.
///
/// Rejects the whole batch when it exceeds the size limit; skips blank names and non-workbook
/// names; fails with not-found when no workbook is left.
pub fn stage_uploads(config: &ServerConfig, uploads: Vec<UploadedFile>) -> Result<StagedBatch> {
    let total: u64 = uploads.iter().map(|u| u.bytes.len() as u64).sum();
    if let Some(limit) = config.max_upload_bytes {
        if total > limit {
            return Err(PayloadTooLargeError {
                actual: total,
                limit,
            }
            .into());
        }
    }

    fs::create_dir_all(&config.uploads_dir).with_context(|| {
        format!(
            "failed to create uploads dir {}",
            config.uploads_dir.display()
        )
    })?;

    let mut batch = StagedBatch::default();
    for upload in uploads {
        let original_name = upload.file_name.trim().to_string();
        if original_name.is_empty() || !config.is_workbook_name(&original_name) {
            tracing::debug!(file = %original_name, "skipping non-workbook upload");
            batch.skipped.push(original_name);
            continue;
        }
        let file = stage_one(&config.uploads_dir, &original_name, &upload.bytes)?;
        tracing::debug!(file = %original_name, path = %file.path().display(), "upload staged");
        batch.staged.push(StagedUpload {
            original_name,
            file,
        });
    }

    if batch.staged.is_empty() {
        return Err(NotFoundError::new("no workbook files were uploaded")
            .with_suggestion(format!(
                "upload files with one of these extensions: {}",
                config.workbook_extensions.join(", ")
            ))
            .with_detail("skipped_files", batch.skipped.clone())
            .into());
    }

    Ok(batch)
}

fn stage_one(dir: &Path, original_name: &str, bytes: &[u8]) -> Result<NamedTempFile> {
    let safe_name = sanitize_filename_component(&display_file_name(original_name));
    let prefix = format!("{}_", unix_millis());

    let mut file = match Builder::new()
        .prefix(&prefix)
        .suffix(&safe_name)
        .rand_bytes(0)
        .tempfile_in(dir)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Builder::new()
            .prefix(&prefix)
            .suffix(&format!("_{safe_name}"))
            .tempfile_in(dir)
            .with_context(|| format!("failed to stage upload {original_name}"))?,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to stage upload {original_name}"));
        }
    };
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .with_context(|| format!("failed to write staged upload {original_name}"))?;
    Ok(file)
}
