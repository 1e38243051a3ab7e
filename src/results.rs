use crate::errors::{InvalidInputError, NotFoundError};
use crate::security::canonicalize_within_root;
use crate::utils::artifact_timestamp;
use anyhow::{Context, Result};
use chrono::Local;
use std::cmp::Reverse;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use umya_spreadsheet::Spreadsheet;

const ARTIFACT_PREFIX: &str = "search_results_";
const ARTIFACT_EXTENSION: &str = "xlsx";

/// A result workbook persisted in the results directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub file_name: String,
    pub path: PathBuf,
}

/// Write-once store of generated result workbooks.
#[derive(Debug, Clone)]
pub struct ResultsStore {
    dir: PathBuf,
}

impl ResultsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `book` as `search_results_<YYYYMMDD_HHMMSS>.xlsx`.
    ///
    /// Existing artifacts are never overwritten; a same-second collision gets a `_<n>` suffix.
    pub fn save(&self, book: &Spreadsheet) -> Result<StoredArtifact> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create results dir {}", self.dir.display()))?;
        let stamp = artifact_timestamp(Local::now());
        let mut file_name = format!("{ARTIFACT_PREFIX}{stamp}.{ARTIFACT_EXTENSION}");
        let mut attempt = 1;
        while self.dir.join(&file_name).exists() {
            attempt += 1;
            file_name = format!("{ARTIFACT_PREFIX}{stamp}_{attempt}.{ARTIFACT_EXTENSION}");
        }
        let path = self.dir.join(&file_name);
        umya_spreadsheet::writer::xlsx::write(book, &path)
            .with_context(|| format!("failed to write result workbook {}", path.display()))?;
        tracing::info!(path = %path.display(), "result workbook saved");
        Ok(StoredArtifact { file_name, path })
    }

    /// Locate an artifact by identifier.
    ///
    /// Accepts a bare file name, a `results/`-prefixed path, or a path inside the results
    /// directory. When nothing exists at that location, falls back to an exact file-name match,
    /// then to the newest artifact whose name overlaps the requested one.
    pub fn resolve(&self, identifier: &str) -> Result<StoredArtifact> {
        let normalized = normalize_identifier(identifier);
        if normalized.is_empty() {
            return Err(InvalidInputError::new("fetch_result", "file path must not be empty")
                .with_field("file_path")
                .into());
        }

        let requested = Path::new(&normalized);
        if requested
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(InvalidInputError::new(
                "fetch_result",
                "file path must not leave the results directory",
            )
            .with_field("file_path")
            .into());
        }

        let candidate = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.dir.join(requested)
        };
        if candidate.is_file() {
            let path = canonicalize_within_root(&self.dir, &candidate, "fetch_result", "file_path")?;
            return Ok(artifact_from_path(path));
        }

        let wanted = requested
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| normalized.clone());
        let available = self.list()?;

        if let Some((path, _)) = available
            .iter()
            .find(|(path, _)| file_name_of(path) == wanted)
        {
            tracing::info!(path = %path.display(), "artifact found by name");
            return Ok(artifact_from_path(path.clone()));
        }

        let mut partial: Vec<&(PathBuf, SystemTime)> = available
            .iter()
            .filter(|(path, _)| {
                let name = file_name_of(path);
                name.contains(&wanted) || wanted.contains(&name)
            })
            .collect();
        partial.sort_by_key(|(_, modified)| Reverse(*modified));
        if let Some((path, _)) = partial.first() {
            tracing::info!(path = %path.display(), "artifact found by partial name");
            return Ok(artifact_from_path(path.clone()));
        }

        tracing::warn!(requested = identifier, "result artifact not found");
        let available_names: Vec<String> = available.iter().map(|(p, _)| file_name_of(p)).collect();
        Err(NotFoundError::new(format!("result file not found: {identifier}"))
            .with_suggestion("run a search first and use the returned output_file")
            .with_detail("requested_path", identifier)
            .with_detail("normalized_path", normalized)
            .with_detail("file_name_only", wanted)
            .with_detail("results_folder", self.dir.display().to_string())
            .with_detail("available_files", available_names)
            .into())
    }

    /// Read the bytes of an artifact located by [`ResultsStore::resolve`].
    pub fn read(&self, identifier: &str) -> Result<(StoredArtifact, Vec<u8>)> {
        let artifact = self.resolve(identifier)?;
        let bytes = fs::read(&artifact.path)
            .with_context(|| format!("failed to read {}", artifact.path.display()))?;
        Ok((artifact, bytes))
    }

    /// Workbooks currently in the results directory with their modification times.
    fn list(&self) -> Result<Vec<(PathBuf, SystemTime)>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list {}", self.dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            let is_workbook = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ARTIFACT_EXTENSION));
            if !path.is_file() || !is_workbook {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            out.push((path, modified));
        }
        out.sort();
        Ok(out)
    }
}

/// Forward slashes, no `results/` prefix, no leading separators.
fn normalize_identifier(identifier: &str) -> String {
    let forward = identifier.trim().replace('\\', "/");
    if Path::new(&forward).is_absolute() {
        return forward;
    }
    let trimmed = forward.trim_start_matches('/');
    let stripped = match trimmed.get(..8) {
        Some(prefix) if prefix.eq_ignore_ascii_case("results/") => &trimmed[8..],
        _ => trimmed,
    };
    stripped.trim_start_matches('/').to_string()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn artifact_from_path(path: PathBuf) -> StoredArtifact {
    StoredArtifact {
        file_name: file_name_of(&path),
        path,
    }
}
