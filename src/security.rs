use crate::errors::InvalidInputError;
use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

/// Canonicalize `candidate` and ensure it remains within `root`.
///
/// Symlink-aware: both the root and the candidate are canonicalized, so the candidate must exist.
pub fn canonicalize_within_root(
    root: &Path,
    candidate: &Path,
    operation: &'static str,
    field: &'static str,
) -> Result<PathBuf> {
    let root = root
        .canonicalize()
        .map_err(|e| anyhow!("failed to canonicalize {}: {e}", root.display()))?;

    let canonical_candidate = candidate.canonicalize().map_err(|e| {
        InvalidInputError::new(operation, format!("{field} could not be canonicalized: {e}"))
            .with_field(field)
    })?;

    if !canonical_candidate.starts_with(&root) {
        return Err(InvalidInputError::new(
            operation,
            format!(
                "{field} must stay inside '{}' (got '{}')",
                root.display(),
                canonical_candidate.display(),
            ),
        )
        .with_field(field)
        .into());
    }

    Ok(canonical_candidate)
}

/// Sanitize a filename component for safe `Path::join` usage.
///
/// Path separators and control characters become `_`; `.` and `..` are replaced outright.
pub fn sanitize_filename_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_control() || ch == '/' || ch == '\\' {
            out.push('_');
        } else {
            out.push(ch);
        }
    }

    if out.is_empty() || out == "." || out == ".." {
        return "_".to_string();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn sanitize_strips_separators() {
        assert_eq!(
            sanitize_filename_component("../a/b\\c.xlsx"),
            ".._a_b_c.xlsx"
        );
        assert_eq!(sanitize_filename_component(".."), "_");
        assert_eq!(sanitize_filename_component(""), "_");
    }

    #[test]
    fn escaping_candidates_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let inside = root.path().join("results");
        std::fs::create_dir_all(&inside).unwrap();
        std::fs::write(root.path().join("outside.xlsx"), b"x").unwrap();
        std::fs::write(inside.join("kept.xlsx"), b"x").unwrap();

        let err = canonicalize_within_root(&inside, &inside.join("../outside.xlsx"), "fetch", "id")
            .unwrap_err();
        assert_matches!(err.downcast_ref::<InvalidInputError>(), Some(e) if e.field() == Some("id"));

        let ok = canonicalize_within_root(&inside, &inside.join("kept.xlsx"), "fetch", "id").unwrap();
        assert!(ok.ends_with("kept.xlsx"));
    }

    #[test]
    fn missing_candidates_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let err = canonicalize_within_root(root.path(), &root.path().join("new.xlsx"), "fetch", "id")
            .unwrap_err();
        assert_matches!(
            err.downcast_ref::<InvalidInputError>(),
            Some(e) if e.field() == Some("id") && e.message().contains("canonicalized")
        );
    }
}
