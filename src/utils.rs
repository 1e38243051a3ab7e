use crate::config::LinkConvention;
use chrono::{DateTime, Local};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// `file:` URL for an absolute path under the given convention.
pub fn file_url(path: &str, convention: LinkConvention) -> String {
    match convention {
        LinkConvention::Windows => format!("file:///{}", path.replace('\\', "/")),
        LinkConvention::Posix => format!("file://{path}"),
    }
}

/// Best-effort absolute form of a source path: canonical when it exists on disk, as given otherwise.
pub fn resolve_for_link(path: &Path) -> PathBuf {
    if path.exists() {
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}

/// Whether a source path points somewhere a viewer could open, not just a bare file name.
pub fn is_link_resolvable(original: &Path, resolved: &str) -> bool {
    if resolved.is_empty() {
        return false;
    }
    original.exists()
        || Path::new(resolved).is_absolute()
        || resolved.contains('\\')
        || resolved.contains('/')
        || resolved.contains(MAIN_SEPARATOR)
}

/// `YYYYMMDD_HHMMSS` in local time, used to name result artifacts.
pub fn artifact_timestamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

pub fn unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Final path component of a user-visible identifier, tolerating either separator style.
pub fn display_file_name(identifier: &str) -> String {
    identifier
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(identifier)
        .to_string()
}
