use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_UPLOADS_DIR: &str = "uploads";
const DEFAULT_RESULTS_DIR: &str = "results";
const DEFAULT_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
const DEFAULT_CONTEXT_ROWS: u32 = 5;

/// How hyperlinks are attached to result cells.
///
/// Chosen once at startup; the renderer never checks capabilities per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HyperlinkMode {
    /// Hyperlink with target and hover tooltip.
    #[default]
    Native,
    /// Hyperlink with target only.
    Bare,
}

/// `file:` URL shape for links pointing back at source workbooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LinkConvention {
    /// `file:///C:/dir/book.xlsx`, backslashes turned into forward slashes.
    Windows,
    /// `file://` followed by the absolute path as-is.
    Posix,
}

impl Default for LinkConvention {
    fn default() -> Self {
        if cfg!(windows) {
            LinkConvention::Windows
        } else {
            LinkConvention::Posix
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Staging area for uploaded workbooks; files live here only for one search.
    pub uploads_dir: PathBuf,
    /// Write-once store for generated result workbooks.
    pub results_dir: PathBuf,
    pub http_bind_address: SocketAddr,
    pub workbook_extensions: Vec<String>,
    pub max_upload_bytes: Option<u64>,
    pub hyperlink_mode: HyperlinkMode,
    pub link_convention: LinkConvention,
    pub default_context_rows: u32,
    pub default_search_folder: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            http_bind_address: default_bind_address(),
            workbook_extensions: default_extensions(),
            max_upload_bytes: Some(DEFAULT_MAX_UPLOAD_BYTES),
            hyperlink_mode: HyperlinkMode::default(),
            link_convention: LinkConvention::default(),
            default_context_rows: DEFAULT_CONTEXT_ROWS,
            default_search_folder: None,
        }
    }
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            uploads_dir: cli_uploads_dir,
            results_dir: cli_results_dir,
            http_bind: cli_http_bind,
            extensions: cli_extensions,
            max_upload_bytes: cli_max_upload_bytes,
            hyperlink_mode: cli_hyperlink_mode,
            link_convention: cli_link_convention,
            context_rows: cli_context_rows,
            default_search_folder: cli_default_search_folder,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            uploads_dir: file_uploads_dir,
            results_dir: file_results_dir,
            http_bind: file_http_bind,
            extensions: file_extensions,
            max_upload_bytes: file_max_upload_bytes,
            hyperlink_mode: file_hyperlink_mode,
            link_convention: file_link_convention,
            context_rows: file_context_rows,
            default_search_folder: file_default_search_folder,
        } = file_config;

        let uploads_dir = cli_uploads_dir
            .or(file_uploads_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOADS_DIR));
        let results_dir = cli_results_dir
            .or(file_results_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR));

        let workbook_extensions =
            normalize_extensions(cli_extensions.or(file_extensions).unwrap_or_default());
        let workbook_extensions = if workbook_extensions.is_empty() {
            default_extensions()
        } else {
            workbook_extensions
        };

        let http_bind_address = cli_http_bind
            .or(file_http_bind)
            .unwrap_or_else(default_bind_address);

        let max_upload_bytes = cli_max_upload_bytes
            .or(file_max_upload_bytes)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let max_upload_bytes = if max_upload_bytes == 0 {
            None
        } else {
            Some(max_upload_bytes)
        };

        let hyperlink_mode = cli_hyperlink_mode
            .or(file_hyperlink_mode)
            .unwrap_or_default();
        let link_convention = cli_link_convention
            .or(file_link_convention)
            .unwrap_or_default();

        let default_context_rows = cli_context_rows
            .or(file_context_rows)
            .unwrap_or(DEFAULT_CONTEXT_ROWS);

        let default_search_folder = cli_default_search_folder
            .or(file_default_search_folder)
            .filter(|p| !p.as_os_str().is_empty());

        Ok(Self {
            uploads_dir,
            results_dir,
            http_bind_address,
            workbook_extensions,
            max_upload_bytes,
            hyperlink_mode,
            link_convention,
            default_context_rows,
            default_search_folder,
        })
    }

    /// Create the uploads and results directories if they are missing.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.uploads_dir, &self.results_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {:?}", dir))?;
            anyhow::ensure!(dir.is_dir(), "{:?} is not a directory", dir);
        }
        Ok(())
    }

    pub fn is_workbook_path(&self, path: &Path) -> bool {
        has_extension(&self.workbook_extensions, path)
    }

    pub fn is_workbook_name(&self, name: &str) -> bool {
        self.is_workbook_path(Path::new(name))
    }
}

pub fn has_extension(allowed: &[String], path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            allowed.iter().any(|candidate| candidate == &lower)
        })
        .unwrap_or(false)
}

/// Lowercase, strip leading dots, sort and dedup.
pub fn normalize_extensions<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = raw
        .into_iter()
        .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect::<Vec<_>>();
    out.sort();
    out.dedup();
    out
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS
        .iter()
        .map(|ext| (*ext).to_string())
        .collect()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5001))
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "workbook-search",
    about = "Keyword search service for spreadsheet workbooks",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "WORKBOOK_SEARCH_UPLOADS_DIR",
        value_name = "DIR",
        help = "Staging directory for uploaded workbooks (default: ./uploads)"
    )]
    pub uploads_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "WORKBOOK_SEARCH_RESULTS_DIR",
        value_name = "DIR",
        help = "Directory that receives generated result workbooks (default: ./results)"
    )]
    pub results_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "WORKBOOK_SEARCH_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address (default: 127.0.0.1:5001)"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "WORKBOOK_SEARCH_EXTENSIONS",
        value_name = "EXT",
        value_delimiter = ',',
        help = "Comma-separated list of workbook extensions to search"
    )]
    pub extensions: Option<Vec<String>>,

    #[arg(
        long,
        env = "WORKBOOK_SEARCH_MAX_UPLOAD_BYTES",
        value_name = "BYTES",
        help = "Max total upload size in bytes (default: 104857600; 0 disables)",
        value_parser = clap::value_parser!(u64)
    )]
    pub max_upload_bytes: Option<u64>,

    #[arg(
        long,
        env = "WORKBOOK_SEARCH_HYPERLINK_MODE",
        value_enum,
        value_name = "MODE",
        help = "Hyperlink style for result workbooks (native or bare)"
    )]
    pub hyperlink_mode: Option<HyperlinkMode>,

    #[arg(
        long,
        env = "WORKBOOK_SEARCH_LINK_CONVENTION",
        value_enum,
        value_name = "KIND",
        help = "file: URL convention for links (windows or posix; default: host OS)"
    )]
    pub link_convention: Option<LinkConvention>,

    #[arg(
        long,
        env = "WORKBOOK_SEARCH_CONTEXT_ROWS",
        value_name = "N",
        help = "Rows shown above and below a cell in context lookups (default: 5)",
        value_parser = clap::value_parser!(u32)
    )]
    pub context_rows: Option<u32>,

    #[arg(
        long,
        env = "DEFAULT_SEARCH_FOLDER",
        value_name = "DIR",
        help = "Folder suggested to clients that ask for a default search location"
    )]
    pub default_search_folder: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    uploads_dir: Option<PathBuf>,
    results_dir: Option<PathBuf>,
    http_bind: Option<SocketAddr>,
    extensions: Option<Vec<String>>,
    max_upload_bytes: Option<u64>,
    hyperlink_mode: Option<HyperlinkMode>,
    link_convention: Option<LinkConvention>,
    context_rows: Option<u32>,
    default_search_folder: Option<PathBuf>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
