pub mod commands;
pub mod output;

use crate::config::{CliArgs, ServerConfig};
use crate::state::AppState;
use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(
    name = "workbook-search-cli",
    version,
    about = "Search workbooks and bulk-replace text from the command line"
)]
pub struct Cli {
    /// Print single-line JSON.
    #[arg(long, global = true)]
    pub compact: bool,

    /// Service settings, read from flags or their environment variables.
    #[command(flatten)]
    pub settings: CliArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search workbooks (or folders of workbooks) for keywords and write a result workbook.
    Search {
        #[arg(long = "keyword", short = 'k', required = true)]
        keywords: Vec<String>,
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Show a cell with the rows around it.
    Context {
        file: PathBuf,
        sheet: String,
        row: u32,
        col: u32,
        #[arg(long, default_value = "")]
        keyword: String,
        #[arg(long)]
        context_rows: Option<u32>,
    },
    /// Find (and with --apply, replace) a pattern across a folder tree.
    Replace {
        folder: PathBuf,
        pattern: String,
        replacement: String,
        #[arg(long)]
        regex: bool,
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,
        /// Write changes; without it the command only previews.
        #[arg(long)]
        apply: bool,
    },
    /// Copy a result workbook out of the results directory.
    Fetch {
        id: String,
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
}

impl Cli {
    pub fn app_state(&self) -> Result<Arc<AppState>> {
        let config = ServerConfig::from_args(self.settings.clone())?;
        Ok(Arc::new(AppState::new(Arc::new(config))))
    }
}

pub async fn run_command(state: Arc<AppState>, command: Commands) -> Result<Value> {
    match command {
        Commands::Search { keywords, paths } => {
            commands::search::search(state, keywords, paths).await
        }
        Commands::Context {
            file,
            sheet,
            row,
            col,
            keyword,
            context_rows,
        } => commands::search::context(state, file, sheet, row, col, keyword, context_rows).await,
        Commands::Replace {
            folder,
            pattern,
            replacement,
            regex,
            extensions,
            apply,
        } => {
            commands::replace::replace(state, folder, pattern, replacement, regex, extensions, apply)
                .await
        }
        Commands::Fetch { id, out } => commands::fetch::fetch(state, id, out).await,
    }
}
