#![allow(dead_code)]
pub mod builders;

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::{TempDir, tempdir};
use umya_spreadsheet::{self, Spreadsheet};
use workbook_search::state::AppState;
use workbook_search::{HyperlinkMode, LinkConvention, ServerConfig};

pub fn write_workbook_to_path<F>(path: &Path, f: F)
where
    F: FnOnce(&mut Spreadsheet),
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dir");
    }
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    umya_spreadsheet::writer::xlsx::write(&book, path).expect("write workbook");
}

/// A workbook whose package part `part` is replaced with `contents` after writing.
pub fn write_workbook_with_broken_part<F>(path: &Path, part: &str, contents: &[u8], f: F)
where
    F: FnOnce(&mut Spreadsheet),
{
    write_workbook_to_path(path, f);
    let bytes = std::fs::read(path).expect("read workbook");
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open package");
    let mut writer = zip::ZipWriter::new(std::fs::File::create(path).expect("recreate workbook"));
    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx).expect("package entry");
        let name = entry.name().to_string();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).expect("read entry");
        writer
            .start_file(name.clone(), zip::write::FileOptions::default())
            .expect("start entry");
        let body = if name == part { contents } else { &data[..] };
        writer.write_all(body).expect("write entry");
    }
    writer.finish().expect("finish package");
}

pub fn read_workbook(path: &Path) -> Spreadsheet {
    umya_spreadsheet::reader::xlsx::read(path).expect("read workbook")
}

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir
            .path()
            .canonicalize()
            .expect("canonical tempdir");
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn create_workbook<F>(&self, name: &str, f: F) -> PathBuf
    where
        F: FnOnce(&mut Spreadsheet),
    {
        let path = self.path(name);
        write_workbook_to_path(&path, f);
        path
    }

    /// A zip-valid workbook whose `xl/workbook.xml` is not well-formed XML.
    pub fn create_malformed_workbook(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        write_workbook_with_broken_part(&path, "xl/workbook.xml", b"<<<", |book| {
            let sheet = book.get_sheet_mut(&0).expect("default sheet");
            sheet.get_cell_mut("A1").set_value("alpha needle");
        });
        path
    }

    pub fn create_file(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dir");
        }
        std::fs::write(&path, contents).expect("write file");
        path
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.path("uploads")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.path("results")
    }

    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            uploads_dir: self.uploads_dir(),
            results_dir: self.results_dir(),
            http_bind_address: "127.0.0.1:8079".parse().expect("bind address"),
            hyperlink_mode: HyperlinkMode::Native,
            link_convention: LinkConvention::Posix,
            ..ServerConfig::default()
        }
    }

    pub fn config_with<F>(&self, configure: F) -> ServerConfig
    where
        F: FnOnce(&mut ServerConfig),
    {
        let mut config = self.config();
        configure(&mut config);
        config
    }

    pub fn app_state(&self) -> Arc<AppState> {
        app_state_with_config(self.config())
    }

    /// Result artifacts currently stored, sorted by name.
    pub fn result_files(&self) -> Vec<String> {
        list_file_names(&self.results_dir())
    }

    pub fn upload_files(&self) -> Vec<String> {
        list_file_names(&self.uploads_dir())
    }
}

pub fn app_state_with_config(config: ServerConfig) -> Arc<AppState> {
    config.ensure_directories().expect("create service directories");
    Arc::new(AppState::new(Arc::new(config)))
}

fn list_file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
