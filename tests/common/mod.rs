//! Common test utilities for pipeline tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;

use pkg_recipe::Recipe;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a zip archive in memory from (path, contents) pairs.
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        for (path, contents) in files {
            zip.start_file(*path, options).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf.into_inner()
}

/// Serve the same zip archive for every GET request.
pub async fn serve_zip(files: &[(&str, &str)]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_bytes(files)))
        .mount(&server)
        .await;
    server
}

/// Parse a fixture, pointing its archive URL at `server_uri`.
pub fn fixture(template: &str, server_uri: &str) -> Recipe {
    Recipe::from_toml_str(&template.replace("{server}", server_uri)).unwrap()
}

/// Work and package directories inside one temp dir.
pub struct TestEnv {
    pub dir: TempDir,
    pub work: PathBuf,
    pub package: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        let package = dir.path().join("package");
        Self { dir, work, package }
    }

    /// Make an empty dependency package root and return it.
    pub fn dep_root(&self, name: &str) -> PathBuf {
        let root = self.dir.path().join("deps").join(name);
        std::fs::create_dir_all(root.join("include")).unwrap();
        std::fs::create_dir_all(root.join("lib")).unwrap();
        root
    }
}

/// All regular files under `root`, relative and sorted.
pub fn files_under(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    files.sort();
    files
}
