#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use dotnet_reports::wildcard::WildcardResolver;
use tempfile::TempDir;

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Resolver rooted at `tests/fixtures`, splitting patterns on `/`.
pub fn fixtures_resolver() -> WildcardResolver {
    WildcardResolver::new(fixtures_dir(), "/")
}

/// Create a temporary directory holding empty files at the given relative
/// paths. The caller must hold onto `TempDir` to keep it alive.
pub fn setup_tree(files: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in files {
        let path = dir.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"").unwrap();
    }
    dir
}

/// Copy a fixture into `dir` under a new name.
pub fn copy_fixture(fixture: &str, dir: &Path, name: &str) -> PathBuf {
    let target = dir.join(name);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::copy(fixtures_dir().join(fixture), &target).unwrap();
    target
}
