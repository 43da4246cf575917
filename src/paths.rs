//! Path helpers shared by the parsers and the wildcard resolver.
//!
//! Reports reference source files by whatever path the coverage tool saw.
//! Those references are turned into canonical absolute paths so that hits
//! from different reports for the same file land under the same key.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute against the current directory without touching the
/// file system. Falls back to the path unchanged if the current directory
/// cannot be determined.
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize(&cwd.join(path)),
        Err(_) => path.to_path_buf(),
    }
}

/// Resolve a path referenced from inside a report to its canonical form.
///
/// Existing files are resolved through the file system (symlinks followed).
/// Files that do not exist on this machine are normalized lexically, so a
/// report produced elsewhere still yields a stable key.
pub fn canonical(raw: &str) -> io::Result<String> {
    if raw.trim().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }
    if raw.contains('\0') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "path contains a NUL byte",
        ));
    }

    let path = Path::new(raw);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let resolved = match std::fs::canonicalize(&absolute) {
        Ok(p) => p,
        Err(e) if e.kind() == io::ErrorKind::NotFound => normalize(&absolute),
        Err(e) => return Err(e),
    };

    resolved
        .into_os_string()
        .into_string()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "path is not valid UTF-8"))
}

/// Drop `.` components and fold `..` into their parent.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_normalizes_missing_files() {
        let p = canonical("/nonexistent/dir/./sub/../Calc.cs").unwrap();
        assert_eq!(p, "/nonexistent/dir/Calc.cs");
    }

    #[test]
    fn canonical_resolves_relative_against_cwd() {
        let p = canonical("does-not-exist/Foo.cs").unwrap();
        let expected = std::env::current_dir().unwrap().join("does-not-exist/Foo.cs");
        assert_eq!(Path::new(&p), expected);
    }

    #[test]
    fn canonical_follows_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Calc.cs");
        std::fs::write(&file, "class Calc {}").unwrap();

        let raw = format!("{}/./Calc.cs", dir.path().display());
        let p = canonical(&raw).unwrap();
        assert_eq!(Path::new(&p), std::fs::canonicalize(&file).unwrap());
    }

    #[test]
    fn canonical_rejects_unusable_paths() {
        assert!(canonical("").is_err());
        assert!(canonical("   ").is_err());
        assert!(canonical("foo\0bar").is_err());
    }

    #[test]
    fn absolute_keeps_absolute_paths() {
        assert_eq!(absolute(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
    }
}
