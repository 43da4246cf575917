//! Expansion of report path patterns into concrete files.
//!
//! A pattern is split on the directory separator. The leading elements that
//! contain no wildcard form the anchor directory; only that directory is
//! walked, and the paths below it are matched against the remaining
//! elements:
//!
//! - `*` matches zero or more characters within one path element
//! - `?` matches exactly one character within one path element
//! - `**` as a whole element matches zero or more elements
//!
//! So `reports/**/coverage/*.xml` walks `reports/` only, and
//! `sub/**/x.xml` matches both `sub/x.xml` and `sub/a/b/x.xml`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ReportError, Result};
use crate::paths;

const CURRENT_FOLDER: &str = ".";
const PARENT_FOLDER: &str = "..";
const RECURSIVE_PATTERN: &str = "**";
const ZERO_OR_MORE_PATTERN: char = '*';
const ANY_PATTERN: char = '?';

#[derive(Debug, Clone)]
pub struct WildcardResolver {
    base_dir: PathBuf,
    separator: String,
}

impl WildcardResolver {
    pub fn new(base_dir: impl Into<PathBuf>, separator: &str) -> Self {
        Self {
            base_dir: base_dir.into(),
            separator: separator.to_string(),
        }
    }

    /// Resolver using the platform's directory separator.
    pub fn with_platform_separator(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(base_dir, std::path::MAIN_SEPARATOR_STR)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Every existing file or directory matching `pattern`, as absolute paths.
    pub fn resolve(&self, pattern: &str) -> Result<BTreeSet<PathBuf>> {
        if self.separator.is_empty() {
            return Err(ReportError::InvalidPattern(
                "The directory separator cannot be empty".to_string(),
            ));
        }

        let elements: Vec<&str> = pattern.split(self.separator.as_str()).collect();
        let anchor_len = elements
            .iter()
            .position(|e| contains_wildcard(e))
            .unwrap_or(elements.len());

        let anchor = elements[..anchor_len].join(&self.separator);
        let start = if anchor.is_empty() {
            self.base_dir.clone()
        } else if Path::new(&anchor).is_absolute() {
            PathBuf::from(&anchor)
        } else {
            self.base_dir.join(&anchor)
        };
        let start = paths::absolute(&start);

        let wildcard_elements = &elements[anchor_len..];
        if wildcard_elements.is_empty() {
            return Ok(if start.exists() {
                BTreeSet::from([start])
            } else {
                BTreeSet::new()
            });
        }

        if wildcard_elements
            .iter()
            .any(|e| *e == CURRENT_FOLDER || *e == PARENT_FOLDER)
        {
            return Err(ReportError::InvalidPattern(format!(
                "Cannot contain '{CURRENT_FOLDER}' or '{PARENT_FOLDER}' after the first wildcard: {pattern}"
            )));
        }

        let glob = glob_regex(wildcard_elements, &self.separator)?;

        let mut matches = BTreeSet::new();
        for entry in WalkDir::new(&start).min_depth(1).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping an unreadable entry below {}: {}", start.display(), e);
                    continue;
                }
            };
            let Ok(relative) = entry.path().strip_prefix(&start) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join(&self.separator);

            if glob.is_match(&relative) {
                matches.insert(entry.into_path());
            }
        }

        Ok(matches)
    }
}

fn contains_wildcard(element: &str) -> bool {
    element == RECURSIVE_PATTERN
        || element.contains(ZERO_OR_MORE_PATTERN)
        || element.contains(ANY_PATTERN)
}

/// Anchored regex for the wildcard part of a pattern, matched against paths
/// relative to the anchor directory and joined with `separator`.
fn glob_regex(elements: &[&str], separator: &str) -> Result<Regex> {
    let sep = regex::escape(separator);
    let not_sep = format!("[^{sep}]");

    let mut re = String::from("^");
    let last = elements.len() - 1;
    for (i, element) in elements.iter().enumerate() {
        if *element == RECURSIVE_PATTERN {
            if i == last {
                re.push_str(".*");
            } else {
                re.push_str(&format!("(?:.*{sep})?"));
            }
            continue;
        }

        for c in element.chars() {
            match c {
                ZERO_OR_MORE_PATTERN => {
                    re.push_str(&not_sep);
                    re.push('*');
                }
                ANY_PATTERN => re.push_str(&not_sep),
                c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        if i != last {
            re.push_str(&sep);
        }
    }
    re.push('$');

    Regex::new(&re).map_err(|e| ReportError::InvalidPattern(e.to_string()))
}
