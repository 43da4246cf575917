//! Uniform in-memory representation of coverage and unit test results,
//! independent of any specific report format. Parsers accumulate into a
//! `Coverage` or a `UnitTestResults` which is then handed to the host.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Serialize;

/// Line hits keyed by 1-based line number.
pub type LineHits = BTreeMap<u32, u64>;

/// File → line → hit count accumulator shared by every coverage parser of
/// one analysis run.
///
/// When the same (file, line) is observed more than once, the highest hit
/// count wins. A line is covered when its count is nonzero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    files: BTreeMap<String, LineHits>,
}

impl Coverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hits` for `line` of the file at `path`.
    pub fn add_hits(&mut self, path: &str, line: u32, hits: u64) {
        let lines = self.files.entry(path.to_string()).or_default();
        match lines.entry(line) {
            Entry::Vacant(v) => {
                v.insert(hits);
            }
            Entry::Occupied(mut o) => {
                if hits > *o.get() {
                    o.insert(hits);
                }
            }
        }
    }

    /// Fold another accumulator into this one under the same max policy.
    pub fn merge(&mut self, other: &Coverage) {
        for (path, lines) in &other.files {
            for (&line, &hits) in lines {
                self.add_hits(path, line, hits);
            }
        }
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn hits(&self, path: &str) -> Option<&LineHits> {
        self.files.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Per-file line counters, in path order.
    pub fn summaries(&self) -> Vec<FileSummary> {
        self.files
            .iter()
            .map(|(path, lines)| FileSummary::from_hits(path, lines))
            .collect()
    }
}

/// Line counters for a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: String,
    pub lines_to_cover: u64,
    pub covered_lines: u64,
}

impl FileSummary {
    pub fn from_hits(path: &str, lines: &LineHits) -> Self {
        Self {
            path: path.to_string(),
            lines_to_cover: lines.len() as u64,
            covered_lines: lines.values().filter(|&&h| h > 0).count() as u64,
        }
    }

    #[must_use]
    pub fn uncovered_lines(&self) -> u64 {
        self.lines_to_cover - self.covered_lines
    }

    #[must_use]
    pub fn line_rate(&self) -> f64 {
        rate(self.covered_lines, self.lines_to_cover)
    }
}

/// Compute a coverage rate, returning 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// Aggregate unit test counters, summed across every parsed report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnitTestResults {
    pub tests: u64,
    pub passed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub errors: u64,
    pub execution_time_ms: u64,
}

impl UnitTestResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters saturate at `u64::MAX`.
    pub fn add(
        &mut self,
        tests: u64,
        passed: u64,
        skipped: u64,
        failed: u64,
        errors: u64,
        execution_time_ms: u64,
    ) {
        self.tests = self.tests.saturating_add(tests);
        self.passed = self.passed.saturating_add(passed);
        self.skipped = self.skipped.saturating_add(skipped);
        self.failed = self.failed.saturating_add(failed);
        self.errors = self.errors.saturating_add(errors);
        self.execution_time_ms = self.execution_time_ms.saturating_add(execution_time_ms);
    }

    pub fn add_execution_time(&mut self, millis: u64) {
        self.execution_time_ms = self.execution_time_ms.saturating_add(millis);
    }

    pub fn merge(&mut self, other: &UnitTestResults) {
        self.add(
            other.tests,
            other.passed,
            other.skipped,
            other.failed,
            other.errors,
            other.execution_time_ms,
        );
    }

    /// `passed * 100 / tests`, or `None` when no test ran.
    #[must_use]
    pub fn passed_percentage(&self) -> Option<f64> {
        if self.tests == 0 {
            None
        } else {
            Some(self.passed as f64 * 100.0 / self.tests as f64)
        }
    }
}
