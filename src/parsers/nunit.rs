/// Parser for NUnit 2 XML test results.
///
/// Structure:
///   <test-results name="..." total="196" errors="30" failures="20"
///                 not-run="7" inconclusive="7" ignored="0" skipped="0" invalid="0">
///     <test-suite type="Assembly" name="..." time="0.500" ...>
///       <results>
///         <test-suite type="TestFixture" time="0.232" ...> ... </test-suite>
///       </results>
///     </test-suite>
///   </test-results>
///
/// Inconclusive tests are reported as skipped rather than run.
use std::path::Path;

use tracing::{debug, info};

use super::xml::XmlCursor;
use super::{checked_difference, checked_sum, counter, seconds_to_millis, UnitTestResultsParser};
use crate::error::Result;
use crate::model::UnitTestResults;
use crate::paths;

pub struct NUnitParser {
    suite_timing: bool,
}

impl NUnitParser {
    /// Root summary plus the duration of every `<test-suite>`.
    pub fn new() -> Self {
        Self { suite_timing: true }
    }

    /// Root summary only; no duration is recorded.
    pub fn summary_only() -> Self {
        Self {
            suite_timing: false,
        }
    }
}

impl Default for NUnitParser {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitTestResultsParser for NUnitParser {
    fn parse(&self, path: &Path, results: &mut UnitTestResults) -> Result<()> {
        info!(
            "Parsing the NUnit Test Results file {}",
            paths::absolute(path).display()
        );
        let mut cursor = XmlCursor::open(path)?;
        cursor.require_root_tag("test-results")?;

        let total = cursor.require_int_attribute("total")?;
        let errors = cursor.require_int_attribute("errors")?;
        let failures = cursor.require_int_attribute("failures")?;
        let inconclusive = cursor.require_int_attribute("inconclusive")?;
        let ignored = cursor.require_int_attribute("ignored")?;

        let tests = counter(
            &cursor,
            "run",
            checked_difference(&cursor, "run", total, &[inconclusive])?,
        )?;
        let passed = counter(
            &cursor,
            "passed",
            checked_difference(&cursor, "passed", total, &[errors, failures, inconclusive])?,
        )?;
        let skipped = counter(
            &cursor,
            "skipped",
            checked_sum(&cursor, "skipped", &[inconclusive, ignored])?,
        )?;
        let failed = counter(&cursor, "failed", failures)?;
        let errored = counter(&cursor, "errored", errors)?;

        let mut execution_time_ms: u64 = 0;
        if self.suite_timing {
            while let Some(tag) = cursor.next_tag()? {
                if tag != "test-suite" {
                    continue;
                }
                let Some(time) = cursor.optional_attribute("time") else {
                    continue;
                };
                match seconds_to_millis(time) {
                    Some(ms) => execution_time_ms = execution_time_ms.saturating_add(ms),
                    None => debug!(
                        "Ignoring the unparsable test suite time \"{}\" in {} at line {}",
                        time,
                        paths::absolute(path).display(),
                        cursor.line()
                    ),
                }
            }
        }

        results.add(tests, passed, skipped, failed, errored, execution_time_ms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::error::ReportError;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/nunit")
            .join(name)
    }

    #[test]
    fn test_parse_nunit_summary() {
        let mut results = UnitTestResults::new();
        NUnitParser::summary_only()
            .parse(&fixture("valid.xml"), &mut results)
            .unwrap();

        assert_eq!(results.tests, 196);
        assert_eq!(results.passed, 146);
        assert_eq!(results.skipped, 7);
        assert_eq!(results.failed, 20);
        assert_eq!(results.errors, 30);
        assert_eq!(results.execution_time_ms, 0);
        assert_eq!(results.passed_percentage(), Some(146.0 * 100.0 / 196.0));
    }

    #[test]
    fn test_parse_nunit_with_time() {
        let mut results = UnitTestResults::new();
        NUnitParser::new()
            .parse(&fixture("valid_with_time.xml"), &mut results)
            .unwrap();

        assert_eq!(results.tests, 196);
        assert_eq!(results.passed, 146);
        assert_eq!(results.skipped, 7);
        assert_eq!(results.failed, 20);
        assert_eq!(results.errors, 30);
        assert_eq!(results.execution_time_ms, 732);
    }

    #[test]
    fn test_parse_nunit_unparsable_time_counts_as_zero() {
        let mut results = UnitTestResults::new();
        NUnitParser::new()
            .parse(&fixture("invalid_time.xml"), &mut results)
            .unwrap();
        assert_eq!(results.tests, 196);
        assert_eq!(results.execution_time_ms, 250);
    }

    #[test]
    fn test_parse_nunit_no_counters() {
        let mut results = UnitTestResults::new();
        let err = NUnitParser::new()
            .parse(&fixture("no_counters.xml"), &mut results)
            .unwrap_err();
        assert!(matches!(err, ReportError::Parse(_)));
        let msg = err.to_string();
        assert!(
            msg.contains("Missing attribute \"total\" in element <test-results> in "),
            "{msg}"
        );
        assert!(
            msg.contains(&paths::absolute(&fixture("no_counters.xml")).display().to_string()),
            "{msg}"
        );
        assert_eq!(results, UnitTestResults::new());
    }

    #[test]
    fn test_parse_nunit_invalid_total() {
        let mut results = UnitTestResults::new();
        let err = NUnitParser::new()
            .parse(&fixture("invalid_total.xml"), &mut results)
            .unwrap_err()
            .to_string();
        assert!(
            err.contains("Expected an integer instead of \"invalid\" for the attribute \"total\" in "),
            "{err}"
        );
        assert!(err.contains("invalid_total.xml"), "{err}");
    }

    #[test]
    fn test_parse_nunit_wrong_root() {
        let mut results = UnitTestResults::new();
        let err = NUnitParser::new()
            .parse(&fixture("../xunit/valid.xml"), &mut results)
            .unwrap_err()
            .to_string();
        assert!(err.contains("Missing root element <test-results>"), "{err}");
    }

    #[test]
    fn test_parse_nunit_is_idempotent() {
        let mut first = UnitTestResults::new();
        let mut second = UnitTestResults::new();
        NUnitParser::new()
            .parse(&fixture("valid_with_time.xml"), &mut first)
            .unwrap();
        NUnitParser::new()
            .parse(&fixture("valid_with_time.xml"), &mut second)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_nunit_counter_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overflow.xml");
        std::fs::write(
            &path,
            r#"<test-results total="-9223372036854775808" errors="0" failures="0" inconclusive="1" ignored="0"/>"#,
        )
        .unwrap();

        let mut results = UnitTestResults::new();
        let err = NUnitParser::summary_only()
            .parse(&path, &mut results)
            .unwrap_err();
        assert!(matches!(err, ReportError::Parse(_)));
        assert!(
            err.to_string()
                .contains("The computed number of run tests is out of range"),
            "{err}"
        );
        assert_eq!(results, UnitTestResults::new());
    }
}
