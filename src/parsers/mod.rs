pub mod dotcover;
pub mod ncover3;
pub mod nunit;
pub mod opencover;
pub mod trx;
pub mod vscoveragexml;
pub mod xml;
pub mod xunit;

use std::path::Path;

use crate::error::{ReportError, Result};
use crate::model::{Coverage, UnitTestResults};
use xml::XmlCursor;

/// Every coverage format parser implements this trait.
pub trait CoverageParser {
    /// Parse the report at `path`, accumulating line hits into `coverage`.
    fn parse(&self, path: &Path, coverage: &mut Coverage) -> Result<()>;
}

/// Every unit test results format parser implements this trait.
pub trait UnitTestResultsParser {
    /// Parse the report at `path`, accumulating counters into `results`.
    fn parse(&self, path: &Path, results: &mut UnitTestResults) -> Result<()>;
}

/// Supported coverage report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CoverageFormat {
    NCover3,
    OpenCover,
    DotCover,
    DotCoverAggregated,
    VisualStudioCoverageXml,
}

impl CoverageFormat {
    pub const ALL: [CoverageFormat; 5] = [
        CoverageFormat::NCover3,
        CoverageFormat::OpenCover,
        CoverageFormat::DotCover,
        CoverageFormat::DotCoverAggregated,
        CoverageFormat::VisualStudioCoverageXml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageFormat::NCover3 => "ncover3",
            CoverageFormat::OpenCover => "opencover",
            CoverageFormat::DotCover => "dotcover",
            CoverageFormat::DotCoverAggregated => "dotcover-aggregated",
            CoverageFormat::VisualStudioCoverageXml => "vscoveragexml",
        }
    }

    /// The parser that reads this format.
    pub fn parser(&self) -> Box<dyn CoverageParser> {
        match self {
            CoverageFormat::NCover3 => Box::new(ncover3::NCover3Parser),
            CoverageFormat::OpenCover => Box::new(opencover::OpenCoverParser),
            CoverageFormat::DotCover => Box::new(dotcover::DotCoverParser),
            CoverageFormat::DotCoverAggregated => Box::new(dotcover::DotCoverAggregatedParser),
            CoverageFormat::VisualStudioCoverageXml => {
                Box::new(vscoveragexml::VisualStudioCoverageXmlParser)
            }
        }
    }
}

impl std::str::FromStr for CoverageFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CoverageFormat::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ReportError::UnknownFormat(s.to_string()))
    }
}

impl std::fmt::Display for CoverageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported unit test results formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TestResultsFormat {
    /// NUnit 2 summary plus summed `<test-suite>` times.
    NUnit,
    /// NUnit 2 root summary only.
    NUnitSummary,
    /// Visual Studio TRX counters plus run duration from `<Times>`.
    VisualStudio,
    /// Visual Studio TRX counters only.
    VisualStudioCounters,
    XUnit,
}

impl TestResultsFormat {
    pub const ALL: [TestResultsFormat; 5] = [
        TestResultsFormat::NUnit,
        TestResultsFormat::NUnitSummary,
        TestResultsFormat::VisualStudio,
        TestResultsFormat::VisualStudioCounters,
        TestResultsFormat::XUnit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestResultsFormat::NUnit => "nunit",
            TestResultsFormat::NUnitSummary => "nunit-summary",
            TestResultsFormat::VisualStudio => "trx",
            TestResultsFormat::VisualStudioCounters => "trx-counters",
            TestResultsFormat::XUnit => "xunit",
        }
    }

    /// The parser that reads this format.
    pub fn parser(&self) -> Box<dyn UnitTestResultsParser> {
        match self {
            TestResultsFormat::NUnit => Box::new(nunit::NUnitParser::new()),
            TestResultsFormat::NUnitSummary => Box::new(nunit::NUnitParser::summary_only()),
            TestResultsFormat::VisualStudio => Box::new(trx::TrxParser::new()),
            TestResultsFormat::VisualStudioCounters => Box::new(trx::TrxParser::counters_only()),
            TestResultsFormat::XUnit => Box::new(xunit::XUnitParser),
        }
    }
}

impl std::str::FromStr for TestResultsFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TestResultsFormat::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ReportError::UnknownFormat(s.to_string()))
    }
}

impl std::fmt::Display for TestResultsFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a counter read from a report into a hit count; negative visit
/// counts mark non-instrumented points and yield `None`.
pub(crate) fn hit_count(value: i64) -> Option<u64> {
    u64::try_from(value).ok()
}

/// Convert a line number read from a report; zero and negative values carry
/// no line information.
pub(crate) fn line_number(value: i64) -> Option<u32> {
    u32::try_from(value).ok().filter(|&l| l > 0)
}

/// A test counter derived from report attributes; negative totals mean the
/// report contradicts itself.
pub(crate) fn counter(cursor: &XmlCursor, name: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| {
        cursor.parse_error(format!(
            "The computed number of {name} tests is negative: {value}"
        ))
    })
}

/// Sum of report counters; a sum that does not fit an `i64` is a parse error.
pub(crate) fn checked_sum(cursor: &XmlCursor, name: &str, values: &[i64]) -> Result<i64> {
    values
        .iter()
        .try_fold(0i64, |acc, &v| acc.checked_add(v))
        .ok_or_else(|| overflow(cursor, name))
}

/// `minuend` minus every value of `subtrahends`, with the same overflow rule
/// as `checked_sum`.
pub(crate) fn checked_difference(
    cursor: &XmlCursor,
    name: &str,
    minuend: i64,
    subtrahends: &[i64],
) -> Result<i64> {
    subtrahends
        .iter()
        .try_fold(minuend, |acc, &v| acc.checked_sub(v))
        .ok_or_else(|| overflow(cursor, name))
}

fn overflow(cursor: &XmlCursor, name: &str) -> ReportError {
    cursor.parse_error(format!(
        "The computed number of {name} tests is out of range"
    ))
}

/// Parse a duration in seconds, accepting either `.` or `,` as the decimal
/// separator, into whole milliseconds. `None` when the value is unusable.
pub(crate) fn seconds_to_millis(value: &str) -> Option<u64> {
    let seconds = value.trim().replace(',', ".").parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some((seconds * 1000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_format_names_round_trip() {
        for format in CoverageFormat::ALL {
            assert_eq!(format.as_str().parse::<CoverageFormat>().unwrap(), format);
        }
        assert_eq!(
            "OpenCover".parse::<CoverageFormat>().unwrap(),
            CoverageFormat::OpenCover
        );
        assert!(matches!(
            "cobertura".parse::<CoverageFormat>(),
            Err(ReportError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_results_format_names_round_trip() {
        for format in TestResultsFormat::ALL {
            assert_eq!(format.as_str().parse::<TestResultsFormat>().unwrap(), format);
        }
        assert!("junit".parse::<TestResultsFormat>().is_err());
    }

    #[test]
    fn counters_conversions() {
        assert_eq!(hit_count(3), Some(3));
        assert_eq!(hit_count(-1), None);
        assert_eq!(line_number(0), None);
        assert_eq!(line_number(-4), None);
        assert_eq!(line_number(12), Some(12));
    }

    #[test]
    fn seconds_are_rounded_to_millis() {
        assert_eq!(seconds_to_millis("0.732"), Some(732));
        assert_eq!(seconds_to_millis("0,5"), Some(500));
        assert_eq!(seconds_to_millis(" 1.0004 "), Some(1000));
        assert_eq!(seconds_to_millis("12"), Some(12000));
        assert_eq!(seconds_to_millis("n/a"), None);
        assert_eq!(seconds_to_millis("-1.5"), None);
        assert_eq!(seconds_to_millis("NaN"), None);
    }
}
