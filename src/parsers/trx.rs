/// Parser for Visual Studio `.trx` test results.
///
/// Structure:
///   <TestRun id="..." name="..." xmlns="http://microsoft.com/schemas/VisualStudio/TeamTest/2010">
///     <Times creation="..." queuing="..." start="2016-01-21T17:38:56.9281140+01:00"
///            finish="2016-01-21T17:38:58.3121140+01:00" />
///     ...
///     <ResultSummary outcome="Failed">
///       <Counters total="31" executed="31" passed="14" error="3" failed="5"
///                 timeout="2" aborted="1" inconclusive="6" ... />
///     </ResultSummary>
///   </TestRun>
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info};

use super::xml::XmlCursor;
use super::{checked_sum, counter, UnitTestResultsParser};
use crate::error::Result;
use crate::model::UnitTestResults;
use crate::paths;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

pub struct TrxParser {
    with_times: bool,
}

impl TrxParser {
    /// Counters plus the run duration taken from `<Times>`.
    pub fn new() -> Self {
        Self { with_times: true }
    }

    /// Counters only, bucketed from the `total` attribute.
    pub fn counters_only() -> Self {
        Self { with_times: false }
    }

    fn add_counters(&self, cursor: &XmlCursor, results: &mut UnitTestResults) -> Result<()> {
        let errors = cursor.require_int_attribute("error")?;
        let failed = cursor.require_int_attribute("failed")?;
        let timeout = cursor.require_int_attribute("timeout")?;
        let aborted = cursor.require_int_attribute("aborted")?;
        let inconclusive = cursor.require_int_attribute("inconclusive")?;
        let passed = cursor.require_int_attribute("passed")?;

        if self.with_times {
            results.add(
                counter(
                    cursor,
                    "run",
                    checked_sum(cursor, "run", &[passed, failed, errors, timeout, aborted])?,
                )?,
                counter(cursor, "passed", passed)?,
                counter(cursor, "skipped", inconclusive)?,
                counter(
                    cursor,
                    "failed",
                    checked_sum(cursor, "failed", &[timeout, failed, aborted])?,
                )?,
                counter(cursor, "errored", errors)?,
                0,
            );
        } else {
            let total = cursor.require_int_attribute("total")?;
            results.add(
                counter(cursor, "run", total)?,
                counter(cursor, "passed", passed)?,
                counter(
                    cursor,
                    "skipped",
                    checked_sum(cursor, "skipped", &[aborted, inconclusive])?,
                )?,
                counter(cursor, "failed", checked_sum(cursor, "failed", &[timeout, failed])?)?,
                counter(cursor, "errored", errors)?,
                0,
            );
        }
        Ok(())
    }
}

impl Default for TrxParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()
}

/// Milliseconds between `start` and `finish`, zero when either timestamp
/// cannot be read or the run ends before it starts.
fn duration_millis(start: &str, finish: &str) -> u64 {
    match (parse_timestamp(start), parse_timestamp(finish)) {
        (Some(start), Some(finish)) => {
            u64::try_from((finish - start).num_milliseconds()).unwrap_or(0)
        }
        _ => {
            debug!("Ignoring the unparsable test run times start=\"{start}\" finish=\"{finish}\"");
            0
        }
    }
}

impl UnitTestResultsParser for TrxParser {
    fn parse(&self, path: &Path, results: &mut UnitTestResults) -> Result<()> {
        info!(
            "Parsing the Visual Studio Test Results file {}",
            paths::absolute(path).display()
        );
        let mut cursor = XmlCursor::open(path)?;
        cursor.require_root_tag("TestRun")?;

        let mut counters = UnitTestResults::new();
        let mut found_counters = false;
        let mut times: Option<(String, String)> = None;

        while let Some(tag) = cursor.next_tag()? {
            match tag.as_str() {
                "Counters" => {
                    if found_counters {
                        return Err(cursor.parse_error("Only one <Counters> tag is expected"));
                    }
                    found_counters = true;
                    self.add_counters(&cursor, &mut counters)?;
                }
                "Times" if self.with_times => {
                    let start = cursor.optional_attribute("start").unwrap_or_default();
                    let finish = cursor.optional_attribute("finish").unwrap_or_default();
                    times = Some((start.to_string(), finish.to_string()));
                }
                _ => {}
            }
        }

        if !found_counters {
            return Err(cursor.parse_error("The mandatory <Counters> tag is missing"));
        }

        if let Some((start, finish)) = times {
            counters.add_execution_time(duration_millis(&start, &finish));
        }
        results.merge(&counters);
        Ok(())
    }
}
