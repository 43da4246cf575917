/// Parser for xUnit.net v2 XML test results.
///
/// Structure:
///   <assemblies>
///     <assembly name="..." total="10" passed="8" failed="1" skipped="1"
///               errors="0" time="0.312" ...>
///       <collection ...> <test ... /> </collection>
///     </assembly>
///   </assemblies>
///
/// A single `<assembly>` may also be the document root. `errors` is missing
/// from older runners and defaults to zero.
use std::path::Path;

use tracing::{debug, info};

use super::xml::XmlCursor;
use super::{counter, seconds_to_millis, UnitTestResultsParser};
use crate::error::Result;
use crate::model::UnitTestResults;
use crate::paths;

pub struct XUnitParser;

fn add_assembly(cursor: &XmlCursor, results: &mut UnitTestResults) -> Result<()> {
    let total = cursor.require_int_attribute("total")?;
    let passed = cursor.require_int_attribute("passed")?;
    let failed = cursor.require_int_attribute("failed")?;
    let skipped = cursor.require_int_attribute("skipped")?;
    let errors = cursor.int_attribute_or_zero("errors");

    let time = cursor.optional_attribute("time");
    let millis = time.and_then(seconds_to_millis).unwrap_or_else(|| {
        if let Some(time) = time {
            debug!(
                "Ignoring the unparsable assembly time \"{}\" at line {}",
                time,
                cursor.line()
            );
        }
        0
    });

    results.add(
        counter(cursor, "run", total)?,
        counter(cursor, "passed", passed)?,
        counter(cursor, "skipped", skipped)?,
        counter(cursor, "failed", failed)?,
        counter(cursor, "errored", errors)?,
        millis,
    );
    Ok(())
}

impl UnitTestResultsParser for XUnitParser {
    fn parse(&self, path: &Path, results: &mut UnitTestResults) -> Result<()> {
        info!(
            "Parsing the XUnit Test Results file {}",
            paths::absolute(path).display()
        );
        let mut cursor = XmlCursor::open(path)?;

        let mut tag = cursor.next_tag()?;
        match tag.as_deref() {
            Some("assemblies") | Some("assembly") => {}
            other => {
                return Err(cursor.parse_error(format!(
                    "Expected either an <assemblies> or an <assembly> root tag, but got <{}> instead",
                    other.unwrap_or_default()
                )))
            }
        }

        let mut counters = UnitTestResults::new();
        while let Some(name) = tag {
            if name == "assembly" {
                add_assembly(&cursor, &mut counters)?;
            }
            tag = cursor.next_tag()?;
        }

        results.merge(&counters);
        Ok(())
    }
}
