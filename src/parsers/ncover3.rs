/// Parser for NCover 3 XML coverage reports.
///
/// NCover 3 structure:
///   <coverage exportversion="3">
///     <documents>
///       <doc id="1" url="C:\src\Calc.cs" />
///     </documents>
///     <module ...>
///       <method ...>
///         <seqpnt doc="1" l="12" vc="3" ... />
///       </method>
///     </module>
///   </coverage>
///
/// `doc` id "0" and line 0 are placeholders NCover emits for code without
/// source information.
use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use super::xml::XmlCursor;
use super::{hit_count, line_number, CoverageParser};
use crate::error::Result;
use crate::model::Coverage;
use crate::paths;

pub struct NCover3Parser;

impl CoverageParser for NCover3Parser {
    fn parse(&self, path: &Path, coverage: &mut Coverage) -> Result<()> {
        info!("Parsing the NCover3 report {}", paths::absolute(path).display());
        let mut cursor = XmlCursor::open(path)?;
        cursor.require_root_tag("coverage")?;
        cursor.require_attribute_equals("exportversion", 3)?;

        // doc id → canonical path; None when the path could not be resolved.
        let mut documents: HashMap<String, Option<String>> = HashMap::new();

        while let Some(tag) = cursor.next_tag()? {
            match tag.as_str() {
                "doc" => {
                    let id = cursor.require_attribute("id")?;
                    let url = cursor.require_attribute("url")?;
                    if id == "0" {
                        continue;
                    }
                    let canonical = match paths::canonical(url) {
                        Ok(p) => Some(p),
                        Err(e) => {
                            debug!(
                                "Skipping the import of NCover3 code coverage for the invalid file path: {} at line {}: {}",
                                url,
                                cursor.line(),
                                e
                            );
                            None
                        }
                    };
                    documents.insert(id.to_string(), canonical);
                }
                "seqpnt" => {
                    let doc = cursor.require_attribute("doc")?;
                    let line = cursor.require_int_attribute("l")?;
                    let vc = cursor.require_int_attribute("vc")?;

                    if let Some(Some(file)) = documents.get(doc) {
                        if let (Some(line), Some(hits)) = (line_number(line), hit_count(vc)) {
                            coverage.add_hits(file, line, hits);
                        }
                    }
                }
                _ => {}
            }
        }

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
            .join("tests/fixtures/ncover3")
            .join(name)
    }

    #[test]
    fn test_parse_ncover3() {
        let mut coverage = Coverage::new();
        NCover3Parser
            .parse(&fixture("valid.nccov"), &mut coverage)
            .unwrap();

        assert_eq!(
            coverage.files().collect::<Vec<_>>(),
            vec!["/projects/MyLibrary/Calc.cs", "/projects/MyLibraryTest/CalcTest.cs"]
        );

        let calc = coverage.hits("/projects/MyLibrary/Calc.cs").unwrap();
        assert_eq!(calc.len(), 5);
        assert_eq!(calc[&12], 1);
        assert_eq!(calc[&13], 0);
        // Two sequence points on line 17 with 1 and 3 visits.
        assert_eq!(calc[&17], 3);
        assert_eq!(calc[&18], 3);
        assert_eq!(calc[&22], 0);

        let test = coverage.hits("/projects/MyLibraryTest/CalcTest.cs").unwrap();
        assert_eq!(test.len(), 2);
        assert_eq!(test[&9], 1);
    }

    #[test]
    fn test_parse_ncover3_skips_placeholders() {
        let mut coverage = Coverage::new();
        NCover3Parser
            .parse(&fixture("valid.nccov"), &mut coverage)
            .unwrap();

        // doc id 0 and line 0 never reach the model.
        assert!(coverage.files().all(|f| !f.ends_with("Placeholder.cs")));
        assert!(coverage
            .hits("/projects/MyLibrary/Calc.cs")
            .unwrap()
            .get(&0)
            .is_none());
    }

    #[test]
    fn test_parse_ncover3_wrong_version() {
        let mut coverage = Coverage::new();
        let err = NCover3Parser
            .parse(&fixture("wrong_version.nccov"), &mut coverage)
            .unwrap_err();
        let msg = err.to_string();
        assert!(
            msg.contains("Expected \"3\" instead of \"2\" for the \"exportversion\" attribute"),
            "{msg}"
        );
        assert!(msg.contains("wrong_version.nccov"), "{msg}");
    }

    #[test]
    fn test_parse_ncover3_wrong_root() {
        let mut coverage = Coverage::new();
        let err = NCover3Parser
            .parse(&fixture("invalid_root.nccov"), &mut coverage)
            .unwrap_err();
        assert!(matches!(err, ReportError::Parse(_)));
        let msg = err.to_string();
        assert!(msg.contains("Missing root element <coverage>"), "{msg}");
        assert!(
            msg.contains(&paths::absolute(&fixture("invalid_root.nccov")).display().to_string()),
            "{msg}"
        );
    }

    #[test]
    fn test_parse_ncover3_non_numeric_visit_count() {
        let mut coverage = Coverage::new();
        let err = NCover3Parser
            .parse(&fixture("invalid_vc.nccov"), &mut coverage)
            .unwrap_err()
            .to_string();
        assert!(
            err.contains("Expected an integer instead of \"many\" for the attribute \"vc\""),
            "{err}"
        );
        assert!(err.contains("at line 6"), "{err}");
    }

    #[test]
    fn test_parse_ncover3_is_idempotent() {
        let mut first = Coverage::new();
        let mut second = Coverage::new();
        NCover3Parser.parse(&fixture("valid.nccov"), &mut first).unwrap();
        NCover3Parser.parse(&fixture("valid.nccov"), &mut second).unwrap();
        assert_eq!(first, second);
    }
}
