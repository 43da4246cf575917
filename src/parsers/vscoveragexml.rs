/// Parser for Visual Studio `.coveragexml` reports (the XML export of a
/// `.coverage` file).
///
/// Structure:
///   <results>
///     <modules>
///       <module name="mylibrary.dll" ...>
///         <functions>
///           <function ...>
///             <ranges>
///               <range source_id="0" covered="yes" start_line="12" ... />
///             </ranges>
///           </function>
///         </functions>
///         <source_files>
///           <source_file id="0" path="C:\src\Calc.cs" />
///         </source_files>
///       </module>
///     </modules>
///   </results>
///
/// Ranges come before the source files they refer to, so lines are buffered
/// per `source_id` until the matching `<source_file>` shows up. Source ids
/// are local to their `<module>`.
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tracing::{debug, info};

use super::xml::XmlCursor;
use super::{line_number, CoverageParser};
use crate::error::Result;
use crate::model::Coverage;
use crate::paths;

pub struct VisualStudioCoverageXmlParser;

#[derive(Default)]
struct ModuleLines {
    covered: HashMap<i64, BTreeSet<u32>>,
    uncovered: HashMap<i64, BTreeSet<u32>>,
}

impl ModuleLines {
    fn clear(&mut self) {
        self.covered.clear();
        self.uncovered.clear();
    }

    fn flush(&self, source_id: i64, file: &str, coverage: &mut Coverage) {
        for &line in self.covered.get(&source_id).into_iter().flatten() {
            coverage.add_hits(file, line, 1);
        }
        for &line in self.uncovered.get(&source_id).into_iter().flatten() {
            coverage.add_hits(file, line, 0);
        }
    }
}

impl CoverageParser for VisualStudioCoverageXmlParser {
    fn parse(&self, path: &Path, coverage: &mut Coverage) -> Result<()> {
        info!(
            "Parsing the Visual Studio coverage XML report {}",
            paths::absolute(path).display()
        );
        let mut cursor = XmlCursor::open(path)?;
        cursor.require_root_tag("results")?;

        let mut lines = ModuleLines::default();

        while let Some(tag) = cursor.next_tag()? {
            match tag.as_str() {
                "module" => lines.clear(),
                "range" => {
                    let source = cursor.require_int_attribute("source_id")?;
                    let covered = cursor.require_attribute("covered")?;
                    let line = cursor.require_int_attribute("start_line")?;

                    let bucket = match covered {
                        "yes" | "partial" => &mut lines.covered,
                        "no" => &mut lines.uncovered,
                        other => {
                            return Err(cursor.parse_error(format!(
                                "Unsupported \"covered\" value \"{other}\", expected one of \"yes\", \"partial\" or \"no\""
                            )))
                        }
                    };
                    if let Some(line) = line_number(line) {
                        bucket.entry(source).or_default().insert(line);
                    }
                }
                "source_file" => {
                    let id = cursor.require_int_attribute("id")?;
                    let raw = cursor.require_attribute("path")?;
                    match paths::canonical(raw) {
                        Ok(file) => lines.flush(id, &file, coverage),
                        Err(e) => debug!(
                            "Skipping the import of Visual Studio XML code coverage for the invalid file path: {} at line {}: {}",
                            raw,
                            cursor.line(),
                            e
                        ),
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

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/vscoveragexml")
            .join(name)
    }

    #[test]
    fn test_parse_vscoveragexml() {
        let mut coverage = Coverage::new();
        VisualStudioCoverageXmlParser
            .parse(&fixture("valid.coveragexml"), &mut coverage)
            .unwrap();

        assert_eq!(
            coverage.files().collect::<Vec<_>>(),
            vec![
                "/projects/CalcMultiplyTest/MultiplyTest.cs",
                "/projects/MyLibrary/Calc.cs"
            ]
        );

        let calc = coverage.hits("/projects/MyLibrary/Calc.cs").unwrap();
        assert_eq!(calc.len(), 16);
        for line in [12, 13, 14, 22, 23, 24, 25, 26, 28, 29, 32, 33, 34] {
            assert_eq!(calc[&line], 0, "line {line}");
        }
        for line in [17, 18, 19] {
            assert_eq!(calc[&line], 1, "line {line}");
        }

        // `partial` counts as covered.
        let test = coverage
            .hits("/projects/CalcMultiplyTest/MultiplyTest.cs")
            .unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(test[&13], 1);
        assert_eq!(test[&14], 1);
        assert_eq!(test[&15], 1);
    }

    #[test]
    fn test_parse_vscoveragexml_source_ids_are_per_module() {
        let mut coverage = Coverage::new();
        VisualStudioCoverageXmlParser
            .parse(&fixture("valid.coveragexml"), &mut coverage)
            .unwrap();
        // Both modules use source id 0; lines of the first module must not
        // leak into the second module's file.
        assert!(coverage
            .hits("/projects/CalcMultiplyTest/MultiplyTest.cs")
            .unwrap()
            .get(&12)
            .is_none());
    }

    #[test]
    fn test_parse_vscoveragexml_invalid_root() {
        let mut coverage = Coverage::new();
        let err = VisualStudioCoverageXmlParser
            .parse(&fixture("invalid_root.coveragexml"), &mut coverage)
            .unwrap_err()
            .to_string();
        assert!(err.contains("<results>"), "{err}");
    }

    #[test]
    fn test_parse_vscoveragexml_wrong_covered() {
        let mut coverage = Coverage::new();
        let err = VisualStudioCoverageXmlParser
            .parse(&fixture("wrong_covered.coveragexml"), &mut coverage)
            .unwrap_err()
            .to_string();
        assert!(
            err.contains("Unsupported \"covered\" value \"foo\", expected one of \"yes\", \"partial\" or \"no\""),
            "{err}"
        );
        assert!(err.contains("wrong_covered.coveragexml"), "{err}");
        assert!(err.contains("at line 8"), "{err}");
    }

    #[test]
    fn test_parse_vscoveragexml_non_existing_file() {
        let mut coverage = Coverage::new();
        let err = VisualStudioCoverageXmlParser
            .parse(&fixture("non_existing_file.coveragexml"), &mut coverage)
            .unwrap_err()
            .to_string();
        assert!(err.contains("non_existing_file.coveragexml"), "{err}");
    }
}
