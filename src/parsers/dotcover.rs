/// Parsers for dotCover HTML coverage reports.
///
/// dotCover does not emit XML line data. Its HTML report has one page per
/// source file: the page `<title>` is the source path and an inline script
/// highlights the instrumented ranges:
///
///   <title>C:\src\mylibrary\calc.cs</title>
///   ...
///   <script type="text/javascript">
///     highlightRanges([[12,5,12,6,0],[17,5,17,6,1]]);
///   </script>
///
/// Each range is `[start_line, start_col, end_line, end_col, hits]`.
///
/// The aggregated report is an index page `<name>.html` next to a
/// `<name>/src` folder holding the per-file pages.
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use super::CoverageParser;
use crate::error::{ParseError, ReportError, Result};
use crate::model::Coverage;
use crate::paths;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title>(.*?)</title>").unwrap());

static HIGHLIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<script type="text/javascript">\s*highlightRanges\(\[(.*?)\]\);\s*</script>"#,
    )
    .unwrap()
});

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+),\d+,\d+,\d+,(\d+)\]").unwrap());

const HTML_PROLOGUE: &str = "<!DOCTYPE html>";
const NO_SOURCE_PAGE: &str = "nosource.html";

/// Invalid UTF-8 sequences are replaced rather than rejected.
fn read_report(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| ReportError::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn report_error(path: &Path, message: impl Into<String>) -> ReportError {
    ReportError::Parse(ParseError::new(message, path, None))
}

fn line_of(contents: &str, offset: usize) -> u64 {
    contents[..offset].bytes().filter(|&b| b == b'\n').count() as u64 + 1
}

/// Parser for a single dotCover HTML source page.
pub struct DotCoverParser;

impl CoverageParser for DotCoverParser {
    fn parse(&self, path: &Path, coverage: &mut Coverage) -> Result<()> {
        info!("Parsing the dotCover report {}", paths::absolute(path).display());
        let contents = read_report(path)?;

        let title = TITLE_RE
            .captures(&contents)
            .and_then(|c| c.get(1))
            .ok_or_else(|| {
                report_error(
                    path,
                    format!(
                        "The report contents does not match the following regular expression: {}",
                        TITLE_RE.as_str()
                    ),
                )
            })?
            .as_str()
            .trim();

        let file = match paths::canonical(title) {
            Ok(p) => p,
            Err(e) => {
                debug!(
                    "Skipping the import of dotCover code coverage for the invalid file path: {}: {}",
                    title, e
                );
                return Ok(());
            }
        };

        let ranges = HIGHLIGHT_RE
            .captures_iter(&contents)
            .last()
            .and_then(|c| c.get(1))
            .ok_or_else(|| {
                report_error(
                    path,
                    format!(
                        "The report contents does not match the following regular expression: {}",
                        HIGHLIGHT_RE.as_str()
                    ),
                )
            })?;

        for range in RANGE_RE.captures_iter(ranges.as_str()) {
            let line = range[1].parse::<u32>();
            let hits = range[2].parse::<u64>();
            match (line, hits) {
                (Ok(line), Ok(hits)) => coverage.add_hits(&file, line, hits),
                _ => {
                    let offset = ranges.start() + range.get(0).map_or(0, |m| m.start());
                    return Err(ReportError::Parse(ParseError::new(
                        format!("Invalid highlighted range \"{}\"", &range[0]),
                        path,
                        Some(line_of(&contents, offset)),
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Parser for an aggregated dotCover HTML report: every page under the
/// report's `src` folder is parsed with `DotCoverParser`.
pub struct DotCoverAggregatedParser;

impl DotCoverAggregatedParser {
    /// The folder holding the per-file pages of the report at `path`.
    fn sources_folder(path: &Path) -> Result<PathBuf> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let stem = match name.rfind('.') {
            Some(dot) => &name[..dot],
            None => {
                return Err(report_error(
                    path,
                    format!("The following dotCover report name should have an extension: {name}"),
                ))
            }
        };
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(parent.join(stem).join("src"))
    }
}

impl CoverageParser for DotCoverAggregatedParser {
    fn parse(&self, path: &Path, coverage: &mut Coverage) -> Result<()> {
        info!(
            "Aggregating the HTML reports from {}",
            paths::absolute(path).display()
        );
        let contents = read_report(path)?;
        if !contents.starts_with(HTML_PROLOGUE) {
            return Err(report_error(
                path,
                format!("Only dotCover HTML reports which start with \"{HTML_PROLOGUE}\" are supported"),
            ));
        }

        let folder = Self::sources_folder(path)?;
        if !folder.is_dir() {
            return Err(report_error(
                path,
                format!(
                    "The dotCover report HTML sources folder cannot be found: {}",
                    paths::absolute(&folder).display()
                ),
            ));
        }

        let mut pages = Vec::new();
        for entry in std::fs::read_dir(&folder).map_err(|e| ReportError::io(&folder, e))? {
            let page = entry.map_err(|e| ReportError::io(&folder, e))?.path();
            let is_html = page.extension().is_some_and(|ext| ext == "html");
            let excluded = page.file_name().is_some_and(|n| n == NO_SOURCE_PAGE);
            if is_html && !excluded && page.is_file() {
                pages.push(page);
            }
        }
        pages.sort();

        for page in &pages {
            DotCoverParser.parse(page, coverage)?;
        }

        Ok(())
    }
}
