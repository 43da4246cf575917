//! Command handler functions for the dotnet-reports CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use crate::aggregate::{AggregationReport, CoverageAggregator, UnitTestResultsAggregator};
use crate::model::{rate, Coverage, FileSummary, LineHits, UnitTestResults};
use crate::wildcard::WildcardResolver;

/// Largest run of untracked lines bridged when listing uncovered ranges.
const MAX_BRIDGE_GAP: u32 = 2;

/// Output style for the `coverage` and `tests` commands.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Style {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
struct Failure {
    path: String,
    error: String,
}

fn failures(report: &AggregationReport) -> Vec<Failure> {
    report
        .failures
        .iter()
        .map(|(path, error)| Failure {
            path: path.display().to_string(),
            error: error.to_string(),
        })
        .collect()
}

fn write_failures(out: &mut String, report: &AggregationReport) -> Result<()> {
    if report.is_clean() {
        return Ok(());
    }
    writeln!(out, "Skipped {} report(s):", report.failures.len())?;
    for (path, error) in &report.failures {
        writeln!(out, "  {}: {}", path.display(), error)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct FileOutput<'a> {
    #[serde(flatten)]
    summary: FileSummary,
    line_rate: f64,
    hits: &'a LineHits,
}

#[derive(Serialize)]
struct CoverageOutput<'a> {
    reports: usize,
    lines_to_cover: u64,
    covered_lines: u64,
    line_rate: f64,
    files: Vec<FileOutput<'a>>,
    failures: Vec<Failure>,
}

pub fn cmd_coverage(
    aggregator: &CoverageAggregator,
    resolver: &WildcardResolver,
    style: Style,
    show_uncovered: bool,
) -> Result<String> {
    let mut coverage = Coverage::new();
    let report = aggregator.aggregate(resolver, &mut coverage)?;
    let summaries = coverage.summaries();
    let lines_to_cover: u64 = summaries.iter().map(|s| s.lines_to_cover).sum();
    let covered_lines: u64 = summaries.iter().map(|s| s.covered_lines).sum();

    if let Style::Json = style {
        let files = summaries
            .into_iter()
            .filter_map(|summary| {
                let hits = coverage.hits(&summary.path)?;
                Some(FileOutput {
                    line_rate: summary.line_rate(),
                    summary,
                    hits,
                })
            })
            .collect();
        let output = CoverageOutput {
            reports: report.parsed.len(),
            lines_to_cover,
            covered_lines,
            line_rate: rate(covered_lines, lines_to_cover),
            files,
            failures: failures(&report),
        };
        return Ok(serde_json::to_string_pretty(&output)? + "\n");
    }

    let mut out = String::new();
    if coverage.is_empty() {
        writeln!(out, "No coverage data found.")?;
    } else {
        writeln!(
            out,
            "{:<60} {:>8} {:>8} {:>8}",
            "FILE", "LINES", "COVERED", "RATE"
        )?;
        writeln!(out, "{}", "-".repeat(88))?;
        for summary in &summaries {
            writeln!(
                out,
                "{:<60} {:>8} {:>8} {:>7.1}%",
                summary.path,
                summary.lines_to_cover,
                summary.covered_lines,
                summary.line_rate() * 100.0
            )?;
            if show_uncovered && summary.uncovered_lines() > 0 {
                if let Some(hits) = coverage.hits(&summary.path) {
                    writeln!(out, "  uncovered: {}", format_uncovered(hits))?;
                }
            }
        }
        writeln!(out, "{}", "-".repeat(88))?;
        writeln!(
            out,
            "Reports:    {}",
            report.parsed.len()
        )?;
        writeln!(out, "Files:      {}", summaries.len())?;
        writeln!(
            out,
            "Lines:      {}/{} ({:.1}%)",
            covered_lines,
            lines_to_cover,
            rate(covered_lines, lines_to_cover) * 100.0
        )?;
    }
    write_failures(&mut out, &report)?;
    Ok(out)
}

#[derive(Serialize)]
struct TestsOutput {
    reports: usize,
    #[serde(flatten)]
    results: UnitTestResults,
    passed_percentage: Option<f64>,
    failures: Vec<Failure>,
}

pub fn cmd_tests(
    aggregator: &UnitTestResultsAggregator,
    resolver: &WildcardResolver,
    style: Style,
) -> Result<String> {
    let mut results = UnitTestResults::new();
    let report = aggregator.aggregate(resolver, &mut results)?;

    if let Style::Json = style {
        let output = TestsOutput {
            reports: report.parsed.len(),
            results,
            passed_percentage: results.passed_percentage(),
            failures: failures(&report),
        };
        return Ok(serde_json::to_string_pretty(&output)? + "\n");
    }

    let mut out = String::new();
    writeln!(out, "Reports:    {}", report.parsed.len())?;
    writeln!(out, "Tests:      {}", results.tests)?;
    writeln!(out, "Passed:     {}", results.passed)?;
    writeln!(out, "Skipped:    {}", results.skipped)?;
    writeln!(out, "Failures:   {}", results.failed)?;
    writeln!(out, "Errors:     {}", results.errors)?;
    writeln!(out, "Duration:   {} ms", results.execution_time_ms)?;
    if let Some(percentage) = results.passed_percentage() {
        writeln!(out, "Success:    {:.1}%", percentage)?;
    }
    write_failures(&mut out, &report)?;
    Ok(out)
}

pub fn cmd_resolve(resolver: &WildcardResolver, pattern: &str) -> Result<String> {
    let matches = resolver.resolve(pattern)?;
    if matches.is_empty() {
        return Ok(format!("No file matches '{}'\n", pattern));
    }

    let mut out = String::new();
    for path in &matches {
        writeln!(out, "{}", path.display())?;
    }
    Ok(out)
}

/// Uncovered lines of one file in compact range notation, e.g. "1, 3-5, 8".
///
/// Two uncovered lines are joined into one range when every line between
/// them is absent from the report and the gap is at most `MAX_BRIDGE_GAP`.
fn format_uncovered(hits: &LineHits) -> String {
    let mut ranges: Vec<(u32, u32)> = Vec::new();
    for (&line, &count) in hits {
        if count > 0 {
            continue;
        }
        match ranges.last_mut() {
            Some((_, end))
                if line - *end - 1 <= MAX_BRIDGE_GAP
                    && hits.range(*end + 1..line).next().is_none() =>
            {
                *end = line;
            }
            _ => ranges.push((line, line)),
        }
    }

    ranges
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
