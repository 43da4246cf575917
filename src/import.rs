//! Hand the aggregated results over to the host.
//!
//! The host knows which files belong to the analysed project and stores the
//! measures; both sides are traits so any project model or metric store can
//! sit behind them.

use std::path::PathBuf;

use tracing::debug;

use crate::aggregate::{AggregationReport, CoverageAggregator, UnitTestResultsAggregator};
use crate::config::CoverageConfiguration;
use crate::error::Result;
use crate::model::{Coverage, FileSummary, LineHits, UnitTestResults};
use crate::wildcard::WildcardResolver;

/// A source file tracked by the host project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub language: Option<String>,
}

/// The host's view of the project's source files.
pub trait SourceFiles {
    /// The project file at `absolute_path`, if the project tracks one.
    fn input_file(&self, absolute_path: &str) -> Option<InputFile>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    LinesToCover,
    UncoveredLines,
    Tests,
    TestErrors,
    TestFailures,
    SkippedTests,
    TestExecutionTime,
    TestSuccessDensity,
}

impl Metric {
    pub fn key(&self) -> &'static str {
        match self {
            Metric::LinesToCover => "lines_to_cover",
            Metric::UncoveredLines => "uncovered_lines",
            Metric::Tests => "tests",
            Metric::TestErrors => "test_errors",
            Metric::TestFailures => "test_failures",
            Metric::SkippedTests => "skipped_tests",
            Metric::TestExecutionTime => "test_execution_time",
            Metric::TestSuccessDensity => "test_success_density",
        }
    }
}

/// Receives the measures computed from the reports.
pub trait MetricSink {
    /// Per-line hit counts of one file.
    fn save_line_hits(&mut self, file: &InputFile, hits: &LineHits);

    fn save_file_measure(&mut self, file: &InputFile, metric: Metric, value: f64);

    fn save_project_measure(&mut self, metric: Metric, value: f64);
}

/// Imports coverage of the configured language into the host.
pub struct CoverageImport {
    conf: CoverageConfiguration,
    aggregator: CoverageAggregator,
}

impl CoverageImport {
    pub fn new(conf: CoverageConfiguration, aggregator: CoverageAggregator) -> Self {
        Self { conf, aggregator }
    }

    pub fn should_execute(&self) -> bool {
        self.aggregator.has_report_paths()
    }

    pub fn analyze(
        &self,
        resolver: &WildcardResolver,
        files: &dyn SourceFiles,
        sink: &mut dyn MetricSink,
    ) -> Result<AggregationReport> {
        let mut coverage = Coverage::new();
        let report = self.aggregator.aggregate(resolver, &mut coverage)?;
        self.save(&coverage, files, sink);
        Ok(report)
    }

    fn save(&self, coverage: &Coverage, files: &dyn SourceFiles, sink: &mut dyn MetricSink) {
        for path in coverage.files() {
            let Some(input_file) = files.input_file(path) else {
                debug!(
                    "Code coverage will not be imported for the following file outside of the project: {}",
                    path
                );
                continue;
            };
            if input_file.language.as_deref() != Some(self.conf.language_key.as_str()) {
                debug!(
                    "Code coverage will not be imported for the following file, which is not a {} file: {}",
                    self.conf.language_key, path
                );
                continue;
            }
            let Some(hits) = coverage.hits(path) else {
                continue;
            };

            let summary = FileSummary::from_hits(path, hits);
            sink.save_line_hits(&input_file, hits);
            sink.save_file_measure(
                &input_file,
                Metric::LinesToCover,
                summary.lines_to_cover as f64,
            );
            sink.save_file_measure(
                &input_file,
                Metric::UncoveredLines,
                summary.uncovered_lines() as f64,
            );
        }
    }
}

/// Imports the project-wide unit test counters into the host.
pub struct UnitTestResultsImport {
    aggregator: UnitTestResultsAggregator,
}

impl UnitTestResultsImport {
    pub fn new(aggregator: UnitTestResultsAggregator) -> Self {
        Self { aggregator }
    }

    pub fn should_execute(&self) -> bool {
        self.aggregator.has_report_paths()
    }

    pub fn analyze(
        &self,
        resolver: &WildcardResolver,
        sink: &mut dyn MetricSink,
    ) -> Result<AggregationReport> {
        let mut results = UnitTestResults::new();
        let report = self.aggregator.aggregate(resolver, &mut results)?;

        sink.save_project_measure(Metric::Tests, results.tests as f64);
        sink.save_project_measure(Metric::TestErrors, results.errors as f64);
        sink.save_project_measure(Metric::TestFailures, results.failed as f64);
        sink.save_project_measure(Metric::SkippedTests, results.skipped as f64);
        sink.save_project_measure(
            Metric::TestExecutionTime,
            results.execution_time_ms as f64,
        );
        if let Some(density) = results.passed_percentage() {
            sink.save_project_measure(Metric::TestSuccessDensity, density);
        }
        Ok(report)
    }
}
