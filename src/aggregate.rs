//! Drive the parsers over every configured report.
//!
//! Each source is a format together with the patterns the user listed for
//! it. All patterns of a run are resolved before the first report is read,
//! so a malformed pattern aborts the run without touching the accumulator.
//! Every report is parsed into a scratch accumulator and merged only once it
//! parsed cleanly; under `FailurePolicy::BestEffort` a bad report therefore
//! leaves no trace besides its entry in `AggregationReport::failures`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{CoverageConfiguration, FailurePolicy, Settings, UnitTestConfiguration};
use crate::error::{ReportError, Result};
use crate::model::{Coverage, UnitTestResults};
use crate::parsers::{CoverageFormat, CoverageParser, TestResultsFormat, UnitTestResultsParser};
use crate::wildcard::WildcardResolver;

/// Outcome of one aggregation run.
#[derive(Debug, Default)]
pub struct AggregationReport {
    /// Reports merged into the accumulator, in processing order.
    pub parsed: Vec<PathBuf>,
    /// Reports skipped under the best-effort policy.
    pub failures: Vec<(PathBuf, ReportError)>,
}

impl AggregationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Source<P: ?Sized> {
    name: String,
    patterns: Vec<String>,
    parser: Box<P>,
}

fn resolve_all(
    resolver: &WildcardResolver,
    name: &str,
    patterns: &[String],
) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();
    for pattern in patterns {
        let matched = resolver.resolve(pattern)?;
        if matched.is_empty() {
            info!("No {} report matches the pattern \"{}\"", name, pattern);
        }
        files.extend(matched);
    }

    Ok(files
        .into_iter()
        .filter(|path| {
            let is_file = path.is_file();
            if !is_file {
                debug!("Skipping {} which is not a file", path.display());
            }
            is_file
        })
        .collect())
}

/// The parse capability of one report family, seen from the aggregator.
trait ReportParser<M> {
    fn parse_into(&self, path: &Path, acc: &mut M) -> Result<()>;
}

impl ReportParser<Coverage> for dyn CoverageParser {
    fn parse_into(&self, path: &Path, acc: &mut Coverage) -> Result<()> {
        self.parse(path, acc)
    }
}

impl ReportParser<UnitTestResults> for dyn UnitTestResultsParser {
    fn parse_into(&self, path: &Path, acc: &mut UnitTestResults) -> Result<()> {
        self.parse(path, acc)
    }
}

trait Accumulator: Default {
    fn absorb(&mut self, other: &Self);
}

impl Accumulator for Coverage {
    fn absorb(&mut self, other: &Self) {
        self.merge(other);
    }
}

impl Accumulator for UnitTestResults {
    fn absorb(&mut self, other: &Self) {
        self.merge(other);
    }
}

/// Resolve and parse every source, folding each report through a scratch
/// accumulator.
fn aggregate_sources<P, M>(
    sources: &[Source<P>],
    resolver: &WildcardResolver,
    policy: FailurePolicy,
    acc: &mut M,
) -> Result<AggregationReport>
where
    P: ReportParser<M> + ?Sized,
    M: Accumulator,
{
    let mut planned = Vec::with_capacity(sources.len());
    for source in sources {
        planned.push((source, resolve_all(resolver, &source.name, &source.patterns)?));
    }

    let mut report = AggregationReport::default();
    for (source, files) in planned {
        for file in files {
            let mut scratch = M::default();
            match source.parser.parse_into(&file, &mut scratch) {
                Ok(()) => {
                    acc.absorb(&scratch);
                    report.parsed.push(file);
                }
                Err(e) => match policy {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::BestEffort => {
                        warn!("Skipping the {} report {}: {}", source.name, file.display(), e);
                        report.failures.push((file, e));
                    }
                },
            }
        }
    }
    Ok(report)
}

/// Folds every configured coverage report into one `Coverage`.
pub struct CoverageAggregator {
    sources: Vec<Source<dyn CoverageParser>>,
    policy: FailurePolicy,
}

impl CoverageAggregator {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            sources: Vec::new(),
            policy,
        }
    }

    /// One source per coverage property set in `settings`.
    pub fn from_settings(
        conf: &CoverageConfiguration,
        settings: &(impl Settings + ?Sized),
        policy: FailurePolicy,
    ) -> Self {
        let mut aggregator = Self::new(policy);
        for (format, key) in conf.property_keys() {
            if settings.has_key(key) {
                aggregator.add_format(format, settings.patterns(key));
            }
        }
        aggregator
    }

    pub fn add_format(&mut self, format: CoverageFormat, patterns: Vec<String>) {
        self.add_source(format.as_str(), patterns, format.parser());
    }

    pub fn add_source(
        &mut self,
        name: &str,
        patterns: Vec<String>,
        parser: Box<dyn CoverageParser>,
    ) {
        self.sources.push(Source {
            name: name.to_string(),
            patterns,
            parser,
        });
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Whether any coverage report property is configured at all.
    pub fn has_report_paths(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn aggregate(
        &self,
        resolver: &WildcardResolver,
        coverage: &mut Coverage,
    ) -> Result<AggregationReport> {
        aggregate_sources(&self.sources, resolver, self.policy, coverage)
    }
}

/// Sums every configured test results report into one `UnitTestResults`.
pub struct UnitTestResultsAggregator {
    sources: Vec<Source<dyn UnitTestResultsParser>>,
    policy: FailurePolicy,
}

impl UnitTestResultsAggregator {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            sources: Vec::new(),
            policy,
        }
    }

    pub fn from_settings(
        conf: &UnitTestConfiguration,
        settings: &(impl Settings + ?Sized),
        policy: FailurePolicy,
    ) -> Self {
        let mut aggregator = Self::new(policy);
        for (format, key) in conf.property_keys() {
            if settings.has_key(key) {
                aggregator.add_format(format, settings.patterns(key));
            }
        }
        aggregator
    }

    pub fn add_format(&mut self, format: TestResultsFormat, patterns: Vec<String>) {
        self.add_source(format.as_str(), patterns, format.parser());
    }

    pub fn add_source(
        &mut self,
        name: &str,
        patterns: Vec<String>,
        parser: Box<dyn UnitTestResultsParser>,
    ) {
        self.sources.push(Source {
            name: name.to_string(),
            patterns,
            parser,
        });
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn has_report_paths(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn aggregate(
        &self,
        resolver: &WildcardResolver,
        results: &mut UnitTestResults,
    ) -> Result<AggregationReport> {
        aggregate_sources(&self.sources, resolver, self.policy, results)
    }
}
