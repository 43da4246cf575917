//! Which report properties to read, and where their values come from.
//!
//! The host owns the settings store; this crate only needs to turn a
//! property key into the comma-separated list of path patterns the user
//! configured for it. `FileSettings` is a standalone store backed by a TOML
//! file for use outside a host:
//!
//! ```toml
//! base_dir = "build"
//! policy = "best-effort"
//!
//! [properties]
//! "sonar.cs.opencover.reportsPaths" = "coverage/*.xml"
//! "sonar.cs.vstest.reportsPaths" = ["TestResults/**/*.trx", "legacy.trx"]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::parsers::{CoverageFormat, TestResultsFormat};

const DEFAULT_LANGUAGE: &str = "cs";

/// What to do when one report of an aggregation run cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the run on the first report error.
    #[default]
    FailFast,
    /// Log the failed report, leave the accumulator untouched for it and
    /// carry on with the rest.
    BestEffort,
}

/// Property keys naming the coverage reports of one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfiguration {
    pub language_key: String,
    pub ncover3_property_key: String,
    pub opencover_property_key: String,
    pub dotcover_property_key: String,
    /// Read the dotCover property as aggregated index pages rather than as
    /// individual source pages.
    pub dotcover_aggregated: bool,
    pub vscoveragexml_property_key: String,
}

impl CoverageConfiguration {
    pub fn for_language(language_key: &str) -> Self {
        Self {
            language_key: language_key.to_string(),
            ncover3_property_key: property_key(language_key, "ncover3"),
            opencover_property_key: property_key(language_key, "opencover"),
            dotcover_property_key: property_key(language_key, "dotcover"),
            dotcover_aggregated: true,
            vscoveragexml_property_key: property_key(language_key, "vscoveragexml"),
        }
    }

    /// Every configured format with the property key that lists its reports.
    pub fn property_keys(&self) -> Vec<(CoverageFormat, &str)> {
        let dotcover = if self.dotcover_aggregated {
            CoverageFormat::DotCoverAggregated
        } else {
            CoverageFormat::DotCover
        };
        vec![
            (CoverageFormat::NCover3, self.ncover3_property_key.as_str()),
            (CoverageFormat::OpenCover, self.opencover_property_key.as_str()),
            (dotcover, self.dotcover_property_key.as_str()),
            (
                CoverageFormat::VisualStudioCoverageXml,
                self.vscoveragexml_property_key.as_str(),
            ),
        ]
    }
}

impl Default for CoverageConfiguration {
    fn default() -> Self {
        Self::for_language(DEFAULT_LANGUAGE)
    }
}

/// Property keys naming the unit test result reports of one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitTestConfiguration {
    pub nunit_property_key: String,
    /// Sum `<test-suite>` durations on top of the root summary.
    pub nunit_suite_timing: bool,
    pub visual_studio_property_key: String,
    /// Bucket TRX counters by outcome and read the run duration.
    pub visual_studio_times: bool,
    pub xunit_property_key: String,
}

impl UnitTestConfiguration {
    pub fn for_language(language_key: &str) -> Self {
        Self {
            nunit_property_key: property_key(language_key, "nunit"),
            nunit_suite_timing: true,
            visual_studio_property_key: property_key(language_key, "vstest"),
            visual_studio_times: true,
            xunit_property_key: property_key(language_key, "xunit"),
        }
    }

    pub fn property_keys(&self) -> Vec<(TestResultsFormat, &str)> {
        let nunit = if self.nunit_suite_timing {
            TestResultsFormat::NUnit
        } else {
            TestResultsFormat::NUnitSummary
        };
        let visual_studio = if self.visual_studio_times {
            TestResultsFormat::VisualStudio
        } else {
            TestResultsFormat::VisualStudioCounters
        };
        vec![
            (nunit, self.nunit_property_key.as_str()),
            (visual_studio, self.visual_studio_property_key.as_str()),
            (TestResultsFormat::XUnit, self.xunit_property_key.as_str()),
        ]
    }
}

impl Default for UnitTestConfiguration {
    fn default() -> Self {
        Self::for_language(DEFAULT_LANGUAGE)
    }
}

fn property_key(language_key: &str, report: &str) -> String {
    format!("sonar.{language_key}.{report}.reportsPaths")
}

/// Split a comma-separated pattern list, trimming entries and dropping
/// empty ones.
pub fn split_patterns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read access to the host's settings store.
pub trait Settings {
    /// Raw value of `key`, if the key is set at all.
    fn get_string(&self, key: &str) -> Option<&str>;

    fn has_key(&self, key: &str) -> bool {
        self.get_string(key).is_some()
    }

    /// Patterns listed under `key`; empty when the key is not set.
    fn patterns(&self, key: &str) -> Vec<String> {
        self.get_string(key).map(split_patterns).unwrap_or_default()
    }
}

impl<S: BuildHasher> Settings for HashMap<String, String, S> {
    fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl Settings for BTreeMap<String, String> {
    fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PropertyValue {
    One(String),
    Many(Vec<String>),
}

impl PropertyValue {
    fn into_joined(self) -> String {
        match self {
            PropertyValue::One(value) => value,
            PropertyValue::Many(values) => values.join(","),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFileSettings {
    base_dir: Option<PathBuf>,
    language: Option<String>,
    policy: FailurePolicy,
    properties: BTreeMap<String, PropertyValue>,
}

/// Settings store read from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSettings {
    /// Directory relative patterns are resolved against, itself relative to
    /// the directory holding the settings file.
    pub base_dir: Option<PathBuf>,
    pub language: Option<String>,
    pub policy: FailurePolicy,
    pub properties: BTreeMap<String, String>,
}

impl FileSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
        let mut settings = Self::parse(&content).map_err(|e| match e {
            ReportError::Config(msg) => {
                ReportError::Config(format!("{} in {}", msg, path.display()))
            }
            other => other,
        })?;

        if let Some(base_dir) = settings.base_dir.take() {
            let parent = path.parent().unwrap_or_else(|| Path::new(""));
            settings.base_dir = Some(parent.join(base_dir));
        }
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawFileSettings =
            toml::from_str(content).map_err(|e| ReportError::Config(e.message().to_string()))?;

        Ok(Self {
            base_dir: raw.base_dir,
            language: raw.language,
            policy: raw.policy,
            properties: raw
                .properties
                .into_iter()
                .map(|(key, value)| (key, value.into_joined()))
                .collect(),
        })
    }

    pub fn language_key(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }
}

impl Settings for FileSettings {
    fn get_string(&self, key: &str) -> Option<&str> {
        self.properties.get_string(key)
    }
}
