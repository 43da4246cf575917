use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A report that could not be understood.
///
/// Carries the absolute path of the offending report and, when the reader
/// could tell, the 1-based line the failure was detected on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub path: PathBuf,
    pub line: Option<u64>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, path: &Path, line: Option<u64>) -> Self {
        Self {
            message: message.into(),
            path: crate::paths::absolute(path),
            line,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.message, self.path.display())?;
        if let Some(line) = self.line {
            write!(f, " at line {line}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Unknown report format: '{0}'")]
    UnknownFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReportError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        ReportError::Io {
            path: crate::paths::absolute(path),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
