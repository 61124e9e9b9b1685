use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `CommunityError` and maps other errors to
/// convert to a `CommunityError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum CommunityError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    /// The supplied `Parameters` (or a mid-run adjustment) failed validation.
    ConfigError(String),
    /// A declared capability that has no defined algorithm yet.
    NotSupported(String),
    ReportError(String),
}

impl From<io::Error> for CommunityError {
    fn from(error: io::Error) -> Self {
        CommunityError::IoError(error)
    }
}

impl From<serde_json::Error> for CommunityError {
    fn from(error: serde_json::Error) -> Self {
        CommunityError::JsonError(error)
    }
}

impl From<csv::Error> for CommunityError {
    fn from(error: csv::Error) -> Self {
        CommunityError::CsvError(error)
    }
}

impl std::error::Error for CommunityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommunityError::IoError(error) => Some(error),
            CommunityError::JsonError(error) => Some(error),
            CommunityError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for CommunityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommunityError::IoError(error) => write!(f, "I/O error: {error}"),
            CommunityError::JsonError(error) => write!(f, "JSON error: {error}"),
            CommunityError::CsvError(error) => write!(f, "CSV error: {error}"),
            CommunityError::ConfigError(msg) => write!(f, "Invalid configuration: {msg}"),
            CommunityError::NotSupported(msg) => write!(f, "Not supported: {msg}"),
            CommunityError::ReportError(msg) => write!(f, "Report error: {msg}"),
        }
    }
}
