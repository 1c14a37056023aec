//! The crate-wide error type (§7).
//!
//! Each variant corresponds to one of the error kinds this crate needs to surface; none of them
//! derive from a macro crate, matching how the rest of this codebase hand-writes `Display` and
//! `std::error::Error` for its error types.

use std::fmt;

/// Any failure surfaced by a [`crate::ports::CloudOperations`] implementation.
///
/// Boxed so that this crate never needs to depend on a concrete AWS SDK to describe the error
/// shapes its externally-implemented cloud port might report.
pub type CloudError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One issue found while validating a template (§4.7).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationIssue {
    pub title: String,
    pub detail: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.detail)
    }
}

/// The crate-wide error type.
#[derive(Debug)]
pub enum Error {
    Config(String),
    TemplateSource(String),
    Resolution(String),
    CrossStackLookup(String),
    Cycle(String),
    Cloud(String, CloudError),
    Validation(Vec<ValidationIssue>),
    Cancellation { stack_name: String },
}

impl Error {
    /// Wraps a lower-level error with a stage prefix, preserving it as the `source()`.
    pub(crate) fn cloud(operation: impl Into<String>, source: CloudError) -> Self {
        Self::Cloud(operation.into(), source)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(message) => write!(f, "{message}"),
            Self::TemplateSource(message) => write!(f, "{message}"),
            Self::Resolution(message) => write!(f, "{message}"),
            Self::CrossStackLookup(message) => write!(f, "{message}"),
            Self::Cycle(message) => write!(f, "{message}"),
            Self::Cloud(operation, source) => write!(f, "{operation}: {source}"),
            Self::Validation(issues) => {
                writeln!(f, "template validation failed with {} issue(s):", issues.len())?;
                for (index, issue) in issues.iter().enumerate() {
                    write!(f, "\n{}. {issue}", index + 1)?;
                }
                Ok(())
            }
            Self::Cancellation { stack_name } => {
                write!(f, "deployment of stack '{stack_name}' was cancelled")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cloud(_, source) => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// This crate's `Result` alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Wraps an arbitrary displayable error with a stage prefix, producing `Error::Config`.
pub(crate) fn config(stage: &str, source: impl fmt::Display) -> Error {
    Error::Config(format!("{stage}: {source}"))
}

/// Wraps an arbitrary displayable error with a stage prefix, producing `Error::TemplateSource`.
pub(crate) fn template_source(stage: &str, source: impl fmt::Display) -> Error {
    Error::TemplateSource(format!("{stage}: {source}"))
}

/// Wraps an arbitrary displayable error with a stage prefix, producing `Error::Resolution`.
pub(crate) fn resolution(stage: &str, source: impl fmt::Display) -> Error {
    Error::Resolution(format!("{stage}: {source}"))
}
