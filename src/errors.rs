//! Error types for the spectest passes.
//!
//! Every variant is local to one record: the driver reports it against the
//! offending test or assertion and carries on with the rest of the run.

use thiserror::Error;

/// Errors that can occur while compiling a suite.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// A prose pattern could not be turned into a single-capture regex.
    #[error("malformed pattern for spec assertion {id}: {message}")]
    MalformedPattern { id: String, message: String },

    /// A `@nonfinite` directive had nothing to expand.
    #[error("nonfinite expansion of `{callable}` needs at least one argument with a valid value")]
    Arity { callable: String },

    /// A directive marker survived translation.
    #[error("untranslated directive `{fragment}`")]
    UntranslatedDirective { fragment: String },

    /// The prose document could not be read.
    #[error("markup error at byte {position}: {message}")]
    Markup { position: u64, message: String },

    /// A configuration file could not be read or parsed.
    #[error("failed to load config: {path}: {message}")]
    Config { path: String, message: String },
}

impl SpecError {
    pub fn malformed_pattern(id: impl Into<String>, message: impl Into<String>) -> Self {
        SpecError::MalformedPattern {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Result type for spectest operations.
pub type SpecResult<T> = Result<T, SpecError>;
