//! Error type shared by every pipeline stage.
//!
//! All failures are funnelled into a single [`PipelineError`] carrying an
//! [`ErrorKind`] tag, a human-readable context and the original cause.

use std::error::Error as StdError;
use std::fmt;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// Category of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Remote object could not be fetched (network, auth, missing object).
    Fetch,
    /// Tabular input is unreadable or malformed.
    Parse,
    /// A configured column is missing or has the wrong type.
    Column,
    /// Target distribution is degenerate (fewer than two classes).
    ClassImbalance,
    /// Model fitting or hyper-parameter search failed.
    Fit,
    /// Filesystem or serialization failure.
    Io,
    /// Configuration document is missing or invalid.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Fetch => "fetch",
            ErrorKind::Parse => "parse",
            ErrorKind::Column => "column",
            ErrorKind::ClassImbalance => "class-imbalance",
            ErrorKind::Fit => "fit",
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Uniform error returned by every stage method.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {context}")]
pub struct PipelineError {
    kind: ErrorKind,
    context: String,
    #[source]
    source: Option<BoxedCause>,
}

impl PipelineError {
    /// Error without an underlying cause.
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Self {
            kind,
            context: context.into(),
            source: None,
        }
    }

    /// Error wrapping an underlying cause.
    pub fn with_source<E>(kind: ErrorKind, context: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxedCause>,
    {
        Self {
            kind,
            context: context.into(),
            source: Some(source.into()),
        }
    }

    /// Re-wrap this error under a higher-level context, keeping its kind.
    pub fn wrap(self, context: impl Into<String>) -> Self {
        let kind = self.kind;
        Self::with_source(kind, context, self)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Render the full cause chain on one line, outermost first.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut cause = StdError::source(self);
        while let Some(err) = cause {
            out.push_str(": ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }

    pub fn fetch(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fetch, context)
    }

    pub fn parse(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, context)
    }

    pub fn column(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::Column, context)
    }

    pub fn class_imbalance(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::ClassImbalance, context)
    }

    pub fn fit(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fit, context)
    }

    pub fn config(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, context)
    }
}

/// Log-and-wrap adapter used at stage method boundaries.
pub trait ResultExt<T> {
    /// On failure, log the full cause chain at `error` level and wrap the
    /// error under `context`, keeping its kind.
    fn log_context(self, context: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn log_context(self, context: &str) -> Result<T> {
        self.map_err(|err| {
            tracing::error!(error = %err.chain(), "{context}");
            err.wrap(context)
        })
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::with_source(ErrorKind::Io, "I/O operation failed", err)
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        let kind = if err.is_io_error() {
            ErrorKind::Io
        } else {
            ErrorKind::Parse
        };
        PipelineError::with_source(kind, "CSV processing failed", err)
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::with_source(ErrorKind::Io, "binary serialization failed", err)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::with_source(ErrorKind::Io, "JSON serialization failed", err)
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::with_source(ErrorKind::Config, "invalid configuration document", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_contains_kind_and_context() {
        let err = PipelineError::column("column 'x' not found");
        assert_eq!(err.to_string(), "column error: column 'x' not found");
        assert_eq!(err.kind(), ErrorKind::Column);
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(ErrorKind::ClassImbalance.to_string(), "class-imbalance");
        assert_eq!(ErrorKind::Fetch.to_string(), "fetch");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: PipelineError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn test_wrap_keeps_kind_and_cause() {
        let inner = PipelineError::fit("degenerate input");
        let outer = inner.wrap("model training failed");
        assert_eq!(outer.kind(), ErrorKind::Fit);
        assert_eq!(outer.context(), "model training failed");
        let chain = outer.chain();
        assert!(chain.contains("model training failed"));
        assert!(chain.contains("degenerate input"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<PipelineError>();
    }

    #[test]
    fn test_error_from_bincode_error() {
        let bad_bytes: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        let bincode_result: std::result::Result<String, bincode::Error> =
            bincode::deserialize(bad_bytes);
        if let Err(e) = bincode_result {
            let err: PipelineError = e.into();
            assert_eq!(err.kind(), ErrorKind::Io);
        }
    }

    #[test]
    fn test_log_context_wraps_failure() {
        let result: Result<()> = Err(PipelineError::column("column 'x' not found"));
        let err = result.log_context("clean_and_encode failed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Column);
        assert_eq!(err.context(), "clean_and_encode failed");

        let ok: Result<u8> = Ok(3);
        assert_eq!(ok.log_context("unused").unwrap(), 3);
    }
}
