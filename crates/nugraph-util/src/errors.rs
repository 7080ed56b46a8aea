use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all nugraph operations.
#[derive(Debug, Error, Diagnostic)]
pub enum NuGraphError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed version, version range or floating range string.
    #[error("Parse error: {message}")]
    #[diagnostic(help(
        "Versions look like `1.0.0-beta.1+meta`, ranges like `[1.0, 2.0)` or `1.*`"
    ))]
    Parse { message: String },

    /// Dependency resolution could not produce a graph.
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// A dependency provider (package source) failed to answer a lookup.
    #[error("Package source '{source_name}' failed: {message}")]
    #[diagnostic(help("Set `ignore-failed-sources = true` to treat failing sources as empty"))]
    Provider {
        source_name: String,
        message: String,
    },

    /// The walk was cancelled through its cancellation token.
    #[error("Operation was cancelled")]
    Cancelled,

    /// Invalid resolver configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the resolver configuration file for syntax errors"))]
    Config { message: String },

    /// Invalid content pattern expression.
    #[error("Invalid pattern: {message}")]
    Pattern { message: String },
}

impl NuGraphError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn provider(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for `miette::Result<T>`.
pub type NuGraphResult<T> = miette::Result<T>;
