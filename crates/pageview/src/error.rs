//! Error types for configuration and rendering.
//!
//! [`ConfigError`] is raised while a [`RenderConfig`](crate::RenderConfig) is
//! being built and always reaches the configuring caller before any template
//! work begins. [`RenderError`] covers everything that can go wrong once a
//! view exists: building the engine, loading a template, and rendering it.
//! It abstracts over the underlying engine's errors so callers never depend on
//! the backend's own error type.

use std::io;
use std::path::PathBuf;

/// Error raised while building or loading a [`RenderConfig`](crate::RenderConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A supplied token is outside the fixed set of allowed values.
    #[error("invalid value '{value}' for {field} (allowed: {allowed})")]
    InvalidConfigurationValue {
        field: &'static str,
        value: String,
        allowed: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration document could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, value: impl Into<String>, allowed: &[&str]) -> Self {
        Self::InvalidConfigurationValue {
            field,
            value: value.into(),
            allowed: allowed.join(", "),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Error type for view construction and rendering.
///
/// Every engine failure surfaces as exactly one of these variants. A failed
/// render never yields partial output.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No template with the requested name exists under any search directory.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// The template source could not be compiled.
    #[error("template syntax error: {0}")]
    TemplateSyntax(String),

    /// A template referenced an undefined variable while strict variables are on.
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    /// Any other failure raised while evaluating a template.
    #[error("engine error: {0}")]
    Engine(String),

    /// The engine could not be constructed from the configuration.
    #[error("engine setup failed: {0}")]
    Setup(String),

    /// Template variables could not be converted.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error while reading templates or writing the response body.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}
