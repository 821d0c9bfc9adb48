//! Structured error types shared across mjfit crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`MjfitError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (trigger bins, edges, thresholds, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for mjfit.
///
/// The family tells the caller how to react: `Input` errors abort construction, `Config`
/// errors reject a call and leave prior state untouched, and `Evaluation` errors mark the
/// current correction as invalid without invalidating the measurement itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum MjfitError {
    /// Missing or malformed inputs detected while building a measurement.
    #[error("input error: {0}")]
    Input(ErrorInfo),
    /// Rejected configuration or selection request.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Binning precondition violations.
    #[error("binning error: {0}")]
    Binning(ErrorInfo),
    /// Fatal condition met while evaluating a correction.
    #[error("evaluation error: {0}")]
    Evaluation(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl MjfitError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            MjfitError::Input(info)
            | MjfitError::Config(info)
            | MjfitError::Binning(info)
            | MjfitError::Evaluation(info)
            | MjfitError::Serde(info) => info,
        }
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Whether the error signals a correction that cannot be evaluated.
    ///
    /// Fit drivers should reject the current parameter point on such errors and keep going.
    pub fn is_invalid_correction(&self) -> bool {
        matches!(self, MjfitError::Evaluation(_))
    }
}
