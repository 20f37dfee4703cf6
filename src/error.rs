//! Error types for the scheduling engine.
//!
//! Two failure categories exist: a callable that panicked while running
//! ([`SchedError::Call`]) and a value rejected at construction time
//! ([`SchedError::Parameter`]). Callers can test the category with
//! [`SchedError::is_call`] / [`SchedError::is_parameter`] or by matching on
//! the variant.

use std::any::Any;

use thiserror::Error;

/// Errors produced by futures and scheduler components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedError {
    /// A wrapped callable panicked; carries the rendered panic payload.
    #[error("call error: {0}")]
    Call(String),
    /// A construction-time parameter was rejected.
    #[error("parameter error: {0}")]
    Parameter(String),
}

impl SchedError {
    /// Convert a panic payload into a [`SchedError::Call`].
    ///
    /// String payloads (the common `panic!("...")` case) are carried
    /// verbatim; any other payload type is recorded as opaque.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "opaque panic payload".to_string()
        };
        Self::Call(message)
    }

    /// Whether this error classifies as a call failure.
    #[must_use]
    pub const fn is_call(&self) -> bool {
        matches!(self, Self::Call(_))
    }

    /// Whether this error classifies as a parameter rejection.
    #[must_use]
    pub const fn is_parameter(&self) -> bool {
        matches!(self, Self::Parameter(_))
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

/// Panic with a [`SchedError::Parameter`] rendering unless `cond` holds.
///
/// Construction-time validation is synchronous: a rejected value aborts the
/// calling operation immediately instead of surfacing later from the event
/// loop.
pub(crate) fn require(cond: bool, msg: &str) {
    assert!(cond, "{}", SchedError::Parameter(msg.to_string()));
}
