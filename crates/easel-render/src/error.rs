#![forbid(unsafe_code)]

//! Error taxonomy for the render orchestrator.
//!
//! Failures are deliberately coarse: the orchestrator's contract is that a
//! backend failure degrades that backend's frame and nothing else, so most
//! errors are logged at the point of recovery rather than propagated. Only
//! the speculative font/size/width queries surface errors to the caller.

use std::fmt;

/// Errors produced by the render subsystem.
#[derive(Debug)]
pub enum RenderError {
    /// A transient working buffer could not be grown.
    ///
    /// Fatal only to the single operation that hit it (the affected row or
    /// registration attempt); never propagated across rows or backends.
    Allocation(&'static str),
    /// A backend paint-protocol call failed.
    ///
    /// The failing backend's remaining pipeline steps for the frame are
    /// skipped; other backends are unaffected.
    Backend(String),
    /// No registered backend could answer the query.
    NoBackend,
    /// The paint thread could not be spawned.
    Thread(std::io::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Allocation(what) => write!(f, "allocation failed: {what}"),
            RenderError::Backend(msg) => write!(f, "backend error: {msg}"),
            RenderError::NoBackend => write!(f, "no backend registered"),
            RenderError::Thread(e) => write!(f, "paint thread spawn failed: {e}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Thread(e) => Some(e),
            _ => None,
        }
    }
}

/// Standard result type for render APIs.
pub type Result<T> = std::result::Result<T, RenderError>;
