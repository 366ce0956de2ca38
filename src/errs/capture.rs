//! Failure capture
//!
//! Converts a caught panic payload into a failure value.

use std::any::Any;
use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use super::Errs;

/// Errors produced by the runners themselves
#[derive(Error, Debug)]
pub enum ConcError {
    /// A task panicked with a payload that is not an error value
    #[error("{0}")]
    Panic(String),

    #[error("failed to spawn worker thread for task {index}")]
    Spawn {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("task {index} was cancelled before completion")]
    Cancelled { index: usize },
}

impl ConcError {
    /// Wrap a non-error panic payload, rendering it to text
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        ConcError::Panic(message)
    }
}

/// Classify a panic payload.
///
/// Error values raised with [`std::panic::panic_any`] are kept as-is. That
/// covers `anyhow::Error`, [`Errs`], [`ConcError`], `io::Error` and any
/// `Box<dyn Error + Send + Sync>`. A boxed `io::Error` is unboxed so that
/// `downcast_ref::<io::Error>()` finds it; other boxed errors keep their
/// message and are reachable through [`ErrorChain`](super::ErrorChain).
///
/// A payload of any other concrete error type cannot be recognized as an
/// error. Raise it as `anyhow::Error` or box it first. Anything else is
/// wrapped in [`ConcError::Panic`].
pub fn capture(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let payload = match payload.downcast::<anyhow::Error>() {
        Ok(err) => return *err,
        Err(other) => other,
    };

    let payload = match payload.downcast::<Box<dyn StdError + Send + Sync>>() {
        Ok(boxed) => return from_boxed(*boxed),
        Err(other) => other,
    };

    let payload = match payload.downcast::<io::Error>() {
        Ok(err) => return anyhow::Error::new(*err),
        Err(other) => other,
    };

    let payload = match payload.downcast::<Errs>() {
        Ok(errs) => return anyhow::Error::new(*errs),
        Err(other) => other,
    };

    match payload.downcast::<ConcError>() {
        Ok(err) => anyhow::Error::new(*err),
        Err(other) => anyhow::Error::new(ConcError::from_payload(other.as_ref())),
    }
}

fn from_boxed(boxed: Box<dyn StdError + Send + Sync>) -> anyhow::Error {
    match boxed.downcast::<io::Error>() {
        Ok(err) => anyhow::Error::new(*err),
        Err(other) => anyhow::Error::from_boxed(other),
    }
}
