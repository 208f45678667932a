//! Error types for Astrolabe operations.
//!
//! Generation itself never fails; model problems surface as
//! [`Diagnostic`](crate::diagnostic::Diagnostic) values. [`AstrolabeError`]
//! covers the fallible surfaces around it: loading, building and emitting.

use std::io;

use thiserror::Error;

use astrolabe_core::model::ModelError;

use crate::backend::{EmitError, TargetBackend};

/// The main error type for Astrolabe operations.
#[derive(Debug, Error)]
pub enum AstrolabeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("No emitter is registered for target `{0}`")]
    UnsupportedTarget(TargetBackend),

    #[error("Emit error: {0}")]
    Emit(#[from] EmitError),
}
