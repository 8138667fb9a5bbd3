// src/error.rs

use std::fmt;
use thiserror::Error;

/// Outcomes that abort processing of a whole document.
///
/// Missing or malformed fields are never errors: they degrade to the
/// defaults in [`crate::models`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The input is not well-formed XML (or not UTF-8).
    #[error("XML syntax error: {0}")]
    Syntax(String),

    /// Well-formed, but no `infNFe` element under either namespace pass.
    #[error("document schema not recognized: <infNFe> not found")]
    SchemaNotRecognized,

    /// Anything else, e.g. decimal overflow while summing weights.
    #[error("internal fault: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn syntax(err: impl fmt::Display) -> Self {
        EngineError::Syntax(err.to_string())
    }

    pub fn overflow(context: &str) -> Self {
        EngineError::Internal(format!("decimal overflow in {context}"))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
