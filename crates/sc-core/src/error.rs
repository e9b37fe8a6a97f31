//! Error taxonomy for the converter core.
//!
//! Three classes, mirroring the failure policy of the pipeline: per-item
//! decode failures ([`ParseError`]), per-item encode failures
//! ([`ProduceError`]) and whole-document failures ([`DocumentError`]).
//! The first two are always recoverable and never abort a batch.

use thiserror::Error;

use crate::classify::SourceFormat;

/// A single line/object could not be decoded into a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown scheme")]
    UnknownScheme,
    #[error("invalid base64 payload")]
    Base64,
    #[error("invalid json payload: {0}")]
    Json(String),
    #[error("missing host")]
    MissingHost,
    #[error("missing or invalid port")]
    InvalidPort,
    #[error("missing mandatory field: {0}")]
    MissingField(&'static str),
    #[error("malformed {0} link")]
    Malformed(&'static str),
}

/// A node cannot be represented in the chosen target dialect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProduceError {
    #[error("protocol {proto} not supported by {target}")]
    Unsupported {
        proto: &'static str,
        target: &'static str,
    },
}

/// The whole input document yielded nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("no valid nodes found (detected format: {format})")]
    NoValidNodes { format: SourceFormat },
}
