use thiserror::Error;

use crate::minhash::LshMode;

/// Errors returned by the similarity pipeline and its building blocks.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimilarityError {
    #[error("no band/row decomposition of signature_size={signature_size} satisfies {mode} for threshold={threshold}")]
    InvalidBandDecomposition {
        signature_size: usize,
        threshold: f64,
        mode: LshMode,
    },

    #[error("invalid config: shingle_size must be >= 1 (got {shingle_size})")]
    InvalidShingleSize { shingle_size: usize },

    #[error("invalid config: threshold must be in (0, 1] (got {threshold})")]
    InvalidThreshold { threshold: f64 },

    #[error("invalid config: signature_size must be >= 1 (got {signature_size})")]
    InvalidSignatureSize { signature_size: usize },

    #[error("invalid config: coefficient range [{low}, {high}] must satisfy 1 <= low <= high < {modulus}")]
    InvalidCoefficientRange { low: u32, high: u32, modulus: u32 },

    #[error("signature length mismatch (expected {expected}, got {got})")]
    SignatureLengthMismatch { expected: usize, got: usize },

    #[error("no signature for document {id}")]
    UnknownDocument { id: String },

    #[error("document {id} appears more than once in the corpus")]
    DuplicateDocument { id: String },
}
