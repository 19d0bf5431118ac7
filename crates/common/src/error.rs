use std::path::PathBuf;

use thiserror::Error;

use crate::Nullifier;

/// Coarse error classes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request (bad amount, absent proof reference)
    Validation,
    /// Proof artifact or verification key missing or unreadable
    Resource,
    /// Nullifier already committed
    Replay,
    /// Proof rejected or the verifier could not be run
    Verification,
    /// Nonce fetch, signing or submission failure
    Backend,
    /// Replay store unavailable
    Storage,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("mint amount must be greater than 0")]
    InvalidAmount,

    #[error("proof data is required")]
    MissingProof,

    #[error("proof file does not exist: {}", .0.display())]
    ProofNotFound(PathBuf),

    #[error("verification key file does not exist: {}", .0.display())]
    VerificationKeyNotFound(PathBuf),

    #[error("no nullifier could be resolved for this request")]
    MissingNullifier,

    #[error("nullifier has already been used (double-spending attempt): {0}")]
    NullifierReplay(Nullifier),

    #[error("zero-knowledge proof verification failed")]
    ProofRejected,

    #[error("proof verifier could not be run: {0}")]
    Verification(String),

    #[error("proof verifier timed out after {0}s")]
    VerifierTimeout(u64),

    #[error("ledger backend error: {0}")]
    Backend(String),

    #[error("transaction signing failed: {0}")]
    Signing(String),

    #[error("replay store error: {0}")]
    Store(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Classify the error for callers and transport layers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAmount
            | Error::MissingProof
            | Error::MissingNullifier
            | Error::InvalidQuantity(_)
            | Error::InvalidAddress(_)
            | Error::JsonSerialization(_) => ErrorKind::Validation,
            Error::ProofNotFound(_) | Error::VerificationKeyNotFound(_) | Error::Io(_) => {
                ErrorKind::Resource
            }
            Error::NullifierReplay(_) => ErrorKind::Replay,
            Error::ProofRejected | Error::Verification(_) | Error::VerifierTimeout(_) => {
                ErrorKind::Verification
            }
            Error::Backend(_) | Error::Signing(_) | Error::Other(_) => ErrorKind::Backend,
            Error::Store(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
