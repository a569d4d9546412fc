//! Error Types Module
//!
//! Defines the error taxonomy for certificate issuance and revocation.
//! Every failure is surfaced to the immediate caller; the crate performs
//! no internal retry or recovery.

use thiserror::Error;

/// Errors produced by certificate issuance and revocation operations
#[derive(Debug, Error)]
pub enum Error {
    /// The cryptographic toolkit failed to produce key material
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// A certificate signing request had the wrong shape for its role
    #[error("invalid certificate request: {0}")]
    InvalidRequest(String),

    /// Signing failed, either from a policy conflict or a toolkit failure.
    /// CA state is unchanged; the serial is not consumed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// `bootstrap` was called while a root certificate already exists
    #[error("certificate authority is already bootstrapped")]
    AlreadyBootstrapped,

    /// The serial is already present in the revocation ledger.
    /// First revocation wins; the original record is retained.
    #[error("serial {0} is already revoked")]
    AlreadyRevoked(u64),

    /// The serial was never issued by the referenced CA
    #[error("serial {0} was never issued by this authority")]
    UnknownSerial(u64),

    /// A client identity claim could not be decoded
    #[error("identity claim rejected: {0}")]
    IdentityDecode(#[from] crate::identity::IdentityDecodeError),

    /// Durable storage (key files, ledgers, emitted artifacts) failed
    #[error("storage failure: {0}")]
    Storage(String),
}
