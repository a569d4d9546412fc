//! Cryptographic Toolkit Boundary Module
//!
//! The core never performs cryptographic primitives itself; it calls out to
//! an external toolkit for key generation, certificate construction, CSR
//! construction, CSR signing, and CRL construction. Keeping the boundary
//! this narrow lets the serial/ledger/policy invariants be exercised with a
//! deterministic fake in tests.
//!
//! All five operations are synchronous and fallible, and return
//! toolkit-native PEM encodings that the core does not interpret beyond the
//! bookkeeping fields it already supplied.

use time::OffsetDateTime;

use crate::error::Error;
use crate::extension_policy::ExtensionSet;
use crate::model::{DistinguishedName, KeyBitLength, RevocationRecord, SanEntry, ValidityWindow};

/// Asymmetric key material for one principal.
///
/// The private key is exclusively owned by its principal and never leaves
/// the process except when the caller persists it to access-restricted
/// storage; only the public key is embedded in CSRs and certificates.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub bit_length: KeyBitLength,
    /// PKCS#8 PEM encoding of the private key
    pub private_key_pem: String,
    /// SubjectPublicKeyInfo PEM encoding of the public key
    pub public_key_pem: String,
}

/// The issuing CA's key and certificate, as a toolkit signing input
#[derive(Debug, Clone)]
pub struct IssuerMaterial {
    pub key: KeyMaterial,
    pub certificate_pem: String,
}

/// External cryptographic primitive provider.
///
/// The production implementation is [`crate::standard_toolkit::StandardToolkit`].
pub trait CryptoToolkit: Send + Sync {
    /// Generate an RSA key pair at the given bit length
    fn generate_key_pair(&self, bit_length: KeyBitLength) -> Result<KeyMaterial, Error>;

    /// Build a self-signed certificate from a DN, extension set, and key pair
    fn build_self_signed_certificate(
        &self,
        dn: &DistinguishedName,
        extensions: &ExtensionSet,
        key: &KeyMaterial,
        serial: u64,
        validity: &ValidityWindow,
    ) -> Result<String, Error>;

    /// Build a PKCS#10 signing request binding the key's public half to a DN.
    ///
    /// SAN entries and extensions are applied by [`Self::sign_request`] from
    /// the structured request; the signing step's extension configuration
    /// always wins over anything embedded in the PKCS#10 itself.
    fn build_signing_request(
        &self,
        dn: &DistinguishedName,
        key: &KeyMaterial,
    ) -> Result<String, Error>;

    /// Sign a PKCS#10 request under the issuer, attaching the supplied DN,
    /// SAN entries, extension set, serial, and validity window
    fn sign_request(
        &self,
        csr_pem: &str,
        subject_dn: &DistinguishedName,
        san_entries: &[SanEntry],
        extensions: &ExtensionSet,
        issuer: &IssuerMaterial,
        serial: u64,
        validity: &ValidityWindow,
    ) -> Result<String, Error>;

    /// Build a CRL over the given revocation records, signed by the issuer
    fn build_revocation_list(
        &self,
        issuer: &IssuerMaterial,
        entries: &[RevocationRecord],
        crl_number: u64,
        this_update: OffsetDateTime,
        next_update: OffsetDateTime,
    ) -> Result<String, Error>;
}
