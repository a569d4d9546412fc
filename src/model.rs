//! Core Data Model Module
//!
//! Domain types shared across the issuance and revocation workflow:
//! principal roles, distinguished names, SAN entries, validity windows,
//! issued certificates, and revocation records.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Validity period for the self-signed root certificate (days)
pub const ROOT_VALIDITY_DAYS: u32 = 1826;
/// Validity period for leaf (gateway/client) certificates (days)
pub const LEAF_VALIDITY_DAYS: u32 = 365;
/// A CRL's `nextUpdate` is `thisUpdate` plus this many days
pub const CRL_NEXT_UPDATE_DAYS: u32 = 7;

/// The kind of principal a certificate is issued for.
///
/// The role determines the extension policy attached at signing time and
/// the required shape of the SAN entries in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrincipalRole {
    /// Root CA, used to sign gateway/client certificates
    RootCa,
    /// Gateway (server) principal
    Gateway,
    /// Client principal
    Client,
}

/// X.500 distinguished name fields attached to every CSR and certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    pub country: String,
    pub state: String,
    pub city: String,
    pub organization: String,
    pub organizational_unit: String,
    pub common_name: String,
}

/// A single subject alternative name entry.
///
/// Gateways carry one or more DNS/IP entries; clients carry exactly one
/// URI entry whose payload is a JSON identity claim (see [`crate::identity`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SanEntry {
    Dns(String),
    Ip(String),
    Uri(String),
}

/// RSA key sizes supported by the key pair provider.
///
/// 4096-bit keys are reserved for the root CA; leaf principals use
/// 2048-bit keys as a deliberate performance tradeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyBitLength {
    Bits2048,
    Bits4096,
}

impl KeyBitLength {
    /// Key size in bits
    pub fn bits(&self) -> u32 {
        match self {
            KeyBitLength::Bits2048 => 2048,
            KeyBitLength::Bits4096 => 4096,
        }
    }
}

/// Certificate validity window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    #[serde(with = "time::serde::rfc3339")]
    pub not_before: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub not_after: OffsetDateTime,
}

impl ValidityWindow {
    /// Window starting now and ending `days` days later
    pub fn starting_now(days: u32) -> Self {
        let not_before = OffsetDateTime::now_utc();
        Self {
            not_before,
            not_after: not_before + Duration::days(i64::from(days)),
        }
    }
}

/// An issued certificate together with the bookkeeping fields the CA
/// extracted for its own records. The PEM is the toolkit-native encoding
/// and is not interpreted further by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCertificate {
    /// CA-scoped serial number, unique and strictly increasing
    pub serial: u64,
    pub role: PrincipalRole,
    pub subject: DistinguishedName,
    pub issuer: DistinguishedName,
    pub san_entries: Vec<SanEntry>,
    pub extensions: crate::extension_policy::ExtensionSet,
    pub validity: ValidityWindow,
    /// PEM-encoded signed certificate
    pub certificate_pem: String,
}

/// Reason recorded when a certificate is revoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
}

/// A single revocation ledger entry. Immutable once written; a serial
/// revoked once stays revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRecord {
    pub serial: u64,
    pub reason: RevocationReason,
    #[serde(with = "time::serde::rfc3339")]
    pub revoked_at: OffsetDateTime,
}

/// A signed certificate revocation list snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrlDocument {
    /// Strictly increasing across regenerations for a given CA
    pub crl_number: u64,
    pub issuer: DistinguishedName,
    #[serde(with = "time::serde::rfc3339")]
    pub this_update: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub next_update: OffsetDateTime,
    pub entries: Vec<RevocationRecord>,
    /// PEM-encoded signed CRL
    pub crl_pem: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bit_length_values() {
        assert_eq!(KeyBitLength::Bits2048.bits(), 2048);
        assert_eq!(KeyBitLength::Bits4096.bits(), 4096);
    }

    #[test]
    fn test_validity_window_span() {
        let window = ValidityWindow::starting_now(365);
        assert_eq!(window.not_after - window.not_before, Duration::days(365));
    }
}
