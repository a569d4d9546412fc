//! Extension Policy Module
//!
//! Maps each principal role to its fixed X.509v3 extension bundle. The
//! mapping is a total function over the closed role enum, so no role can
//! silently receive a missing or wrong extension set. The policy always
//! wins over whatever a CSR requested; conflicting requests are rejected
//! at signing time rather than overridden.

use serde::{Deserialize, Serialize};

use crate::model::PrincipalRole;

/// Key usage bits a role's policy may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyUsage {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    KeyCertSign,
    CrlSign,
}

/// Extended key usage purposes a role's policy may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtendedKeyUsage {
    ServerAuth,
    ClientAuth,
}

/// The basicConstraints extension as a role policy expresses it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicConstraintsExt {
    pub ca: bool,
    pub critical: bool,
}

/// The fixed per-role extension bundle attached at signing time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSet {
    pub basic_constraints: BasicConstraintsExt,
    pub key_usages: Vec<KeyUsage>,
    pub key_usages_critical: bool,
    pub extended_key_usages: Vec<ExtendedKeyUsage>,
    pub extended_key_usages_critical: bool,
    pub subject_key_identifier: bool,
    pub authority_key_identifier: bool,
}

/// Return the extension bundle for `role`.
///
/// Pure and total: the role enum is closed, so there is no failure mode.
pub fn extensions_for(role: PrincipalRole) -> ExtensionSet {
    match role {
        PrincipalRole::RootCa => ExtensionSet {
            basic_constraints: BasicConstraintsExt {
                ca: true,
                critical: true,
            },
            key_usages: vec![
                KeyUsage::KeyCertSign,
                KeyUsage::CrlSign,
                KeyUsage::DigitalSignature,
            ],
            key_usages_critical: true,
            extended_key_usages: vec![ExtendedKeyUsage::ServerAuth, ExtendedKeyUsage::ClientAuth],
            extended_key_usages_critical: false,
            subject_key_identifier: true,
            authority_key_identifier: false,
        },
        PrincipalRole::Gateway => ExtensionSet {
            basic_constraints: BasicConstraintsExt {
                ca: false,
                critical: true,
            },
            key_usages: vec![KeyUsage::DigitalSignature, KeyUsage::KeyEncipherment],
            key_usages_critical: true,
            extended_key_usages: vec![ExtendedKeyUsage::ServerAuth],
            extended_key_usages_critical: false,
            subject_key_identifier: false,
            authority_key_identifier: true,
        },
        PrincipalRole::Client => ExtensionSet {
            basic_constraints: BasicConstraintsExt {
                ca: false,
                critical: true,
            },
            key_usages: vec![KeyUsage::DigitalSignature, KeyUsage::NonRepudiation],
            key_usages_critical: true,
            extended_key_usages: vec![ExtendedKeyUsage::ClientAuth],
            extended_key_usages_critical: true,
            subject_key_identifier: true,
            authority_key_identifier: true,
        },
    }
}
