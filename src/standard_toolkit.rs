//! Standard Toolkit Module
//!
//! Production implementation of the [`CryptoToolkit`] boundary. RSA key
//! pairs come from openssl (`Rsa::generate`), while certificate, CSR, and
//! CRL assembly goes through rcgen, which covers all three artifact kinds
//! under one API. The two meet at the PKCS#8 PEM encoding of the private
//! key.

use std::net::IpAddr;

use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CertificateRevocationList,
    CertificateRevocationListParams, CertificateSigningRequest as Pkcs10Request,
    DistinguishedName as X509Name, DnType, DnValue, ExtendedKeyUsagePurpose, IsCa, KeyIdMethod,
    KeyPair, KeyUsagePurpose, RevocationReason as X509RevocationReason, RevokedCertParams,
    SerialNumber, PKCS_RSA_SHA256,
};
use time::OffsetDateTime;

use crate::error::Error;
use crate::extension_policy::{ExtendedKeyUsage, ExtensionSet, KeyUsage};
use crate::model::{
    DistinguishedName, KeyBitLength, RevocationReason, RevocationRecord, SanEntry, ValidityWindow,
};
use crate::toolkit::{CryptoToolkit, IssuerMaterial, KeyMaterial};

/// The production cryptographic toolkit
#[derive(Debug, Default)]
pub struct StandardToolkit;

impl StandardToolkit {
    pub fn new() -> Self {
        Self
    }
}

/// Minimal big-endian encoding of a serial number
fn serial_bytes(serial: u64) -> Vec<u8> {
    let bytes = serial.to_be_bytes();
    let start = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

/// Load a PKCS#8 PEM private key as an RSA-SHA256 signing key
fn signing_key(key: &KeyMaterial) -> Result<KeyPair, Error> {
    KeyPair::from_pem_and_sign_algo(&key.private_key_pem, &PKCS_RSA_SHA256)
        .map_err(|e| Error::Signing(format!("Failed to load signing key: {}", e)))
}

/// Build the X.500 name, skipping fields left empty
fn x509_name(dn: &DistinguishedName) -> X509Name {
    let mut name = X509Name::new();
    if !dn.country.is_empty() {
        name.push(DnType::CountryName, DnValue::Utf8String(dn.country.clone()));
    }
    if !dn.state.is_empty() {
        name.push(
            DnType::StateOrProvinceName,
            DnValue::Utf8String(dn.state.clone()),
        );
    }
    if !dn.city.is_empty() {
        name.push(DnType::LocalityName, DnValue::Utf8String(dn.city.clone()));
    }
    if !dn.organization.is_empty() {
        name.push(
            DnType::OrganizationName,
            DnValue::Utf8String(dn.organization.clone()),
        );
    }
    if !dn.organizational_unit.is_empty() {
        name.push(
            DnType::OrganizationalUnitName,
            DnValue::Utf8String(dn.organizational_unit.clone()),
        );
    }
    if !dn.common_name.is_empty() {
        name.push(
            DnType::CommonName,
            DnValue::Utf8String(dn.common_name.clone()),
        );
    }
    name
}

fn san_type(entry: &SanEntry) -> Result<rcgen::SanType, Error> {
    Ok(match entry {
        SanEntry::Dns(name) => rcgen::SanType::DnsName(name.clone()),
        SanEntry::Ip(addr) => {
            let parsed = addr
                .parse::<IpAddr>()
                .map_err(|_| Error::Signing(format!("Invalid IP SAN entry: {}", addr)))?;
            rcgen::SanType::IpAddress(parsed)
        }
        SanEntry::Uri(uri) => rcgen::SanType::URI(uri.clone()),
    })
}

/// Translate an extension bundle onto certificate parameters.
///
/// Criticality is fixed by the encoder: basicConstraints and keyUsage are
/// written critical, extendedKeyUsage is not, and a subject key identifier
/// is present on every certificate.
fn apply_extensions(params: &mut CertificateParams, extensions: &ExtensionSet) {
    params.is_ca = if extensions.basic_constraints.ca {
        IsCa::Ca(BasicConstraints::Unconstrained)
    } else {
        IsCa::ExplicitNoCa
    };
    params.key_usages = extensions
        .key_usages
        .iter()
        .map(|usage| match usage {
            KeyUsage::DigitalSignature => KeyUsagePurpose::DigitalSignature,
            KeyUsage::NonRepudiation => KeyUsagePurpose::ContentCommitment,
            KeyUsage::KeyEncipherment => KeyUsagePurpose::KeyEncipherment,
            KeyUsage::KeyCertSign => KeyUsagePurpose::KeyCertSign,
            KeyUsage::CrlSign => KeyUsagePurpose::CrlSign,
        })
        .collect();
    params.extended_key_usages = extensions
        .extended_key_usages
        .iter()
        .map(|usage| match usage {
            ExtendedKeyUsage::ServerAuth => ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsage::ClientAuth => ExtendedKeyUsagePurpose::ClientAuth,
        })
        .collect();
    params.use_authority_key_identifier_extension = extensions.authority_key_identifier;
    params.key_identifier_method = KeyIdMethod::Sha256;
}

/// Reconstruct the issuer as an rcgen signer from its PEM material.
///
/// `from_ca_cert_pem` restores the subject name and key pair but not the
/// extension profile, so the CA bits the signer checks are re-applied.
fn issuer_certificate(issuer: &IssuerMaterial) -> Result<Certificate, Error> {
    let key_pair = signing_key(&issuer.key)?;
    let mut params = CertificateParams::from_ca_cert_pem(&issuer.certificate_pem, key_pair)
        .map_err(|e| Error::Signing(format!("Failed to load issuer certificate: {}", e)))?;
    params.alg = &PKCS_RSA_SHA256;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
    ];
    Certificate::from_params(params)
        .map_err(|e| Error::Signing(format!("Failed to prepare issuer for signing: {}", e)))
}

fn revocation_reason(reason: RevocationReason) -> X509RevocationReason {
    match reason {
        RevocationReason::Unspecified => X509RevocationReason::Unspecified,
        RevocationReason::KeyCompromise => X509RevocationReason::KeyCompromise,
        RevocationReason::CaCompromise => X509RevocationReason::CaCompromise,
        RevocationReason::AffiliationChanged => X509RevocationReason::AffiliationChanged,
        RevocationReason::Superseded => X509RevocationReason::Superseded,
        RevocationReason::CessationOfOperation => X509RevocationReason::CessationOfOperation,
    }
}

impl CryptoToolkit for StandardToolkit {
    fn generate_key_pair(&self, bit_length: KeyBitLength) -> Result<KeyMaterial, Error> {
        let rsa = Rsa::generate(bit_length.bits())
            .map_err(|e| Error::KeyGeneration(format!("Failed to generate RSA keypair: {}", e)))?;
        let private_key = PKey::from_rsa(rsa)
            .map_err(|e| Error::KeyGeneration(format!("Failed to create private key: {}", e)))?;

        let private_key_pem = private_key
            .private_key_to_pem_pkcs8()
            .map_err(|e| Error::KeyGeneration(format!("Failed to encode private key: {}", e)))
            .and_then(|pem| {
                String::from_utf8(pem).map_err(|e| {
                    Error::KeyGeneration(format!("Private key PEM is not UTF-8: {}", e))
                })
            })?;
        let public_key_pem = private_key
            .public_key_to_pem()
            .map_err(|e| Error::KeyGeneration(format!("Failed to encode public key: {}", e)))
            .and_then(|pem| {
                String::from_utf8(pem).map_err(|e| {
                    Error::KeyGeneration(format!("Public key PEM is not UTF-8: {}", e))
                })
            })?;

        Ok(KeyMaterial {
            bit_length,
            private_key_pem,
            public_key_pem,
        })
    }

    fn build_self_signed_certificate(
        &self,
        dn: &DistinguishedName,
        extensions: &ExtensionSet,
        key: &KeyMaterial,
        serial: u64,
        validity: &ValidityWindow,
    ) -> Result<String, Error> {
        let mut params = CertificateParams::default();
        params.alg = &PKCS_RSA_SHA256;
        params.serial_number = Some(SerialNumber::from_slice(&serial_bytes(serial)));
        params.not_before = validity.not_before;
        params.not_after = validity.not_after;
        params.distinguished_name = x509_name(dn);
        apply_extensions(&mut params, extensions);
        params.key_pair = Some(signing_key(key)?);

        let certificate = Certificate::from_params(params)
            .map_err(|e| Error::Signing(format!("Failed to create root certificate: {}", e)))?;
        certificate
            .serialize_pem()
            .map_err(|e| Error::Signing(format!("Failed to serialize root certificate: {}", e)))
    }

    fn build_signing_request(
        &self,
        dn: &DistinguishedName,
        key: &KeyMaterial,
    ) -> Result<String, Error> {
        let mut params = CertificateParams::default();
        params.alg = &PKCS_RSA_SHA256;
        params.distinguished_name = x509_name(dn);
        params.key_pair = Some(signing_key(key)?);

        let certificate = Certificate::from_params(params)
            .map_err(|e| Error::Signing(format!("Failed to prepare signing request: {}", e)))?;
        certificate
            .serialize_request_pem()
            .map_err(|e| Error::Signing(format!("Failed to serialize signing request: {}", e)))
    }

    fn sign_request(
        &self,
        csr_pem: &str,
        subject_dn: &DistinguishedName,
        san_entries: &[SanEntry],
        extensions: &ExtensionSet,
        issuer: &IssuerMaterial,
        serial: u64,
        validity: &ValidityWindow,
    ) -> Result<String, Error> {
        let issuer_cert = issuer_certificate(issuer)?;

        let mut request = Pkcs10Request::from_pem(csr_pem)
            .map_err(|e| Error::Signing(format!("Failed to parse signing request: {}", e)))?;
        request.params.alg = &PKCS_RSA_SHA256;
        request.params.serial_number = Some(SerialNumber::from_slice(&serial_bytes(serial)));
        request.params.not_before = validity.not_before;
        request.params.not_after = validity.not_after;
        request.params.distinguished_name = x509_name(subject_dn);
        request.params.subject_alt_names = san_entries
            .iter()
            .map(san_type)
            .collect::<Result<Vec<_>, Error>>()?;
        apply_extensions(&mut request.params, extensions);

        request
            .serialize_pem_with_signer(&issuer_cert)
            .map_err(|e| Error::Signing(format!("Failed to sign certificate: {}", e)))
    }

    fn build_revocation_list(
        &self,
        issuer: &IssuerMaterial,
        entries: &[RevocationRecord],
        crl_number: u64,
        this_update: OffsetDateTime,
        next_update: OffsetDateTime,
    ) -> Result<String, Error> {
        let issuer_cert = issuer_certificate(issuer)?;

        let revoked_certs = entries
            .iter()
            .map(|record| RevokedCertParams {
                serial_number: SerialNumber::from_slice(&serial_bytes(record.serial)),
                revocation_time: record.revoked_at,
                reason_code: Some(revocation_reason(record.reason)),
                invalidity_date: None,
            })
            .collect();

        let crl = CertificateRevocationList::from_params(CertificateRevocationListParams {
            this_update,
            next_update,
            crl_number: SerialNumber::from_slice(&serial_bytes(crl_number)),
            issuing_distribution_point: None,
            revoked_certs,
            alg: &PKCS_RSA_SHA256,
            key_identifier_method: KeyIdMethod::Sha256,
        })
        .map_err(|e| Error::Signing(format!("Failed to create revocation list: {}", e)))?;

        crl.serialize_pem_with_signer(&issuer_cert)
            .map_err(|e| Error::Signing(format!("Failed to sign revocation list: {}", e)))
    }
}
