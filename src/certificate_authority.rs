//! Certificate Authority Module
//!
//! The root CA: bootstraps a self-signed root certificate, reopens from
//! durable state after a restart, and signs validated gateway/client
//! requests with strictly increasing, never-reused serial numbers.
//!
//! Serial allocation and the issuance ledger live behind one mutex, so
//! concurrent signing requests cannot observe the same serial. A serial is
//! consumed only when the toolkit signing call succeeds; on failure the
//! ledger is untouched and the serial is handed to the next request.

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::artifact_store::{self, CaPaths};
use crate::error::Error;
use crate::extension_policy::extensions_for;
use crate::ledger::{IssuanceLedger, IssuanceRecord};
use crate::model::{
    DistinguishedName, IssuedCertificate, KeyBitLength, PrincipalRole, ValidityWindow,
};
use crate::request_builder::CertificateSigningRequest;
use crate::toolkit::{CryptoToolkit, IssuerMaterial, KeyMaterial};

/// Serial number of the self-signed root certificate
pub const ROOT_SERIAL: u64 = 1;
/// Bit length of the root CA key
pub const ROOT_KEY_BITS: KeyBitLength = KeyBitLength::Bits4096;

/// Everything needed to reopen the CA, minus the private key which is
/// persisted separately with restricted permissions
#[derive(Serialize, Deserialize)]
struct RootState {
    key_bit_length: KeyBitLength,
    public_key_pem: String,
    certificate: IssuedCertificate,
}

pub struct CertificateAuthority {
    toolkit: Arc<dyn CryptoToolkit>,
    paths: CaPaths,
    key: KeyMaterial,
    certificate: IssuedCertificate,
    ledger: Mutex<IssuanceLedger>,
}

impl CertificateAuthority {
    /// Create a brand-new CA under `state_dir`.
    ///
    /// Generates the root key pair, self-signs the root certificate with
    /// serial [`ROOT_SERIAL`], and persists every artifact before returning.
    ///
    /// # Returns
    /// * `Ok(CertificateAuthority)` - The bootstrapped CA
    /// * `Err(Error::AlreadyBootstrapped)` - If a root certificate already
    ///   exists under `state_dir`
    pub fn bootstrap(
        toolkit: Arc<dyn CryptoToolkit>,
        state_dir: &Path,
        dn: DistinguishedName,
        validity_days: u32,
    ) -> Result<Self, Error> {
        let paths = CaPaths::new(state_dir)?;
        if paths.root_certificate().exists() {
            return Err(Error::AlreadyBootstrapped);
        }

        let key = toolkit.generate_key_pair(ROOT_KEY_BITS)?;
        let extensions = extensions_for(PrincipalRole::RootCa);
        let validity = ValidityWindow::starting_now(validity_days);
        let certificate_pem =
            toolkit.build_self_signed_certificate(&dn, &extensions, &key, ROOT_SERIAL, &validity)?;

        let certificate = IssuedCertificate {
            serial: ROOT_SERIAL,
            role: PrincipalRole::RootCa,
            subject: dn.clone(),
            issuer: dn,
            san_entries: Vec::new(),
            extensions,
            validity,
            certificate_pem,
        };

        artifact_store::write_private_key(&paths.root_key(), &key.private_key_pem)?;
        artifact_store::write_pem(&paths.root_certificate(), &certificate.certificate_pem)?;
        artifact_store::write_json(
            &paths.root_record(),
            &RootState {
                key_bit_length: key.bit_length,
                public_key_pem: key.public_key_pem.clone(),
                certificate: certificate.clone(),
            },
        )?;

        let mut ledger = IssuanceLedger::load_or_create(&paths.issuance_ledger())?;
        ledger.append(IssuanceRecord {
            serial: ROOT_SERIAL,
            role: PrincipalRole::RootCa,
            common_name: certificate.subject.common_name.clone(),
            issued_at: OffsetDateTime::now_utc(),
        })?;

        info!(
            common_name = %certificate.subject.common_name,
            validity_days,
            "bootstrapped root CA"
        );

        Ok(Self {
            toolkit,
            paths,
            key,
            certificate,
            ledger: Mutex::new(ledger),
        })
    }

    /// Reopen a previously bootstrapped CA from its state directory.
    ///
    /// Serial allocation resumes from the reloaded issuance ledger, so
    /// restarts never reuse a serial.
    pub fn open(toolkit: Arc<dyn CryptoToolkit>, state_dir: &Path) -> Result<Self, Error> {
        let paths = CaPaths::new(state_dir)?;
        let state: RootState = artifact_store::read_json(&paths.root_record())?;
        let private_key_pem = artifact_store::read_pem(&paths.root_key())?;
        let ledger = IssuanceLedger::load_or_create(&paths.issuance_ledger())?;

        info!(
            common_name = %state.certificate.subject.common_name,
            issued = ledger.records().len(),
            "reopened root CA"
        );

        Ok(Self {
            toolkit,
            paths,
            key: KeyMaterial {
                bit_length: state.key_bit_length,
                private_key_pem,
                public_key_pem: state.public_key_pem,
            },
            certificate: state.certificate,
            ledger: Mutex::new(ledger),
        })
    }

    /// The root certificate and its bookkeeping fields
    pub fn certificate(&self) -> &IssuedCertificate {
        &self.certificate
    }

    /// Artifact layout for this CA's state directory
    pub fn paths(&self) -> &CaPaths {
        &self.paths
    }

    /// The signing inputs a toolkit needs to issue under this CA
    pub fn issuer_material(&self) -> IssuerMaterial {
        IssuerMaterial {
            key: self.key.clone(),
            certificate_pem: self.certificate.certificate_pem.clone(),
        }
    }

    /// Whether this CA has ever issued the given serial
    pub fn has_issued(&self, serial: u64) -> Result<bool, Error> {
        let ledger = self
            .ledger
            .lock()
            .map_err(|_| Error::Storage("issuance ledger lock poisoned".to_string()))?;
        Ok(ledger.contains(serial))
    }

    /// Sign a validated request under this CA.
    ///
    /// The role's extension policy always wins: a request whose echoed
    /// extension bundle disagrees with the policy for its role is rejected
    /// rather than silently corrected.
    ///
    /// # Arguments
    /// * `request` - Validated signing request
    /// * `validity_days` - Leaf validity period
    /// * `serial_override` - Pin a specific serial instead of allocating the
    ///   next one; the pinned serial must never have been issued
    ///
    /// # Returns
    /// * `Ok(IssuedCertificate)` - The signed certificate, recorded in the
    ///   issuance ledger
    /// * `Err(Error::Signing)` - On policy conflict, serial collision, or
    ///   toolkit failure
    pub fn sign(
        &self,
        request: CertificateSigningRequest,
        validity_days: u32,
        serial_override: Option<u64>,
    ) -> Result<IssuedCertificate, Error> {
        if request.role == PrincipalRole::RootCa {
            return Err(Error::InvalidRequest(
                "root CA certificates are self-signed, not requested".to_string(),
            ));
        }
        let extensions = extensions_for(request.role);
        if request.requested_extensions != extensions {
            return Err(Error::Signing(
                "requested extensions conflict with the role's policy".to_string(),
            ));
        }

        let mut ledger = self
            .ledger
            .lock()
            .map_err(|_| Error::Storage("issuance ledger lock poisoned".to_string()))?;

        let serial = match serial_override {
            Some(serial) => {
                if ledger.contains(serial) {
                    return Err(Error::Signing(format!(
                        "serial {} has already been issued",
                        serial
                    )));
                }
                serial
            }
            None => ledger.next_serial(),
        };

        let validity = ValidityWindow::starting_now(validity_days);
        let certificate_pem = self.toolkit.sign_request(
            &request.csr_pem,
            &request.distinguished_name,
            &request.san_entries,
            &extensions,
            &self.issuer_material(),
            serial,
            &validity,
        )?;

        // Signing succeeded; the serial is consumed now
        ledger.append(IssuanceRecord {
            serial,
            role: request.role,
            common_name: request.distinguished_name.common_name.clone(),
            issued_at: OffsetDateTime::now_utc(),
        })?;

        info!(
            serial,
            role = ?request.role,
            common_name = %request.distinguished_name.common_name,
            "issued certificate"
        );

        Ok(IssuedCertificate {
            serial,
            role: request.role,
            subject: request.distinguished_name,
            issuer: self.certificate.subject.clone(),
            san_entries: request.san_entries,
            extensions,
            validity,
            certificate_pem,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SanEntry, LEAF_VALIDITY_DAYS, ROOT_VALIDITY_DAYS};
    use crate::request_builder::CertificateRequestBuilder;
    use crate::test_toolkit::FakeToolkit;

    fn test_dn(common_name: &str) -> DistinguishedName {
        DistinguishedName {
            country: "US".to_string(),
            organization: "ExampleCA".to_string(),
            common_name: common_name.to_string(),
            ..DistinguishedName::default()
        }
    }

    fn bootstrap(toolkit: Arc<FakeToolkit>, dir: &Path) -> CertificateAuthority {
        CertificateAuthority::bootstrap(
            toolkit,
            dir,
            test_dn("example-ca.local"),
            ROOT_VALIDITY_DAYS,
        )
        .unwrap()
    }

    fn gateway_request(toolkit: &FakeToolkit) -> CertificateSigningRequest {
        let key = toolkit
            .generate_key_pair(KeyBitLength::Bits2048)
            .unwrap();
        CertificateRequestBuilder::new(PrincipalRole::Gateway)
            .country("US")
            .organization("ExampleCA")
            .common_name("example-gateway.local")
            .san_dns_name("example-gateway.local")
            .build(toolkit, &key)
            .unwrap()
    }

    #[test]
    fn test_bootstrap_writes_artifacts_and_records_root() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(FakeToolkit::new());
        let ca = bootstrap(toolkit, dir.path());

        assert_eq!(ca.certificate().serial, ROOT_SERIAL);
        assert_eq!(ca.certificate().role, PrincipalRole::RootCa);
        assert_eq!(ca.certificate().subject, ca.certificate().issuer);
        assert!(ca.paths().root_key().exists());
        assert!(ca.paths().root_certificate().exists());
        assert!(ca.paths().root_record().exists());
        assert!(ca.has_issued(ROOT_SERIAL).unwrap());
    }

    #[test]
    fn test_bootstrap_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(FakeToolkit::new());
        let _ca = bootstrap(toolkit.clone(), dir.path());

        let result = CertificateAuthority::bootstrap(
            toolkit,
            dir.path(),
            test_dn("example-ca.local"),
            ROOT_VALIDITY_DAYS,
        );
        assert!(matches!(result, Err(Error::AlreadyBootstrapped)));
    }

    #[test]
    fn test_failed_key_generation_aborts_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(FakeToolkit::new());

        toolkit.fail_next_keygen();
        let result = CertificateAuthority::bootstrap(
            toolkit.clone(),
            dir.path(),
            test_dn("example-ca.local"),
            ROOT_VALIDITY_DAYS,
        );
        assert!(matches!(result, Err(Error::KeyGeneration(_))));
        assert!(!dir.path().join("root_cert.pem").exists());

        // The next attempt starts clean
        let ca = bootstrap(toolkit, dir.path());
        assert_eq!(ca.certificate().serial, ROOT_SERIAL);
    }

    #[test]
    fn test_serials_increase_monotonically() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(FakeToolkit::new());
        let ca = bootstrap(toolkit.clone(), dir.path());

        let first = ca
            .sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, None)
            .unwrap();
        let second = ca
            .sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, None)
            .unwrap();
        assert_eq!(first.serial, 2);
        assert_eq!(second.serial, 3);
    }

    #[test]
    fn test_open_resumes_serial_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(FakeToolkit::new());
        {
            let ca = bootstrap(toolkit.clone(), dir.path());
            ca.sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, None)
                .unwrap();
        }

        let reopened = CertificateAuthority::open(toolkit.clone(), dir.path()).unwrap();
        assert_eq!(reopened.certificate().serial, ROOT_SERIAL);
        assert!(reopened.has_issued(2).unwrap());
        let next = reopened
            .sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, None)
            .unwrap();
        assert_eq!(next.serial, 3);
    }

    #[test]
    fn test_serial_override_is_pinned_and_sequence_continues_past_it() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(FakeToolkit::new());
        let ca = bootstrap(toolkit.clone(), dir.path());

        let pinned = ca
            .sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, Some(300))
            .unwrap();
        assert_eq!(pinned.serial, 300);

        let next = ca
            .sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, None)
            .unwrap();
        assert_eq!(next.serial, 301);
    }

    #[test]
    fn test_serial_override_collision_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(FakeToolkit::new());
        let ca = bootstrap(toolkit.clone(), dir.path());

        ca.sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, Some(300))
            .unwrap();
        let result = ca.sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, Some(300));
        assert!(matches!(result, Err(Error::Signing(_))));

        let collides_with_root =
            ca.sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, Some(ROOT_SERIAL));
        assert!(matches!(collides_with_root, Err(Error::Signing(_))));
    }

    #[test]
    fn test_failed_signing_does_not_consume_serial() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(FakeToolkit::new());
        let ca = bootstrap(toolkit.clone(), dir.path());

        toolkit.fail_next_sign();
        let failed = ca.sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, None);
        assert!(matches!(failed, Err(Error::Signing(_))));
        assert!(!ca.has_issued(2).unwrap());

        let next = ca
            .sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, None)
            .unwrap();
        assert_eq!(next.serial, 2);
    }

    #[test]
    fn test_tampered_extension_bundle_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(FakeToolkit::new());
        let ca = bootstrap(toolkit.clone(), dir.path());

        let mut request = gateway_request(&toolkit);
        request.requested_extensions.basic_constraints.ca = true;
        let result = ca.sign(request, LEAF_VALIDITY_DAYS, None);
        assert!(matches!(result, Err(Error::Signing(_))));
    }

    #[test]
    fn test_forged_root_request_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(FakeToolkit::new());
        let ca = bootstrap(toolkit.clone(), dir.path());

        let mut request = gateway_request(&toolkit);
        request.role = PrincipalRole::RootCa;
        request.requested_extensions = extensions_for(PrincipalRole::RootCa);
        request.san_entries = vec![];
        let result = ca.sign(request, LEAF_VALIDITY_DAYS, None);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_issued_certificate_carries_issuer_subject_and_sans() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(FakeToolkit::new());
        let ca = bootstrap(toolkit.clone(), dir.path());

        let issued = ca
            .sign(gateway_request(&toolkit), LEAF_VALIDITY_DAYS, None)
            .unwrap();
        assert_eq!(issued.issuer.common_name, "example-ca.local");
        assert_eq!(issued.subject.common_name, "example-gateway.local");
        assert_eq!(
            issued.san_entries,
            vec![SanEntry::Dns("example-gateway.local".to_string())]
        );
    }
}
