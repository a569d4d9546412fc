//! Revocation Registry Module
//!
//! Append-only registry of revoked serials for one CA, plus signed CRL
//! emission. A serial can only be revoked if the CA actually issued it,
//! and only once; the first revocation's reason and timestamp are what
//! every subsequent CRL carries.
//!
//! Each emitted CRL is regenerated in full from the ledger and carries a
//! strictly increasing CRL number. The number is committed only after the
//! toolkit has produced the signed list, so a failed build never burns one.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::artifact_store;
use crate::certificate_authority::CertificateAuthority;
use crate::error::Error;
use crate::ledger::{CrlSequence, RevocationLedger};
use crate::model::{CrlDocument, RevocationReason, RevocationRecord, CRL_NEXT_UPDATE_DAYS};
use crate::toolkit::CryptoToolkit;

struct RegistryState {
    ledger: RevocationLedger,
    sequence: CrlSequence,
}

pub struct RevocationRegistry {
    toolkit: Arc<dyn CryptoToolkit>,
    authority: Arc<CertificateAuthority>,
    state: Mutex<RegistryState>,
    crl_path: PathBuf,
}

impl RevocationRegistry {
    /// Open the registry for `authority`, reloading any prior revocations
    /// and CRL sequence state from its state directory
    pub fn open(
        toolkit: Arc<dyn CryptoToolkit>,
        authority: Arc<CertificateAuthority>,
    ) -> Result<Self, Error> {
        let paths = authority.paths();
        let ledger = RevocationLedger::load_or_create(&paths.revocation_ledger())?;
        let sequence = CrlSequence::load_or_create(&paths.crl_sequence())?;
        let crl_path = paths.crl();
        Ok(Self {
            toolkit,
            authority,
            state: Mutex::new(RegistryState { ledger, sequence }),
            crl_path,
        })
    }

    /// Revoke an issued serial.
    ///
    /// # Arguments
    /// * `serial` - Serial of the certificate to revoke
    /// * `reason` - Reason recorded in the ledger and every future CRL
    ///
    /// # Returns
    /// * `Ok(RevocationRecord)` - The durably appended record
    /// * `Err(Error::UnknownSerial)` - If this CA never issued `serial`
    /// * `Err(Error::AlreadyRevoked)` - If `serial` was revoked before
    pub fn revoke(&self, serial: u64, reason: RevocationReason) -> Result<RevocationRecord, Error> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Storage("revocation ledger lock poisoned".to_string()))?;

        if !self.authority.has_issued(serial)? {
            return Err(Error::UnknownSerial(serial));
        }
        if state.ledger.contains(serial) {
            return Err(Error::AlreadyRevoked(serial));
        }

        let record = RevocationRecord {
            serial,
            reason,
            revoked_at: OffsetDateTime::now_utc(),
        };
        state.ledger.append(record.clone())?;

        info!(serial, reason = ?reason, "revoked certificate");
        Ok(record)
    }

    /// Whether `serial` has been revoked
    pub fn is_revoked(&self, serial: u64) -> Result<bool, Error> {
        let state = self
            .state
            .lock()
            .map_err(|_| Error::Storage("revocation ledger lock poisoned".to_string()))?;
        Ok(state.ledger.contains(serial))
    }

    /// Build, sign, and persist a fresh CRL covering every revocation to
    /// date. Emitting with an empty ledger is valid and yields an empty
    /// list; relying parties still learn the CA has nothing revoked.
    pub fn emit_crl(&self) -> Result<CrlDocument, Error> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Storage("revocation ledger lock poisoned".to_string()))?;

        let this_update = OffsetDateTime::now_utc();
        let next_update = this_update + Duration::days(i64::from(CRL_NEXT_UPDATE_DAYS));
        let crl_number = state.sequence.next();

        let crl_pem = self.toolkit.build_revocation_list(
            &self.authority.issuer_material(),
            state.ledger.records(),
            crl_number,
            this_update,
            next_update,
        )?;

        // The signed list exists; commit the number and persist the artifact
        state.sequence.advance()?;
        artifact_store::write_pem(&self.crl_path, &crl_pem)?;

        let entries = state.ledger.records().to_vec();
        info!(crl_number, entries = entries.len(), "emitted CRL");

        Ok(CrlDocument {
            crl_number,
            issuer: self.authority.certificate().subject.clone(),
            this_update,
            next_update,
            entries,
            crl_pem,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DistinguishedName, KeyBitLength, PrincipalRole, LEAF_VALIDITY_DAYS, ROOT_VALIDITY_DAYS,
    };
    use crate::request_builder::CertificateRequestBuilder;
    use crate::test_toolkit::FakeToolkit;

    fn setup(dir: &std::path::Path) -> (Arc<FakeToolkit>, Arc<CertificateAuthority>) {
        let toolkit = Arc::new(FakeToolkit::new());
        let ca = CertificateAuthority::bootstrap(
            toolkit.clone(),
            dir,
            DistinguishedName {
                country: "US".to_string(),
                organization: "ExampleCA".to_string(),
                common_name: "example-ca.local".to_string(),
                ..DistinguishedName::default()
            },
            ROOT_VALIDITY_DAYS,
        )
        .unwrap();
        (toolkit, Arc::new(ca))
    }

    fn issue_gateway(toolkit: &FakeToolkit, ca: &CertificateAuthority) -> u64 {
        let key = toolkit.generate_key_pair(KeyBitLength::Bits2048).unwrap();
        let request = CertificateRequestBuilder::new(PrincipalRole::Gateway)
            .common_name("example-gateway.local")
            .san_dns_name("example-gateway.local")
            .build(toolkit, &key)
            .unwrap();
        ca.sign(request, LEAF_VALIDITY_DAYS, None).unwrap().serial
    }

    #[test]
    fn test_revoke_unknown_serial_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, ca) = setup(dir.path());
        let registry = RevocationRegistry::open(toolkit, ca).unwrap();

        let result = registry.revoke(999, RevocationReason::Unspecified);
        assert!(matches!(result, Err(Error::UnknownSerial(999))));
    }

    #[test]
    fn test_revoke_twice_keeps_first_record() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, ca) = setup(dir.path());
        let serial = issue_gateway(&toolkit, &ca);
        let registry = RevocationRegistry::open(toolkit, ca).unwrap();

        let first = registry
            .revoke(serial, RevocationReason::KeyCompromise)
            .unwrap();
        let second = registry.revoke(serial, RevocationReason::Superseded);
        assert!(matches!(second, Err(Error::AlreadyRevoked(s)) if s == serial));

        let document = registry.emit_crl().unwrap();
        assert_eq!(document.entries, vec![first]);
    }

    #[test]
    fn test_emit_crl_numbers_increase_and_entries_persist() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, ca) = setup(dir.path());
        let serial = issue_gateway(&toolkit, &ca);
        let registry = RevocationRegistry::open(toolkit, ca).unwrap();

        let empty = registry.emit_crl().unwrap();
        assert_eq!(empty.crl_number, 1);
        assert!(empty.entries.is_empty());

        registry
            .revoke(serial, RevocationReason::KeyCompromise)
            .unwrap();
        let populated = registry.emit_crl().unwrap();
        assert_eq!(populated.crl_number, 2);
        assert_eq!(populated.entries.len(), 1);
        assert_eq!(populated.entries[0].serial, serial);

        let again = registry.emit_crl().unwrap();
        assert_eq!(again.crl_number, 3);
        assert_eq!(again.entries.len(), 1, "entries never drop out");
    }

    #[test]
    fn test_emit_crl_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, ca) = setup(dir.path());
        let crl_path = ca.paths().crl();
        let registry = RevocationRegistry::open(toolkit, ca).unwrap();

        let document = registry.emit_crl().unwrap();
        assert_eq!(std::fs::read_to_string(crl_path).unwrap(), document.crl_pem);
    }

    #[test]
    fn test_failed_crl_build_does_not_advance_number() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, ca) = setup(dir.path());
        let registry = RevocationRegistry::open(toolkit.clone(), ca).unwrap();

        toolkit.fail_next_crl();
        assert!(matches!(registry.emit_crl(), Err(Error::Signing(_))));

        let document = registry.emit_crl().unwrap();
        assert_eq!(document.crl_number, 1);
    }

    #[test]
    fn test_registry_reload_preserves_revocations_and_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let (toolkit, ca) = setup(dir.path());
        let serial = issue_gateway(&toolkit, &ca);
        {
            let registry = RevocationRegistry::open(toolkit.clone(), ca.clone()).unwrap();
            registry
                .revoke(serial, RevocationReason::CessationOfOperation)
                .unwrap();
            registry.emit_crl().unwrap();
        }

        let reopened = RevocationRegistry::open(toolkit, ca).unwrap();
        assert!(reopened.is_revoked(serial).unwrap());
        let document = reopened.emit_crl().unwrap();
        assert_eq!(document.crl_number, 2);
        assert_eq!(document.entries.len(), 1);
    }
}
