//! Certificate Request Builder Module
//!
//! Builds role-shaped certificate signing requests for gateway and client
//! principals. The builder validates the SAN shape its role requires before
//! asking the toolkit for the PKCS#10 encoding, so a malformed request never
//! reaches the signing path.
//!
//! Role shapes:
//! * Gateway - one or more DNS or IP entries, every IP parseable
//! * Client - exactly one URI entry carrying a decodable identity claim

use crate::error::Error;
use crate::extension_policy::{extensions_for, ExtensionSet};
use crate::identity;
use crate::model::{DistinguishedName, PrincipalRole, SanEntry};
use crate::toolkit::{CryptoToolkit, KeyMaterial};

/// A validated signing request: the PKCS#10 encoding plus the structured
/// fields the CA applies at signing time
#[derive(Debug, Clone)]
pub struct CertificateSigningRequest {
    pub role: PrincipalRole,
    pub distinguished_name: DistinguishedName,
    pub public_key_pem: String,
    pub san_entries: Vec<SanEntry>,
    /// The role's policy bundle, echoed so the CA can detect tampering
    pub requested_extensions: ExtensionSet,
    /// PEM-encoded PKCS#10 request
    pub csr_pem: String,
}

/// Builder for [`CertificateSigningRequest`]
pub struct CertificateRequestBuilder {
    role: PrincipalRole,
    dn: DistinguishedName,
    san_entries: Vec<SanEntry>,
    identity_claim: Option<(u64, String)>,
}

impl CertificateRequestBuilder {
    pub fn new(role: PrincipalRole) -> Self {
        Self {
            role,
            dn: DistinguishedName::default(),
            san_entries: Vec::new(),
            identity_claim: None,
        }
    }

    pub fn country(mut self, country: &str) -> Self {
        self.dn.country = country.to_string();
        self
    }

    pub fn state(mut self, state: &str) -> Self {
        self.dn.state = state.to_string();
        self
    }

    pub fn city(mut self, city: &str) -> Self {
        self.dn.city = city.to_string();
        self
    }

    pub fn organization(mut self, organization: &str) -> Self {
        self.dn.organization = organization.to_string();
        self
    }

    pub fn organizational_unit(mut self, organizational_unit: &str) -> Self {
        self.dn.organizational_unit = organizational_unit.to_string();
        self
    }

    pub fn common_name(mut self, common_name: &str) -> Self {
        self.dn.common_name = common_name.to_string();
        self
    }

    /// Add a DNS SAN entry (gateway requests)
    pub fn san_dns_name(mut self, name: &str) -> Self {
        self.san_entries.push(SanEntry::Dns(name.to_string()));
        self
    }

    /// Add an IP address SAN entry (gateway requests)
    pub fn san_ip_address(mut self, address: &str) -> Self {
        self.san_entries.push(SanEntry::Ip(address.to_string()));
        self
    }

    /// Set the identity claim carried in the URI SAN entry (client requests)
    pub fn san_identity(mut self, user_id: u64, platform: &str) -> Self {
        self.identity_claim = Some((user_id, platform.to_string()));
        self
    }

    /// Validate the request shape and build the PKCS#10 encoding.
    ///
    /// # Arguments
    /// * `toolkit` - Toolkit used for the PKCS#10 construction
    /// * `key` - The principal's key pair
    ///
    /// # Returns
    /// * `Ok(CertificateSigningRequest)` - Validated request
    /// * `Err(Error::InvalidRequest)` - If the SAN shape does not match the role
    pub fn build(
        mut self,
        toolkit: &dyn CryptoToolkit,
        key: &KeyMaterial,
    ) -> Result<CertificateSigningRequest, Error> {
        if self.role == PrincipalRole::RootCa {
            return Err(Error::InvalidRequest(
                "root CA certificates are self-signed, not requested".to_string(),
            ));
        }
        if self.dn.common_name.is_empty() {
            return Err(Error::InvalidRequest(
                "common name must not be empty".to_string(),
            ));
        }

        if let Some((user_id, platform)) = self.identity_claim.take() {
            self.san_entries.push(identity::encode(user_id, &platform)?);
        }

        match self.role {
            PrincipalRole::Gateway => self.validate_gateway_entries()?,
            PrincipalRole::Client => self.validate_client_entries()?,
            PrincipalRole::RootCa => unreachable!("rejected above"),
        }

        let csr_pem = toolkit.build_signing_request(&self.dn, key)?;

        Ok(CertificateSigningRequest {
            role: self.role,
            distinguished_name: self.dn,
            public_key_pem: key.public_key_pem.clone(),
            san_entries: self.san_entries,
            requested_extensions: extensions_for(self.role),
            csr_pem,
        })
    }

    fn validate_gateway_entries(&self) -> Result<(), Error> {
        let mut addressable = 0;
        for entry in &self.san_entries {
            match entry {
                SanEntry::Dns(name) => {
                    if name.is_empty() {
                        return Err(Error::InvalidRequest(
                            "DNS SAN entry must not be empty".to_string(),
                        ));
                    }
                    addressable += 1;
                }
                SanEntry::Ip(address) => {
                    if address.parse::<std::net::IpAddr>().is_err() {
                        return Err(Error::InvalidRequest(format!(
                            "IP SAN entry is not a valid address: {}",
                            address
                        )));
                    }
                    addressable += 1;
                }
                SanEntry::Uri(_) => {
                    return Err(Error::InvalidRequest(
                        "gateway requests must not carry URI SAN entries".to_string(),
                    ));
                }
            }
        }
        if addressable == 0 {
            return Err(Error::InvalidRequest(
                "gateway requests need at least one DNS or IP SAN entry".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_client_entries(&self) -> Result<(), Error> {
        match self.san_entries.as_slice() {
            [SanEntry::Uri(uri)] => {
                identity::decode(uri)?;
                Ok(())
            }
            [] => Err(Error::InvalidRequest(
                "client requests need an identity claim".to_string(),
            )),
            _ => Err(Error::InvalidRequest(
                "client requests carry exactly one URI SAN entry".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KeyBitLength;
    use crate::test_toolkit::FakeToolkit;

    fn test_key(toolkit: &FakeToolkit) -> KeyMaterial {
        toolkit.generate_key_pair(KeyBitLength::Bits2048).unwrap()
    }

    #[test]
    fn test_gateway_request_with_dns_and_ip() {
        let toolkit = FakeToolkit::new();
        let key = test_key(&toolkit);
        let request = CertificateRequestBuilder::new(PrincipalRole::Gateway)
            .country("US")
            .organization("ExampleCA")
            .common_name("example-gateway.local")
            .san_dns_name("example-gateway.local")
            .san_dns_name("localhost")
            .san_ip_address("127.0.0.1")
            .san_ip_address("127.1.0.3")
            .build(&toolkit, &key)
            .unwrap();

        assert_eq!(request.role, PrincipalRole::Gateway);
        assert_eq!(request.san_entries.len(), 4);
        assert_eq!(request.public_key_pem, key.public_key_pem);
        assert!(!request.csr_pem.is_empty());
    }

    #[test]
    fn test_client_request_with_identity_claim() {
        let toolkit = FakeToolkit::new();
        let key = test_key(&toolkit);
        let request = CertificateRequestBuilder::new(PrincipalRole::Client)
            .country("US")
            .organization("ExampleCA")
            .common_name("client0.example.local")
            .san_identity(100, "Linux")
            .build(&toolkit, &key)
            .unwrap();

        assert_eq!(request.san_entries.len(), 1);
        match &request.san_entries[0] {
            SanEntry::Uri(uri) => {
                let context = crate::identity::decode(uri).unwrap();
                assert_eq!(context.user_id, 100);
                assert_eq!(context.platform, "Linux");
            }
            other => panic!("Wrong SAN entry kind: {:?}", other),
        }
    }

    #[test]
    fn test_root_ca_role_is_rejected() {
        let toolkit = FakeToolkit::new();
        let key = test_key(&toolkit);
        let result = CertificateRequestBuilder::new(PrincipalRole::RootCa)
            .common_name("example-ca.local")
            .build(&toolkit, &key);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_gateway_without_san_entries_is_rejected() {
        let toolkit = FakeToolkit::new();
        let key = test_key(&toolkit);
        let result = CertificateRequestBuilder::new(PrincipalRole::Gateway)
            .common_name("example-gateway.local")
            .build(&toolkit, &key);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_gateway_with_malformed_ip_is_rejected() {
        let toolkit = FakeToolkit::new();
        let key = test_key(&toolkit);
        let result = CertificateRequestBuilder::new(PrincipalRole::Gateway)
            .common_name("example-gateway.local")
            .san_ip_address("999.1.2.3")
            .build(&toolkit, &key);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_client_with_dns_entry_is_rejected() {
        let toolkit = FakeToolkit::new();
        let key = test_key(&toolkit);
        let result = CertificateRequestBuilder::new(PrincipalRole::Client)
            .common_name("client0.example.local")
            .san_dns_name("client0.example.local")
            .san_identity(100, "Linux")
            .build(&toolkit, &key);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_client_without_identity_is_rejected() {
        let toolkit = FakeToolkit::new();
        let key = test_key(&toolkit);
        let result = CertificateRequestBuilder::new(PrincipalRole::Client)
            .common_name("client0.example.local")
            .build(&toolkit, &key);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_empty_common_name_is_rejected() {
        let toolkit = FakeToolkit::new();
        let key = test_key(&toolkit);
        let result = CertificateRequestBuilder::new(PrincipalRole::Gateway)
            .san_dns_name("example-gateway.local")
            .build(&toolkit, &key);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }
}
