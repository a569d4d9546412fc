//! CertForge - Certificate Lifecycle Manager Library
//!
//! A private-PKI system for mutual-TLS deployments: one self-signed root CA
//! issues certificates to two kinds of principals, gateways (servers) and
//! clients, then tracks revocations and publishes signed CRLs.
//!
//! # Overview
//!
//! ```text
//! Root CA (self-signed, serial 1)
//!   ├── Gateway certificate (serverAuth, DNS/IP SANs)
//!   └── Client certificate (clientAuth, identity claim in URI SAN)
//! ```
//!
//! Every certificate carries the X.509v3 extension bundle fixed by its
//! role; requests that disagree with the role's policy are rejected rather
//! than silently corrected. Client certificates embed a JSON identity
//! claim (`userId`, `platform`) in their single URI SAN entry, which the
//! downstream authentication layer reads back at connection time.
//!
//! All CA state is durable under one directory: the root key and
//! certificate, an append-only issuance ledger that drives strictly
//! increasing serial allocation across restarts, an append-only revocation
//! ledger, and the CRL sequence counter.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use certforge::certificate_authority::CertificateAuthority;
//! use certforge::key_provider::KeyPairProvider;
//! use certforge::model::{DistinguishedName, KeyBitLength, PrincipalRole};
//! use certforge::model::{LEAF_VALIDITY_DAYS, ROOT_VALIDITY_DAYS};
//! use certforge::request_builder::CertificateRequestBuilder;
//! use certforge::revocation_registry::RevocationRegistry;
//! use certforge::standard_toolkit::StandardToolkit;
//!
//! fn main() -> Result<(), certforge::error::Error> {
//!     let toolkit = Arc::new(StandardToolkit::new());
//!
//!     // Bootstrap the root CA
//!     let ca = Arc::new(CertificateAuthority::bootstrap(
//!         toolkit.clone(),
//!         std::path::Path::new("ca_state"),
//!         DistinguishedName {
//!             country: "US".to_string(),
//!             organization: "ExampleCA".to_string(),
//!             common_name: "example-ca.local".to_string(),
//!             ..DistinguishedName::default()
//!         },
//!         ROOT_VALIDITY_DAYS,
//!     )?);
//!
//!     // Issue a gateway certificate
//!     let provider = KeyPairProvider::new(toolkit.clone());
//!     let gateway_key = provider.generate(KeyBitLength::Bits2048)?;
//!     let request = CertificateRequestBuilder::new(PrincipalRole::Gateway)
//!         .common_name("example-gateway.local")
//!         .san_dns_name("example-gateway.local")
//!         .san_ip_address("127.0.0.1")
//!         .build(toolkit.as_ref(), &gateway_key)?;
//!     let issued = ca.sign(request, LEAF_VALIDITY_DAYS, None)?;
//!
//!     // Revoke it and publish a CRL
//!     let registry = RevocationRegistry::open(toolkit, ca)?;
//!     registry.revoke(issued.serial, certforge::model::RevocationReason::KeyCompromise)?;
//!     let crl = registry.emit_crl()?;
//!     println!("CRL number {} with {} entries", crl.crl_number, crl.entries.len());
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`model`]: Shared domain types (roles, names, SAN entries, records)
//! - [`extension_policy`]: The fixed per-role X.509v3 extension bundles
//! - [`identity`]: Codec for the client identity claim in the URI SAN
//! - [`toolkit`]: The narrow cryptographic boundary the core calls through
//! - [`standard_toolkit`]: Production toolkit (openssl keys, rcgen X.509)
//! - [`key_provider`]: Per-principal RSA key pair generation
//! - [`request_builder`]: Role-shaped CSR construction and validation
//! - [`certificate_authority`]: Bootstrap, reopen, and sign with monotonic serials
//! - [`revocation_registry`]: Append-only revocation and CRL emission
//! - [`ledger`]: The durable JSON-lines ledgers behind both of the above
//! - [`artifact_store`]: State-directory layout and artifact IO
//! - [`configs`]: TOML configuration for the provisioning binary

pub mod artifact_store;
pub mod certificate_authority;
pub mod configs;
pub mod error;
pub mod extension_policy;
pub mod identity;
pub mod key_provider;
pub mod ledger;
pub mod model;
pub mod request_builder;
pub mod revocation_registry;
pub mod standard_toolkit;
pub mod toolkit;

#[cfg(test)]
pub(crate) mod test_toolkit;
