//! CertForge - Certificate Lifecycle Manager
//!
//! Provisioning binary for a private mutual-TLS PKI. On first run it
//! bootstraps a self-signed root CA under the configured state directory;
//! on later runs it reopens the existing CA and resumes the serial
//! sequence. Each run issues a gateway certificate and a client
//! certificate from the configured defaults, exports the artifacts, and
//! publishes a fresh CRL.
//!
//! Configuration is read from `config.toml` when present; every field has
//! a built-in default (see [`certforge::configs`]).

use std::sync::Arc;

use anyhow::{Context, Result};

use certforge::certificate_authority::CertificateAuthority;
use certforge::configs::AppConfig;
use certforge::key_provider::KeyPairProvider;
use certforge::model::{DistinguishedName, IssuedCertificate, KeyBitLength, PrincipalRole};
use certforge::request_builder::CertificateRequestBuilder;
use certforge::revocation_registry::RevocationRegistry;
use certforge::standard_toolkit::StandardToolkit;
use certforge::{artifact_store, identity};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    println!("=== CertForge Provisioning ===\n");

    let config = AppConfig::load().context("Failed to load configuration")?;
    let toolkit = Arc::new(StandardToolkit::new());

    let ca = if config.state_dir.join("root_cert.pem").exists() {
        let ca = CertificateAuthority::open(toolkit.clone(), &config.state_dir)
            .context("Failed to reopen root CA")?;
        println!("✓ Reopened root CA '{}'", ca.certificate().subject.common_name);
        Arc::new(ca)
    } else {
        let dn = DistinguishedName {
            country: config.root_ca.country.clone(),
            state: config.root_ca.state.clone(),
            city: config.root_ca.locality.clone(),
            organization: config.root_ca.organization.clone(),
            organizational_unit: config.root_ca.organizational_unit.clone(),
            common_name: config.root_ca.common_name.clone(),
        };
        let ca = CertificateAuthority::bootstrap(
            toolkit.clone(),
            &config.state_dir,
            dn,
            config.root_ca.validity_days,
        )
        .context("Failed to bootstrap root CA")?;
        println!("✓ Bootstrapped root CA '{}'", ca.certificate().subject.common_name);
        Arc::new(ca)
    };

    let provider = KeyPairProvider::new(toolkit.clone());
    let exports = config.state_dir.join("exports");
    std::fs::create_dir_all(&exports).context("Failed to create exports directory")?;

    // Gateway certificate
    let gateway_key = provider
        .generate(KeyBitLength::Bits2048)
        .context("Failed to generate gateway key pair")?;
    let mut builder = CertificateRequestBuilder::new(PrincipalRole::Gateway)
        .country(&config.root_ca.country)
        .organization(&config.root_ca.organization)
        .common_name(&config.gateway.common_name);
    for name in &config.gateway.dns_names {
        builder = builder.san_dns_name(name);
    }
    for address in &config.gateway.ip_addresses {
        builder = builder.san_ip_address(address);
    }
    let request = builder
        .build(toolkit.as_ref(), &gateway_key)
        .context("Failed to build gateway signing request")?;
    artifact_store::write_pem(&exports.join("gateway.csr"), &request.csr_pem)
        .context("Failed to export gateway signing request")?;
    let gateway_cert = ca
        .sign(request, config.gateway.validity_days, None)
        .context("Failed to sign gateway certificate")?;
    export_principal(&exports, "gateway", &gateway_key.private_key_pem, &gateway_cert)?;
    println!(
        "✓ Issued gateway certificate '{}' (serial {})",
        gateway_cert.subject.common_name, gateway_cert.serial
    );

    // Client certificate with the identity claim in its URI SAN
    let client_key = provider
        .generate(KeyBitLength::Bits2048)
        .context("Failed to generate client key pair")?;
    let request = CertificateRequestBuilder::new(PrincipalRole::Client)
        .country(&config.root_ca.country)
        .organization(&config.root_ca.organization)
        .common_name(&config.client.common_name)
        .san_identity(config.client.user_id, &config.client.platform)
        .build(toolkit.as_ref(), &client_key)
        .context("Failed to build client signing request")?;
    artifact_store::write_pem(&exports.join("client.csr"), &request.csr_pem)
        .context("Failed to export client signing request")?;
    let client_cert = ca
        .sign(
            request,
            config.client.validity_days,
            config.client.pinned_serial,
        )
        .context("Failed to sign client certificate")?;
    export_principal(&exports, "client", &client_key.private_key_pem, &client_cert)?;
    let claim = identity::encode(config.client.user_id, &config.client.platform)?;
    println!(
        "✓ Issued client certificate '{}' (serial {}, claim {:?})",
        client_cert.subject.common_name, client_cert.serial, claim
    );

    // Publish a CRL covering everything revoked to date
    let registry =
        RevocationRegistry::open(toolkit, ca).context("Failed to open revocation registry")?;
    let crl = registry.emit_crl().context("Failed to emit CRL")?;
    println!(
        "✓ Published CRL number {} with {} entries",
        crl.crl_number,
        crl.entries.len()
    );

    Ok(())
}

fn export_principal(
    exports: &std::path::Path,
    name: &str,
    private_key_pem: &str,
    certificate: &IssuedCertificate,
) -> Result<()> {
    artifact_store::write_private_key(&exports.join(format!("{}.key", name)), private_key_pem)
        .with_context(|| format!("Failed to export {} key", name))?;
    artifact_store::write_pem(
        &exports.join(format!("{}.crt", name)),
        &certificate.certificate_pem,
    )
    .with_context(|| format!("Failed to export {} certificate", name))?;
    Ok(())
}
