//! Key Pair Provider Module
//!
//! Thin issuance-side wrapper over the toolkit's key generation operation.
//! Every principal gets a freshly generated key pair; nothing is cached or
//! reused between principals.

use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::model::KeyBitLength;
use crate::toolkit::{CryptoToolkit, KeyMaterial};

/// Generates per-principal RSA key pairs through the toolkit
#[derive(Clone)]
pub struct KeyPairProvider {
    toolkit: Arc<dyn CryptoToolkit>,
}

impl KeyPairProvider {
    pub fn new(toolkit: Arc<dyn CryptoToolkit>) -> Self {
        Self { toolkit }
    }

    /// Generate a fresh key pair at the given bit length.
    ///
    /// # Returns
    /// * `Ok(KeyMaterial)` - PEM-encoded private and public halves
    /// * `Err(Error::KeyGeneration)` - If the toolkit fails
    pub fn generate(&self, bit_length: KeyBitLength) -> Result<KeyMaterial, Error> {
        let key = self.toolkit.generate_key_pair(bit_length)?;
        debug!(bits = bit_length.bits(), "generated key pair");
        Ok(key)
    }
}
