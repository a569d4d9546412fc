//! Identity Claim Codec Module
//!
//! Encodes and decodes the structured identity claim carried in a client
//! certificate's URI SAN entry. The payload is a canonical JSON object with
//! exactly two keys in stable order: `userId`, then `platform`.
//!
//! This is the one codec boundary the downstream authentication component
//! depends on when it reads the claim back out of the certificate at
//! connection time, so the field names and types must remain stable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::model::SanEntry;

/// User/device access context stored as JSON in a client certificate's
/// SAN URI entry
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AccessContext {
    /// Numeric user id for the certificate holder
    pub user_id: u64,
    /// Machine platform hosting the certificate
    pub platform: String,
}

/// Reasons an identity claim payload is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityDecodeError {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("userId field is missing")]
    MissingUserId,
    #[error("userId field is not an unsigned integer")]
    InvalidUserId,
    #[error("platform field is missing")]
    MissingPlatform,
    #[error("platform field is empty")]
    EmptyPlatform,
}

/// Encode an identity claim into a URI SAN entry.
///
/// # Arguments
/// * `user_id` - Numeric user id
/// * `platform` - Non-empty platform string
///
/// # Returns
/// * `Ok(SanEntry::Uri)` - The canonical JSON payload as a URI entry
/// * `Err(Error::InvalidRequest)` - If `platform` is empty
pub fn encode(user_id: u64, platform: &str) -> Result<SanEntry, Error> {
    if platform.is_empty() {
        return Err(Error::InvalidRequest(
            "identity claim platform must not be empty".to_string(),
        ));
    }

    let context = AccessContext {
        user_id,
        platform: platform.to_string(),
    };
    let json = serde_json::to_string(&context)
        .map_err(|e| Error::InvalidRequest(format!("failed to serialize identity claim: {}", e)))?;

    Ok(SanEntry::Uri(json))
}

/// Decode an identity claim from a URI SAN payload.
///
/// # Arguments
/// * `uri` - The raw URI SAN payload
///
/// # Returns
/// * `Ok(AccessContext)` - The decoded `(userId, platform)` pair
/// * `Err(IdentityDecodeError)` - If the payload is not a JSON object, if
///   `userId` is missing or not an unsigned integer, or if `platform` is
///   missing or empty
pub fn decode(uri: &str) -> Result<AccessContext, IdentityDecodeError> {
    let value: serde_json::Value =
        serde_json::from_str(uri).map_err(|_| IdentityDecodeError::NotAnObject)?;
    let object = value.as_object().ok_or(IdentityDecodeError::NotAnObject)?;

    let user_id = object
        .get("userId")
        .ok_or(IdentityDecodeError::MissingUserId)?
        .as_u64()
        .ok_or(IdentityDecodeError::InvalidUserId)?;

    let platform = object
        .get("platform")
        .ok_or(IdentityDecodeError::MissingPlatform)?
        .as_str()
        .ok_or(IdentityDecodeError::MissingPlatform)?;
    if platform.is_empty() {
        return Err(IdentityDecodeError::EmptyPlatform);
    }

    Ok(AccessContext {
        user_id,
        platform: platform.to_string(),
    })
}
