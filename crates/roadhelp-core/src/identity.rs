//! Session identity bootstrap from an opaque bearer token.
//!
//! The token is issued and verified elsewhere. Here we only read the
//! claims segment of a JWT (`header.payload.signature`) to learn who the
//! session belongs to; no signature check happens on this path.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use crate::error::AppError;
use crate::model::Identity;
use crate::types::id::UserId;

/// Claim names that may carry the user ID, in lookup order.
const ID_CLAIMS: [&str; 4] = ["userid", "userId", "id", "sub"];

/// Claim names that may carry the display name, in lookup order.
const NAME_CLAIMS: [&str; 3] = ["name", "displayName", "username"];

/// Decodes the identity claims from a JWT without verifying it.
pub fn decode_identity(token: &str) -> Result<Identity, AppError> {
    let payload = token
        .trim()
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| AppError::authentication("Token is not a JWT"))?;

    // Some issuers pad the segment; the URL-safe engine rejects padding.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AppError::authentication(format!("Token payload is not base64url: {e}")))?;

    let claims: Value = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::authentication(format!("Token payload is not JSON: {e}")))?;

    let id = ID_CLAIMS
        .iter()
        .find_map(|claim| claims.get(*claim).filter(|v| !v.is_null()))
        .cloned()
        .ok_or_else(|| AppError::authentication("Token has no user id claim"))
        .and_then(|value| {
            serde_json::from_value::<UserId>(value)
                .map_err(|e| AppError::authentication(format!("Invalid user id claim: {e}")))
        })?;

    let display_name = NAME_CLAIMS
        .iter()
        .find_map(|claim| claims.get(*claim).and_then(Value::as_str))
        .ok_or_else(|| AppError::authentication("Token has no name claim"))?;

    Ok(Identity::new(id, display_name))
}

/// Like [`decode_identity`], but logs and returns `None` on failure.
///
/// A session without identity runs with the dispatch flow disabled.
pub fn bootstrap_identity(token: Option<&str>) -> Option<Identity> {
    let token = token?;
    match decode_identity(token) {
        Ok(identity) => Some(identity),
        Err(e) => {
            tracing::warn!(error = %e, "Could not decode session token; help requests disabled");
            None
        }
    }
}
