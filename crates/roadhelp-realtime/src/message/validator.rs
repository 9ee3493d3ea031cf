//! Inbound frame validation rules.

use roadhelp_core::error::AppError;
use roadhelp_core::events::AcceptHelp;

use crate::connection::handle::ConnectionHandle;

/// Rejects empty or oversized frames before parsing.
pub fn validate_inbound(raw: &str, max_bytes: usize) -> Result<(), AppError> {
    if raw.len() > max_bytes {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {max_bytes} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Checks an acceptance claim is made by the connected helper about a
/// plausible location.
pub fn validate_claim(handle: &ConnectionHandle, claim: &AcceptHelp) -> Result<(), AppError> {
    if claim.acceptance.helper_id != *handle.user_id() {
        return Err(AppError::validation(
            "Acceptance helper does not match the connected user",
        ));
    }
    if claim.acceptance.helper_name.trim().is_empty() {
        return Err(AppError::validation("Acceptance is missing the helper name"));
    }
    claim.acceptance.helper_position.validate()
}
