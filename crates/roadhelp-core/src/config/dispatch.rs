//! Help-dispatch workflow configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Upper bound for every dispatch duration setting (30 days).
pub const MAX_DISPATCH_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Tunables for candidate selection and the request lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Candidate radius around the requester, in kilometres.
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    /// Seconds after which an unaccepted request is expired (0 = never).
    #[serde(default)]
    pub pending_timeout_seconds: u64,
    /// Seconds the dispatcher remembers a matched request after its acceptance.
    #[serde(default = "default_settled_retention_seconds")]
    pub settled_retention_seconds: u64,
}

impl DispatchConfig {
    /// Pending timeout, or `None` when expiry is disabled.
    pub fn pending_timeout(&self) -> Option<Duration> {
        (self.pending_timeout_seconds > 0).then(|| Duration::from_secs(self.pending_timeout_seconds))
    }

    /// How long matched requests are kept.
    pub fn settled_retention(&self) -> Duration {
        Duration::from_secs(self.settled_retention_seconds)
    }

    /// Checks the radius is a usable distance and the durations are bounded.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.radius_km.is_finite() || self.radius_km < 0.0 {
            return Err(AppError::configuration(format!(
                "dispatch.radius_km must be a non-negative distance, got {}",
                self.radius_km
            )));
        }
        if self.pending_timeout_seconds > MAX_DISPATCH_SECONDS {
            return Err(AppError::configuration(format!(
                "dispatch.pending_timeout_seconds must be at most {MAX_DISPATCH_SECONDS}, got {}",
                self.pending_timeout_seconds
            )));
        }
        if self.settled_retention_seconds == 0
            || self.settled_retention_seconds > MAX_DISPATCH_SECONDS
        {
            return Err(AppError::configuration(format!(
                "dispatch.settled_retention_seconds must be between 1 and {MAX_DISPATCH_SECONDS}, got {}",
                self.settled_retention_seconds
            )));
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            radius_km: default_radius_km(),
            pending_timeout_seconds: 0,
            settled_retention_seconds: default_settled_retention_seconds(),
        }
    }
}

fn default_radius_km() -> f64 {
    6.0
}

fn default_settled_retention_seconds() -> u64 {
    3600
}
