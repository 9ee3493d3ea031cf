//! Device position sources.

use std::sync::RwLock;

use async_trait::async_trait;

use roadhelp_core::error::AppError;
use roadhelp_core::geo::Coordinate;
use roadhelp_core::result::AppResult;

/// Something that can report where the device is.
#[async_trait]
pub trait PositionSource: Send + Sync + std::fmt::Debug + 'static {
    /// Waits for a fix. Fails with `PositionUnavailable` if none can be had.
    async fn current_position(&self) -> AppResult<Coordinate>;
}

/// A position set by hand: fixed installs, simulators, tests.
#[derive(Debug, Default)]
pub struct ManualPosition {
    current: RwLock<Option<Coordinate>>,
}

impl ManualPosition {
    /// Starts at `position`.
    pub fn at(position: Coordinate) -> Self {
        Self {
            current: RwLock::new(Some(position)),
        }
    }

    /// Starts without a fix.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Moves to `position`.
    pub fn set(&self, position: Coordinate) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(position);
    }

    /// Loses the fix.
    pub fn clear(&self) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

#[async_trait]
impl PositionSource for ManualPosition {
    async fn current_position(&self) -> AppResult<Coordinate> {
        let current = *self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let position = current.ok_or_else(|| AppError::position_unavailable("No position fix"))?;
        position
            .validate()
            .map_err(|e| AppError::position_unavailable(format!("Invalid position fix: {}", e.message)))?;
        Ok(position)
    }
}
