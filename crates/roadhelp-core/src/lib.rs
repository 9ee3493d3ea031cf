//! # roadhelp-core
//!
//! Core crate for RoadHelp. Contains the dispatch domain model, the
//! geodistance calculator and candidate filter, configuration schemas,
//! typed identifiers, the realtime wire events, identity token decoding,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other RoadHelp crates.

pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod geo;
pub mod identity;
pub mod model;
pub mod result;
pub mod types;

pub use error::AppError;
pub use geo::{Coordinate, distance_km};
pub use result::AppResult;
