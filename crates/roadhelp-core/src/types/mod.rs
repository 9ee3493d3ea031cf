//! Core type definitions used across the RoadHelp workspace.

pub mod id;

pub use id::*;
