//! # ngnet-common
//!
//! Shared types for the ngnet netgraph tools.
//!
//! This crate provides functionality used across all ngnet crates:
//! - Validated node names and canonical graph paths
//! - Link-layer address parsing
//! - Common error types

#![warn(missing_docs)]

pub mod error;
pub mod lladdr;
pub mod name;

pub use error::{NgError, NgResult};
pub use lladdr::LinkAddr;
pub use name::{GraphPath, NodeName};
