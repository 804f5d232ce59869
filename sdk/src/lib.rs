//! Swarm SDK
//!
//! Shared error vocabulary for Swarm components.
//! The engine and its integration tests both depend on this crate.

/// Error types and handling
pub mod errors;

// Re-export commonly used types
pub use errors::{EngineError, SwarmErrorExt};
