//! Study Swarm Engine Library
//!
//! This library provides the core functionality of the swarm assistant.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Generative model abstraction layer
pub mod llm;

/// Long-term fact store
pub mod memory;

/// Document text extraction
pub mod document;

/// Specialist agents
pub mod agents;

/// Conductor orchestration module
pub mod conductor;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
