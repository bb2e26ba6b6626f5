//! Common types and utilities shared across container generations.
//!
//! This module provides the unified error type, configuration, and the
//! charset and escaping helpers used by both manifest dialects.

// Submodule declarations
pub mod config;
pub mod encoding;
pub mod error;
pub mod xml;

// Re-exports for convenience
pub use config::{PackConfig, UnmatchedMark};
pub use error::{Error, Result};
