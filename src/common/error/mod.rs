//! Unified error types for pubpack.
//!
//! Every reader, writer and codec in this crate reports failures through a
//! single [`Error`] type so that callers driving a packaging pass can match on
//! the failure category without caring which container generation produced it.

// Submodule declarations
pub mod types;
pub mod conversions;

// Re-exports
pub use types::{Error, Result};
