//! Shared types for the HeronDB storage subsystem: errors, namespaces,
//! catalog metadata, timestamps, and configuration.
//!
//! This crate carries no engine logic. Everything here is either persisted
//! (metadata records), passed across crate boundaries (errors, config), or a
//! service trait injected from above (the logical clock).

pub mod clock;
pub mod config;
pub mod error;
pub mod invariant;
pub mod metadata;
pub mod namespace;
pub mod types;
