//! Tracking layer: request signatures and the validated allow-list.
//!
//! This module is separate from log decoding and aggregation. It owns:
//! - TrackedSignature (method + templated path)
//! - Tracking config (endpoint pattern + tracked signatures)

pub mod config;
pub mod signature;

pub use config::{Tracking, TrackingSpec};
pub use signature::TrackedSignature;
