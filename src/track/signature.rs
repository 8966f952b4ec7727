//! Request signature type used as the aggregation key.
//!
//! Example: method GET, path /api/users/42  =>  GET::/api/users/{user_id}
//!
//! Ord keys the allow-list BTreeSet; Hash keys the store's first-seen map.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TrackedSignature {
    pub method: String,
    pub template: String,
}

impl TrackedSignature {
    pub fn new(method: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            template: template.into(),
        }
    }
}

impl fmt::Display for TrackedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.method, self.template)
    }
}
