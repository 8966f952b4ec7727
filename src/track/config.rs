//! Tracking config: which request paths are recognised and which signatures
//! are aggregated.
//!
//! JSON shape (every field optional, defaults shown):
//! {
//!   "pattern": "^/api/users/(\\d+)(?:/(?:count_pending_messages|...))?$",
//!   "placeholder": "{user_id}",
//!   "signatures": [
//!     { "method": "GET", "template": "/api/users/{user_id}" },
//!     ...
//!   ]
//! }
//!
//! The pattern must contain exactly one capture group: the numeric id that
//! gets replaced by the placeholder. A signature is tracked only on exact
//! method + template equality. Methods are trimmed and uppercased on both
//! sides, in the config and on every request, before they are compared.

use crate::track::TrackedSignature;

use anyhow::{Context, bail};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;

pub const DEFAULT_PATTERN: &str = r"^/api/users/(\d+)(?:/(?:count_pending_messages|get_messages|get_friends_progress|get_friends_score))?$";

pub const DEFAULT_PLACEHOLDER: &str = "{user_id}";

const DEFAULT_SIGNATURES: [(&str, &str); 6] = [
    ("GET", "/api/users/{user_id}/count_pending_messages"),
    ("GET", "/api/users/{user_id}/get_messages"),
    ("GET", "/api/users/{user_id}/get_friends_progress"),
    ("GET", "/api/users/{user_id}/get_friends_score"),
    ("POST", "/api/users/{user_id}"),
    ("GET", "/api/users/{user_id}"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingSpec {
    #[serde(default = "default_pattern")]
    pub pattern: String,

    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    #[serde(default = "default_signatures")]
    pub signatures: Vec<RawSignature>,
}

/// Raw signature shape as it appears in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSignature {
    pub method: String,
    pub template: String,
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_signatures() -> Vec<RawSignature> {
    DEFAULT_SIGNATURES
        .iter()
        .map(|(method, template)| RawSignature {
            method: method.to_string(),
            template: template.to_string(),
        })
        .collect()
}

impl Default for TrackingSpec {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            placeholder: default_placeholder(),
            signatures: default_signatures(),
        }
    }
}

impl TrackingSpec {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read tracking config {}", path))?;
        serde_json::from_str(&text).with_context(|| format!("parse tracking config {}", path))
    }

    /// Compile the pattern and validate the allow-list.
    ///
    /// Rejects:
    /// - a pattern that does not compile, or has a capture group count other than one
    /// - an empty placeholder
    /// - an empty signature list
    /// - signatures with an empty method or a template lacking the placeholder
    /// - duplicate signatures
    pub fn validate_and_build(&self) -> anyhow::Result<Tracking> {
        let re = Regex::new(&self.pattern)
            .with_context(|| format!("invalid endpoint pattern {:?}", self.pattern))?;

        // captures_len counts the implicit whole-match group.
        if re.captures_len() != 2 {
            bail!(
                "endpoint pattern must have exactly one capture group for the id (found {}): {:?}",
                re.captures_len() - 1,
                self.pattern
            );
        }

        if self.placeholder.is_empty() {
            bail!("placeholder cannot be empty");
        }

        if self.signatures.is_empty() {
            bail!("tracking config contained no signatures");
        }

        let mut signatures = BTreeSet::new();
        for raw in &self.signatures {
            let method = normalize_method(&raw.method);
            if method.is_empty() {
                bail!("signature for template {:?} has an empty method", raw.template);
            }
            if !raw.template.contains(&self.placeholder) {
                bail!(
                    "signature template {:?} does not contain placeholder {:?}",
                    raw.template,
                    self.placeholder
                );
            }

            let sig = TrackedSignature::new(method, raw.template.clone());
            if !signatures.insert(sig.clone()) {
                bail!("duplicate tracked signature: {}", sig);
            }
        }

        Ok(Tracking {
            pattern: EndpointPattern {
                re,
                placeholder: self.placeholder.clone(),
            },
            signatures,
        })
    }
}

fn normalize_method(method: &str) -> String {
    method.trim().to_ascii_uppercase()
}

/// Compiled path pattern: finds the id in a request path and templates it.
#[derive(Debug, Clone)]
pub struct EndpointPattern {
    re: Regex,
    placeholder: String,
}

impl EndpointPattern {
    /// Replace the captured id with the placeholder, or None if the path does
    /// not match.
    pub fn template(&self, path: &str) -> Option<String> {
        let id = self.re.captures(path)?.get(1)?;

        let mut out = String::with_capacity(path.len() + self.placeholder.len());
        out.push_str(&path[..id.start()]);
        out.push_str(&self.placeholder);
        out.push_str(&path[id.end()..]);
        Some(out)
    }
}

/// Validated tracking config ready for aggregation.
#[derive(Debug, Clone)]
pub struct Tracking {
    pub pattern: EndpointPattern,
    pub signatures: BTreeSet<TrackedSignature>,
}

impl Tracking {
    /// Canonical signature for a request, if its path matches the pattern.
    /// Whether the signature is tracked is a separate question, see `is_tracked`.
    pub fn signature(&self, method: &str, path: &str) -> Option<TrackedSignature> {
        let template = self.pattern.template(path)?;
        Some(TrackedSignature::new(normalize_method(method), template))
    }

    pub fn is_tracked(&self, sig: &TrackedSignature) -> bool {
        self.signatures.contains(sig)
    }
}
