use std::collections::BTreeMap;

/// One router request line, decoded from logfmt.
///
/// Durations are kept as raw strings (`"12ms"`); the aggregator strips the
/// unit suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub method: String,
    pub path: String,
    pub worker_id: String,
    pub connect: String,
    pub service: String,
}

impl LogRecord {
    /// Build a record from decoded logfmt fields.
    ///
    /// Returns None when any of `method`, `path`, `dyno`, `connect`, `service`
    /// is missing: such lines are not router request lines.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Option<Self> {
        Some(Self {
            method: fields.get("method")?.clone(),
            path: fields.get("path")?.clone(),
            worker_id: fields.get("dyno")?.clone(),
            connect: fields.get("connect")?.clone(),
            service: fields.get("service")?.clone(),
        })
    }
}
