//! Log decoding for router access logs in logfmt form.

pub mod parse;
pub mod record;

pub use parse::{open_source, read_records};
pub use record::LogRecord;
