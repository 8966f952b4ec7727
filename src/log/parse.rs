use crate::log::record::LogRecord;
use anyhow::{Context, bail};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

/// Counts from one pass over a log source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub lines: usize,
    pub records: usize,
}

/// Open a log source for line-by-line reading. `-` means stdin.
pub fn open_source(path: &str) -> anyhow::Result<Box<dyn BufRead>> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("open log file {}", path))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Stream logfmt lines from `reader`, calling `sink` once per router record.
///
/// Lines are handed over one at a time, in input order. Blank lines and lines
/// lacking request fields are skipped; a syntax error stops the read.
pub fn read_records<R, F>(reader: R, source: &str, mut sink: F) -> anyhow::Result<ReadSummary>
where
    R: BufRead,
    F: FnMut(LogRecord),
{
    let mut summary = ReadSummary::default();

    for (lineno, line) in reader.lines().enumerate() {
        let lno = lineno + 1;
        let line = line.with_context(|| format!("read error at {}:{}", source, lno))?;
        summary.lines += 1;

        if line.trim().is_empty() {
            continue;
        }

        let fields = parse_logfmt_line(&line)
            .with_context(|| format!("log parse error at {}:{}", source, lno))?;

        match LogRecord::from_fields(&fields) {
            Some(record) => {
                summary.records += 1;
                sink(record);
            }
            None => {
                tracing::trace!(source, line = lno, "skipping line without request fields");
            }
        }
    }

    Ok(summary)
}

/// Decode one logfmt line into key/value pairs.
///
/// - `key=value` pairs separated by whitespace
/// - `key="quoted value"` with `\"`, `\\`, `\n`, `\t`, `\r` escapes
/// - a bare `key` maps to "true", `key=` maps to ""
/// - repeated keys: last one wins
pub fn parse_logfmt_line(line: &str) -> anyhow::Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }

        if chars.next_if_eq(&'=').is_none() {
            out.insert(key, "true".to_string());
            continue;
        }

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some(e @ ('"' | '\\')) => value.push(e),
                        Some(other) => {
                            value.push('\\');
                            value.push(other);
                        }
                        None => break,
                    },
                    c => value.push(c),
                }
            }
            if !closed {
                bail!("unterminated quoted value for key {:?}", key);
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                value.push(c);
            }
        }

        out.insert(key, value);
    }

    Ok(out)
}
