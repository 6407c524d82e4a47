//! Recovers a [`MeasurementRecord`] from the text a benchmark run logs.
//!
//! The runner prints its results as an object literal:
//!
//! ```text
//! synthesis finished
//! {
//!   accuracy: 0.97,
//!   error: 1.5,
//!   ...
//!   synth: 12.75
//! }
//! ```
//!
//! Lines are split on single spaces, so the two-space indent leaves the key
//! at token 2 and the value at token 3.
//!
//! The first block that supplies all seven keys is the result. Anything the
//! runner prints after it, including further blocks, is ignored.

use crate::error::{Error, Result};
use crate::measurement::{Field, FieldSet, MeasurementRecord};
use log::warn;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    Inside,
}

/// Line-at-a-time scanner over a run log.
#[derive(Debug)]
pub struct BlockScanner {
    state: State,
    blocks: usize,
    fields: FieldSet,
    captured: Option<FieldSet>,
}

impl Default for BlockScanner {
    fn default() -> Self {
        BlockScanner {
            state: State::Outside,
            blocks: 0,
            fields: FieldSet::default(),
            captured: None,
        }
    }
}

impl BlockScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line (without its terminator). Fails only on a recognised
    /// key whose value is not a number.
    pub fn feed(&mut self, line: &str) -> std::result::Result<(), String> {
        if self.captured.is_some() {
            return Ok(());
        }

        let tokens: Vec<&str> = line.split(' ').collect();
        match tokens[0] {
            "{" => {
                // An incomplete earlier block is discarded.
                self.close_block();
                if self.captured.is_none() {
                    self.state = State::Inside;
                    self.blocks += 1;
                    self.fields = FieldSet::default();
                }
                return Ok(());
            }
            "}" => {
                self.close_block();
                return Ok(());
            }
            _ => {}
        }

        if self.state == State::Outside || tokens.len() < 4 {
            return Ok(());
        }

        let Some(field) = Field::from_key(strip_last(tokens[2])) else {
            return Ok(());
        };
        let raw = tokens[3].strip_suffix(',').unwrap_or(tokens[3]);
        let value = parse_literal(raw)
            .ok_or_else(|| format!("value {:?} for {:?} is not a number", raw, field))?;
        self.fields.set(field, value);
        Ok(())
    }

    fn close_block(&mut self) {
        if self.state == State::Inside && self.fields.is_complete() {
            self.captured = Some(std::mem::take(&mut self.fields));
        }
        self.state = State::Outside;
    }

    /// Builds the record once the whole log has been fed.
    pub fn finish(mut self, name: &str) -> std::result::Result<MeasurementRecord, String> {
        if self.blocks == 0 {
            return Err("no result block".to_string());
        }
        // A block left open at end of file still counts.
        self.close_block();
        match self.captured {
            Some(fields) => fields
                .finish(name)
                .ok_or_else(|| format!("missing keys {:?}", fields.missing())),
            None => Err(format!("missing keys {:?}", self.fields.missing())),
        }
    }
}

/// Drops the final character of a token (the `:` after a key).
fn strip_last(token: &str) -> &str {
    match token.char_indices().next_back() {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}

/// Evaluates an integer or floating point literal. Non-finite values are
/// rejected.
fn parse_literal(text: &str) -> Option<f64> {
    if let Ok(int) = text.parse::<i64>() {
        return Some(int as f64);
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses log text, failing with the reason the log was unusable.
pub fn try_parse(log_text: &str, name: &str) -> std::result::Result<MeasurementRecord, String> {
    let mut scanner = BlockScanner::new();
    for line in log_text.lines() {
        scanner.feed(line)?;
    }
    scanner.finish(name)
}

/// Parses log text. A malformed log yields the tombstone for `name`.
pub fn parse(log_text: &str, name: &str) -> MeasurementRecord {
    match try_parse(log_text, name) {
        Ok(record) => record,
        Err(reason) => {
            warn!("invalid parse of result for {}: {}", name, reason);
            MeasurementRecord::tombstone(name)
        }
    }
}

fn read_log(path: &Path, name: &str) -> Result<MeasurementRecord> {
    let text = fs::read_to_string(path).map_err(|e| Error::MalformedLog {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    try_parse(&text, name).map_err(|reason| Error::MalformedLog {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parses the log at `path`. An unreadable or malformed log yields the
/// tombstone for `name`.
pub fn parse_file<P: AsRef<Path>>(path: P, name: &str) -> MeasurementRecord {
    match read_log(path.as_ref(), name) {
        Ok(record) => record,
        Err(e) => {
            warn!("{}", e);
            MeasurementRecord::tombstone(name)
        }
    }
}
