//! Labelled value extraction from one line of sensor output.
//!
//! Recognised shape, after an occurrence of the keyword:
//!
//! ```text
//! <keyword>[(<label>)]:<whitespace>*[+-]<digits>[.<digits>]<anything>
//! ```
//!
//! Lines that don't fit are ordinary noise on the wire (boot banners,
//! `Z-axis(M1): ERROR`, partial lines) and yield `None`.

use serde::{Deserialize, Serialize};

/// One value picked out of a raw line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Raw sensor value (mT for the Z-axis channel)
    pub value: f64,
    /// Parenthesised sub-label, or the keyword when the line has none
    pub label: String,
}

/// Extract a labelled reading for `keyword` from `line`.
///
/// Occurrences of `keyword` are tried left to right and the first one
/// followed by the expected `:number` shape wins. Returns `None` when the
/// keyword is absent, the shape doesn't match, or the number is unusable.
pub fn extract(line: &str, keyword: &str) -> Option<SensorReading> {
    if keyword.is_empty() || !line.contains(keyword) {
        return None;
    }

    line.match_indices(keyword).find_map(|(idx, _)| {
        let (value, label) = match_after_keyword(&line[idx + keyword.len()..])?;
        let label = match label {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => keyword.to_string(),
        };
        Some(SensorReading { value, label })
    })
}

/// Parse `[(label)]: number` at the start of `rest`.
fn match_after_keyword(rest: &str) -> Option<(f64, Option<&str>)> {
    let (label, rest) = match rest.strip_prefix('(') {
        Some(inner) => {
            let close = inner.find(')')?;
            (Some(&inner[..close]), &inner[close + 1..])
        }
        None => (None, rest),
    };

    let number = rest.strip_prefix(':')?.trim_start();
    let len = numeric_prefix_len(number)?;
    let value: f64 = number[..len].parse().ok()?;

    // A run of digits long enough to overflow is noise, not a reading
    if !value.is_finite() {
        return None;
    }

    Some((value, label))
}

/// Length of the leading `[+-]?\d+(\.\d*)?` match, if any.
fn numeric_prefix_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }

    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    Some(i)
}

/// A parser bound to one keyword, for repeated use over a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineParser {
    keyword: String,
}

impl LineParser {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn parse(&self, line: &str) -> Option<SensorReading> {
        extract(line, &self.keyword)
    }
}
