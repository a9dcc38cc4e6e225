//! Line sources that don't need hardware.
//!
//! [`ReaderLineSource`] replays a captured serial log (one reading per line)
//! at full speed. [`ScriptedLineSource`] is an in-memory queue used by tests
//! to script timeouts and faults precisely.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use super::{LineSource, ReadOutcome};
use crate::error::TransportError;

/// Decode one raw line the way every source does: UTF-8, trimmed, non-empty.
pub(crate) fn decode_line(bytes: &[u8]) -> ReadOutcome {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                ReadOutcome::Empty
            } else {
                ReadOutcome::Line(trimmed.to_string())
            }
        }
        Err(_) => ReadOutcome::Empty,
    }
}

/// Replays lines from any buffered reader; end of input closes the stream.
pub struct ReaderLineSource<R> {
    reader: R,
    buf: Vec<u8>,
    lines_read: usize,
}

impl<R: BufRead> ReaderLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(128),
            lines_read: 0,
        }
    }

    /// Number of raw lines consumed so far, including unusable ones
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }
}

impl ReaderLineSource<BufReader<File>> {
    /// Open a captured log file for replay
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TransportError> {
        let file = File::open(&path).map_err(|err| TransportError::OpenFailed {
            port: path.as_ref().display().to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LineSource for ReaderLineSource<R> {
    fn read_line(&mut self) -> Result<ReadOutcome, TransportError> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(ReadOutcome::Closed);
        }
        self.lines_read += 1;
        Ok(decode_line(&self.buf))
    }

    // A replay has no physical sensor to wait for.
    fn settle(&mut self, _delay: Duration) {}
}

/// Scripted outcomes for tests. Once the script runs out the stream is closed.
#[derive(Debug, Default)]
pub struct ScriptedLineSource {
    script: VecDeque<Result<ReadOutcome, TransportError>>,
    reads: usize,
    discards: usize,
    settles: Vec<Duration>,
}

impl ScriptedLineSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a sequence of raw lines; blank entries become empty reads
    pub fn from_lines<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let mut source = Self::new();
        for line in lines {
            source.push_line(line.as_ref());
        }
        source
    }

    pub fn push_line(&mut self, line: &str) -> &mut Self {
        self.script.push_back(Ok(decode_line(line.as_bytes())));
        self
    }

    pub fn push_empty(&mut self) -> &mut Self {
        self.script.push_back(Ok(ReadOutcome::Empty));
        self
    }

    pub fn push_fault(&mut self, reason: &str) -> &mut Self {
        self.script.push_back(Err(TransportError::ReadFailed {
            reason: reason.to_string(),
        }));
        self
    }

    /// Read attempts made so far, including those past the end of the script
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn discards(&self) -> usize {
        self.discards
    }

    /// Settle delays requested by callers, in order
    pub fn settles(&self) -> &[Duration] {
        &self.settles
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl LineSource for ScriptedLineSource {
    fn read_line(&mut self) -> Result<ReadOutcome, TransportError> {
        self.reads += 1;
        self.script.pop_front().unwrap_or(Ok(ReadOutcome::Closed))
    }

    fn discard_pending(&mut self) -> Result<(), TransportError> {
        self.discards += 1;
        Ok(())
    }

    fn settle(&mut self, delay: Duration) {
        self.settles.push(delay);
    }
}
