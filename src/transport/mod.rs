//! Line-oriented transport abstraction.
//!
//! Sessions own exactly one [`LineSource`] and hand `&mut` access to the
//! collector or monitor. The core never opens, configures or closes a port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::TransportError;

pub mod replay;
#[cfg(feature = "serial")]
pub mod serial;

pub use replay::{ReaderLineSource, ScriptedLineSource};
#[cfg(feature = "serial")]
pub use serial::{list_ports, PortListing, SerialLineSource};

/// Result of one read attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete, decoded, non-empty line (trimmed)
    Line(String),
    /// Nothing usable this call: timeout, blank line or undecodable bytes
    Empty,
    /// The stream has ended and will not produce more lines
    Closed,
}

/// Capability to read sensor output one line at a time.
pub trait LineSource {
    /// Read the next line. Blocks for at most the transport's own timeout.
    fn read_line(&mut self) -> Result<ReadOutcome, TransportError>;

    /// Drop anything buffered so the next line reflects the current load.
    fn discard_pending(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Wait for the sensor to settle between samples.
    fn settle(&mut self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn read_line(&mut self) -> Result<ReadOutcome, TransportError> {
        (**self).read_line()
    }

    fn discard_pending(&mut self) -> Result<(), TransportError> {
        (**self).discard_pending()
    }

    fn settle(&mut self, delay: Duration) {
        (**self).settle(delay)
    }
}

impl<S: LineSource + ?Sized> LineSource for &mut S {
    fn read_line(&mut self) -> Result<ReadOutcome, TransportError> {
        (**self).read_line()
    }

    fn discard_pending(&mut self) -> Result<(), TransportError> {
        (**self).discard_pending()
    }

    fn settle(&mut self, delay: Duration) {
        (**self).settle(delay)
    }
}

/// Cooperative cancellation shared between a session and whoever ends it.
///
/// Checked between read attempts, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_boxed_source_delegates() {
        let mut source: Box<dyn LineSource> =
            Box::new(ScriptedLineSource::from_lines(["Z-axis: 1.0"]));
        assert_eq!(
            source.read_line().unwrap(),
            ReadOutcome::Line("Z-axis: 1.0".to_string())
        );
        assert_eq!(source.read_line().unwrap(), ReadOutcome::Closed);
    }
}
