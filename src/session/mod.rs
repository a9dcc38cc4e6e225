//! Session drivers for the two operating modes.
//!
//! A session owns its line source for its whole lifetime and drives the
//! calibration core against it. Calibration talks to the operator through
//! [`OperatorInput`]; monitoring renders through [`DisplaySurface`].

use std::io;
use std::thread;

use tokio::runtime::Builder;

use crate::transport::CancelToken;

pub mod calibrate;
pub mod display;
pub mod monitor;

pub use calibrate::{CalibrationOutcome, CalibrationSession, ConsoleOperator, OperatorInput};
pub use display::{DisplaySurface, JsonLinesDisplay, TerminalDisplay};
pub use monitor::{MonitorSession, MonitorSnapshot, MonitorState, StopReason, TickOutcome};

/// Cancel `token` when the process receives Ctrl-C.
///
/// The watcher runs a current-thread runtime on a helper thread and does
/// nothing but flip the token; sessions notice between reads.
pub fn cancel_on_ctrl_c(token: CancelToken) -> io::Result<()> {
    let runtime = Builder::new_current_thread().enable_all().build()?;

    thread::Builder::new()
        .name("ctrl-c-watcher".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("[Session] Ctrl-C received, stopping");
                        token.cancel();
                    }
                    Err(err) => {
                        tracing::warn!("[Session] Could not listen for Ctrl-C: {}", err)
                    }
                }
            });
        })?;
    Ok(())
}
