// MonitorSession - real-time force readout from a loaded model
//
// Each tick performs one read: Idle -> AwaitingLine -> (Parsed | SkippedNoMatch)
// -> Idle, or Closed once the stream ends. The model is fixed for the whole
// session; the display only ever sees snapshots.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::calibration::{estimate_force, CalibrationModel, ForceEstimate};
use crate::config::MonitorConfig;
use crate::protocol::LineParser;
use crate::session::display::DisplaySurface;
use crate::transport::{CancelToken, LineSource, ReadOutcome};

/// Mutable monitor state, owned by the session
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorState {
    pub last_reading: f64,
    pub last_label: String,
    pub last_estimate: ForceEstimate,
    /// Upper end of the force axis; grows when a reading exceeds it
    pub autoscale_max: f64,
    pub ticks: u64,
    pub parsed_ticks: u64,
}

impl MonitorState {
    fn new(label: &str, initial_force_max: f64) -> Self {
        Self {
            last_reading: 0.0,
            last_label: label.to_string(),
            last_estimate: ForceEstimate::default(),
            autoscale_max: initial_force_max,
            ticks: 0,
            parsed_ticks: 0,
        }
    }
}

/// Read-only view handed to the display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    pub label: String,
    pub raw_value: f64,
    pub force_newtons: f64,
    pub force_kg: f64,
    pub force_axis_max: f64,
    pub raw_axis_max: f64,
    pub tick: u64,
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A reading was parsed and the estimate updated
    Parsed,
    /// Nothing usable this tick; state unchanged
    SkippedNoMatch,
    /// The stream ended
    Closed,
}

/// Why [`MonitorSession::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    Closed,
    DisplayClosed,
    TickLimit,
}

/// Drives the monitor loop over one line source
pub struct MonitorSession<S> {
    source: S,
    parser: LineParser,
    model: CalibrationModel,
    config: MonitorConfig,
    state: MonitorState,
}

impl<S: LineSource> MonitorSession<S> {
    pub fn new(source: S, keyword: &str, model: CalibrationModel, config: MonitorConfig) -> Self {
        let state = MonitorState::new(keyword, config.initial_force_max);
        Self {
            source,
            parser: LineParser::new(keyword),
            model,
            config,
            state,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.model
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            label: self.state.last_label.clone(),
            raw_value: self.state.last_reading,
            force_newtons: self.state.last_estimate.newtons,
            force_kg: self.state.last_estimate.display_kilograms(),
            force_axis_max: self.state.autoscale_max,
            raw_axis_max: self.config.raw_axis_max,
            tick: self.state.ticks,
        }
    }

    /// Perform one blocking read and update the state
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let outcome = self.source.read_line().context("reading sensor line")?;
        self.state.ticks += 1;

        let line = match outcome {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Empty => return Ok(TickOutcome::SkippedNoMatch),
            ReadOutcome::Closed => return Ok(TickOutcome::Closed),
        };

        let Some(reading) = self.parser.parse(&line) else {
            tracing::trace!("[Monitor] Skipping line: {}", line);
            return Ok(TickOutcome::SkippedNoMatch);
        };

        let force = estimate_force(reading.value, &self.model);
        if force.newtons > self.state.autoscale_max {
            self.state.autoscale_max = force.newtons * self.config.autoscale_headroom;
            tracing::debug!(
                "[Monitor] Force axis rescaled to {:.3} N",
                self.state.autoscale_max
            );
        }

        self.state.last_reading = reading.value;
        self.state.last_label = reading.label;
        self.state.last_estimate = force;
        self.state.parsed_ticks += 1;
        Ok(TickOutcome::Parsed)
    }

    /// Tick until cancelled, the stream closes, the display closes or
    /// `max_ticks` is reached, rendering after every parsed reading
    pub fn run<D: DisplaySurface + ?Sized>(
        &mut self,
        display: &mut D,
        cancel: &CancelToken,
        max_ticks: Option<u64>,
    ) -> Result<StopReason> {
        tracing::info!(
            "[Monitor] Started (refresh {} ms)",
            self.config.refresh_interval_ms
        );

        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if !display.is_open() {
                break StopReason::DisplayClosed;
            }
            if max_ticks.is_some_and(|limit| self.state.ticks >= limit) {
                break StopReason::TickLimit;
            }

            match self.tick()? {
                TickOutcome::Parsed => display
                    .render(&self.snapshot())
                    .context("rendering monitor snapshot")?,
                TickOutcome::SkippedNoMatch => {}
                TickOutcome::Closed => break StopReason::Closed,
            }

            let interval = self.config.refresh_interval();
            if interval > Duration::ZERO {
                thread::sleep(interval);
            }
        };

        display.finish().context("closing display")?;
        tracing::info!(
            "[Monitor] Stopped ({:?}) after {} ticks, {} readings",
            reason,
            self.state.ticks,
            self.state.parsed_ticks
        );
        Ok(reason)
    }
}
