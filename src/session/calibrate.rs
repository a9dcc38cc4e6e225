// CalibrationSession - interactive calibration over one line source
//
// Prompt for a weight, collect a sample window, record the point; repeat
// until the operator types `done` or input ends. The record is only written
// when the fit succeeds.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

use anyhow::{Context, Result};

use crate::calibration::{
    parse_operator_input, timestamp_now, CalibrationProcedure, CalibrationRecord,
    CalibrationStore, OperatorCommand, SampleCollector, KG_TO_NEWTONS,
};
use crate::config::AppConfig;
use crate::error::{log_calibration_error, CalibrationError, ErrorCode};
use crate::transport::{CancelToken, LineSource};

/// The operator side of a calibration session
pub trait OperatorInput {
    /// Show `message` and read one line of reply; `None` when input has ended
    fn prompt(&mut self, message: &str) -> io::Result<Option<String>>;

    /// Show an informational message
    fn notify(&mut self, message: &str) -> io::Result<()>;
}

/// Operator at a text console
pub struct ConsoleOperator<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl ConsoleOperator<StdinLock<'static>, Stdout> {
    /// Prompt on stdout, read replies from stdin
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> OperatorInput for ConsoleOperator<R, W> {
    fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn notify(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }
}

/// Result of a completed calibration session
#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    pub record: CalibrationRecord,
    pub procedure: CalibrationProcedure,
}

/// Drives one calibration session
pub struct CalibrationSession<S, O> {
    source: S,
    operator: O,
    collector: SampleCollector,
    procedure: CalibrationProcedure,
    cancel: CancelToken,
}

impl<S: LineSource, O: OperatorInput> CalibrationSession<S, O> {
    pub fn new(source: S, operator: O, config: &AppConfig) -> Self {
        let keyword = config.sensor.z_axis_keyword.clone();
        let collector =
            SampleCollector::new(keyword.clone(), config.calibration.samples_per_weight)
                .with_sample_delay(config.calibration.sample_delay())
                .with_buffer_settle(config.calibration.buffer_settle());

        Self {
            source,
            operator,
            collector,
            procedure: CalibrationProcedure::new(keyword),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn procedure(&self) -> &CalibrationProcedure {
        &self.procedure
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    pub fn into_operator(self) -> O {
        self.operator
    }

    /// Prompt for weights and collect a sample window for each
    ///
    /// Returns once the operator types `done`, input ends or the session is
    /// cancelled. Invalid input re-prompts; transport faults abort.
    pub fn collect_points(&mut self) -> Result<()> {
        self.operator.notify(&format!(
            "Place a known weight on the sensor, enter it in kilograms, type 'done' when finished.\n\
             Keyword: {}, {} samples per weight",
            self.collector.keyword(),
            self.collector.target_count()
        ))?;

        while !self.cancel.is_cancelled() {
            let point_number = self.procedure.len() + 1;
            self.operator
                .notify(&format!("\n[Calibration Point {}]", point_number))?;

            let reply = self
                .operator
                .prompt("Enter weight in kg (or 'done' to finish): ")?;
            let weight_kg = match reply.as_deref().map(parse_operator_input) {
                None | Some(OperatorCommand::Done) => break,
                Some(OperatorCommand::Invalid(text)) => {
                    tracing::debug!("[Session] Rejected operator input {:?}", text);
                    self.operator
                        .notify("Invalid input. Please enter a number or 'done'.")?;
                    continue;
                }
                Some(OperatorCommand::Weight(weight_kg)) => weight_kg,
            };

            if !weight_kg.is_finite() || weight_kg < 0.0 {
                let err = CalibrationError::InvalidWeight { weight_kg };
                log_calibration_error(&err, "collect_points");
                self.operator.notify(&err.message())?;
                continue;
            }

            self.operator.notify(&format!(
                "  Weight: {} kg = {:.2} N",
                weight_kg,
                weight_kg * KG_TO_NEWTONS
            ))?;

            let summary = self
                .collector
                .collect(&mut self.source, &self.cancel)
                .with_context(|| format!("collecting samples for {} kg", weight_kg))?;

            match &summary {
                Some(summary) => self.operator.notify(&format!(
                    "  Average {}: {:.3} ± {:.3} ({} samples)",
                    summary.label, summary.mean, summary.stddev, summary.count
                ))?,
                None => self.operator.notify(&format!(
                    "  No {} samples collected!",
                    self.collector.keyword()
                ))?,
            }

            self.procedure.add_point(weight_kg, summary)?;
        }

        tracing::info!(
            "[Session] Collection finished with {} points",
            self.procedure.len()
        );
        Ok(())
    }

    /// Fit the collected points into a record stamped `generated`
    pub fn finalize(&self, generated: impl Into<String>) -> Result<CalibrationRecord> {
        self.procedure.finalize(generated).map_err(|err| {
            log_calibration_error(&err, "finalize");
            anyhow::Error::new(err).context("calibration not saved")
        })
    }

    /// Collect, fit and persist
    pub fn run(mut self, store: &CalibrationStore) -> Result<CalibrationOutcome> {
        self.collect_points()?;
        let record = self.finalize(timestamp_now())?;
        store
            .save(&record)
            .with_context(|| format!("writing {}", store.path().display()))?;

        Ok(CalibrationOutcome {
            record,
            procedure: self.procedure,
        })
    }
}
