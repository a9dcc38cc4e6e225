// CalibrationProcedure - operator-driven calibration workflow
//
// The operator enters one known weight at a time; the session collects a
// sample window for each and hands both to the procedure. The procedure
// converts kilograms to newtons, keeps every entered point (even ones that
// produced no readings), and finalizes into a record once the operator is
// done. Nothing is persisted here.

use crate::calibration::collector::SampleSummary;
use crate::calibration::fitter::{fit, CalibrationPoint, MIN_CALIBRATION_POINTS};
use crate::calibration::store::CalibrationRecord;
use crate::error::CalibrationError;

/// Standard gravity used to convert reference weights
pub const KG_TO_NEWTONS: f64 = 9.80665;

/// One operator-entered calibration point
#[derive(Debug, Clone, PartialEq)]
pub struct PointEntry {
    pub weight_kg: f64,
    pub force_newtons: f64,
    /// `None` when no valid reading arrived for this weight
    pub summary: Option<SampleSummary>,
}

/// One row of the operator-facing data table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableRow {
    pub weight_kg: f64,
    pub force_newtons: f64,
    pub raw_mean: Option<f64>,
}

/// What the operator typed at the weight prompt
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    /// A reference weight in kilograms
    Weight(f64),
    /// Finish calibration
    Done,
    /// Unrecognised input; re-prompt
    Invalid(String),
}

/// Interpret one line of operator input
///
/// `done` is matched case-insensitively after trimming. Anything that isn't
/// `done` or a number is `Invalid`, not an error. Range checks on the weight
/// happen in [`CalibrationProcedure::add_point`].
pub fn parse_operator_input(text: &str) -> OperatorCommand {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("done") {
        return OperatorCommand::Done;
    }
    match trimmed.parse::<f64>() {
        Ok(weight) => OperatorCommand::Weight(weight),
        Err(_) => OperatorCommand::Invalid(trimmed.to_string()),
    }
}

/// Accumulates calibration points for one keyword
#[derive(Debug, Clone)]
pub struct CalibrationProcedure {
    keyword: String,
    entries: Vec<PointEntry>,
}

impl CalibrationProcedure {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            entries: Vec::new(),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Record a calibration point
    ///
    /// # Arguments
    /// * `weight_kg` - Reference weight; must be finite and non-negative
    /// * `summary` - Sample window for this weight, `None` if nothing arrived
    ///
    /// # Returns
    /// * `Ok(&PointEntry)` - The recorded entry
    /// * `Err(CalibrationError::InvalidWeight)` - Weight rejected, nothing recorded
    pub fn add_point(
        &mut self,
        weight_kg: f64,
        summary: Option<SampleSummary>,
    ) -> Result<&PointEntry, CalibrationError> {
        if !weight_kg.is_finite() || weight_kg < 0.0 {
            return Err(CalibrationError::InvalidWeight { weight_kg });
        }

        let entry = PointEntry {
            weight_kg,
            force_newtons: weight_kg * KG_TO_NEWTONS,
            summary,
        };
        match &entry.summary {
            Some(summary) => tracing::info!(
                "[Procedure] Point {}: {} kg ({:.3} N) -> {:.3}",
                self.entries.len() + 1,
                entry.weight_kg,
                entry.force_newtons,
                summary.mean
            ),
            None => tracing::warn!(
                "[Procedure] Point {}: {} kg recorded without readings",
                self.entries.len() + 1,
                entry.weight_kg
            ),
        }
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn entries(&self) -> &[PointEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Points that have readings, each paired with its own force
    pub fn calibration_points(&self) -> Vec<CalibrationPoint> {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry
                    .summary
                    .as_ref()
                    .map(|summary| CalibrationPoint::new(entry.force_newtons, summary.mean))
            })
            .collect()
    }

    /// Label of the first entry's readings, else the keyword
    pub fn sensor_label(&self) -> &str {
        self.entries
            .first()
            .and_then(|entry| entry.summary.as_ref())
            .map(|summary| summary.label.as_str())
            .unwrap_or(&self.keyword)
    }

    /// Rows for the data table, in entry order
    pub fn table(&self) -> Vec<TableRow> {
        self.entries
            .iter()
            .map(|entry| TableRow {
                weight_kg: entry.weight_kg,
                force_newtons: entry.force_newtons,
                raw_mean: entry.summary.as_ref().map(|s| s.mean),
            })
            .collect()
    }

    /// Fit the collected points and build the record to persist
    ///
    /// # Arguments
    /// * `generated` - Timestamp to stamp on the record
    ///
    /// # Returns
    /// * `Ok(CalibrationRecord)` - Record with a fitted model
    /// * `Err(CalibrationError)` - Too few points, no readings at all, or a
    ///   degenerate fit; nothing should be written
    pub fn finalize(
        &self,
        generated: impl Into<String>,
    ) -> Result<CalibrationRecord, CalibrationError> {
        if self.entries.len() < MIN_CALIBRATION_POINTS {
            return Err(CalibrationError::InsufficientPoints {
                required: MIN_CALIBRATION_POINTS,
                collected: self.entries.len(),
            });
        }

        let points = self.calibration_points();
        if points.is_empty() {
            return Err(CalibrationError::NoSamples {
                points: self.entries.len(),
            });
        }

        let model = fit(&points, self.sensor_label())?;
        tracing::info!(
            "[Procedure] Fit {} points: slope={:.6}, intercept={:.6}, R²={:.6}",
            points.len(),
            model.slope,
            model.intercept,
            model.r_squared
        );

        Ok(CalibrationRecord::new(
            generated,
            self.entries.len(),
            Some(&model),
            self.keyword.clone(),
        ))
    }
}

#[cfg(test)]
#[path = "procedure_tests.rs"]
mod tests;
