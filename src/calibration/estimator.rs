// ForceEstimator - raw reading to physical force through a fitted model

use crate::calibration::fitter::CalibrationModel;

/// Gravity used only for the informational kilogram readout in the monitor.
///
/// Calibration converts kilograms with [`KG_TO_NEWTONS`](super::procedure::KG_TO_NEWTONS)
/// (9.80665) instead.
pub const DISPLAY_GRAVITY: f64 = 9.81;

/// Estimated force, never negative
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ForceEstimate {
    pub newtons: f64,
}

impl ForceEstimate {
    /// Kilogram equivalent for display, using [`DISPLAY_GRAVITY`]
    pub fn display_kilograms(&self) -> f64 {
        self.newtons / DISPLAY_GRAVITY
    }
}

/// Apply `model` to one raw reading, clamping below at zero.
///
/// Total over all inputs: a NaN result clamps to 0.0, positive infinity
/// passes through.
pub fn estimate(raw_value: f64, model: &CalibrationModel) -> f64 {
    (raw_value * model.slope + model.intercept).max(0.0)
}

/// [`estimate`] wrapped as a [`ForceEstimate`]
pub fn estimate_force(raw_value: f64, model: &CalibrationModel) -> ForceEstimate {
    ForceEstimate {
        newtons: estimate(raw_value, model),
    }
}
