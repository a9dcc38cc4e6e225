// CalibrationFitter - ordinary least-squares line through calibration points
//
// Fits `force = slope * raw + intercept` with force as the dependent
// variable. Plain unweighted OLS; no outlier rejection.

use crate::error::CalibrationError;

/// Fewest points that determine a line
pub const MIN_CALIBRATION_POINTS: usize = 2;

/// One matched pair of known force and averaged raw reading
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationPoint {
    pub known_force_newtons: f64,
    pub raw_mean: f64,
}

impl CalibrationPoint {
    pub fn new(known_force_newtons: f64, raw_mean: f64) -> Self {
        Self {
            known_force_newtons,
            raw_mean,
        }
    }
}

/// Fitted linear sensor model
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationModel {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 0 when every reference force is equal
    pub r_squared: f64,
    pub sensor_label: String,
}

/// Fit a line through `points`.
///
/// # Arguments
/// * `points` - Calibration points in entry order
/// * `sensor_label` - Label to attach to the model
///
/// # Returns
/// * `Ok(CalibrationModel)` - Least-squares fit
/// * `Err(CalibrationError::InsufficientPoints)` - Fewer than 2 points
/// * `Err(CalibrationError::DegenerateReadings)` - All raw means identical
pub fn fit(
    points: &[CalibrationPoint],
    sensor_label: &str,
) -> Result<CalibrationModel, CalibrationError> {
    if points.len() < MIN_CALIBRATION_POINTS {
        return Err(CalibrationError::InsufficientPoints {
            required: MIN_CALIBRATION_POINTS,
            collected: points.len(),
        });
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.raw_mean).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.known_force_newtons).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for p in points {
        let dx = p.raw_mean - mean_x;
        sxx += dx * dx;
        sxy += dx * (p.known_force_newtons - mean_y);
    }

    if sxx == 0.0 {
        return Err(CalibrationError::DegenerateReadings { raw_value: mean_x });
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for p in points {
        let predicted = slope * p.raw_mean + intercept;
        ss_res += (p.known_force_newtons - predicted).powi(2);
        ss_tot += (p.known_force_newtons - mean_y).powi(2);
    }

    let r_squared = if ss_tot > 0.0 {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(CalibrationModel {
        slope,
        intercept,
        r_squared,
        sensor_label: sensor_label.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(pairs: &[(f64, f64)]) -> Vec<CalibrationPoint> {
        pairs
            .iter()
            .map(|&(force, raw)| CalibrationPoint::new(force, raw))
            .collect()
    }

    #[test]
    fn test_exact_line() {
        let pts = points(&[(0.0, 0.0), (9.80665, 10.0), (19.6133, 20.0)]);
        let model = fit(&pts, "M1").unwrap();

        assert!((model.slope - 0.980665).abs() < 1e-12);
        assert!(model.intercept.abs() < 1e-12);
        assert!((model.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(model.sensor_label, "M1");
    }

    #[test]
    fn test_noisy_fit_matches_hand_computation() {
        // x: 1,2,3,4  y: 2,4,5,4  -> Sxy 3.5, Sxx 5
        let pts = points(&[(2.0, 1.0), (4.0, 2.0), (5.0, 3.0), (4.0, 4.0)]);
        let model = fit(&pts, "Z-axis").unwrap();

        assert!((model.slope - 0.7).abs() < 1e-12);
        assert!((model.intercept - 2.0).abs() < 1e-12);
        // SS_res = 2.3, SS_tot = 4.75
        assert!((model.r_squared - (1.0 - 2.3 / 4.75)).abs() < 1e-12);
    }

    #[test]
    fn test_negative_slope_and_intercept() {
        // Magnet moving away: field drops as load grows
        let pts = points(&[(0.0, 20.0), (10.0, 15.0), (20.0, 10.0)]);
        let model = fit(&pts, "M1").unwrap();
        assert!((model.slope + 2.0).abs() < 1e-12);
        assert!((model.intercept - 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_insufficient_points() {
        for pts in [vec![], points(&[(9.8, 10.0)])] {
            match fit(&pts, "M1") {
                Err(CalibrationError::InsufficientPoints {
                    required: 2,
                    collected,
                }) => assert_eq!(collected, pts.len()),
                other => panic!("Expected InsufficientPoints, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_identical_forces_give_zero_r_squared() {
        let pts = points(&[(5.0, 1.0), (5.0, 2.0), (5.0, 3.0)]);
        let model = fit(&pts, "M1").unwrap();
        assert_eq!(model.slope, 0.0);
        assert_eq!(model.intercept, 5.0);
        assert_eq!(model.r_squared, 0.0);
    }

    #[test]
    fn test_identical_raw_readings_are_degenerate() {
        let pts = points(&[(0.0, 7.5), (9.8, 7.5)]);
        match fit(&pts, "M1") {
            Err(CalibrationError::DegenerateReadings { raw_value }) => {
                assert_eq!(raw_value, 7.5)
            }
            other => panic!("Expected DegenerateReadings, got {:?}", other),
        }
    }

    #[test]
    fn test_refit_is_bit_identical() {
        let pts = points(&[(0.0, 1.3), (4.903325, 6.1), (9.80665, 11.7), (14.709975, 15.2)]);
        let a = fit(&pts, "M1").unwrap();
        let b = fit(&pts, "M1").unwrap();
        assert_eq!(a.slope.to_bits(), b.slope.to_bits());
        assert_eq!(a.intercept.to_bits(), b.intercept.to_bits());
        assert_eq!(a.r_squared.to_bits(), b.r_squared.to_bits());
    }

    #[test]
    fn test_r_squared_within_unit_interval() {
        let pts = points(&[(0.0, 3.0), (9.8, 1.0), (19.6, 4.0), (29.4, 1.5), (39.2, 5.9)]);
        let model = fit(&pts, "M1").unwrap();
        assert!((0.0..=1.0).contains(&model.r_squared));
    }
}
