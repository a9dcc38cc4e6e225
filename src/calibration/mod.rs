// Calibration module - sample aggregation, fitting, inference and storage
//
// The calibration workflow:
// 1. SampleCollector averages N valid readings per reference weight
// 2. CalibrationProcedure converts weights to newtons and gathers points
// 3. fit() produces a CalibrationModel, persisted by CalibrationStore
// 4. estimate() applies the model to live readings during monitoring

pub mod collector;
pub mod estimator;
pub mod fitter;
pub mod procedure;
pub mod store;

pub use collector::{SampleCollector, SampleSummary};
pub use estimator::{estimate, estimate_force, ForceEstimate, DISPLAY_GRAVITY};
pub use fitter::{fit, CalibrationModel, CalibrationPoint, MIN_CALIBRATION_POINTS};
pub use procedure::{
    parse_operator_input, CalibrationProcedure, OperatorCommand, PointEntry, TableRow,
    KG_TO_NEWTONS,
};
pub use store::{timestamp_now, CalibrationRecord, CalibrationStore, SensorCalibration, FORMULA};
