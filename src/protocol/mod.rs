//! Text protocol spoken by the sensor firmware.
//!
//! The firmware prints one measurement per line, e.g. `Z-axis(M1): 12.693 mT`,
//! interleaved with banners and status text. This module picks labelled
//! values out of that stream and ignores everything else.

pub mod line_parser;

pub use line_parser::{extract, LineParser, SensorReading};
