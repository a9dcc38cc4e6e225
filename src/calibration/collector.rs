// SampleCollector - averages N valid readings for one calibration point
//
// Reads are pulled from the injected line source until enough valid readings
// have accumulated, the stream closes, or the session is cancelled. Lines
// that don't parse are skipped; only transport faults are errors.

use std::time::Duration;

use crate::error::TransportError;
use crate::protocol::{LineParser, SensorReading};
use crate::transport::{CancelToken, LineSource, ReadOutcome};

/// Mean and spread of one sample window
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SampleSummary {
    pub mean: f64,
    /// Population standard deviation
    pub stddev: f64,
    /// Label of the first reading in the window
    pub label: String,
    /// Number of readings averaged
    pub count: usize,
}

impl SampleSummary {
    /// Summarise a window of readings
    ///
    /// # Returns
    /// * `Some(SampleSummary)` - At least one reading was given
    /// * `None` - Empty window
    pub fn from_readings(readings: &[SensorReading]) -> Option<Self> {
        let first = readings.first()?;
        let n = readings.len() as f64;
        let mean = readings.iter().map(|r| r.value).sum::<f64>() / n;
        let variance = readings
            .iter()
            .map(|r| (r.value - mean).powi(2))
            .sum::<f64>()
            / n;

        Some(Self {
            mean,
            stddev: variance.sqrt(),
            label: first.label.clone(),
            count: readings.len(),
        })
    }
}

/// Collects a fixed number of valid readings for one keyword
#[derive(Debug, Clone)]
pub struct SampleCollector {
    parser: LineParser,
    target_count: usize,
    sample_delay: Duration,
    buffer_settle: Duration,
}

impl SampleCollector {
    /// Create a collector with no settling delays
    ///
    /// # Arguments
    /// * `keyword` - Measurement keyword, e.g. `Z-axis`
    /// * `target_count` - Valid readings to gather before summarising
    pub fn new(keyword: impl Into<String>, target_count: usize) -> Self {
        Self {
            parser: LineParser::new(keyword),
            target_count,
            sample_delay: Duration::ZERO,
            buffer_settle: Duration::ZERO,
        }
    }

    /// Delay requested from the source between accepted samples
    pub fn with_sample_delay(mut self, delay: Duration) -> Self {
        self.sample_delay = delay;
        self
    }

    /// Delay requested from the source after discarding buffered input
    pub fn with_buffer_settle(mut self, delay: Duration) -> Self {
        self.buffer_settle = delay;
        self
    }

    pub fn keyword(&self) -> &str {
        self.parser.keyword()
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Gather readings and summarise them
    ///
    /// # Returns
    /// * `Ok(Some(summary))` - At least one valid reading was collected
    /// * `Ok(None)` - Stream closed or cancelled before any valid reading
    /// * `Err(TransportError)` - The source failed
    pub fn collect<S: LineSource + ?Sized>(
        &self,
        source: &mut S,
        cancel: &CancelToken,
    ) -> Result<Option<SampleSummary>, TransportError> {
        source.discard_pending()?;
        source.settle(self.buffer_settle);

        tracing::info!(
            "[Collector] Collecting {} {} samples",
            self.target_count,
            self.keyword()
        );

        let mut readings: Vec<SensorReading> = Vec::with_capacity(self.target_count);
        while readings.len() < self.target_count {
            if cancel.is_cancelled() {
                tracing::info!(
                    "[Collector] Cancelled after {} of {} samples",
                    readings.len(),
                    self.target_count
                );
                break;
            }

            match source.read_line()? {
                ReadOutcome::Line(line) => match self.parser.parse(&line) {
                    Some(reading) => {
                        tracing::debug!(
                            "[Collector] Sample {}: {} = {:.3}",
                            readings.len() + 1,
                            reading.label,
                            reading.value
                        );
                        readings.push(reading);
                        if readings.len() < self.target_count {
                            source.settle(self.sample_delay);
                        }
                    }
                    None => tracing::trace!("[Collector] Skipping line: {}", line),
                },
                ReadOutcome::Empty => continue,
                ReadOutcome::Closed => {
                    tracing::warn!(
                        "[Collector] Stream closed after {} of {} samples",
                        readings.len(),
                        self.target_count
                    );
                    break;
                }
            }
        }

        let summary = SampleSummary::from_readings(&readings);
        match &summary {
            Some(summary) => tracing::info!(
                "[Collector] Average {}: {:.3} ± {:.3} ({} samples)",
                self.keyword(),
                summary.mean,
                summary.stddev,
                summary.count
            ),
            None => tracing::warn!("[Collector] No {} samples collected", self.keyword()),
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedLineSource;

    fn reading(value: f64, label: &str) -> SensorReading {
        SensorReading {
            value,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_summary_mean_and_population_stddev() {
        let readings = [
            reading(2.0, "M1"),
            reading(4.0, "M1"),
            reading(4.0, "M1"),
            reading(4.0, "M1"),
            reading(5.0, "M1"),
            reading(5.0, "M1"),
            reading(7.0, "M1"),
            reading(9.0, "M1"),
        ];
        let summary = SampleSummary::from_readings(&readings).unwrap();
        assert!((summary.mean - 5.0).abs() < 1e-12);
        assert!((summary.stddev - 2.0).abs() < 1e-12);
        assert_eq!(summary.count, 8);
    }

    #[test]
    fn test_summary_label_from_first_reading() {
        let summary =
            SampleSummary::from_readings(&[reading(1.0, "M1"), reading(1.0, "M2")]).unwrap();
        assert_eq!(summary.label, "M1");
    }

    #[test]
    fn test_summary_of_empty_window() {
        assert!(SampleSummary::from_readings(&[]).is_none());
    }

    #[test]
    fn test_collect_skips_noise_and_empty_reads() {
        let mut source = ScriptedLineSource::new();
        source
            .push_line("Starting measurements...")
            .push_line("Z-axis(M1): 10.0 mT")
            .push_empty()
            .push_line("Z-axis(M1): ERROR")
            .push_line("Z-axis(M1): 12.0 mT")
            .push_line("Z-axis(M1): 14.0 mT")
            .push_line("Z-axis(M1): 99.0 mT");

        let collector = SampleCollector::new("Z-axis", 3);
        let summary = collector
            .collect(&mut source, &CancelToken::new())
            .unwrap()
            .unwrap();

        assert!((summary.mean - 12.0).abs() < 1e-12);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.label, "M1");
        // The fourth reading stays in the stream
        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn test_collect_partial_window_on_close() {
        let mut source = ScriptedLineSource::from_lines(["Z-axis: 1.0", "Z-axis: 3.0"]);
        let summary = SampleCollector::new("Z-axis", 10)
            .collect(&mut source, &CancelToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(summary.count, 2);
        assert!((summary.mean - 2.0).abs() < 1e-12);
        assert_eq!(summary.label, "Z-axis");
    }

    #[test]
    fn test_collect_no_data_is_none() {
        let mut source = ScriptedLineSource::from_lines(["Sensor not initialized", ""]);
        let result = SampleCollector::new("Z-axis", 5)
            .collect(&mut source, &CancelToken::new())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_collect_propagates_transport_fault() {
        let mut source = ScriptedLineSource::new();
        source.push_line("Z-axis: 1.0").push_fault("device unplugged");

        let result = SampleCollector::new("Z-axis", 5).collect(&mut source, &CancelToken::new());
        match result {
            Err(TransportError::ReadFailed { reason }) => {
                assert!(reason.contains("unplugged"))
            }
            other => panic!("Expected ReadFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_collect_observes_cancellation_before_reading() {
        let mut source = ScriptedLineSource::from_lines(["Z-axis: 1.0"]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = SampleCollector::new("Z-axis", 1)
            .collect(&mut source, &cancel)
            .unwrap();
        assert!(result.is_none());
        assert_eq!(source.reads(), 0);
    }

    #[test]
    fn test_collect_requests_settling_between_samples_only() {
        let mut source =
            ScriptedLineSource::from_lines(["Z-axis: 1.0", "Z-axis: 2.0", "Z-axis: 3.0"]);
        SampleCollector::new("Z-axis", 3)
            .with_sample_delay(Duration::from_millis(100))
            .with_buffer_settle(Duration::from_millis(200))
            .collect(&mut source, &CancelToken::new())
            .unwrap();

        assert_eq!(source.discards(), 1);
        assert_eq!(
            source.settles(),
            &[
                Duration::from_millis(200),
                Duration::from_millis(100),
                Duration::from_millis(100)
            ]
        );
    }

    #[test]
    fn test_collect_zero_target() {
        let mut source = ScriptedLineSource::from_lines(["Z-axis: 1.0"]);
        let result = SampleCollector::new("Z-axis", 0)
            .collect(&mut source, &CancelToken::new())
            .unwrap();
        assert!(result.is_none());
        assert_eq!(source.reads(), 0);
    }
}
