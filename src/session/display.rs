//! Display surfaces for the monitor.

use std::io::{self, Write};

use crate::session::monitor::MonitorSnapshot;

/// Where monitor snapshots are rendered
pub trait DisplaySurface {
    fn render(&mut self, snapshot: &MonitorSnapshot) -> io::Result<()>;

    /// `false` once the operator has closed the display
    fn is_open(&self) -> bool {
        true
    }

    /// Called once when the monitor stops
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

const DEFAULT_BAR_WIDTH: usize = 20;

/// Two horizontal bars redrawn in place on one terminal line
pub struct TerminalDisplay<W: Write> {
    out: W,
    bar_width: usize,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            bar_width: DEFAULT_BAR_WIDTH,
        }
    }

    pub fn with_bar_width(mut self, bar_width: usize) -> Self {
        self.bar_width = bar_width;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn bar(&self, value: f64, max: f64) -> String {
        let fraction = if max > 0.0 { value / max } else { 0.0 };
        // NaN fails the comparison and lands on zero
        let fraction = if fraction > 0.0 { fraction.min(1.0) } else { 0.0 };
        let filled = (fraction * self.bar_width as f64).round() as usize;
        format!(
            "{}{}",
            "#".repeat(filled),
            ".".repeat(self.bar_width - filled)
        )
    }
}

impl<W: Write> DisplaySurface for TerminalDisplay<W> {
    fn render(&mut self, snapshot: &MonitorSnapshot) -> io::Result<()> {
        let raw_bar = self.bar(snapshot.raw_value, snapshot.raw_axis_max);
        let force_bar = self.bar(snapshot.force_newtons, snapshot.force_axis_max);
        write!(
            self.out,
            "\r{} {:>9.3} mT [{}]  Force {:>9.3} N {:>8.4} kg [{}] /{:.2} N ",
            snapshot.label,
            snapshot.raw_value,
            raw_bar,
            snapshot.force_newtons,
            snapshot.force_kg,
            force_bar,
            snapshot.force_axis_max
        )?;
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.out.flush()
    }
}

/// One JSON object per snapshot, for piping into other tools
pub struct JsonLinesDisplay<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DisplaySurface for JsonLinesDisplay<W> {
    fn render(&mut self, snapshot: &MonitorSnapshot) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, snapshot)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(raw_value: f64, force_newtons: f64) -> MonitorSnapshot {
        MonitorSnapshot {
            label: "M1".to_string(),
            raw_value,
            force_newtons,
            force_kg: force_newtons / 9.81,
            force_axis_max: 10.0,
            raw_axis_max: 50.0,
            tick: 7,
        }
    }

    #[test]
    fn test_terminal_bars() {
        let mut display = TerminalDisplay::new(Vec::new()).with_bar_width(10);
        display.render(&snapshot(25.0, 10.0)).unwrap();
        let text = String::from_utf8(display.into_inner()).unwrap();

        assert!(text.starts_with('\r'));
        assert!(text.contains("[#####.....]"));
        assert!(text.contains("[##########]"));
        assert!(text.contains("10.000 N"));
        assert!(text.contains("1.0194 kg"));
    }

    #[test]
    fn test_terminal_bar_limits() {
        let display = TerminalDisplay::new(Vec::new()).with_bar_width(4);
        assert_eq!(display.bar(-3.0, 50.0), "....");
        assert_eq!(display.bar(500.0, 50.0), "####");
        assert_eq!(display.bar(f64::NAN, 50.0), "....");
        assert_eq!(display.bar(1.0, 0.0), "....");
    }

    #[test]
    fn test_terminal_finish_ends_line() {
        let mut display = TerminalDisplay::new(Vec::new());
        display.finish().unwrap();
        assert_eq!(display.into_inner(), b"\n");
    }

    #[test]
    fn test_json_lines() {
        let mut display = JsonLinesDisplay::new(Vec::new());
        display.render(&snapshot(12.5, 2.5)).unwrap();
        display.render(&snapshot(13.0, 3.0)).unwrap();
        let text = String::from_utf8(display.into_inner()).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["raw_value"], 12.5);
        assert_eq!(value["force_newtons"], 2.5);
        assert_eq!(value["label"], "M1");
        assert_eq!(value["tick"], 7);
    }
}
