//! Output formatting for `snmp-resolve`.

use serde::Serialize;
use std::error::Error as _;
use std::io::{self, Write};
use std::time::Duration;

use crate::assemble::{CycleReport, CycleStats, ResultMapping};
use crate::cli::args::OutputFormat;

/// One cycle, ready for output.
#[derive(Debug, Serialize)]
pub struct CycleOutput<'a> {
    pub target: String,
    pub version: String,
    pub properties: &'a ResultMapping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<&'a CycleStats>,
    pub timing_ms: f64,
}

/// Output context for formatting.
pub struct OutputContext {
    pub format: OutputFormat,
    pub show_stats: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            show_stats: false,
        }
    }

    /// Write a cycle report to stdout.
    pub fn write_report(
        &self,
        target: &str,
        version: &str,
        report: &CycleReport,
        elapsed: Duration,
    ) -> io::Result<()> {
        let output = CycleOutput {
            target: target.to_string(),
            version: version.to_string(),
            properties: &report.mapping,
            stats: self.show_stats.then_some(&report.stats),
            timing_ms: elapsed.as_secs_f64() * 1000.0,
        };
        let mut stdout = io::stdout().lock();
        self.write(&mut stdout, &output)
    }

    fn write<W: Write>(&self, w: &mut W, output: &CycleOutput<'_>) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => self.write_text(w, output),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(output).map_err(io::Error::other)?;
                writeln!(w, "{}", json)
            }
        }
    }

    fn write_text<W: Write>(&self, w: &mut W, output: &CycleOutput<'_>) -> io::Result<()> {
        for (name, value) in output.properties {
            writeln!(w, "{}: {}", name, value)?;
        }

        if let Some(stats) = output.stats {
            writeln!(w)?;
            writeln!(w, "--- {} ({}) ---", output.target, output.version)?;
            writeln!(w, "Requested:        {}", stats.requested)?;
            writeln!(w, "Values:           {}", stats.values)?;
            let omitted = [
                ("Empty values", stats.empty_values),
                ("Timeouts", stats.timeouts),
                ("Security reports", stats.security_reports),
                ("OID mismatches", stats.mismatches),
                ("Empty bindings", stats.empty_bindings),
                ("Exceptions", stats.exceptions),
                ("Agent errors", stats.agent_errors),
                ("Failures", stats.failures),
                ("Malformed entries", stats.malformed),
            ];
            for (label, count) in omitted.into_iter().filter(|(_, n)| *n > 0) {
                writeln!(w, "{:<18}{}", format!("{}:", label), count)?;
            }
            writeln!(w, "Time:             {:.1}ms", output.timing_ms)?;
        }
        Ok(())
    }
}

/// Write an error message to stderr.
pub fn write_error(err: &crate::Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "Error: {}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  caused by: {}", cause);
        source = cause.source();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> CycleReport {
        let mut report = CycleReport::default();
        report.mapping.insert("DeviceName".into(), "DESKTOP-32LE6G6".into());
        report.mapping.insert("Contact".into(), "ops@example.com".into());
        report.stats.requested = 3;
        report.stats.values = 2;
        report.stats.timeouts = 1;
        report
    }

    fn render(ctx: &OutputContext, report: &CycleReport) -> String {
        let output = CycleOutput {
            target: "192.0.2.1:161".into(),
            version: "SNMPv2c".into(),
            properties: &report.mapping,
            stats: ctx.show_stats.then_some(&report.stats),
            timing_ms: 12.5,
        };
        let mut buf = Vec::new();
        ctx.write(&mut buf, &output).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_text_sorted_lines() {
        let text = render(&OutputContext::new(OutputFormat::Text), &report());
        assert_eq!(text, "Contact: ops@example.com\nDeviceName: DESKTOP-32LE6G6\n");
    }

    #[test]
    fn test_text_stats_skip_zero_counters() {
        let ctx = OutputContext {
            format: OutputFormat::Text,
            show_stats: true,
        };
        let text = render(&ctx, &report());
        assert!(text.contains("Timeouts:         1"));
        assert!(!text.contains("Exceptions"));
        assert!(text.contains("Time:             12.5ms"));
    }

    #[test]
    fn test_json() {
        let ctx = OutputContext {
            format: OutputFormat::Json,
            show_stats: true,
        };
        let json: serde_json::Value = serde_json::from_str(&render(&ctx, &report())).unwrap();
        assert_eq!(json["properties"]["DeviceName"], "DESKTOP-32LE6G6");
        assert_eq!(json["stats"]["timeouts"], 1);
        assert_eq!(json["version"], "SNMPv2c");

        let plain: serde_json::Value =
            serde_json::from_str(&render(&OutputContext::new(OutputFormat::Json), &report())).unwrap();
        assert!(plain.get("stats").is_none());
    }
}
