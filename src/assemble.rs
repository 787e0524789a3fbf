//! Folding per-OID outcomes into the property mapping.

use std::collections::BTreeMap;

use crate::query::{QueryOutcome, QueryResult};

/// Property name to trimmed value, sorted by property name.
pub type ResultMapping = BTreeMap<String, String>;

/// Per-cycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CycleStats {
    pub requested: usize,
    pub values: usize,
    pub empty_values: usize,
    pub timeouts: usize,
    pub security_reports: usize,
    pub mismatches: usize,
    pub empty_bindings: usize,
    pub exceptions: usize,
    pub agent_errors: usize,
    pub failures: usize,
    /// Property list segments dropped before querying.
    pub malformed: usize,
}

impl CycleStats {
    /// Entries that produced no mapping value.
    pub fn omitted(&self) -> usize {
        self.requested - self.values
    }
}

/// The mapping of one cycle together with its counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub mapping: ResultMapping,
    pub stats: CycleStats,
}

/// Builds a [`CycleReport`] from query results.
///
/// Later entries for the same property name overwrite earlier ones. Values
/// that are empty after trimming are left out. Security reports are left
/// out unless a placeholder is configured, in which case the placeholder is
/// stored instead.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    report_placeholder: Option<String>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report_placeholder(placeholder: impl Into<String>) -> Self {
        Self {
            report_placeholder: Some(placeholder.into()),
        }
    }

    pub fn report_placeholder(&self) -> Option<&str> {
        self.report_placeholder.as_deref()
    }

    pub fn assemble(&self, results: Vec<QueryResult>, malformed: usize) -> CycleReport {
        let mut report = CycleReport {
            stats: CycleStats {
                requested: results.len(),
                malformed,
                ..CycleStats::default()
            },
            ..CycleReport::default()
        };
        let stats = &mut report.stats;

        for QueryResult { entry, outcome } in results {
            let value = match outcome {
                QueryOutcome::Value(value) => {
                    let value = value.trim();
                    if value.is_empty() {
                        stats.empty_values += 1;
                        continue;
                    }
                    value.to_string()
                }
                QueryOutcome::SecurityReport(_) => {
                    stats.security_reports += 1;
                    match &self.report_placeholder {
                        Some(placeholder) => placeholder.clone(),
                        None => continue,
                    }
                }
                QueryOutcome::Timeout => {
                    stats.timeouts += 1;
                    continue;
                }
                QueryOutcome::OidMismatch { .. } => {
                    stats.mismatches += 1;
                    continue;
                }
                QueryOutcome::NoBinding => {
                    stats.empty_bindings += 1;
                    continue;
                }
                QueryOutcome::Exception(_) => {
                    stats.exceptions += 1;
                    continue;
                }
                QueryOutcome::AgentError(_) => {
                    stats.agent_errors += 1;
                    continue;
                }
                QueryOutcome::Failed(_) => {
                    stats.failures += 1;
                    continue;
                }
            };
            stats.values += 1;
            report.mapping.insert(entry.property_name, value);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorStatus};
    use crate::properties::OidPropertyEntry;
    use crate::v3::UsmReport;
    use crate::value::Value;

    fn result(name: &str, outcome: QueryOutcome) -> QueryResult {
        QueryResult {
            entry: OidPropertyEntry::new("1.3.6.1.2.1.1.5.0", name),
            outcome,
        }
    }

    fn value(name: &str, v: &str) -> QueryResult {
        result(name, QueryOutcome::Value(v.to_string()))
    }

    #[test]
    fn test_sorted_and_trimmed() {
        let report = Assembler::new().assemble(
            vec![
                value("Uptime", "1:00:00.00"),
                value("DeviceName", " DESKTOP-32LE6G6 "),
                value("Contact", "   "),
            ],
            0,
        );
        let keys: Vec<_> = report.mapping.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["DeviceName", "Uptime"]);
        assert_eq!(report.mapping["DeviceName"], "DESKTOP-32LE6G6");
        assert_eq!(report.stats.values, 2);
        assert_eq!(report.stats.empty_values, 1);
    }

    #[test]
    fn test_last_write_wins() {
        let report = Assembler::new().assemble(
            vec![value("Name", "first"), value("Other", "x"), value("Name", "second")],
            0,
        );
        assert_eq!(report.mapping["Name"], "second");
        assert_eq!(report.mapping.len(), 2);
    }

    #[test]
    fn test_failures_are_omitted_and_counted() {
        let report = Assembler::new().assemble(
            vec![
                value("A", "a"),
                result("B", QueryOutcome::Timeout),
                result("C", QueryOutcome::SecurityReport(UsmReport::NotInTimeWindow)),
                result(
                    "D",
                    QueryOutcome::OidMismatch {
                        expected: "1.3.6.1.2.1.1.1.0".into(),
                        actual: "9.9.9".into(),
                    },
                ),
                result("E", QueryOutcome::NoBinding),
                result("F", QueryOutcome::Exception(Value::NoSuchInstance)),
                result("G", QueryOutcome::AgentError(ErrorStatus::NoSuchName)),
                result("H", QueryOutcome::Failed(Error::SessionClosed)),
            ],
            2,
        );
        assert_eq!(report.mapping.len(), 1);
        assert_eq!(
            report.stats,
            CycleStats {
                requested: 8,
                values: 1,
                empty_values: 0,
                timeouts: 1,
                security_reports: 1,
                mismatches: 1,
                empty_bindings: 1,
                exceptions: 1,
                agent_errors: 1,
                failures: 1,
                malformed: 2,
            }
        );
        assert_eq!(report.stats.omitted(), 7);
    }

    #[test]
    fn test_report_placeholder() {
        let assembler = Assembler::with_report_placeholder("N/A");
        let report = assembler.assemble(
            vec![result("Name", QueryOutcome::SecurityReport(UsmReport::UnknownUserName))],
            0,
        );
        assert_eq!(report.mapping["Name"], "N/A");
        assert_eq!(report.stats.security_reports, 1);
        assert_eq!(report.stats.values, 1);
    }

    #[test]
    fn test_empty_input() {
        let report = Assembler::new().assemble(Vec::new(), 0);
        assert!(report.mapping.is_empty());
        assert_eq!(report.stats, CycleStats::default());
    }
}
