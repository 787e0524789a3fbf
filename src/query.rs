//! Query execution: one GET per property entry, classified per OID.
//!
//! Entries are queried one after another on the same session. Nothing that
//! goes wrong for one OID stops the next one from being attempted; every
//! failure becomes a [`QueryOutcome`].

use crate::error::{Error, ErrorStatus};
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::properties::OidPropertyEntry;
use crate::session::{GetReply, Session};
use crate::v3::UsmReport;
use crate::value::Value;

/// How one OID fared in one cycle.
#[derive(Debug)]
#[non_exhaustive]
pub enum QueryOutcome {
    /// Rendered, trimmed value of the matching binding.
    Value(String),
    /// No answer within the timeout and retries.
    Timeout,
    /// The agent answered with a security REPORT.
    SecurityReport(UsmReport),
    /// The binding that came back is for a different OID.
    OidMismatch { expected: String, actual: String },
    /// The response carried no bindings.
    NoBinding,
    /// noSuchObject, noSuchInstance or endOfMibView.
    Exception(Value),
    /// Non-zero error-status in the response.
    AgentError(ErrorStatus),
    /// Any other per-OID failure.
    Failed(Error),
}

impl QueryOutcome {
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl std::fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "value '{}'", v),
            Self::Timeout => write!(f, "timeout"),
            Self::SecurityReport(r) => write!(f, "security report ({})", r),
            Self::OidMismatch { expected, actual } => {
                write!(f, "OID mismatch: expected {}, actual {}", expected, actual)
            }
            Self::NoBinding => write!(f, "no variable bindings"),
            Self::Exception(v) => write!(f, "{}", v),
            Self::AgentError(status) => write!(f, "agent error: {}", status),
            Self::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// An entry together with what its query produced.
#[derive(Debug)]
pub struct QueryResult {
    pub entry: OidPropertyEntry,
    pub outcome: QueryOutcome,
}

fn normalize(oid: &str) -> &str {
    let oid = oid.trim();
    oid.strip_prefix('.').unwrap_or(oid)
}

fn is_dotted_prefix(prefix: &str, full: &str) -> bool {
    full.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('.'))
}

fn is_dotted_suffix(suffix: &str, full: &str) -> bool {
    full.strip_suffix(suffix).is_some_and(|rest| rest.ends_with('.'))
}

/// Whether a returned binding OID answers the requested one.
///
/// Accepted after dropping a leading `.`: equality, the returned OID
/// extending the requested one (index-qualified answers), or either being a
/// whole-arc suffix of the other.
pub fn oid_matches(requested: &str, returned: &str) -> bool {
    let (requested, returned) = (normalize(requested), normalize(returned));
    if requested.is_empty() || returned.is_empty() {
        return false;
    }
    requested == returned
        || is_dotted_prefix(requested, returned)
        || is_dotted_suffix(requested, returned)
        || is_dotted_suffix(returned, requested)
}

/// Query a single entry.
pub async fn query_entry<S: Session>(session: &mut S, entry: &OidPropertyEntry) -> QueryOutcome {
    let oid = match Oid::parse(&entry.oid) {
        Ok(oid) => oid,
        Err(e) => {
            tracing::warn!(snmp.oid = %entry.oid, error = %e, "invalid OID in property list");
            return QueryOutcome::Failed(e);
        }
    };

    let outcome = match session.get(&oid).await {
        Ok(GetReply::Response(pdu)) => classify_response(&entry.oid, pdu),
        Ok(GetReply::Report(report)) => QueryOutcome::SecurityReport(report),
        Err(e) if e.is_timeout() => QueryOutcome::Timeout,
        Err(e) => QueryOutcome::Failed(e),
    };

    tracing::debug!(
        snmp.target = %session.target(),
        snmp.oid = %entry.oid,
        snmp.property = %entry.property_name,
        outcome = %outcome,
        "queried OID"
    );
    outcome
}

fn classify_response(requested: &str, pdu: Pdu) -> QueryOutcome {
    let status = pdu.status();
    if status != ErrorStatus::NoError {
        return QueryOutcome::AgentError(status);
    }
    let Some(binding) = pdu.varbinds.into_iter().next() else {
        tracing::debug!(snmp.oid = requested, "no variable bindings available, skipping");
        return QueryOutcome::NoBinding;
    };

    let actual = binding.oid.to_string();
    if !oid_matches(requested, &actual) {
        tracing::warn!(expected = requested, actual = %actual, "SNMP entry does not match by OID");
        return QueryOutcome::OidMismatch {
            expected: requested.to_string(),
            actual,
        };
    }
    if binding.value.is_exception() {
        return QueryOutcome::Exception(binding.value);
    }
    QueryOutcome::Value(binding.value.to_string().trim().to_string())
}

/// Query every entry in order.
pub async fn execute<S: Session>(session: &mut S, entries: &[OidPropertyEntry]) -> Vec<QueryResult> {
    let mut results = Vec::with_capacity(entries.len());
    for entry in entries {
        let outcome = query_entry(session, entry).await;
        results.push(QueryResult {
            entry: entry.clone(),
            outcome,
        });
    }
    results
}
