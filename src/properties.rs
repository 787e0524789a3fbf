//! Parsing of the `OID:PropertyName|OID:PropertyName` property list.
//!
//! Malformed segments are dropped with a warning and counted; they never
//! fail the list as a whole. OIDs are kept as text here and only validated
//! when queried, so one bad OID costs one property.

/// One OID to query and the property its value is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OidPropertyEntry {
    pub oid: String,
    pub property_name: String,
}

impl OidPropertyEntry {
    pub fn new(oid: impl Into<String>, property_name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            property_name: property_name.into(),
        }
    }
}

impl std::fmt::Display for OidPropertyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.oid, self.property_name)
    }
}

/// Result of parsing a property list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedProperties {
    /// Entries in input order, duplicates included.
    pub entries: Vec<OidPropertyEntry>,
    /// Segments that were dropped as corrupted.
    pub malformed: usize,
}

/// Parse a property list.
///
/// Each `|`-separated segment is split on its first `:`; both halves are
/// trimmed and must be non-empty. Blank segments (such as a trailing `|`)
/// are skipped without counting as malformed.
pub fn parse_property_spec(spec: &str) -> ParsedProperties {
    let mut parsed = ParsedProperties::default();

    for segment in spec.split('|') {
        if segment.trim().is_empty() {
            continue;
        }
        let entry = segment.split_once(':').and_then(|(oid, name)| {
            let (oid, name) = (oid.trim(), name.trim());
            (!oid.is_empty() && !name.is_empty()).then(|| OidPropertyEntry::new(oid, name))
        });
        match entry {
            Some(entry) => parsed.entries.push(entry),
            None => {
                tracing::warn!(snmp.segment = segment, "corrupted SNMP property entry");
                parsed.malformed += 1;
            }
        }
    }

    tracing::debug!(
        snmp.entries = parsed.entries.len(),
        snmp.malformed = parsed.malformed,
        "parsed SNMP property list"
    );
    parsed
}
