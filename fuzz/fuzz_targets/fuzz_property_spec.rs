#![no_main]

use libfuzzer_sys::fuzz_target;

use snmp_resolver::oid::Oid;
use snmp_resolver::parse_property_spec;
use snmp_resolver::query::oid_matches;

fuzz_target!(|data: &[u8]| {
    let _ = Oid::from_ber(data);

    let Ok(spec) = std::str::from_utf8(data) else {
        return;
    };
    let parsed = parse_property_spec(spec);
    for entry in &parsed.entries {
        assert!(!entry.oid.is_empty());
        assert!(!entry.property_name.is_empty());
        let _ = Oid::parse(&entry.oid);
        assert!(oid_matches(&entry.oid, &entry.oid) || entry.oid.trim_start_matches('.').is_empty());
    }
});
