#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use snmp_resolver::message::{CommunityMessage, Message, V3Message};
use snmp_resolver::v3::UsmSecurityParams;
use snmp_resolver::v3::usm::locate_auth_params;

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    // Unified decoder (dispatches on version)
    let _ = Message::decode(bytes.clone());

    let _ = CommunityMessage::decode(bytes.clone());

    if let Ok(msg) = V3Message::decode(bytes.clone()) {
        let _ = UsmSecurityParams::decode(msg.security_params);
    }
    let _ = UsmSecurityParams::decode(bytes);

    // Returned range must lie inside the message
    if let Some(range) = locate_auth_params(data) {
        assert!(range.end <= data.len());
    }
});
