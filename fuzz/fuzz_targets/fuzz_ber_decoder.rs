#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use snmp_resolver::ber::Decoder;
use snmp_resolver::pdu::Pdu;
use snmp_resolver::value::Value;

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_integer();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_octet_string();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_null();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_oid();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_sequence();

    // Every value type, then a whole PDU; rendering must not panic either
    let mut decoder = Decoder::new(bytes.clone());
    if let Ok(value) = Value::decode(&mut decoder) {
        let _ = value.to_string();
    }

    let mut decoder = Decoder::new(bytes);
    let _ = Pdu::decode(&mut decoder);
});
