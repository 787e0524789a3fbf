//! SNMPv2c community message (RFC 1901).
//!
//! ```text
//! SEQUENCE {
//!     INTEGER version (1)
//!     OCTET STRING community
//!     PDU
//! }
//! ```

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;
use crate::version::Version;

/// SNMPv2c message.
#[derive(Debug, Clone)]
pub struct CommunityMessage {
    pub community: Bytes,
    pub pdu: Pdu,
}

impl CommunityMessage {
    pub fn new(community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            community: community.into(),
            pdu,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(Version::V2c.as_i32());
        });
        buf.finish()
    }

    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;
        let offset = seq.absolute_offset();
        let version = seq.read_integer()?;
        if Version::from_i32(version) != Some(Version::V2c) {
            return Err(Error::decode(offset, DecodeErrorKind::UnknownVersion(version)));
        }
        let community = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;
        seq.expect_end()?;
        Ok(Self { community, pdu })
    }

    pub fn into_pdu(self) -> Pdu {
        self.pdu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_get_message_bytes() {
        let msg = CommunityMessage::new(
            Bytes::from_static(b"public"),
            Pdu::get(1, &oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)),
        );
        let bytes = msg.encode();
        assert_eq!(
            &bytes[..13],
            &[
                0x30, 0x26, // message SEQUENCE
                0x02, 0x01, 0x01, // version 1 (v2c)
                0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c',
            ]
        );
        let decoded = CommunityMessage::decode(bytes).unwrap();
        assert_eq!(decoded.community.as_ref(), b"public");
        assert_eq!(decoded.pdu.request_id, 1);
    }

    #[test]
    fn test_rejects_v1() {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            Pdu::empty_get(1).encode(buf);
            buf.push_octet_string(b"public");
            buf.push_integer(0);
        });
        assert!(matches!(
            CommunityMessage::decode(buf.finish()),
            Err(Error::Decode {
                kind: DecodeErrorKind::UnknownVersion(0),
                ..
            })
        ));
    }
}
