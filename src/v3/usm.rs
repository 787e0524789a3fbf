//! USM security parameters (RFC 3414 Section 2.4).
//!
//! ```text
//! UsmSecurityParameters ::= SEQUENCE {
//!     msgAuthoritativeEngineID     OCTET STRING,
//!     msgAuthoritativeEngineBoots  INTEGER (0..2147483647),
//!     msgAuthoritativeEngineTime   INTEGER (0..2147483647),
//!     msgUserName                  OCTET STRING (SIZE(0..32)),
//!     msgAuthenticationParameters  OCTET STRING,
//!     msgPrivacyParameters         OCTET STRING
//! }
//! ```

use std::ops::Range;

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::Result;

/// Decoded or to-be-encoded USM parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsmSecurityParams {
    pub engine_id: Bytes,
    pub engine_boots: u32,
    pub engine_time: u32,
    pub username: Bytes,
    pub auth_params: Bytes,
    pub priv_params: Bytes,
}

impl UsmSecurityParams {
    /// Parameters for the empty discovery request.
    pub fn discovery() -> Self {
        Self::default()
    }

    /// Serialize to the inner SEQUENCE carried in msgSecurityParameters.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_octet_string(&self.priv_params);
            buf.push_octet_string(&self.auth_params);
            buf.push_octet_string(&self.username);
            buf.push_integer(clamp_i32(self.engine_time));
            buf.push_integer(clamp_i32(self.engine_boots));
            buf.push_octet_string(&self.engine_id);
        });
        buf.finish()
    }

    /// Parse msgSecurityParameters content.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut outer = Decoder::new(data);
        let mut seq = outer.read_sequence()?;
        let engine_id = seq.read_octet_string()?;
        let engine_boots = seq.read_integer()?.max(0) as u32;
        let engine_time = seq.read_integer()?.max(0) as u32;
        let username = seq.read_octet_string()?;
        let auth_params = seq.read_octet_string()?;
        let priv_params = seq.read_octet_string()?;
        Ok(Self {
            engine_id,
            engine_boots,
            engine_time,
            username,
            auth_params,
            priv_params,
        })
    }
}

fn clamp_i32(value: u32) -> i32 {
    value.min(i32::MAX as u32) as i32
}

/// Byte range of msgAuthenticationParameters inside an encoded SNMPv3
/// message, or `None` if the message does not have the expected shape.
pub fn locate_auth_params(message: &[u8]) -> Option<Range<usize>> {
    let mut top = Decoder::from_slice(message);
    let mut msg = top.read_sequence().ok()?;
    msg.read_integer().ok()?;
    msg.skip_tlv().ok()?; // msgGlobalData
    let len = msg.expect_tag(tag::universal::OCTET_STRING).ok()?;
    let mut params = msg.sub_decoder(len).ok()?;
    let mut usm = params.read_sequence().ok()?;
    for _ in 0..4 {
        usm.skip_tlv().ok()?;
    }
    let len = usm.expect_tag(tag::universal::OCTET_STRING).ok()?;
    let start = usm.absolute_offset();
    Some(start..start + len)
}
