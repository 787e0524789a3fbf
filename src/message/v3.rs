//! SNMPv3 message format (RFC 3412 Section 6).
//!
//! ```text
//! SEQUENCE {
//!     INTEGER version (3)
//!     SEQUENCE msgGlobalData {
//!         INTEGER msgID
//!         INTEGER msgMaxSize
//!         OCTET STRING msgFlags (1 byte)
//!         INTEGER msgSecurityModel (3 = USM)
//!     }
//!     OCTET STRING msgSecurityParameters
//!     ScopedPDU | OCTET STRING encryptedPDU
//! }
//! ```

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;
use crate::v3::{SecurityLevel, UsmSecurityParams};
use crate::version::Version;

/// Largest message this manager accepts (max UDP payload over IPv4).
pub const MSG_MAX_SIZE: i32 = 65507;

const SECURITY_MODEL_USM: i32 = 3;

const FLAG_AUTH: u8 = 0x01;
const FLAG_PRIV: u8 = 0x02;
const FLAG_REPORTABLE: u8 = 0x04;

/// msgFlags octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgFlags {
    pub security_level: SecurityLevel,
    pub reportable: bool,
}

impl MsgFlags {
    pub fn new(security_level: SecurityLevel, reportable: bool) -> Self {
        Self {
            security_level,
            reportable,
        }
    }

    pub fn to_byte(self) -> u8 {
        let level = match self.security_level {
            SecurityLevel::NoAuthNoPriv => 0,
            SecurityLevel::AuthNoPriv => FLAG_AUTH,
            SecurityLevel::AuthPriv => FLAG_AUTH | FLAG_PRIV,
        };
        if self.reportable {
            level | FLAG_REPORTABLE
        } else {
            level
        }
    }

    /// Parse a flags octet; privacy without authentication is invalid.
    pub fn from_byte(byte: u8) -> Option<Self> {
        let security_level = match (byte & FLAG_AUTH != 0, byte & FLAG_PRIV != 0) {
            (false, false) => SecurityLevel::NoAuthNoPriv,
            (true, false) => SecurityLevel::AuthNoPriv,
            (true, true) => SecurityLevel::AuthPriv,
            (false, true) => return None,
        };
        Some(Self {
            security_level,
            reportable: byte & FLAG_REPORTABLE != 0,
        })
    }
}

/// msgGlobalData header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgGlobalData {
    pub msg_id: i32,
    pub msg_max_size: i32,
    pub flags: MsgFlags,
}

impl MsgGlobalData {
    pub fn new(msg_id: i32, flags: MsgFlags) -> Self {
        Self {
            msg_id,
            msg_max_size: MSG_MAX_SIZE,
            flags,
        }
    }

    fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            buf.push_integer(SECURITY_MODEL_USM);
            buf.push_octet_string(&[self.flags.to_byte()]);
            buf.push_integer(self.msg_max_size);
            buf.push_integer(self.msg_id);
        });
    }

    fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;
        let msg_id = seq.read_integer()?;
        let msg_max_size = seq.read_integer()?;

        let flags_offset = seq.absolute_offset();
        let raw = seq.read_octet_string()?;
        let flags = match raw.as_ref() {
            [byte] => MsgFlags::from_byte(*byte),
            _ => None,
        }
        .ok_or_else(|| Error::decode(flags_offset, DecodeErrorKind::InvalidMsgFlags))?;

        let model_offset = seq.absolute_offset();
        let model = seq.read_integer()?;
        if model != SECURITY_MODEL_USM {
            return Err(Error::decode(
                model_offset,
                DecodeErrorKind::UnknownSecurityModel(model),
            ));
        }
        Ok(Self {
            msg_id,
            msg_max_size,
            flags,
        })
    }
}

/// ScopedPDU: context plus the PDU itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedPdu {
    pub context_engine_id: Bytes,
    pub context_name: Bytes,
    pub pdu: Pdu,
}

impl ScopedPdu {
    pub fn new(context_engine_id: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            context_engine_id: context_engine_id.into(),
            context_name: Bytes::new(),
            pdu,
        }
    }

    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.context_name);
            buf.push_octet_string(&self.context_engine_id);
        });
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        self.encode(&mut buf);
        buf.finish()
    }

    /// Decode one ScopedPDU. Bytes after it (CBC padding) are left unread.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;
        let context_engine_id = seq.read_octet_string()?;
        let context_name = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;
        Ok(Self {
            context_engine_id,
            context_name,
            pdu,
        })
    }
}

/// msgData: either in the clear or encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopedPduData {
    Plaintext(ScopedPdu),
    Encrypted(Bytes),
}

/// Complete SNMPv3 message.
#[derive(Debug, Clone)]
pub struct V3Message {
    pub global: MsgGlobalData,
    /// Encoded [`UsmSecurityParams`].
    pub security_params: Bytes,
    pub data: ScopedPduData,
}

impl V3Message {
    pub fn new(global: MsgGlobalData, security_params: Bytes, data: ScopedPduData) -> Self {
        Self {
            global,
            security_params,
            data,
        }
    }

    /// Unauthenticated, reportable GET with no bindings and empty USM
    /// parameters; the agent answers with a REPORT revealing its engine.
    pub fn discovery_request(msg_id: i32) -> Self {
        Self::new(
            MsgGlobalData::new(msg_id, MsgFlags::new(SecurityLevel::NoAuthNoPriv, true)),
            UsmSecurityParams::discovery().encode(),
            ScopedPduData::Plaintext(ScopedPdu::new(Bytes::new(), Pdu::empty_get(msg_id))),
        )
    }

    pub fn msg_id(&self) -> i32 {
        self.global.msg_id
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.global.flags.security_level
    }

    /// The PDU, unless it is still encrypted.
    pub fn pdu(&self) -> Option<&Pdu> {
        match &self.data {
            ScopedPduData::Plaintext(scoped) => Some(&scoped.pdu),
            ScopedPduData::Encrypted(_) => None,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            match &self.data {
                ScopedPduData::Plaintext(scoped) => scoped.encode(buf),
                ScopedPduData::Encrypted(ciphertext) => buf.push_octet_string(ciphertext),
            }
            buf.push_octet_string(&self.security_params);
            self.global.encode(buf);
            buf.push_integer(Version::V3.as_i32());
        });
        buf.finish()
    }

    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let offset = seq.absolute_offset();
        let version = seq.read_integer()?;
        if version != Version::V3.as_i32() {
            return Err(Error::decode(offset, DecodeErrorKind::UnknownVersion(version)));
        }

        let global = MsgGlobalData::decode(&mut seq)?;
        let security_params = seq.read_octet_string()?;

        let data = match seq.peek_tag() {
            Some(tag::universal::OCTET_STRING) => {
                ScopedPduData::Encrypted(seq.read_octet_string()?)
            }
            _ => ScopedPduData::Plaintext(ScopedPdu::decode(&mut seq)?),
        };
        seq.expect_end()?;

        Ok(Self {
            global,
            security_params,
            data,
        })
    }
}
