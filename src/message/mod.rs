//! SNMP message wrappers.
//!
//! - [`CommunityMessage`]: SNMPv2c, authenticated by community string
//! - [`V3Message`]: SNMPv3 with USM security parameters

mod community;
mod v3;

pub use community::CommunityMessage;
pub use v3::{MsgFlags, MsgGlobalData, ScopedPdu, ScopedPduData, V3Message};

use bytes::Bytes;

use crate::ber::Decoder;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::version::Version;

/// Decoded SNMP message of either version.
#[derive(Debug)]
pub enum Message {
    Community(CommunityMessage),
    V3(V3Message),
}

impl Message {
    pub fn version(&self) -> Version {
        match self {
            Message::Community(_) => Version::V2c,
            Message::V3(_) => Version::V3,
        }
    }

    /// Decode a message, dispatching on its version field.
    pub fn decode(data: Bytes) -> Result<Self> {
        match peek_version(&data)? {
            Version::V2c => CommunityMessage::decode(data).map(Message::Community),
            Version::V3 => V3Message::decode(data).map(Message::V3),
        }
    }
}

/// Read only the version field of an encoded message.
pub fn peek_version(data: &Bytes) -> Result<Version> {
    let mut decoder = Decoder::new(data.clone());
    let mut seq = decoder.read_sequence()?;
    let offset = seq.absolute_offset();
    let value = seq.read_integer()?;
    Version::from_i32(value)
        .ok_or_else(|| Error::decode(offset, DecodeErrorKind::UnknownVersion(value)))
}

impl From<CommunityMessage> for Message {
    fn from(msg: CommunityMessage) -> Self {
        Message::Community(msg)
    }
}

impl From<V3Message> for Message {
    fn from(msg: V3Message) -> Self {
        Message::V3(msg)
    }
}
