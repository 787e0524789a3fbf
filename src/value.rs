//! SNMP value types.
//!
//! The [`Display`](std::fmt::Display) rendering is what ends up as a property
//! value, so it favours readable text over a lossless dump.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use bytes::Bytes;
use std::fmt;

/// SNMP value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Value {
    Integer(i32),
    OctetString(Bytes),
    Null,
    ObjectIdentifier(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Bytes),
    Counter64(u64),
    /// The agent does not implement the object.
    NoSuchObject,
    /// The object exists but this instance does not.
    NoSuchInstance,
    EndOfMibView,
    /// Unrecognised tag, kept raw.
    Unknown { tag: u8, data: Bytes },
}

impl Value {
    /// Whether this is one of the RFC 3416 exception values.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView
        )
    }

    /// Decode one value TLV.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let start = decoder.absolute_offset();
        let tag = decoder.read_tag()?;
        let len = decoder.read_length()?;

        let value = match tag {
            tag::universal::INTEGER => Self::Integer(decoder.read_integer_value(len)?),
            tag::universal::OCTET_STRING => Self::OctetString(decoder.read_bytes(len)?),
            tag::universal::NULL => {
                if len != 0 {
                    return Err(Error::decode(start, DecodeErrorKind::InvalidNull));
                }
                Self::Null
            }
            tag::universal::OBJECT_IDENTIFIER => {
                Self::ObjectIdentifier(decoder.read_oid_value(len)?)
            }
            tag::application::IP_ADDRESS => {
                let bytes = decoder.read_bytes(len)?;
                let addr: [u8; 4] = bytes[..].try_into().map_err(|_| {
                    Error::decode(start, DecodeErrorKind::InvalidIpAddressLength { length: len })
                })?;
                Self::IpAddress(addr)
            }
            tag::application::COUNTER32 => Self::Counter32(decoder.read_unsigned32_value(len)?),
            tag::application::GAUGE32 => Self::Gauge32(decoder.read_unsigned32_value(len)?),
            tag::application::TIMETICKS => Self::TimeTicks(decoder.read_unsigned32_value(len)?),
            tag::application::OPAQUE => Self::Opaque(decoder.read_bytes(len)?),
            tag::application::COUNTER64 => Self::Counter64(decoder.read_counter64_value(len)?),
            tag::context::NO_SUCH_OBJECT => {
                decoder.read_bytes(len)?;
                Self::NoSuchObject
            }
            tag::context::NO_SUCH_INSTANCE => {
                decoder.read_bytes(len)?;
                Self::NoSuchInstance
            }
            tag::context::END_OF_MIB_VIEW => {
                decoder.read_bytes(len)?;
                Self::EndOfMibView
            }
            other => Self::Unknown {
                tag: other,
                data: decoder.read_bytes(len)?,
            },
        };
        Ok(value)
    }

    /// Encode into a reverse buffer.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Self::Integer(v) => buf.push_integer(*v),
            Self::OctetString(data) => buf.push_octet_string(data),
            Self::Null => buf.push_null(),
            Self::ObjectIdentifier(oid) => buf.push_oid(oid),
            Self::IpAddress(addr) => buf.push_ip_address(*addr),
            Self::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Self::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Self::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Self::Opaque(data) => buf.push_primitive(tag::application::OPAQUE, data),
            Self::Counter64(v) => buf.push_counter64(*v),
            Self::NoSuchObject => buf.push_primitive(tag::context::NO_SUCH_OBJECT, &[]),
            Self::NoSuchInstance => buf.push_primitive(tag::context::NO_SUCH_INSTANCE, &[]),
            Self::EndOfMibView => buf.push_primitive(tag::context::END_OF_MIB_VIEW, &[]),
            Self::Unknown { tag, data } => buf.push_primitive(*tag, data),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::OctetString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

/// Printable when valid UTF-8 without control characters other than
/// whitespace; agents commonly pad strings with NUL, which is tolerated at the end.
fn printable(data: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(data).ok()?;
    let text = text.trim_end_matches('\0');
    text.chars()
        .all(|c| !c.is_control() || c.is_whitespace())
        .then_some(text)
}

fn write_hex(f: &mut fmt::Formatter<'_>, data: &[u8]) -> fmt::Result {
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            f.write_str(":")?;
        }
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::OctetString(data) => match printable(data) {
                Some(text) => f.write_str(text),
                None => write_hex(f, data),
            },
            Self::Null => f.write_str("Null"),
            Self::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Self::IpAddress([a, b, c, d]) => write!(f, "{}.{}.{}.{}", a, b, c, d),
            Self::Counter32(v) | Self::Gauge32(v) => write!(f, "{}", v),
            Self::TimeTicks(ticks) => {
                let centis = ticks % 100;
                let secs = ticks / 100;
                let (days, rem) = (secs / 86_400, secs % 86_400);
                let (hours, minutes, seconds) = (rem / 3600, rem % 3600 / 60, rem % 60);
                match days {
                    0 => {}
                    1 => write!(f, "1 day, ")?,
                    n => write!(f, "{} days, ", n)?,
                }
                write!(f, "{}:{:02}:{:02}.{:02}", hours, minutes, seconds, centis)
            }
            Self::Opaque(data) => write_hex(f, data),
            Self::Counter64(v) => write!(f, "{}", v),
            Self::NoSuchObject => f.write_str("noSuchObject"),
            Self::NoSuchInstance => f.write_str("noSuchInstance"),
            Self::EndOfMibView => f.write_str("endOfMibView"),
            Self::Unknown { tag, data } => {
                write!(f, "[0x{:02X}] ", tag)?;
                write_hex(f, data)
            }
        }
    }
}
