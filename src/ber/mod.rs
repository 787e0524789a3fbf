//! BER (Basic Encoding Rules) codec for SNMP.
//!
//! Covers the subset of X.690 that SNMP messages use: definite lengths,
//! primitive integers and strings, OIDs and constructed sequences.

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::*;
pub use encode::*;
pub use length::*;
