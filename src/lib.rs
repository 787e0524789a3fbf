#![allow(clippy::result_large_err)]

//! # snmp-resolver
//!
//! Resolves a configured list of SNMP OIDs into a named property mapping,
//! over SNMPv2c or SNMPv3 (USM, all three security levels).
//!
//! A property list such as
//! `".1.3.6.1.2.1.1.5.0:DeviceName|.1.3.6.1.2.1.1.1.0:Description"` is
//! parsed once; each query cycle issues one GET per OID and returns the
//! trimmed values sorted by property name. OIDs that time out, come back
//! for a different OID, or are answered with a security REPORT are left out
//! of the mapping without failing the cycle.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snmp_resolver::{Resolver, ResolverConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), snmp_resolver::Error> {
//!     let config = ResolverConfig::new("192.0.2.1")
//!         .community("public")
//!         .snmp_properties(".1.3.6.1.2.1.1.5.0:DeviceName");
//!
//!     let resolver = Resolver::new(config)?;
//!     let mapping = resolver.resolve().await?;
//!     println!("{:?}", mapping.get("DeviceName"));
//!     Ok(())
//! }
//! ```
//!
//! ## Building blocks
//!
//! - [`properties`]: property list parsing
//! - [`security`]: security profile resolution
//! - [`session`]: v2c and v3 session management
//! - [`query`]: per-OID GET and outcome classification
//! - [`assemble`]: folding outcomes into the mapping

pub mod assemble;
pub mod ber;
pub mod config;
pub mod error;
pub mod message;
pub mod oid;
pub mod pdu;
pub mod prelude;
pub mod properties;
pub mod query;
pub mod resolver;
pub mod security;
pub mod session;
pub mod transport;
pub mod v3;
pub mod value;
pub mod version;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use assemble::{CycleReport, CycleStats, ResultMapping};
pub use config::ResolverConfig;
pub use error::{Error, Result};
pub use oid::Oid;
pub use properties::{OidPropertyEntry, parse_property_spec};
pub use query::QueryOutcome;
pub use resolver::Resolver;
pub use security::SecurityProfile;
pub use session::SessionPhase;
pub use value::Value;
pub use version::Version;
