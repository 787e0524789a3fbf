//! Commonly used types.
//!
//! ```rust,no_run
//! use snmp_resolver::prelude::*;
//! ```

pub use crate::assemble::{CycleReport, CycleStats, ResultMapping};
pub use crate::config::ResolverConfig;
pub use crate::error::{Error, Result};
pub use crate::oid::Oid;
pub use crate::query::QueryOutcome;
pub use crate::resolver::Resolver;
pub use crate::v3::{AuthProtocol, PrivProtocol, SecurityLevel};
pub use crate::value::Value;

#[doc(no_inline)]
pub use crate::oid;
