//! CLI support for the `snmp-resolve` binary: argument groups, config
//! assembly and output formatting.
//!
//! This module is only available with the `cli` feature.

pub mod args;
pub mod output;
