//! Host-facing configuration.
//!
//! [`ResolverConfig`] carries the settings exactly as a host supplies them
//! (free text, optional fields). Nothing is validated until a cycle runs;
//! see [`ResolverConfig::security_profile`] and [`ResolverConfig::snmp_version`].
//!
//! With the `serde` feature the struct deserializes from a camelCase
//! document:
//!
//! ```json
//! {
//!   "host": "192.0.2.1",
//!   "version": "3",
//!   "login": "monitor",
//!   "authPassword": "authpass123",
//!   "privatePassword": "privpass123",
//!   "securityLevel": "AUTH_PRIV",
//!   "authenticationProtocol": "SHA1",
//!   "privacyProtocol": "AES128",
//!   "snmpProperties": ".1.3.6.1.2.1.1.5.0:DeviceName"
//! }
//! ```

use std::time::Duration;

use crate::error::Result;
use crate::security::{SecurityInputs, SecurityProfile, split_combined_password};
use crate::session::Timing;
use crate::v3::SecurityLevel;
use crate::version::Version;

/// Default agent port.
pub const DEFAULT_PORT: u16 = 161;
/// Default v2c community.
pub const DEFAULT_COMMUNITY: &str = "public";

#[derive(Clone)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct ResolverConfig {
    pub host: String,
    pub port: u16,
    pub community_string: String,
    /// `"2"`, `"2c"`, `"v2c"`, `"3"` or `"v3"`.
    pub version: String,
    pub login: Option<String>,
    /// May hold the legacy combined `"auth|priv"` form, which is only split
    /// at `AUTH_PRIV`.
    pub auth_password: Option<String>,
    pub private_password: Option<String>,
    pub security_level: Option<String>,
    pub authentication_protocol: Option<String>,
    pub privacy_protocol: Option<String>,
    /// `OID:PropertyName|OID:PropertyName...`
    pub snmp_properties: String,
    /// Stored for properties answered by a security REPORT. Unset means
    /// such properties are omitted.
    pub report_placeholder: Option<String>,
    pub discovery_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub retries: Option<u32>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            community_string: DEFAULT_COMMUNITY.to_string(),
            version: "2".to_string(),
            login: None,
            auth_password: None,
            private_password: None,
            security_level: None,
            authentication_protocol: None,
            privacy_protocol: None,
            snmp_properties: String::new(),
            report_placeholder: None,
            discovery_timeout_ms: None,
            request_timeout_ms: None,
            retries: None,
        }
    }
}

impl std::fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ResolverConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("community_string", &"[REDACTED]")
            .field("version", &self.version)
            .field("login", &self.login)
            .field("auth_password", &redact(&self.auth_password))
            .field("private_password", &redact(&self.private_password))
            .field("security_level", &self.security_level)
            .field("authentication_protocol", &self.authentication_protocol)
            .field("privacy_protocol", &self.privacy_protocol)
            .field("snmp_properties", &self.snmp_properties)
            .field("report_placeholder", &self.report_placeholder)
            .field("discovery_timeout_ms", &self.discovery_timeout_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("retries", &self.retries)
            .finish()
    }
}

impl ResolverConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn community(mut self, community: impl Into<String>) -> Self {
        self.community_string = community.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    pub fn auth_password(mut self, password: impl Into<String>) -> Self {
        self.auth_password = Some(password.into());
        self
    }

    pub fn private_password(mut self, password: impl Into<String>) -> Self {
        self.private_password = Some(password.into());
        self
    }

    pub fn security_level(mut self, level: impl Into<String>) -> Self {
        self.security_level = Some(level.into());
        self
    }

    pub fn authentication_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.authentication_protocol = Some(protocol.into());
        self
    }

    pub fn privacy_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.privacy_protocol = Some(protocol.into());
        self
    }

    pub fn snmp_properties(mut self, properties: impl Into<String>) -> Self {
        self.snmp_properties = properties.into();
        self
    }

    pub fn report_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.report_placeholder = Some(placeholder.into());
        self
    }

    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Parsed protocol version.
    pub fn snmp_version(&self) -> Result<Version> {
        Version::from_config(&self.version)
    }

    /// Timing with defaults filled in.
    pub fn timing(&self) -> Timing {
        let defaults = Timing::default();
        Timing {
            discovery_timeout: self
                .discovery_timeout_ms
                .map_or(defaults.discovery_timeout, Duration::from_millis),
            request_timeout: self
                .request_timeout_ms
                .map_or(defaults.request_timeout, Duration::from_millis),
            retries: self.retries.unwrap_or(defaults.retries),
        }
    }

    /// Security inputs, splitting a combined `"auth|priv"` password when the
    /// level requires privacy and no separate privacy password is configured.
    ///
    /// Below `AUTH_PRIV` the authentication password is used as given, so it
    /// may contain `|`.
    pub fn security_inputs(&self) -> SecurityInputs<'_> {
        let wants_priv = self
            .security_level
            .as_deref()
            .and_then(|level| level.trim().parse::<SecurityLevel>().ok())
            .is_some_and(|level| level.requires_priv());
        let private = self.private_password.as_deref().filter(|p| !p.is_empty());
        let (auth_password, priv_password) = match (self.auth_password.as_deref(), private) {
            (Some(combined), None) if wants_priv => split_combined_password(combined),
            (auth, private) => (auth.unwrap_or_default(), private),
        };
        SecurityInputs {
            security_level: self.security_level.as_deref(),
            login: self.login.as_deref(),
            auth_password: Some(auth_password),
            priv_password,
            auth_protocol: self.authentication_protocol.as_deref(),
            priv_protocol: self.privacy_protocol.as_deref(),
        }
    }

    /// Validated v3 security profile.
    pub fn security_profile(&self) -> Result<SecurityProfile> {
        SecurityProfile::resolve(self.security_inputs())
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
