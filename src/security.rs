//! Security profile resolution.
//!
//! Turns the host's free-text security settings into a validated
//! [`SecurityProfile`]. Protocol names that are not recognised fall back to
//! SHA1 / AES128 with a warning; missing credentials for the chosen level
//! are rejected before any socket is opened.

use zeroize::Zeroizing;

use crate::error::{Error, Result, SecurityConfigErrorKind};
use crate::v3::{AuthProtocol, PrivProtocol, SecurityLevel};

/// Used when the configured authentication protocol is absent or unknown.
pub const DEFAULT_AUTH_PROTOCOL: AuthProtocol = AuthProtocol::Sha1;
/// Used when the configured privacy protocol is absent or unknown.
pub const DEFAULT_PRIV_PROTOCOL: PrivProtocol = PrivProtocol::Aes128;

/// Raw security settings as the host supplies them. Empty strings count as
/// absent.
#[derive(Clone, Copy, Default)]
pub struct SecurityInputs<'a> {
    pub security_level: Option<&'a str>,
    pub login: Option<&'a str>,
    pub auth_password: Option<&'a str>,
    pub priv_password: Option<&'a str>,
    pub auth_protocol: Option<&'a str>,
    pub priv_protocol: Option<&'a str>,
}

/// Validated SNMPv3 security settings.
#[derive(Clone)]
pub struct SecurityProfile {
    pub security_level: SecurityLevel,
    pub auth_protocol: AuthProtocol,
    pub priv_protocol: PrivProtocol,
    pub login: String,
    pub auth_password: Zeroizing<String>,
    pub priv_password: Zeroizing<String>,
}

impl std::fmt::Debug for SecurityProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityProfile")
            .field("security_level", &self.security_level)
            .field("auth_protocol", &self.auth_protocol)
            .field("priv_protocol", &self.priv_protocol)
            .field("login", &self.login)
            .field("auth_password", &"[REDACTED]")
            .field("priv_password", &"[REDACTED]")
            .finish()
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl SecurityProfile {
    /// Validate and resolve, checking in this order: security level, login,
    /// authentication password, privacy password.
    pub fn resolve(inputs: SecurityInputs<'_>) -> Result<Self> {
        let level_text = present(inputs.security_level.map(str::trim)).ok_or_else(|| {
            Error::security_config(SecurityConfigErrorKind::MissingSecurityLevel)
        })?;
        let security_level: SecurityLevel = level_text.parse().map_err(|_| {
            Error::security_config(SecurityConfigErrorKind::UnknownSecurityLevel(
                level_text.into(),
            ))
        })?;

        let login = present(inputs.login);
        let auth_password = present(inputs.auth_password);
        let priv_password = present(inputs.priv_password);

        if security_level.requires_auth() {
            if login.is_none() {
                return Err(Error::security_config(SecurityConfigErrorKind::MissingLogin));
            }
            if auth_password.is_none() {
                return Err(Error::security_config(
                    SecurityConfigErrorKind::MissingAuthPassword,
                ));
            }
        }
        if security_level.requires_priv() && priv_password.is_none() {
            return Err(Error::security_config(
                SecurityConfigErrorKind::MissingPrivPassword,
            ));
        }

        Ok(Self {
            security_level,
            auth_protocol: resolve_auth_protocol(inputs.auth_protocol),
            priv_protocol: resolve_priv_protocol(inputs.priv_protocol),
            login: login.unwrap_or_default().to_string(),
            auth_password: Zeroizing::new(auth_password.unwrap_or_default().to_string()),
            priv_password: Zeroizing::new(priv_password.unwrap_or_default().to_string()),
        })
    }
}

/// Map an authentication protocol name, falling back to SHA1.
pub fn resolve_auth_protocol(name: Option<&str>) -> AuthProtocol {
    match present(name.map(str::trim)) {
        None => DEFAULT_AUTH_PROTOCOL,
        Some(name) => name.parse().unwrap_or_else(|_| {
            tracing::warn!(
                snmp.auth_protocol = name,
                snmp.fallback = %DEFAULT_AUTH_PROTOCOL,
                "unknown authentication protocol, using default"
            );
            DEFAULT_AUTH_PROTOCOL
        }),
    }
}

/// Map a privacy protocol name, falling back to AES128.
pub fn resolve_priv_protocol(name: Option<&str>) -> PrivProtocol {
    match present(name.map(str::trim)) {
        None => DEFAULT_PRIV_PROTOCOL,
        Some(name) => name.parse().unwrap_or_else(|_| {
            tracing::warn!(
                snmp.priv_protocol = name,
                snmp.fallback = %DEFAULT_PRIV_PROTOCOL,
                "unknown privacy protocol, using default"
            );
            DEFAULT_PRIV_PROTOCOL
        }),
    }
}

/// Split a legacy `"auth|priv"` password into its halves.
///
/// Without a `|` the whole text is the authentication password.
pub fn split_combined_password(combined: &str) -> (&str, Option<&str>) {
    match combined.split_once('|') {
        Some((auth, priv_)) => (auth, Some(priv_)),
        None => (combined, None),
    }
}
