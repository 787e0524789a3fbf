//! Common test fixtures and constants.

use std::time::Duration;

use snmp_resolver::ResolverConfig;

// =============================================================================
// Standard system MIB OIDs (1.3.6.1.2.1.1.*), as written in property lists
// =============================================================================

pub const SYS_DESCR: &str = ".1.3.6.1.2.1.1.1.0";
pub const SYS_UPTIME: &str = ".1.3.6.1.2.1.1.3.0";
pub const SYS_CONTACT: &str = ".1.3.6.1.2.1.1.4.0";
pub const SYS_NAME: &str = ".1.3.6.1.2.1.1.5.0";
pub const SYS_LOCATION: &str = ".1.3.6.1.2.1.1.6.0";

/// Nonexistent OID for testing noSuchObject.
pub const NONEXISTENT: &str = ".1.3.6.1.99.99.99.0";

// =============================================================================
// Credentials
// =============================================================================

pub const COMMUNITY: &str = "public";
pub const LOGIN: &str = "monitor";
pub const AUTH_PASSWORD: &str = "authpass123";
pub const PRIV_PASSWORD: &str = "privpass123";

/// Agent engine ID (enterprise 8072, net-snmp style text format).
pub const ENGINE_ID: &[u8] = &[0x80, 0x00, 0x1F, 0x88, 0x04, b't', b'e', b's', b't'];

// =============================================================================
// Config helpers
// =============================================================================

/// v2c config for a test agent, with short timeouts.
pub fn v2c_config(addr: std::net::SocketAddr, properties: &str) -> ResolverConfig {
    ResolverConfig::new(addr.ip().to_string())
        .port(addr.port())
        .community(COMMUNITY)
        .version("2c")
        .request_timeout(Duration::from_millis(200))
        .retries(1)
        .snmp_properties(properties)
}

/// v3 config for a test agent, with short timeouts.
pub fn v3_config(
    addr: std::net::SocketAddr,
    level: &str,
    auth_protocol: &str,
    priv_protocol: &str,
    properties: &str,
) -> ResolverConfig {
    ResolverConfig::new(addr.ip().to_string())
        .port(addr.port())
        .version("3")
        .login(LOGIN)
        .security_level(level)
        .authentication_protocol(auth_protocol)
        .auth_password(AUTH_PASSWORD)
        .privacy_protocol(priv_protocol)
        .private_password(PRIV_PASSWORD)
        .discovery_timeout(Duration::from_millis(500))
        .request_timeout(Duration::from_millis(200))
        .retries(1)
        .snmp_properties(properties)
}
