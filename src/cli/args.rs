//! Command-line argument structures for `snmp-resolve`.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::ResolverConfig;

/// SNMP version for CLI argument parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SnmpVersion {
    /// SNMPv2c
    #[value(name = "2c", alias = "2")]
    V2c,
    /// SNMPv3
    #[value(name = "3")]
    V3,
}

impl SnmpVersion {
    fn as_config(self) -> &'static str {
        match self {
            Self::V2c => "2c",
            Self::V3 => "3",
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `Name: value` lines.
    #[default]
    Text,
    /// JSON document.
    Json,
}

/// Agent address and protocol arguments.
#[derive(Debug, Parser)]
pub struct CommonArgs {
    /// Agent host name or address. Optional when --config supplies it.
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Agent UDP port (default 161).
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// SNMP version: 2c or 3.
    #[arg(short = 'v', long = "snmp-version")]
    pub snmp_version: Option<SnmpVersion>,

    /// Community string (v2c, default "public").
    #[arg(short = 'c', long = "community")]
    pub community: Option<String>,

    /// JSON configuration document; flags override its fields.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Engine discovery timeout in milliseconds.
    #[arg(long = "discovery-timeout")]
    pub discovery_timeout_ms: Option<u64>,

    /// Per-attempt request timeout in milliseconds.
    #[arg(short = 't', long = "timeout")]
    pub request_timeout_ms: Option<u64>,

    /// Retries after a request times out.
    #[arg(short = 'r', long = "retries")]
    pub retries: Option<u32>,
}

/// SNMPv3 security arguments. Protocol names are free text; unknown names
/// fall back to SHA1 / AES128 with a warning.
#[derive(Debug, Parser)]
pub struct V3Args {
    /// Security name/login.
    #[arg(short = 'u', long = "login")]
    pub login: Option<String>,

    /// Security level: AUTH_PRIV, AUTH_NOPRIV or NOAUTH_NOPRIV.
    #[arg(short = 'l', long = "security-level")]
    pub security_level: Option<String>,

    /// Authentication protocol: SHA1, MD5, HMAC128SHA224, HMAC192SHA256,
    /// HMAC256SHA384, HMAC384SHA512.
    #[arg(short = 'a', long = "auth-protocol")]
    pub auth_protocol: Option<String>,

    /// Authentication passphrase (or the legacy "auth|priv" pair).
    #[arg(short = 'A', long = "auth-password")]
    pub auth_password: Option<String>,

    /// Privacy protocol: AES128, AES192, AES256, DES, 3DES.
    #[arg(short = 'x', long = "priv-protocol")]
    pub priv_protocol: Option<String>,

    /// Privacy passphrase.
    #[arg(short = 'X', long = "priv-password")]
    pub priv_password: Option<String>,
}

/// What to query.
#[derive(Debug, Parser)]
pub struct PropertyArgs {
    /// Property list: OID:Name|OID:Name...
    #[arg(short = 'P', long = "properties")]
    pub properties: Option<String>,

    /// Value stored for properties answered by a security REPORT.
    #[arg(long = "report-placeholder")]
    pub report_placeholder: Option<String>,
}

/// Output control arguments.
#[derive(Debug, Parser)]
pub struct OutputArgs {
    /// Output format: text or json.
    #[arg(short = 'o', long = "format", default_value = "text")]
    pub format: OutputFormat,

    /// Include per-cycle counters.
    #[arg(long = "stats")]
    pub stats: bool,

    /// Enable debug logging (snmp_resolver=debug).
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Enable trace logging (snmp_resolver=trace).
    #[arg(short = 'D', long = "trace")]
    pub trace: bool,
}

impl OutputArgs {
    /// Initialize tracing on stderr. `RUST_LOG` wins over the flags.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let default = if self.trace {
            "snmp_resolver=trace"
        } else if self.debug {
            "snmp_resolver=debug"
        } else {
            "snmp_resolver=warn"
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Load the `--config` document (if any) and apply flag overrides.
pub fn build_config(
    common: &CommonArgs,
    v3: &V3Args,
    properties: &PropertyArgs,
) -> Result<ResolverConfig, String> {
    let mut config = match &common.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            serde_json::from_str::<ResolverConfig>(&text)
                .map_err(|e| format!("invalid config {}: {}", path.display(), e))?
        }
        None => ResolverConfig::default(),
    };

    if let Some(target) = &common.target {
        config.host = target.clone();
    }
    if let Some(port) = common.port {
        config.port = port;
    }
    if let Some(version) = common.snmp_version {
        config.version = version.as_config().to_string();
    } else if common.config.is_none() && v3.login.is_some() {
        config.version = SnmpVersion::V3.as_config().to_string();
    }
    if let Some(community) = &common.community {
        config.community_string = community.clone();
    }
    override_opt(&mut config.discovery_timeout_ms, common.discovery_timeout_ms);
    override_opt(&mut config.request_timeout_ms, common.request_timeout_ms);
    override_opt(&mut config.retries, common.retries);

    override_opt(&mut config.login, v3.login.clone());
    override_opt(&mut config.security_level, v3.security_level.clone());
    override_opt(&mut config.authentication_protocol, v3.auth_protocol.clone());
    override_opt(&mut config.auth_password, v3.auth_password.clone());
    override_opt(&mut config.privacy_protocol, v3.priv_protocol.clone());
    override_opt(&mut config.private_password, v3.priv_password.clone());

    if let Some(props) = &properties.properties {
        config.snmp_properties = props.clone();
    }
    override_opt(&mut config.report_placeholder, properties.report_placeholder.clone());

    if config.host.trim().is_empty() {
        return Err("no target given (positional TARGET or \"host\" in --config)".into());
    }
    Ok(config)
}

fn override_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Parser)]
    struct TestArgs {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        v3: V3Args,
        #[command(flatten)]
        properties: PropertyArgs,
        #[command(flatten)]
        output: OutputArgs,
    }

    fn parse(args: &[&str]) -> TestArgs {
        TestArgs::try_parse_from(std::iter::once("snmp-resolve").chain(args.iter().copied())).unwrap()
    }

    fn config(args: &[&str]) -> Result<ResolverConfig, String> {
        let a = parse(args);
        build_config(&a.common, &a.v3, &a.properties)
    }

    #[test]
    fn test_v2c_flags() {
        let c = config(&["192.0.2.1", "-p", "1161", "-c", "private", "-P", "1.3.6.1.2.1.1.5.0:Name"]).unwrap();
        assert_eq!(c.host, "192.0.2.1");
        assert_eq!(c.port, 1161);
        assert_eq!(c.community_string, "private");
        assert_eq!(c.version, "2");
        assert_eq!(c.snmp_properties, "1.3.6.1.2.1.1.5.0:Name");
    }

    #[test]
    fn test_login_implies_v3() {
        let c = config(&["agent", "-u", "admin", "-l", "AUTH_NOPRIV", "-A", "authpass123"]).unwrap();
        assert_eq!(c.version, "3");
        assert_eq!(c.security_level.as_deref(), Some("AUTH_NOPRIV"));
        assert!(c.security_profile().is_ok());
    }

    #[test]
    fn test_version_alias() {
        assert_eq!(parse(&["h", "-v", "2"]).common.snmp_version, Some(SnmpVersion::V2c));
        assert_eq!(parse(&["h", "-v", "3"]).common.snmp_version, Some(SnmpVersion::V3));
        assert!(TestArgs::try_parse_from(["snmp-resolve", "h", "-v", "1"]).is_err());
    }

    #[test]
    fn test_missing_target() {
        assert!(config(&["-P", "1.3:X"]).is_err());
    }

    #[test]
    fn test_output_flags() {
        let a = parse(&["h", "-o", "json", "--stats", "-d"]);
        assert_eq!(a.output.format, OutputFormat::Json);
        assert!(a.output.stats);
        assert!(a.output.debug);
    }

    #[test]
    fn test_config_file_with_overrides() {
        let path = std::env::temp_dir().join(format!("snmp-resolve-test-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"host":"192.0.2.9","version":"3","login":"monitor","securityLevel":"NOAUTH_NOPRIV","snmpProperties":"1.3.6.1.2.1.1.5.0:Name"}"#,
        )
        .unwrap();
        let path_str = path.to_str().unwrap();

        let c = config(&["--config", path_str, "-p", "1162", "-l", "noAuthNoPriv"]).unwrap();
        assert_eq!(c.host, "192.0.2.9");
        assert_eq!(c.port, 1162);
        assert_eq!(c.version, "3");
        assert_eq!(c.login.as_deref(), Some("monitor"));
        assert_eq!(c.security_level.as_deref(), Some("noAuthNoPriv"));
        std::fs::remove_file(&path).unwrap();
    }
}
