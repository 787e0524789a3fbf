//! The resolution engine: one configured agent, one property list, repeated
//! query cycles.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;

use crate::assemble::{Assembler, CycleReport, ResultMapping};
use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::properties::{OidPropertyEntry, parse_property_spec};
use crate::query;
use crate::session::{SessionPhase, Timing, V2cSession, V3Session};
use crate::transport::{Connector, UdpConnector};
use crate::version::Version;

enum Backend<C: Connector> {
    V2c {
        connector: C,
        community: Bytes,
        closed: AtomicBool,
    },
    V3(V3Session<C>),
}

/// Resolves a fixed list of OIDs on one agent into a property mapping.
///
/// Construction validates everything that can be checked without the
/// network: the protocol version, the v3 security profile and the property
/// list. Each [`resolve`](Self::resolve) call is one cycle. For SNMPv3 the
/// discovered engine is kept between cycles until [`close`](Self::close).
///
/// ```rust,no_run
/// # use snmp_resolver::{Resolver, ResolverConfig};
/// # async fn example() -> snmp_resolver::Result<()> {
/// let config = ResolverConfig::new("192.0.2.1")
///     .version("3")
///     .security_level("AUTH_PRIV")
///     .login("monitor")
///     .auth_password("authpass123")
///     .private_password("privpass123")
///     .snmp_properties(".1.3.6.1.2.1.1.5.0:DeviceName|.1.3.6.1.2.1.1.1.0:Description");
///
/// let resolver = Resolver::new(config)?;
/// for (name, value) in resolver.resolve().await? {
///     println!("{}: {}", name, value);
/// }
/// resolver.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Resolver<C: Connector = UdpConnector> {
    host: String,
    port: u16,
    version: Version,
    timing: Timing,
    entries: Vec<OidPropertyEntry>,
    malformed: usize,
    assembler: Assembler,
    backend: Backend<C>,
}

impl Resolver {
    /// Resolver speaking UDP.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        Self::with_connector(config, UdpConnector)
    }
}

impl<C: Connector> Resolver<C> {
    /// Resolver using a custom transport connector.
    pub fn with_connector(config: ResolverConfig, connector: C) -> Result<Self> {
        let version = config.snmp_version()?;
        let timing = config.timing();
        let backend = match version {
            Version::V2c => Backend::V2c {
                connector,
                community: Bytes::from(config.community_string.clone().into_bytes()),
                closed: AtomicBool::new(false),
            },
            Version::V3 => Backend::V3(V3Session::new(connector, config.security_profile()?, timing)),
        };

        let parsed = parse_property_spec(&config.snmp_properties);
        let assembler = match &config.report_placeholder {
            Some(placeholder) => Assembler::with_report_placeholder(placeholder.clone()),
            None => Assembler::new(),
        };

        Ok(Self {
            host: config.host,
            port: config.port,
            version,
            timing,
            entries: parsed.entries,
            malformed: parsed.malformed,
            assembler,
            backend,
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Entries that will be queried each cycle, in order.
    pub fn entries(&self) -> &[OidPropertyEntry] {
        &self.entries
    }

    /// Property list segments dropped as malformed.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Session phase. A v2c resolver is `Ready` until closed.
    pub async fn phase(&self) -> SessionPhase {
        match &self.backend {
            Backend::V2c { closed, .. } if closed.load(Ordering::Acquire) => SessionPhase::Closed,
            Backend::V2c { .. } => SessionPhase::Ready,
            Backend::V3(session) => session.phase().await,
        }
    }

    /// Run one cycle and return the property mapping.
    pub async fn resolve(&self) -> Result<ResultMapping> {
        self.resolve_with_stats().await.map(|report| report.mapping)
    }

    /// Run one cycle and return the mapping with its counters.
    ///
    /// Per-OID problems are absorbed into the counters. The cycle fails as a
    /// whole only when the target does not resolve, v3 discovery fails, or
    /// the resolver has been closed.
    #[tracing::instrument(
        level = "debug",
        skip(self),
        fields(snmp.host = %self.host, snmp.port = self.port, snmp.version = %self.version)
    )]
    pub async fn resolve_with_stats(&self) -> Result<CycleReport> {
        let results = match &self.backend {
            Backend::V2c {
                connector,
                community,
                closed,
            } => {
                if closed.load(Ordering::Acquire) {
                    return Err(Error::SessionClosed);
                }
                let target = self.lookup_target().await?;
                let mut session = V2cSession::new(connector, target, community.clone(), self.timing);
                query::execute(&mut session, &self.entries).await
            }
            Backend::V3(session) => {
                let target = self.lookup_target().await?;
                let mut ready = session.ready(target).await?;
                query::execute(&mut *ready, &self.entries).await
            }
        };

        let report = self.assembler.assemble(results, self.malformed);
        let stats = &report.stats;
        tracing::debug!(
            snmp.requested = stats.requested,
            snmp.values = stats.values,
            snmp.timeouts = stats.timeouts,
            snmp.reports = stats.security_reports,
            snmp.mismatches = stats.mismatches,
            "query cycle complete"
        );
        Ok(report)
    }

    /// Release the session. Idempotent; later cycles fail with
    /// [`Error::SessionClosed`].
    pub async fn close(&self) -> Result<()> {
        match &self.backend {
            Backend::V2c { closed, .. } => {
                closed.store(true, Ordering::Release);
                Ok(())
            }
            Backend::V3(session) => session.close().await,
        }
    }

    async fn lookup_target(&self) -> Result<SocketAddr> {
        let host = self.host.trim();
        let invalid = || Error::InvalidTarget {
            target: format!("{}:{}", host, self.port).into(),
        };
        if host.is_empty() {
            return Err(invalid());
        }
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        let mut addrs = tokio::net::lookup_host((host, self.port)).await.map_err(|e| {
            tracing::debug!(snmp.host = host, error = %e, "target lookup failed");
            invalid()
        })?;
        addrs.next().ok_or_else(invalid)
    }
}
