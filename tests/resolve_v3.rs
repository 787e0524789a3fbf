//! End-to-end SNMPv3 cycles against the in-process agent.

mod common;

use std::time::{Duration, Instant};

use common::*;
use snmp_resolver::v3::{AuthProtocol, PrivProtocol, SecurityLevel, UsmReport};
use snmp_resolver::{Error, Resolver, ResolverConfig, SessionPhase};

const DEVICE_NAME: &str = ".1.3.6.1.2.1.1.5.0:DeviceName";

async fn resolve_at(level: SecurityLevel, auth: AuthProtocol, privacy: PrivProtocol) {
    let agent = AgentBuilder::v3(level, auth, privacy)
        .text(SYS_NAME, " DESKTOP-32LE6G6 ")
        .spawn()
        .await;
    let config = v3_config(
        agent.addr,
        &level.to_string(),
        &auth.to_string(),
        &privacy.to_string(),
        DEVICE_NAME,
    );
    let resolver = Resolver::new(config).unwrap();

    let mapping = resolver.resolve().await.unwrap();
    assert_eq!(
        mapping.get("DeviceName").map(String::as_str),
        Some("DESKTOP-32LE6G6"),
        "{} {} {}",
        level,
        auth,
        privacy
    );
    assert_eq!(agent.auth_failures(), 0);
    resolver.close().await.unwrap();
}

#[tokio::test]
async fn test_noauth_nopriv() {
    resolve_at(SecurityLevel::NoAuthNoPriv, AuthProtocol::Sha1, PrivProtocol::Aes128).await;
}

#[tokio::test]
async fn test_auth_nopriv_every_digest() {
    for auth in [
        AuthProtocol::Md5,
        AuthProtocol::Sha1,
        AuthProtocol::Sha224,
        AuthProtocol::Sha256,
        AuthProtocol::Sha384,
        AuthProtocol::Sha512,
    ] {
        resolve_at(SecurityLevel::AuthNoPriv, auth, PrivProtocol::Aes128).await;
    }
}

#[tokio::test]
async fn test_auth_priv_every_cipher() {
    for privacy in [
        PrivProtocol::Des,
        PrivProtocol::Des3,
        PrivProtocol::Aes128,
        PrivProtocol::Aes192,
        PrivProtocol::Aes256,
    ] {
        resolve_at(SecurityLevel::AuthPriv, AuthProtocol::Sha256, privacy).await;
    }
}

#[tokio::test]
async fn test_engine_discovered_once_per_session() {
    let agent = AgentBuilder::v3(SecurityLevel::AuthPriv, AuthProtocol::Sha1, PrivProtocol::Aes128)
        .text(SYS_NAME, "core-1")
        .text(SYS_DESCR, "Linux core-1")
        .spawn()
        .await;
    let properties = format!("{}:DeviceName|{}:Description", SYS_NAME, SYS_DESCR);
    let resolver =
        Resolver::new(v3_config(agent.addr, "AUTH_PRIV", "SHA1", "AES128", &properties)).unwrap();
    assert_eq!(resolver.phase().await, SessionPhase::Uninitialized);

    for _ in 0..3 {
        let mapping = resolver.resolve().await.unwrap();
        assert_eq!(mapping.len(), 2);
    }
    assert_eq!(resolver.phase().await, SessionPhase::Ready);
    assert_eq!(agent.discoveries(), 1);
    assert_eq!(agent.gets(), 6);

    resolver.close().await.unwrap();
    resolver.close().await.unwrap();
    assert_eq!(resolver.phase().await, SessionPhase::Closed);
    assert!(matches!(resolver.resolve().await, Err(Error::SessionClosed)));
}

#[tokio::test]
async fn test_wrong_password_is_reported_not_fatal() {
    let agent = AgentBuilder::v3(SecurityLevel::AuthNoPriv, AuthProtocol::Sha1, PrivProtocol::Aes128)
        .text(SYS_NAME, "core-1")
        .spawn()
        .await;
    let config = v3_config(agent.addr, "AUTH_NOPRIV", "SHA1", "AES128", DEVICE_NAME)
        .auth_password("not-the-password");
    let resolver = Resolver::new(config).unwrap();

    let report = resolver.resolve_with_stats().await.unwrap();
    assert!(report.mapping.is_empty());
    assert_eq!(report.stats.security_reports, 1);
    assert!(agent.auth_failures() >= 1);
}

#[tokio::test]
async fn test_report_placeholder() {
    let agent = AgentBuilder::v3(SecurityLevel::AuthNoPriv, AuthProtocol::Sha1, PrivProtocol::Aes128)
        .text(SYS_NAME, "core-1")
        .answer(SYS_DESCR, Answer::Report(UsmReport::NotInTimeWindow))
        .spawn()
        .await;
    let properties = format!("{}:DeviceName|{}:Description", SYS_NAME, SYS_DESCR);
    let config = v3_config(agent.addr, "AUTH_NOPRIV", "SHA1", "AES128", &properties)
        .report_placeholder("N/A");
    let resolver = Resolver::new(config).unwrap();

    let report = resolver.resolve_with_stats().await.unwrap();
    assert_eq!(report.mapping["DeviceName"], "core-1");
    assert_eq!(report.mapping["Description"], "N/A");
    assert_eq!(report.stats.security_reports, 1);
    // one resend after resynchronising
    assert_eq!(agent.gets(), 3);
}

#[tokio::test]
async fn test_unreachable_agent_fails_discovery() {
    let agent = TestAgent::silent().await;
    let config = ResolverConfig::new(agent.addr.ip().to_string())
        .port(agent.addr.port())
        .version("3")
        .security_level("AUTH_PRIV")
        .login(LOGIN)
        .auth_password(AUTH_PASSWORD)
        .private_password(PRIV_PASSWORD)
        .snmp_properties(DEVICE_NAME);
    let resolver = Resolver::new(config).unwrap();

    let started = Instant::now();
    let err = resolver.resolve().await.unwrap_err();
    let elapsed = started.elapsed();

    match err {
        Error::EngineDiscoveryFailed { source, .. } => assert!(source.is_timeout()),
        other => panic!("unexpected error: {}", other),
    }
    assert!(elapsed >= Duration::from_millis(1400), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(4000), "{:?}", elapsed);
    assert_eq!(agent.gets(), 1);
    assert_eq!(resolver.phase().await, SessionPhase::Uninitialized);
}

#[tokio::test]
async fn test_missing_login_rejected_before_io() {
    let agent = TestAgent::silent().await;
    let err = Resolver::new(
        v3_config(agent.addr, "AUTH_PRIV", "SHA1", "AES128", DEVICE_NAME).login(""),
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::InvalidSecurityConfiguration { .. }));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(agent.gets(), 0);
}

#[tokio::test]
async fn test_combined_password_form() {
    let agent = AgentBuilder::v3(SecurityLevel::AuthPriv, AuthProtocol::Sha1, PrivProtocol::Aes128)
        .text(SYS_NAME, "core-1")
        .spawn()
        .await;
    let mut config = v3_config(agent.addr, "AUTH_PRIV", "SHA1", "AES128", DEVICE_NAME)
        .auth_password(format!("{}|{}", AUTH_PASSWORD, PRIV_PASSWORD));
    config.private_password = None;
    let resolver = Resolver::new(config).unwrap();

    assert_eq!(resolver.resolve().await.unwrap()["DeviceName"], "core-1");
}
