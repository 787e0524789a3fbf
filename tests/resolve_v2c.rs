//! End-to-end SNMPv2c cycles against the in-process agent.

mod common;

use common::*;
use snmp_resolver::oid::Oid;
use snmp_resolver::value::Value;
use snmp_resolver::{Error, Resolver, SessionPhase};

#[tokio::test]
async fn test_trimmed_device_name() {
    let agent = AgentBuilder::v2c().text(SYS_NAME, " DESKTOP-32LE6G6 ").spawn().await;
    let resolver = Resolver::new(v2c_config(agent.addr, ".1.3.6.1.2.1.1.5.0:DeviceName")).unwrap();

    let mapping = resolver.resolve().await.unwrap();
    assert_eq!(mapping.len(), 1);
    assert_eq!(mapping["DeviceName"], "DESKTOP-32LE6G6");
}

#[tokio::test]
async fn test_one_of_five_times_out() {
    let agent = AgentBuilder::v2c()
        .text(SYS_DESCR, "Linux router 6.1")
        .answer(SYS_UPTIME, Answer::Silent)
        .text(SYS_CONTACT, "ops@example.com")
        .text(SYS_NAME, "router")
        .text(SYS_LOCATION, "rack 4")
        .spawn()
        .await;
    let properties = format!(
        "{}:Description|{}:Uptime|{}:Contact|{}:DeviceName|{}:Location",
        SYS_DESCR, SYS_UPTIME, SYS_CONTACT, SYS_NAME, SYS_LOCATION
    );
    let resolver = Resolver::new(v2c_config(agent.addr, &properties)).unwrap();

    let report = resolver.resolve_with_stats().await.unwrap();
    let keys: Vec<_> = report.mapping.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Contact", "Description", "DeviceName", "Location"]);
    assert_eq!(report.stats.timeouts, 1);
    assert_eq!(report.stats.values, 4);
}

#[tokio::test]
async fn test_unusable_answers_are_omitted() {
    let agent = AgentBuilder::v2c()
        .text(SYS_NAME, "router")
        .answer(
            SYS_DESCR,
            Answer::WrongOid(Oid::parse("9.9.9").unwrap(), Value::from("x")),
        )
        .answer(SYS_CONTACT, Answer::NoBinding)
        .answer(SYS_LOCATION, Answer::ErrorStatus(5))
        .text(SYS_UPTIME, "   ")
        .spawn()
        .await;
    let properties = format!(
        "{}:DeviceName|{}:Description|{}:Contact|{}:Location|{}:Uptime|{}:Missing|garbage",
        SYS_NAME, SYS_DESCR, SYS_CONTACT, SYS_LOCATION, SYS_UPTIME, NONEXISTENT
    );
    let resolver = Resolver::new(v2c_config(agent.addr, &properties)).unwrap();

    let report = resolver.resolve_with_stats().await.unwrap();
    assert_eq!(report.mapping.len(), 1);
    assert_eq!(report.mapping["DeviceName"], "router");

    let stats = report.stats;
    assert_eq!(stats.requested, 6);
    assert_eq!(stats.mismatches, 1);
    assert_eq!(stats.empty_bindings, 1);
    assert_eq!(stats.agent_errors, 1);
    assert_eq!(stats.empty_values, 1);
    assert_eq!(stats.exceptions, 1);
    assert_eq!(stats.malformed, 1);
    assert_eq!(agent.gets(), 6);
}

#[tokio::test]
async fn test_index_qualified_answer_accepted() {
    let agent = AgentBuilder::v2c()
        .answer(
            SYS_DESCR,
            Answer::WrongOid(
                Oid::parse("1.3.6.1.2.1.1.1.0.0").unwrap(),
                Value::from("Linux"),
            ),
        )
        .spawn()
        .await;
    let resolver = Resolver::new(v2c_config(agent.addr, "1.3.6.1.2.1.1.1.0:Description")).unwrap();

    let mapping = resolver.resolve().await.unwrap();
    assert_eq!(mapping["Description"], "Linux");
}

#[tokio::test]
async fn test_wrong_community_yields_empty_mapping() {
    let agent = AgentBuilder::v2c().text(SYS_NAME, "router").spawn().await;
    let config = v2c_config(agent.addr, ".1.3.6.1.2.1.1.5.0:DeviceName").community("wrong");
    let resolver = Resolver::new(config).unwrap();

    let report = resolver.resolve_with_stats().await.unwrap();
    assert!(report.mapping.is_empty());
    assert_eq!(report.stats.timeouts, 1);
}

#[tokio::test]
async fn test_repeated_cycles_and_close() {
    let agent = AgentBuilder::v2c().text(SYS_NAME, "router").spawn().await;
    let resolver = Resolver::new(v2c_config(agent.addr, ".1.3.6.1.2.1.1.5.0:DeviceName")).unwrap();

    for _ in 0..3 {
        assert_eq!(resolver.resolve().await.unwrap()["DeviceName"], "router");
    }
    assert_eq!(agent.gets(), 3);

    resolver.close().await.unwrap();
    resolver.close().await.unwrap();
    assert_eq!(resolver.phase().await, SessionPhase::Closed);
    assert!(matches!(resolver.resolve().await, Err(Error::SessionClosed)));
}
