//! In-process UDP agent speaking v2c and v3 USM, built on the crate's own
//! codec.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use bytes::Bytes;
use snmp_resolver::ber::Decoder;
use snmp_resolver::message::{
    CommunityMessage, MsgFlags, MsgGlobalData, ScopedPdu, ScopedPduData, V3Message,
};
use snmp_resolver::oid::Oid;
use snmp_resolver::pdu::{Pdu, PduType, VarBind};
use snmp_resolver::v3::usm::locate_auth_params;
use snmp_resolver::v3::{
    AuthProtocol, LocalizedKey, PrivKey, PrivProtocol, SaltCounter, SecurityLevel, UsmReport,
    UsmSecurityParams,
};
use snmp_resolver::value::Value;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use super::fixtures::{AUTH_PASSWORD, COMMUNITY, ENGINE_ID, LOGIN, PRIV_PASSWORD};

const ENGINE_BOOTS: u32 = 3;

/// How the agent answers a GET for one OID.
#[derive(Debug, Clone)]
pub enum Answer {
    Value(Value),
    /// Binding for a different OID than the one requested.
    WrongOid(Oid, Value),
    NoBinding,
    /// Never answer.
    Silent,
    ErrorStatus(i32),
    /// A security REPORT instead of a response (v3 only).
    Report(UsmReport),
}

enum Security {
    Community(Bytes),
    Usm {
        level: SecurityLevel,
        auth_key: Option<LocalizedKey>,
        priv_key: Option<PrivKey>,
        salt: SaltCounter,
    },
}

/// Request counters, shared with the running agent.
#[derive(Debug, Default)]
pub struct AgentCounters {
    pub discoveries: AtomicUsize,
    pub gets: AtomicUsize,
    pub auth_failures: AtomicUsize,
}

pub struct AgentBuilder {
    security: Security,
    answers: HashMap<String, Answer>,
}

impl AgentBuilder {
    pub fn v2c() -> Self {
        Self {
            security: Security::Community(Bytes::from_static(COMMUNITY.as_bytes())),
            answers: HashMap::new(),
        }
    }

    /// v3 agent with one user ([`LOGIN`]) at `level`.
    pub fn v3(level: SecurityLevel, auth: AuthProtocol, privacy: PrivProtocol) -> Self {
        let auth_key = level
            .requires_auth()
            .then(|| LocalizedKey::from_password(auth, AUTH_PASSWORD.as_bytes(), ENGINE_ID));
        let priv_key = level
            .requires_priv()
            .then(|| PrivKey::from_password(auth, privacy, PRIV_PASSWORD.as_bytes(), ENGINE_ID));
        Self {
            security: Security::Usm {
                level,
                auth_key,
                priv_key,
                salt: SaltCounter::from_value(0x0102_0304_0506_0708),
            },
            answers: HashMap::new(),
        }
    }

    pub fn text(self, oid: &str, value: &str) -> Self {
        self.answer(oid, Answer::Value(Value::from(value)))
    }

    pub fn answer(mut self, oid: &str, answer: Answer) -> Self {
        self.answers.insert(key(oid), answer);
        self
    }

    pub async fn spawn(self) -> TestAgent {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let counters = Arc::new(AgentCounters::default());
        let state = AgentState {
            security: self.security,
            answers: self.answers,
            counters: counters.clone(),
            started: Instant::now(),
        };

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; 65535];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    continue;
                };
                if let Some(reply) = state.handle(Bytes::copy_from_slice(&buf[..len])) {
                    let _ = socket.send_to(&reply, peer).await;
                }
            }
        });

        TestAgent {
            addr,
            counters,
            task,
        }
    }
}

/// A running agent; stops when dropped.
pub struct TestAgent {
    pub addr: SocketAddr,
    pub counters: Arc<AgentCounters>,
    task: JoinHandle<()>,
}

impl TestAgent {
    /// An agent that reads requests and never answers.
    pub async fn silent() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let counters = Arc::new(AgentCounters::default());
        let seen = counters.clone();
        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; 65535];
            while socket.recv_from(&mut buf).await.is_ok() {
                seen.gets.fetch_add(1, Ordering::SeqCst);
            }
        });
        Self {
            addr,
            counters,
            task,
        }
    }

    pub fn discoveries(&self) -> usize {
        self.counters.discoveries.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.counters.gets.load(Ordering::SeqCst)
    }

    pub fn auth_failures(&self) -> usize {
        self.counters.auth_failures.load(Ordering::SeqCst)
    }
}

impl Drop for TestAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn key(oid: &str) -> String {
    Oid::parse(oid).unwrap().to_string()
}

struct AgentState {
    security: Security,
    answers: HashMap<String, Answer>,
    counters: Arc<AgentCounters>,
    started: Instant,
}

/// What to send back for one request PDU.
enum Outcome {
    Pdu(Pdu),
    Report(UsmReport),
}

impl AgentState {
    fn handle(&self, data: Bytes) -> Option<Bytes> {
        match &self.security {
            Security::Community(community) => self.handle_v2c(community, data),
            Security::Usm { .. } => self.handle_v3(data),
        }
    }

    fn engine_time(&self) -> u32 {
        1000 + self.started.elapsed().as_secs() as u32
    }

    fn answer(&self, request: &Pdu) -> Option<Outcome> {
        self.counters.gets.fetch_add(1, Ordering::SeqCst);
        let oid = request.varbinds.first()?.oid.clone();
        let answer = self
            .answers
            .get(&oid.to_string())
            .cloned()
            .unwrap_or(Answer::Value(Value::NoSuchObject));

        let id = request.request_id;
        let outcome = match answer {
            Answer::Value(value) => Outcome::Pdu(Pdu::response(id, vec![VarBind::new(oid, value)])),
            Answer::WrongOid(other, value) => {
                Outcome::Pdu(Pdu::response(id, vec![VarBind::new(other, value)]))
            }
            Answer::NoBinding => Outcome::Pdu(Pdu::response(id, Vec::new())),
            Answer::Silent => return None,
            Answer::ErrorStatus(status) => Outcome::Pdu(Pdu {
                error_status: status,
                error_index: 1,
                ..Pdu::response(id, vec![VarBind::new(oid, Value::Null)])
            }),
            Answer::Report(report) => Outcome::Report(report),
        };
        Some(outcome)
    }

    fn handle_v2c(&self, community: &Bytes, data: Bytes) -> Option<Bytes> {
        let msg = CommunityMessage::decode(data).ok()?;
        if msg.community != *community {
            return None;
        }
        match self.answer(&msg.pdu)? {
            Outcome::Pdu(pdu) => Some(CommunityMessage::new(msg.community, pdu).encode()),
            Outcome::Report(_) => None,
        }
    }

    fn handle_v3(&self, data: Bytes) -> Option<Bytes> {
        let Security::Usm {
            level,
            auth_key,
            priv_key,
            salt,
        } = &self.security
        else {
            return None;
        };

        let msg = V3Message::decode(data.clone()).ok()?;
        let msg_id = msg.msg_id();
        let params = UsmSecurityParams::decode(msg.security_params.clone()).ok()?;

        if params.engine_id.is_empty() {
            self.counters.discoveries.fetch_add(1, Ordering::SeqCst);
            return Some(self.report(msg_id, UsmReport::UnknownEngineId));
        }
        if params.username.as_ref() != LOGIN.as_bytes() {
            return Some(self.report(msg_id, UsmReport::UnknownUserName));
        }
        if msg.security_level() != *level {
            return Some(self.report(msg_id, UsmReport::UnsupportedSecLevel));
        }
        if let Some(key) = auth_key {
            let range = locate_auth_params(&data)?;
            if key.verify(&data, range).is_err() {
                self.counters.auth_failures.fetch_add(1, Ordering::SeqCst);
                return Some(self.report(msg_id, UsmReport::WrongDigest));
            }
        }

        let scoped = match msg.data {
            ScopedPduData::Plaintext(scoped) => scoped,
            ScopedPduData::Encrypted(ciphertext) => {
                let plain = priv_key.as_ref()?.decrypt(
                    &ciphertext,
                    params.engine_boots,
                    params.engine_time,
                    &params.priv_params,
                );
                let Ok(plain) = plain else {
                    return Some(self.report(msg_id, UsmReport::DecryptionError));
                };
                ScopedPdu::decode(&mut Decoder::new(Bytes::from(plain))).ok()?
            }
        };

        let pdu = match self.answer(&scoped.pdu)? {
            Outcome::Pdu(pdu) => pdu,
            Outcome::Report(report) => return Some(self.report(msg_id, report)),
        };

        let time = self.engine_time();
        let scoped = ScopedPdu::new(Bytes::from_static(ENGINE_ID), pdu);
        let (payload, priv_params) = match priv_key {
            Some(key) => {
                let (ciphertext, params) = key.encrypt(&scoped.to_bytes(), ENGINE_BOOTS, time, salt).ok()?;
                (
                    ScopedPduData::Encrypted(Bytes::from(ciphertext)),
                    Bytes::copy_from_slice(&params),
                )
            }
            None => (ScopedPduData::Plaintext(scoped), Bytes::new()),
        };
        let usm = UsmSecurityParams {
            engine_id: Bytes::from_static(ENGINE_ID),
            engine_boots: ENGINE_BOOTS,
            engine_time: time,
            username: params.username,
            auth_params: auth_key
                .as_ref()
                .map(|k| Bytes::from(vec![0u8; k.mac_len()]))
                .unwrap_or_default(),
            priv_params,
        };
        let encoded = V3Message::new(
            MsgGlobalData::new(msg_id, MsgFlags::new(*level, false)),
            usm.encode(),
            payload,
        )
        .encode();

        let Some(key) = auth_key else {
            return Some(encoded);
        };
        let mut signed = encoded.to_vec();
        let range = locate_auth_params(&signed)?;
        key.sign(&mut signed, range).ok()?;
        Some(Bytes::from(signed))
    }

    /// Unauthenticated REPORT carrying the agent's engine parameters.
    fn report(&self, msg_id: i32, report: UsmReport) -> Bytes {
        let usm = UsmSecurityParams {
            engine_id: Bytes::from_static(ENGINE_ID),
            engine_boots: ENGINE_BOOTS,
            engine_time: self.engine_time(),
            ..UsmSecurityParams::default()
        };
        let varbinds = report
            .oid()
            .map(|oid| vec![VarBind::new(oid, Value::Counter32(1))])
            .unwrap_or_default();
        let pdu = Pdu {
            pdu_type: PduType::Report,
            ..Pdu::response(msg_id, varbinds)
        };
        V3Message::new(
            MsgGlobalData::new(msg_id, MsgFlags::new(SecurityLevel::NoAuthNoPriv, false)),
            usm.encode(),
            ScopedPduData::Plaintext(ScopedPdu::new(Bytes::from_static(ENGINE_ID), pdu)),
        )
        .encode()
    }
}
