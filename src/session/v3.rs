//! SNMPv3 session: engine discovery, USM processing and teardown.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tokio::time::Instant;

use super::{GetReply, RequestIds, Session, SessionPhase, Timing, await_reply, timed_out};
use crate::ber::Decoder;
use crate::error::{AuthErrorKind, CryptoErrorKind, Error, Result};
use crate::message::{MsgFlags, MsgGlobalData, ScopedPdu, ScopedPduData, V3Message};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::security::SecurityProfile;
use crate::transport::{Connector, Transport};
use crate::util::hex;
use crate::v3::usm::locate_auth_params;
use crate::v3::{
    EngineState, LocalizedKey, PrivKey, SaltCounter, SecurityLevel, UsmReport, UsmSecurityParams,
};

enum V3State<T> {
    Uninitialized,
    Discovering,
    Ready(Box<ReadySession<T>>),
    Closed,
}

impl<T> V3State<T> {
    fn phase(&self) -> SessionPhase {
        match self {
            Self::Uninitialized => SessionPhase::Uninitialized,
            Self::Discovering => SessionPhase::Discovering,
            Self::Ready(_) => SessionPhase::Ready,
            Self::Closed => SessionPhase::Closed,
        }
    }
}

/// Long-lived SNMPv3 session for one configured user.
///
/// All lifecycle transitions happen under one async mutex, so a cycle and a
/// concurrent [`close`](Self::close) never interleave.
pub struct V3Session<C: Connector> {
    connector: C,
    profile: SecurityProfile,
    timing: Timing,
    state: Mutex<V3State<C::Transport>>,
}

impl<C: Connector> V3Session<C> {
    pub fn new(connector: C, profile: SecurityProfile, timing: Timing) -> Self {
        Self {
            connector,
            profile,
            timing,
            state: Mutex::new(V3State::Uninitialized),
        }
    }

    pub fn profile(&self) -> &SecurityProfile {
        &self.profile
    }

    /// Current phase. Waits for an in-flight cycle to finish.
    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase()
    }

    /// Lock the session for one cycle, discovering the engine first unless a
    /// usable [`ReadySession`] for `target` already exists.
    pub async fn ready(
        &self,
        target: SocketAddr,
    ) -> Result<MappedMutexGuard<'_, ReadySession<C::Transport>>> {
        let mut state = self.state.lock().await;

        let reusable = match &*state {
            V3State::Closed => return Err(Error::SessionClosed),
            V3State::Ready(ready) => ready.target() == target && !ready.needs_rediscovery,
            V3State::Uninitialized | V3State::Discovering => false,
        };

        if !reusable {
            if let V3State::Ready(stale) = std::mem::replace(&mut *state, V3State::Discovering) {
                tracing::debug!(
                    snmp.target = %stale.target(),
                    "dropping stale v3 session before rediscovery"
                );
                if let Err(e) = stale.transport.close().await {
                    tracing::warn!(error = %e, "failed to close stale v3 transport");
                }
            }
            *state = V3State::Discovering;

            match ReadySession::discover(&self.connector, target, &self.profile, self.timing).await {
                Ok(ready) => *state = V3State::Ready(Box::new(ready)),
                Err(e) => {
                    *state = V3State::Uninitialized;
                    return Err(e);
                }
            }
        }

        MutexGuard::try_map(state, |state| match state {
            V3State::Ready(ready) => Some(ready.as_mut()),
            _ => None,
        })
        .map_err(|_| Error::SessionClosed)
    }

    /// Release the transport and keys. Idempotent; later cycles fail with
    /// [`Error::SessionClosed`].
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let ready = match std::mem::replace(&mut *state, V3State::Closed) {
            V3State::Ready(ready) => ready,
            V3State::Closed => return Ok(()),
            V3State::Uninitialized | V3State::Discovering => {
                tracing::debug!("v3 session closed before discovery");
                return Ok(());
            }
        };

        let target = ready.target();
        let result = ready.transport.close().await;
        // keys are zeroized here, after the transport is gone
        drop(ready);
        tracing::debug!(snmp.target = %target, "v3 session closed");

        result.map_err(|e| {
            tracing::warn!(snmp.target = %target, error = %e, "v3 transport close failed");
            Error::TeardownFailed {
                target: Some(target),
                source: Box::new(e),
            }
        })
    }
}

/// Security state the agent's engine has been bound to.
struct Usm {
    engine: EngineState,
    level: SecurityLevel,
    username: Bytes,
    auth_key: Option<LocalizedKey>,
    priv_key: Option<PrivKey>,
    salt: SaltCounter,
}

/// A v3 session with a discovered engine and localized keys.
///
/// Only [`V3Session::ready`] hands these out.
pub struct ReadySession<T> {
    transport: T,
    usm: Usm,
    timing: Timing,
    ids: RequestIds,
    needs_rediscovery: bool,
}

impl<T: Transport> ReadySession<T> {
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(snmp.target = %target, snmp.user = %profile.login)
    )]
    async fn discover<C>(
        connector: &C,
        target: SocketAddr,
        profile: &SecurityProfile,
        timing: Timing,
    ) -> Result<Self>
    where
        C: Connector<Transport = T>,
    {
        let failed = |source: Error| Error::EngineDiscoveryFailed {
            target: Some(target),
            source: Box::new(source),
        };

        let transport = connector.connect(target).await.map_err(failed)?;
        let ids = RequestIds::new();

        let usm = match request_engine_id(&transport, &ids, timing).await {
            Ok(engine) => {
                tracing::debug!(
                    snmp.engine_id = %hex(&engine.engine_id),
                    snmp.engine_boots = engine.engine_boots,
                    snmp.engine_time = engine.engine_time,
                    "discovered engine"
                );
                Usm::new(engine, profile)
            }
            Err(e) => Err(e),
        };

        match usm {
            Ok(usm) => Ok(Self {
                transport,
                usm,
                timing,
                ids,
                needs_rediscovery: false,
            }),
            Err(e) => {
                if let Err(close_err) = transport.close().await {
                    tracing::warn!(error = %close_err, "failed to close transport after discovery");
                }
                Err(failed(e))
            }
        }
    }

    /// The engine this session is bound to.
    pub fn engine(&self) -> &EngineState {
        &self.usm.engine
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.usm.level
    }

    /// Whether the agent reported our engine ID as unknown; the next cycle
    /// rediscovers.
    pub fn needs_rediscovery(&self) -> bool {
        self.needs_rediscovery
    }

    async fn request(&mut self, oid: &Oid) -> Result<GetReply> {
        let id = self.ids.next();
        let target = self.transport.peer_addr();
        let started = Instant::now();

        for attempt in 0..=self.timing.retries {
            if attempt > 0 {
                tracing::debug!(
                    snmp.target = %target,
                    snmp.msg_id = id,
                    snmp.attempt = attempt,
                    "retrying v3 GET"
                );
            }
            // rebuilt per attempt so the time field stays current
            let request = self.usm.encode_get(id, oid)?;
            self.transport.send(&request).await?;

            let usm = &mut self.usm;
            let reply = await_reply(&self.transport, id, self.timing.request_timeout, |data| {
                usm.accept(data, id)
            })
            .await?;
            if let Some(reply) = reply {
                return Ok(reply);
            }
        }
        Err(timed_out(target, id, &self.timing, started))
    }
}

impl<T: Transport> Session for ReadySession<T> {
    async fn get(&mut self, oid: &Oid) -> Result<GetReply> {
        let mut reply = self.request(oid).await?;
        if reply == GetReply::Report(UsmReport::NotInTimeWindow) {
            tracing::debug!(snmp.target = %self.target(), "resynchronised engine time, resending");
            reply = self.request(oid).await?;
        }
        if reply == GetReply::Report(UsmReport::UnknownEngineId) {
            self.needs_rediscovery = true;
        }
        if let GetReply::Report(report) = &reply {
            tracing::warn!(snmp.target = %self.target(), snmp.oid = %oid, report = %report, "security REPORT");
        }
        Ok(reply)
    }

    fn target(&self) -> SocketAddr {
        self.transport.peer_addr()
    }
}

/// Send the empty discovery GET once and wait for the agent's engine ID.
async fn request_engine_id<T: Transport>(transport: &T, ids: &RequestIds, timing: Timing) -> Result<EngineState> {
    let msg_id = ids.next();
    let started = Instant::now();
    transport.send(&V3Message::discovery_request(msg_id).encode()).await?;

    let engine = await_reply(transport, msg_id, timing.discovery_timeout, |data| {
        let msg = V3Message::decode(data).ok()?;
        if msg.msg_id() != msg_id {
            return None;
        }
        let usm = UsmSecurityParams::decode(msg.security_params).ok()?;
        // agents that answer without an engine ID did not complete discovery
        (!usm.engine_id.is_empty())
            .then(|| Ok(EngineState::new(usm.engine_id, usm.engine_boots, usm.engine_time)))
    })
    .await?;

    engine.ok_or_else(|| Error::Timeout {
        target: Some(transport.peer_addr()),
        elapsed: started.elapsed(),
        request_id: msg_id,
        retries: 0,
    })
}

impl Usm {
    fn new(engine: EngineState, profile: &SecurityProfile) -> Result<Self> {
        let level = profile.security_level;
        let auth_key = level.requires_auth().then(|| {
            LocalizedKey::from_password(
                profile.auth_protocol,
                profile.auth_password.as_bytes(),
                &engine.engine_id,
            )
        });
        let priv_key = level.requires_priv().then(|| {
            PrivKey::from_password(
                profile.auth_protocol,
                profile.priv_protocol,
                profile.priv_password.as_bytes(),
                &engine.engine_id,
            )
        });
        Ok(Self {
            level,
            username: Bytes::copy_from_slice(profile.login.as_bytes()),
            auth_key,
            priv_key,
            salt: SaltCounter::new()?,
            engine,
        })
    }

    fn encode_get(&self, msg_id: i32, oid: &Oid) -> Result<Bytes> {
        let boots = self.engine.engine_boots;
        let time = self.engine.estimated_time();
        let scoped = ScopedPdu::new(self.engine.engine_id.clone(), Pdu::get(msg_id, oid));

        let (data, priv_params) = match &self.priv_key {
            Some(key) => {
                let (ciphertext, params) = key.encrypt(&scoped.to_bytes(), boots, time, &self.salt)?;
                (
                    ScopedPduData::Encrypted(Bytes::from(ciphertext)),
                    Bytes::copy_from_slice(&params),
                )
            }
            None => (ScopedPduData::Plaintext(scoped), Bytes::new()),
        };

        let usm = UsmSecurityParams {
            engine_id: self.engine.engine_id.clone(),
            engine_boots: boots,
            engine_time: time,
            username: self.username.clone(),
            auth_params: match &self.auth_key {
                Some(key) => Bytes::from(vec![0u8; key.mac_len()]),
                None => Bytes::new(),
            },
            priv_params,
        };

        let global = MsgGlobalData::new(msg_id, MsgFlags::new(self.level, true));
        let encoded = V3Message::new(global, usm.encode(), data).encode();

        let Some(key) = &self.auth_key else {
            return Ok(encoded);
        };
        let mut message = encoded.to_vec();
        let range = locate_auth_params(&message)
            .ok_or_else(|| Error::auth(None, AuthErrorKind::AuthParamsNotFound))?;
        key.sign(&mut message, range)?;
        Ok(Bytes::from(message))
    }

    /// Process an incoming datagram. `None` means it is not the answer to
    /// `msg_id` and should be ignored.
    ///
    /// Datagrams that fail authentication, decryption or the time window
    /// check are dropped as well (RFC 3414 Section 3.2), so a forged or
    /// replayed packet cannot end the wait for the genuine reply.
    fn accept(&mut self, data: Bytes, msg_id: i32) -> Option<Result<GetReply>> {
        let msg = V3Message::decode(data.clone()).ok()?;
        if msg.msg_id() != msg_id {
            return None;
        }
        match self.process(&data, msg) {
            Err(e @ (Error::AuthenticationFailed { .. } | Error::DecryptionFailed { .. })) => {
                tracing::warn!(
                    snmp.msg_id = msg_id,
                    snmp.engine_id = %hex(&self.engine.engine_id),
                    error = %e,
                    "dropping v3 message that failed USM checks"
                );
                None
            }
            result => Some(result),
        }
    }

    fn process(&mut self, raw: &[u8], msg: V3Message) -> Result<GetReply> {
        let params = UsmSecurityParams::decode(msg.security_params.clone())?;
        let authenticated = msg.security_level().requires_auth();

        if authenticated {
            let key = self
                .auth_key
                .as_ref()
                .ok_or_else(|| Error::auth(None, AuthErrorKind::NoAuthKey))?;
            let range = locate_auth_params(raw)
                .ok_or_else(|| Error::auth(None, AuthErrorKind::AuthParamsNotFound))?;
            key.verify(raw, range)?;
        }
        // only authenticated clocks count; REPORTs below carry their own resync
        let timely = !authenticated
            || self
                .engine
                .in_time_window(params.engine_boots, params.engine_time);
        if authenticated && timely {
            self.engine.update(params.engine_boots, params.engine_time);
        }

        let scoped = match msg.data {
            ScopedPduData::Plaintext(scoped) => scoped,
            ScopedPduData::Encrypted(ciphertext) => {
                let key = self
                    .priv_key
                    .as_ref()
                    .ok_or_else(|| Error::decrypt(None, CryptoErrorKind::NoPrivKey))?;
                let plaintext = key.decrypt(
                    &ciphertext,
                    params.engine_boots,
                    params.engine_time,
                    &params.priv_params,
                )?;
                // garbage plaintext means the wrong key or a corrupted packet
                ScopedPdu::decode(&mut Decoder::new(Bytes::from(plaintext)))
                    .map_err(|_| Error::decrypt(None, CryptoErrorKind::CipherError))?
            }
        };

        match scoped.pdu.pdu_type {
            PduType::Report => {
                let report = UsmReport::from_pdu(&scoped.pdu);
                if report == UsmReport::NotInTimeWindow {
                    self.engine.resync(params.engine_boots, params.engine_time);
                }
                Ok(GetReply::Report(report))
            }
            _ if self.level.requires_auth() && !authenticated => {
                Err(Error::auth(None, AuthErrorKind::UnauthenticatedResponse))
            }
            _ if !timely => Err(Error::auth(None, AuthErrorKind::NotInTimeWindow)),
            _ => Ok(GetReply::Response(scoped.pdu)),
        }
    }
}
