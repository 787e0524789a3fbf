//! SNMPv2c: community-authenticated, no session state.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::time::Instant;

use super::{GetReply, RequestIds, Session, Timing, await_reply, timed_out};
use crate::error::Result;
use crate::message::CommunityMessage;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::transport::{Connector, Transport};
use crate::v3::UsmReport;

/// Address and community for one agent. Each [`get`](Session::get) opens a
/// transport, performs the request and closes the transport again.
pub struct V2cSession<'a, C> {
    connector: &'a C,
    target: SocketAddr,
    community: Bytes,
    timing: Timing,
    ids: RequestIds,
}

impl<'a, C: Connector> V2cSession<'a, C> {
    pub fn new(connector: &'a C, target: SocketAddr, community: impl Into<Bytes>, timing: Timing) -> Self {
        Self {
            connector,
            target,
            community: community.into(),
            timing,
            ids: RequestIds::new(),
        }
    }

    async fn exchange(&self, transport: &C::Transport, oid: &Oid) -> Result<GetReply> {
        let request_id = self.ids.next();
        let request = CommunityMessage::new(self.community.clone(), Pdu::get(request_id, oid)).encode();
        let started = Instant::now();

        for attempt in 0..=self.timing.retries {
            if attempt > 0 {
                tracing::debug!(
                    snmp.target = %self.target,
                    snmp.request_id = request_id,
                    snmp.attempt = attempt,
                    "retrying v2c GET"
                );
            }
            transport.send(&request).await?;
            let reply = await_reply(transport, request_id, self.timing.request_timeout, |data| {
                let msg = CommunityMessage::decode(data).ok()?;
                (msg.pdu.request_id == request_id).then(|| Ok(classify(msg.pdu)))
            })
            .await?;
            if let Some(reply) = reply {
                return Ok(reply);
            }
        }
        Err(timed_out(self.target, request_id, &self.timing, started))
    }
}

fn classify(pdu: Pdu) -> GetReply {
    match pdu.pdu_type {
        PduType::Report => GetReply::Report(UsmReport::from_pdu(&pdu)),
        _ => GetReply::Response(pdu),
    }
}

impl<C: Connector> Session for V2cSession<'_, C> {
    async fn get(&mut self, oid: &Oid) -> Result<GetReply> {
        let transport = self.connector.connect(self.target).await?;
        let result = self.exchange(&transport, oid).await;
        if let Err(e) = transport.close().await {
            tracing::warn!(snmp.target = %self.target, error = %e, "failed to close v2c transport");
        }
        result
    }

    fn target(&self) -> SocketAddr {
        self.target
    }
}
