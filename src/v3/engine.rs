//! Authoritative engine state and REPORT classification (RFC 3414 Section 3.2).

use std::time::Instant;

use bytes::Bytes;

use crate::oid::Oid;
use crate::pdu::Pdu;

/// usmStats subtree: 1.3.6.1.6.3.15.1.1
const USM_STATS_PREFIX: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1];

/// Width of the acceptance window around the agent's clock, in seconds.
pub const TIME_WINDOW: u32 = 150;

/// What this manager knows about the agent's SNMP engine.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub engine_id: Bytes,
    pub engine_boots: u32,
    pub engine_time: u32,
    synced_at: Instant,
}

impl EngineState {
    pub fn new(engine_id: Bytes, engine_boots: u32, engine_time: u32) -> Self {
        Self {
            engine_id,
            engine_boots,
            engine_time,
            synced_at: Instant::now(),
        }
    }

    /// The agent's clock now, extrapolated from the last sync.
    pub fn estimated_time(&self) -> u32 {
        let elapsed = self.synced_at.elapsed().as_secs();
        let time = u64::from(self.engine_time).saturating_add(elapsed);
        time.min(i32::MAX as u64) as u32
    }

    /// Take boots/time from an authenticated message if they move the
    /// clock forward (RFC 3414 Section 3.2 step 7b).
    pub fn update(&mut self, engine_boots: u32, engine_time: u32) -> bool {
        let newer = engine_boots > self.engine_boots
            || (engine_boots == self.engine_boots && engine_time > self.estimated_time());
        if newer {
            self.engine_boots = engine_boots;
            self.engine_time = engine_time;
            self.synced_at = Instant::now();
        }
        newer
    }

    /// Unconditionally adopt the agent's clock, as after a notInTimeWindow
    /// REPORT.
    pub fn resync(&mut self, engine_boots: u32, engine_time: u32) {
        self.engine_boots = engine_boots;
        self.engine_time = engine_time;
        self.synced_at = Instant::now();
    }

    /// Whether an authenticated message's clock falls inside the window.
    pub fn in_time_window(&self, engine_boots: u32, engine_time: u32) -> bool {
        if engine_boots == i32::MAX as u32 || engine_boots < self.engine_boots {
            return false;
        }
        if engine_boots > self.engine_boots {
            return true;
        }
        engine_time.saturating_add(TIME_WINDOW) >= self.estimated_time()
    }
}

/// Security condition an agent reported instead of answering.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UsmReport {
    UnsupportedSecLevel,
    NotInTimeWindow,
    UnknownUserName,
    UnknownEngineId,
    WrongDigest,
    DecryptionError,
    /// A REPORT outside the usmStats subtree, carrying its first OID.
    Other(String),
}

impl UsmReport {
    /// Classify a REPORT PDU by its first binding.
    pub fn from_pdu(pdu: &Pdu) -> Self {
        match pdu.varbinds.first() {
            Some(vb) => Self::from_oid(&vb.oid),
            None => Self::Other(String::new()),
        }
    }

    pub fn from_oid(oid: &Oid) -> Self {
        let arcs = oid.arcs();
        if !arcs.starts_with(USM_STATS_PREFIX) {
            return Self::Other(oid.to_string());
        }
        match arcs.get(USM_STATS_PREFIX.len()) {
            Some(1) => Self::UnsupportedSecLevel,
            Some(2) => Self::NotInTimeWindow,
            Some(3) => Self::UnknownUserName,
            Some(4) => Self::UnknownEngineId,
            Some(5) => Self::WrongDigest,
            Some(6) => Self::DecryptionError,
            _ => Self::Other(oid.to_string()),
        }
    }

    /// The usmStats counter OID this report corresponds to.
    pub fn oid(&self) -> Option<Oid> {
        let leaf = match self {
            Self::UnsupportedSecLevel => 1,
            Self::NotInTimeWindow => 2,
            Self::UnknownUserName => 3,
            Self::UnknownEngineId => 4,
            Self::WrongDigest => 5,
            Self::DecryptionError => 6,
            Self::Other(_) => return None,
        };
        let mut arcs = USM_STATS_PREFIX.to_vec();
        arcs.extend([leaf, 0]);
        Some(Oid::from_slice(&arcs))
    }
}

impl std::fmt::Display for UsmReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedSecLevel => write!(f, "usmStatsUnsupportedSecLevels"),
            Self::NotInTimeWindow => write!(f, "usmStatsNotInTimeWindows"),
            Self::UnknownUserName => write!(f, "usmStatsUnknownUserNames"),
            Self::UnknownEngineId => write!(f, "usmStatsUnknownEngineIDs"),
            Self::WrongDigest => write!(f, "usmStatsWrongDigests"),
            Self::DecryptionError => write!(f, "usmStatsDecryptionErrors"),
            Self::Other(oid) if oid.is_empty() => write!(f, "empty report"),
            Self::Other(oid) => write!(f, "report {}", oid),
        }
    }
}
