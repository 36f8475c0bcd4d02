//! Request coordination for network-backed operations.
//!
//! Every kind of request (weather, climate, search, ...) owns exactly one
//! slot. Starting a request bumps the slot's sequence number; only the
//! holder of the live sequence number may finish the slot or apply its
//! result. Responses that arrive for an older sequence are inert, so the
//! ordering guarantee is last-issued-wins, not last-resolved-wins.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Identifies a request slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Weather,
    AirQuality,
    Climate,
    LocationSearch,
    ReverseGeocode,
    IpLocation,
}

impl RequestKind {
    pub const ALL: [RequestKind; 6] = [
        Self::Weather,
        Self::AirQuality,
        Self::Climate,
        Self::LocationSearch,
        Self::ReverseGeocode,
        Self::IpLocation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::AirQuality => "air_quality",
            Self::Climate => "climate",
            Self::LocationSearch => "location_search",
            Self::ReverseGeocode => "reverse_geocode",
            Self::IpLocation => "ip_location",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
    Aborted,
}

/// State of one request kind. Created lazily, overwritten, never removed.
#[derive(Debug, Clone, Default)]
pub struct RequestSlot {
    pub seq: u64,
    pub in_flight: bool,
    pub status: RequestStatus,
    pub cancel_token: Option<CancellationToken>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub meta: Option<serde_json::Value>,
}

/// Options for [`RequestCoordinator::begin_request`].
#[derive(Debug, Clone)]
pub struct BeginOptions {
    /// Cancel the token of the request this one supersedes.
    pub abort_previous: bool,
    pub meta: Option<serde_json::Value>,
}

impl Default for BeginOptions {
    fn default() -> Self {
        Self {
            abort_previous: true,
            meta: None,
        }
    }
}

impl BeginOptions {
    pub fn with_meta(meta: serde_json::Value) -> Self {
        Self {
            meta: Some(meta),
            ..Self::default()
        }
    }
}

/// Handed to the caller of `begin_request`. The token must be threaded into
/// the network call; the sequence number gates every state mutation.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    pub kind: RequestKind,
    pub seq: u64,
    pub token: CancellationToken,
}

/// Sequence-numbered, cancellable request-slot table.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
#[derive(Debug, Default)]
pub struct RequestCoordinator {
    slots: Mutex<HashMap<RequestKind, RequestSlot>>,
}

impl RequestCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new generation for `kind`.
    pub fn begin_request(&self, kind: RequestKind, opts: BeginOptions) -> RequestTicket {
        let mut slots = self.slots.lock();
        let slot = slots.entry(kind).or_default();

        if opts.abort_previous {
            if let Some(previous) = slot.cancel_token.take() {
                if !previous.is_cancelled() {
                    tracing::debug!("Superseding {} request #{}", kind, slot.seq);
                }
                previous.cancel();
            }
        }

        let token = CancellationToken::new();
        slot.seq += 1;
        slot.cancel_token = Some(token.clone());
        slot.in_flight = true;
        slot.status = RequestStatus::Running;
        slot.error = None;
        slot.started_at = Some(Utc::now());
        slot.ended_at = None;
        slot.meta = opts.meta;

        RequestTicket {
            kind,
            seq: slot.seq,
            token,
        }
    }

    /// Finish the slot if `seq` is still the live generation.
    ///
    /// Returns `false` (and changes nothing) when a newer request has
    /// already superseded `seq`.
    pub fn end_request(
        &self,
        kind: RequestKind,
        seq: u64,
        status: RequestStatus,
        error: Option<String>,
    ) -> bool {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(&kind) else {
            return false;
        };
        if slot.seq != seq {
            tracing::debug!(
                "Ignoring end of stale {} request #{} (live #{})",
                kind,
                seq,
                slot.seq
            );
            return false;
        }

        slot.in_flight = false;
        slot.status = status;
        slot.error = error;
        slot.ended_at = Some(Utc::now());
        true
    }

    /// Cancel whatever is running for `kind`. Manual cancellation always
    /// wins, whatever generation is live.
    pub fn cancel_request(&self, kind: RequestKind, reason: impl Into<String>) {
        let reason = reason.into();
        let mut slots = self.slots.lock();
        let slot = slots.entry(kind).or_default();

        if let Some(token) = &slot.cancel_token {
            token.cancel();
        }
        tracing::info!("Cancelled {} request #{}: {}", kind, slot.seq, reason);

        slot.in_flight = false;
        slot.status = RequestStatus::Aborted;
        slot.error = Some(reason);
        slot.ended_at = Some(Utc::now());
    }

    /// True iff `seq` is the live generation for `kind`.
    pub fn is_request_current(&self, kind: RequestKind, seq: u64) -> bool {
        self.slots
            .lock()
            .get(&kind)
            .is_some_and(|slot| slot.seq == seq)
    }

    /// Snapshot of the slot, if `kind` was ever used.
    pub fn slot(&self, kind: RequestKind) -> Option<RequestSlot> {
        self.slots.lock().get(&kind).cloned()
    }
}
