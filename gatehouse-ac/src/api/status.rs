//! Daemon status endpoint

use crate::state::SharedState;
use axum::{extract::State, response::Json};
use gatehouse_common::ChannelKind;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// GET /status response body
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub counters: CounterSnapshot,
    pub channels: Vec<ChannelStatus>,
}

/// Point-in-time copy of the pipeline counters
#[derive(Debug, Serialize)]
pub struct CounterSnapshot {
    pub scans_decided: u64,
    pub scans_accepted: u64,
    pub scans_denied: u64,
    pub scans_errored: u64,
    pub invalid_payloads: u64,
    pub cooldown_rejects: u64,
    pub tags_enrolled: u64,
    pub heartbeats_sent: u64,
}

/// Per-channel status line
#[derive(Debug, Serialize)]
pub struct ChannelStatus {
    pub name: String,
    pub kind: ChannelKind,
    pub endpoint: String,
    pub online: bool,
    pub queue_depth: usize,
    pub cooldown_entries: usize,
}

/// Full daemon status: uptime, counters, one line per channel
pub async fn full_status(State(state): State<Arc<SharedState>>) -> Json<StatusResponse> {
    let channels = state
        .channels()
        .iter()
        .map(|channel| ChannelStatus {
            name: channel.name().to_string(),
            kind: channel.kind(),
            endpoint: channel.endpoint().to_string(),
            online: channel.is_online(),
            queue_depth: channel.queue_depth(),
            cooldown_entries: channel.cooldown_entries(),
        })
        .collect();

    Json(StatusResponse {
        module: "gatehouse-ac",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        counters: CounterSnapshot {
            scans_decided: state.scans_decided.load(Ordering::Relaxed),
            scans_accepted: state.scans_accepted.load(Ordering::Relaxed),
            scans_denied: state.scans_denied.load(Ordering::Relaxed),
            scans_errored: state.scans_errored.load(Ordering::Relaxed),
            invalid_payloads: state.invalid_payloads.load(Ordering::Relaxed),
            cooldown_rejects: state.cooldown_rejects.load(Ordering::Relaxed),
            tags_enrolled: state.tags_enrolled.load(Ordering::Relaxed),
            heartbeats_sent: state.heartbeats_sent.load(Ordering::Relaxed),
        },
        channels,
    })
}
