//! Channel dispatcher tasks
//!
//! Two tasks drive an access channel: an intake task that reads lines,
//! validates them, and gates tags through the cooldown state, and a
//! drain task that pulls admitted tags one at a time through
//! resolve -> respond -> audit. One tag's full pipeline runs before the
//! next is dequeued, so responses leave a channel in admission order.
//! Enroll channels run a single sequential task with no queue, no
//! cooldown, and no audit trail.
//!
//! A channel whose stream reaches EOF or a hard read error goes
//! offline for the rest of the process lifetime; its backlog still
//! drains (writes may survive a half-closed transport) but nothing new
//! is admitted.

use crate::audit::{AuditLogger, AuditRecord};
use crate::channel::{Admission, BoxedReader, Channel};
use crate::config::PipelineConfig;
use crate::resolver::Resolver;
use crate::state::SharedState;
use crate::store::SharedStore;
use chrono::Utc;
use gatehouse_common::{ChannelKind, GateEvent, ScanPayload, Tag};
use std::io::ErrorKind;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

/// Pipeline collaborators shared by every channel task
pub struct Pipeline {
    pub resolver: Resolver,
    pub audit: AuditLogger,
    pub respond_attempts: u32,
    pub state: Arc<SharedState>,
}

impl Pipeline {
    pub fn new(store: SharedStore, config: &PipelineConfig, state: Arc<SharedState>) -> Self {
        Self {
            resolver: Resolver::new(store.clone(), config.store_retries),
            audit: AuditLogger::new(store),
            respond_attempts: config.respond_attempts,
            state,
        }
    }
}

/// Spawn the tasks driving one channel
pub fn spawn_channel(
    channel: Arc<Channel>,
    reader: BoxedReader,
    pipeline: Arc<Pipeline>,
) -> Vec<JoinHandle<()>> {
    match channel.kind() {
        ChannelKind::Entry | ChannelKind::Exit => vec![
            tokio::spawn(drain_task(channel.clone(), pipeline.clone())),
            tokio::spawn(intake_task(channel, reader, pipeline)),
        ],
        ChannelKind::Enroll => vec![tokio::spawn(intake_task(channel, reader, pipeline))],
    }
}

/// Read lines off the channel until the stream ends
///
/// Non-UTF-8 lines are skipped; EOF and hard errors end the task and
/// take the channel offline.
async fn intake_task(channel: Arc<Channel>, reader: BoxedReader, pipeline: Arc<Pipeline>) {
    let mut lines = BufReader::new(reader).lines();

    let offline_reason = loop {
        match lines.next_line().await {
            Ok(Some(line)) => match ScanPayload::parse(&line) {
                Ok(ScanPayload::Ping) => {
                    tracing::trace!(channel = %channel.name(), "Liveness echo");
                }
                Ok(ScanPayload::Tag(tag)) => {
                    if channel.kind() == ChannelKind::Enroll {
                        process_enrollment(&channel, &pipeline, tag).await;
                    } else {
                        admit_scan(&channel, &pipeline, &tag);
                    }
                }
                Err(e) => {
                    tracing::warn!(channel = %channel.name(), "Dropped invalid payload: {}", e);
                    pipeline
                        .state
                        .invalid_payloads
                        .fetch_add(1, Ordering::Relaxed);
                }
            },
            Ok(None) => break "end of stream".to_string(),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                tracing::warn!(channel = %channel.name(), "Skipped non-UTF-8 line: {}", e);
            }
            Err(e) => break format!("read failed: {}", e),
        }
    };

    channel.set_online(false);
    tracing::warn!(channel = %channel.name(), "Channel offline: {}", offline_reason);
    pipeline.state.broadcast_event(GateEvent::ChannelOffline {
        channel: channel.name().to_string(),
        reason: offline_reason,
        timestamp: Utc::now(),
    });
}

/// Gate one tag into the pending queue, waking the drain task on
/// admission; rejections are silent toward the reader
fn admit_scan(channel: &Channel, pipeline: &Pipeline, tag: &Tag) {
    match channel.admit(tag) {
        Admission::Admitted => {
            tracing::debug!(channel = %channel.name(), tag = %tag, "Scan admitted");
            channel.wake.notify_one();
        }
        Admission::AlreadyQueued => {
            tracing::warn!(channel = %channel.name(), tag = %tag, "Scan dropped: already queued");
            pipeline
                .state
                .cooldown_rejects
                .fetch_add(1, Ordering::Relaxed);
        }
        Admission::CoolingDown => {
            tracing::warn!(channel = %channel.name(), tag = %tag, "Scan dropped: tag in cooldown");
            pipeline
                .state
                .cooldown_rejects
                .fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Pull admitted tags through the decision pipeline, one at a time
async fn drain_task(channel: Arc<Channel>, pipeline: Arc<Pipeline>) {
    loop {
        channel.wake.notified().await;
        while let Some(tag) = channel.next_for_resolution() {
            process_scan(&channel, &pipeline, tag).await;
        }
    }
}

/// Resolve, then respond, then audit, in that order
///
/// The reader's own timeout is ticking from the moment it sent the
/// scan, so the response goes out before any audit write. A lost
/// response (write budget exhausted) is logged and dropped, never
/// requeued.
async fn process_scan(channel: &Channel, pipeline: &Pipeline, tag: Tag) {
    let verdict = pipeline.resolver.resolve(channel.kind(), &tag).await;
    tracing::info!(
        channel = %channel.name(),
        tag = %tag,
        decision = %verdict.decision,
        "{}",
        verdict.reason
    );

    let response = verdict.decision.response_text();
    if let Err(e) = channel
        .writer
        .write_line(response, pipeline.respond_attempts)
        .await
    {
        tracing::error!(channel = %channel.name(), tag = %tag, "Response lost: {}", e);
    }

    let record = AuditRecord::new(channel.name(), channel.kind(), tag, verdict);
    pipeline.audit.record(&record).await;

    pipeline.state.note_verdict(&record.verdict);
    pipeline.state.broadcast_event(GateEvent::ScanDecided {
        channel: record.channel.clone(),
        kind: record.kind,
        tag: record.tag.clone(),
        decision: record.verdict.decision,
        reason: record.verdict.reason.clone(),
        response: response.to_string(),
        timestamp: record.timestamp,
    });
}

/// Enrollment pipeline: read-or-create the resident record and respond
async fn process_enrollment(channel: &Channel, pipeline: &Pipeline, tag: Tag) {
    let outcome = pipeline.resolver.enroll(&tag).await;
    let response = outcome.response_text();
    tracing::info!(channel = %channel.name(), tag = %tag, "Enrollment scan: {}", response);

    if let Err(e) = channel
        .writer
        .write_line(response, pipeline.respond_attempts)
        .await
    {
        tracing::error!(channel = %channel.name(), tag = %tag, "Response lost: {}", e);
    }

    pipeline.state.note_enrollment(outcome);
    pipeline.state.broadcast_event(GateEvent::TagEnrolled {
        channel: channel.name().to_string(),
        tag,
        outcome,
        response: response.to_string(),
        timestamp: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::store::{self, MemoryDocumentStore};
    use gatehouse_common::Decision;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
    use tokio::sync::broadcast;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    struct Rig {
        channel: Arc<Channel>,
        feed: DuplexStream,
        responses: BufReader<DuplexStream>,
        events: broadcast::Receiver<GateEvent>,
        store: Arc<MemoryDocumentStore>,
        pipeline: Arc<Pipeline>,
    }

    fn rig(kind: ChannelKind, store_retries: u32) -> Rig {
        let store = Arc::new(MemoryDocumentStore::new());
        let state = Arc::new(SharedState::new(Vec::new()));
        let pipeline = Arc::new(Pipeline {
            resolver: Resolver::new(store.clone(), store_retries),
            audit: AuditLogger::new(store.clone()),
            respond_attempts: 3,
            state: state.clone(),
        });

        let config = ChannelConfig {
            name: "Test Gate".to_string(),
            kind,
            endpoint: "tcp://127.0.0.1:4001".parse().unwrap(),
        };
        let (feed, reader_io) = duplex(256);
        let (writer_io, response_io) = duplex(256);
        let channel = Channel::new(
            &config,
            Duration::from_millis(180_000),
            Some(Box::new(writer_io)),
        );

        let events = state.subscribe_events();
        spawn_channel(channel.clone(), Box::new(reader_io), pipeline.clone());

        Rig {
            channel,
            feed,
            responses: BufReader::new(response_io),
            events,
            store,
            pipeline,
        }
    }

    async fn read_response(rig: &mut Rig) -> String {
        let mut line = String::new();
        timeout(WAIT, rig.responses.read_line(&mut line))
            .await
            .expect("timed out waiting for response")
            .unwrap();
        line
    }

    async fn next_event(rig: &mut Rig) -> GateEvent {
        timeout(WAIT, rig.events.recv())
            .await
            .expect("timed out waiting for event")
            .unwrap()
    }

    #[tokio::test]
    async fn test_accepted_scan_responds_then_audits() {
        let mut rig = rig(ChannelKind::Entry, 3);
        rig.store
            .seed(store::RESIDENTS, "1A2B3C4D", json!({"assigned": true}));

        rig.feed.write_all(b"1a2b3c4d\n").await.unwrap();

        assert_eq!(read_response(&mut rig).await, "Resident Found\n");

        // The event is broadcast after the audit writes complete
        match next_event(&mut rig).await {
            GateEvent::ScanDecided { decision, tag, .. } => {
                assert_eq!(decision, Decision::Accepted);
                assert_eq!(tag.as_str(), "1A2B3C4D");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(rig.store.collection_len(store::SCAN_LOG), 1);
        assert_eq!(rig.store.collection_len(store::LATEST_ENTRY), 1);
        assert_eq!(rig.store.collection_len(store::DENIED_LOG), 0);
    }

    #[tokio::test]
    async fn test_ping_and_invalid_lines_produce_no_response() {
        let mut rig = rig(ChannelKind::Exit, 3);

        rig.feed.write_all(b"ping\n").await.unwrap();
        rig.feed.write_all(b"not-a-tag\n").await.unwrap();
        rig.feed.write_all(b"deadbeef\n").await.unwrap();

        // The first (and only) response is for the valid tag
        assert_eq!(read_response(&mut rig).await, "Resident Not Found\n");
        assert_eq!(
            rig.pipeline.state.invalid_payloads.load(Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_cooled_down_rescan_is_silent() {
        let mut rig = rig(ChannelKind::Entry, 3);
        rig.store
            .seed(store::RESIDENTS, "1A2B3C4D", json!({"assigned": true}));

        rig.feed.write_all(b"1A2B3C4D\n").await.unwrap();
        assert_eq!(read_response(&mut rig).await, "Resident Found\n");
        next_event(&mut rig).await;

        // Same tag inside the cooldown window, then a different tag
        rig.feed.write_all(b"1A2B3C4D\n").await.unwrap();
        rig.feed.write_all(b"DEADBEEF\n").await.unwrap();

        assert_eq!(read_response(&mut rig).await, "Resident Not Found\n");
        match next_event(&mut rig).await {
            GateEvent::ScanDecided { tag, .. } => assert_eq!(tag.as_str(), "DEADBEEF"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(
            rig.pipeline.state.cooldown_rejects.load(Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_store_failure_yields_error_response_and_denied_log() {
        let mut rig = rig(ChannelKind::Entry, 0);
        rig.store.fail_next(1);

        rig.feed.write_all(b"1A2B3C4D\n").await.unwrap();

        assert_eq!(read_response(&mut rig).await, "Error\n");
        match next_event(&mut rig).await {
            GateEvent::ScanDecided { decision, .. } => assert_eq!(decision, Decision::Error),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(rig.store.collection_len(store::SCAN_LOG), 1);
        assert_eq!(rig.store.collection_len(store::DENIED_LOG), 1);
        assert_eq!(
            rig.pipeline.state.scans_errored.load(Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_enrollment_creates_then_reports_unassigned() {
        let mut rig = rig(ChannelKind::Enroll, 3);

        rig.feed.write_all(b"00000000\n").await.unwrap();
        assert_eq!(read_response(&mut rig).await, "New Resident Created\n");

        let doc = rig.store.document(store::RESIDENTS, "00000000").unwrap();
        assert_eq!(doc["assigned"], false);

        // No cooldown on the enroll channel: an immediate rescan is
        // processed and now finds the unassigned record
        rig.feed.write_all(b"00000000\n").await.unwrap();
        assert_eq!(read_response(&mut rig).await, "UID Not Assigned\n");

        assert_eq!(
            rig.pipeline.state.tags_enrolled.load(Ordering::Relaxed),
            1
        );
        assert_eq!(rig.store.collection_len(store::SCAN_LOG), 0);
    }

    #[tokio::test]
    async fn test_eof_takes_channel_offline() {
        let mut rig = rig(ChannelKind::Entry, 3);
        assert!(rig.channel.is_online());

        drop(rig.feed);

        match timeout(WAIT, rig.events.recv()).await.unwrap().unwrap() {
            GateEvent::ChannelOffline { channel, reason, .. } => {
                assert_eq!(channel, "Test Gate");
                assert_eq!(reason, "end of stream");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(!rig.channel.is_online());
    }
}
