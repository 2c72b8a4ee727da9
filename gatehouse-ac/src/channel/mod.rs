//! Reader channel state and output sink
//!
//! Each physical reader is one [`Channel`]: a name, a direction, the
//! per-channel dedup state, and the shared output sink. Channels never
//! share mutable state with each other; the only cross-channel
//! resources are the document store and the event broadcast.

pub mod dispatcher;
pub mod transport;

pub use transport::{BoxedReader, BoxedWriter, Endpoint};

use crate::config::ChannelConfig;
use crate::error::{Error, Result};
use gatehouse_common::{ChannelKind, Tag};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Outcome of a cooldown-gate admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Appended to the pending queue; the drain task should be woken
    Admitted,
    /// The same tag is already queued and not yet dispatched
    AlreadyQueued,
    /// The tag was dispatched less than one cooldown window ago
    CoolingDown,
}

/// Per-channel pending queue and cooldown map
///
/// The queue is FIFO and set-like: a tag already queued is not enqueued
/// twice. The cooldown clock for a tag starts when it is dequeued for
/// resolution, not when it is admitted, so a burst of identical scans
/// is deduplicated by the queue check while the window itself covers
/// processing time.
pub struct ChannelState {
    pending: VecDeque<Tag>,
    cooldowns: HashMap<Tag, Instant>,
    cooldown_window: Duration,
}

impl ChannelState {
    pub fn new(cooldown_window: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            cooldowns: HashMap::new(),
            cooldown_window,
        }
    }

    /// Gate one tag into the pending queue
    pub fn admit(&mut self, tag: &Tag) -> Admission {
        if self.pending.contains(tag) {
            return Admission::AlreadyQueued;
        }
        if let Some(dispatched_at) = self.cooldowns.get(tag) {
            if dispatched_at.elapsed() < self.cooldown_window {
                return Admission::CoolingDown;
            }
        }
        self.pending.push_back(tag.clone());
        Admission::Admitted
    }

    /// Pop the next tag for resolution, stamping its cooldown at
    /// dispatch time
    pub fn next_for_resolution(&mut self) -> Option<Tag> {
        let tag = self.pending.pop_front()?;
        self.cooldowns.insert(tag.clone(), Instant::now());
        Some(tag)
    }

    /// Drop cooldown entries whose window has fully elapsed, returning
    /// how many were removed
    pub fn prune_expired(&mut self) -> usize {
        let window = self.cooldown_window;
        let before = self.cooldowns.len();
        self.cooldowns.retain(|_, dispatched_at| dispatched_at.elapsed() < window);
        before - self.cooldowns.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn cooldown_len(&self) -> usize {
        self.cooldowns.len()
    }
}

/// Shared handle to a channel's output sink
///
/// The dispatcher's response writes and the liveness pulse go through
/// the same writer; the async mutex keeps their lines from
/// interleaving. A channel whose endpoint never opened has no sink and
/// fails writes cleanly.
pub struct ChannelWriter {
    name: String,
    sink: tokio::sync::Mutex<Option<BoxedWriter>>,
}

impl ChannelWriter {
    pub fn new(name: &str, sink: Option<BoxedWriter>) -> Self {
        Self {
            name: name.to_string(),
            sink: tokio::sync::Mutex::new(sink),
        }
    }

    /// Write one newline-terminated line with a bounded attempt budget
    ///
    /// Attempts are immediate re-tries with no delay. Exhausting the
    /// budget returns the last error; the caller decides whether that
    /// is fatal (it never is; a lost response is logged and dropped).
    pub async fn write_line(&self, payload: &str, attempts: u32) -> Result<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| Error::ChannelWrite(format!("{}: sink not connected", self.name)))?;

        let line = format!("{}\n", payload);
        let budget = attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=budget {
            let result = async {
                sink.write_all(line.as_bytes()).await?;
                sink.flush().await
            }
            .await;
            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        channel = %self.name,
                        attempt,
                        "Channel write failed: {}",
                        e
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(Error::ChannelWrite(format!(
            "{}: {} attempts exhausted: {}",
            self.name,
            budget,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Drop the sink; all further writes fail with a clean error
    pub async fn disconnect(&self) {
        *self.sink.lock().await = None;
    }

    pub async fn is_connected(&self) -> bool {
        self.sink.lock().await.is_some()
    }
}

/// One reader channel: identity, dedup state, output sink, wakeup
pub struct Channel {
    name: String,
    kind: ChannelKind,
    endpoint: Endpoint,
    state: Mutex<ChannelState>,
    pub writer: ChannelWriter,
    /// Wakes the drain task after an admission
    pub(crate) wake: Notify,
    online: AtomicBool,
}

impl Channel {
    /// Build a channel from its config; `sink` is `None` when the
    /// endpoint failed to open at startup
    pub fn new(config: &ChannelConfig, cooldown: Duration, sink: Option<BoxedWriter>) -> Arc<Self> {
        let online = sink.is_some();
        Arc::new(Self {
            name: config.name.clone(),
            kind: config.kind,
            endpoint: config.endpoint.clone(),
            state: Mutex::new(ChannelState::new(cooldown)),
            writer: ChannelWriter::new(&config.name, sink),
            wake: Notify::new(),
            online: AtomicBool::new(online),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    /// Gate a tag through this channel's cooldown state
    pub fn admit(&self, tag: &Tag) -> Admission {
        self.state.lock().unwrap().admit(tag)
    }

    /// Next queued tag, cooldown-stamped at dequeue
    pub fn next_for_resolution(&self) -> Option<Tag> {
        self.state.lock().unwrap().next_for_resolution()
    }

    /// Periodic cooldown map maintenance
    pub fn prune_cooldowns(&self) -> usize {
        self.state.lock().unwrap().prune_expired()
    }

    pub fn queue_depth(&self) -> usize {
        self.state.lock().unwrap().pending_len()
    }

    pub fn cooldown_entries(&self) -> usize {
        self.state.lock().unwrap().cooldown_len()
    }
}
