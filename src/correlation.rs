// ABOUTME: Correlation registry brokering inbound events to waiting dialogue steps.
// ABOUTME: At most one pending waiter per (channel, participant); release is guaranteed on drop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::oneshot;

use crate::event::InboundEvent;

type Key = (String, String);
type WaiterMap = Arc<Mutex<HashMap<Key, oneshot::Sender<InboundEvent>>>>;

/// In-memory map of pending waits, keyed by (channel id, participant key).
/// All check-then-act sequences hold the single mutex across both steps so
/// two dialogues can never both believe they are the sole registrant, and
/// delivery can never race a registration check.
#[derive(Default)]
pub struct Registry {
    waiters: WaiterMap,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single-use wait for the next message from `participant` in
    /// `channel`. Two concurrent waits for the same pair is a programming
    /// fault in the dialogue engine, not a user-facing condition: fail
    /// loudly rather than silently reusing the stale registration.
    pub fn await_reply(&self, channel: &str, participant: &str) -> Result<ReplyHandle> {
        let key = (channel.to_string(), participant.to_string());
        let (tx, rx) = oneshot::channel();

        let mut waiters = self.waiters.lock().expect("correlation lock poisoned");
        if waiters.contains_key(&key) {
            debug_assert!(
                false,
                "double correlation registration for {} / {}",
                channel, participant
            );
            bail!(
                "correlation already registered for {} / {}",
                channel,
                participant
            );
        }
        waiters.insert(key.clone(), tx);
        drop(waiters);

        Ok(ReplyHandle {
            guard: ReleaseGuard {
                waiters: Arc::clone(&self.waiters),
                key,
            },
            rx,
        })
    }

    /// Whether a wait is registered for the pair.
    pub fn is_awaited(&self, channel: &str, participant: &str) -> bool {
        let key = (channel.to_string(), participant.to_string());
        self.waiters
            .lock()
            .expect("correlation lock poisoned")
            .contains_key(&key)
    }

    /// Deliver `event` to the matching registered wait, if any. The lookup
    /// and removal happen under one lock, so a message is either handed to
    /// the waiter that was registered at the instant of the call or reported
    /// as uncorrelated — never dropped in a check/act gap.
    pub fn try_deliver(&self, channel: &str, participant: &str, event: InboundEvent) -> bool {
        let key = (channel.to_string(), participant.to_string());
        let sender = {
            let mut waiters = self.waiters.lock().expect("correlation lock poisoned");
            waiters.remove(&key)
        };
        match sender {
            // The waiter may have timed out between removal and send; the
            // send fails, `false` comes back, and the router treats the
            // message as uncorrelated and classifies it instead.
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Number of pending waits, for diagnostics.
    pub fn pending(&self) -> usize {
        self.waiters.lock().expect("correlation lock poisoned").len()
    }
}

/// A registered wait. The handle owns a `ReleaseGuard` whose drop removes
/// the registration, so every exit path of the owning dialogue — completion,
/// cancellation, timeout, unwind, or a handle that is never awaited —
/// releases the pair.
pub struct ReplyHandle {
    guard: ReleaseGuard,
    rx: oneshot::Receiver<InboundEvent>,
}

impl ReplyHandle {
    /// Wait for the correlated reply, unbounded.
    pub async fn recv(self) -> Result<InboundEvent> {
        let ReplyHandle { guard: _guard, rx } = self;
        rx.await
            .map_err(|_| anyhow::anyhow!("correlation channel closed before delivery"))
    }

    /// Wait for the correlated reply, racing a timer. `None` means the
    /// timeout won.
    pub async fn recv_timeout(self, timeout: Duration) -> Result<Option<InboundEvent>> {
        let ReplyHandle { guard: _guard, rx } = self;
        tokio::select! {
            received = rx => received
                .map(Some)
                .map_err(|_| anyhow::anyhow!("correlation channel closed before delivery")),
            _ = tokio::time::sleep(timeout) => Ok(None),
        }
    }
}

/// Removes the registration when dropped. Held by `ReplyHandle` and moved
/// into `recv`/`recv_timeout`, which keep it alive until the wait resolves.
struct ReleaseGuard {
    waiters: WaiterMap,
    key: Key,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        remove_waiter(&self.waiters, &self.key);
    }
}

fn remove_waiter(waiters: &WaiterMap, key: &Key) {
    if let Ok(mut map) = waiters.lock() {
        map.remove(key);
    }
}
