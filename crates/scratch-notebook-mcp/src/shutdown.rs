//! Shutdown state machine and request gating.
//!
//! `Running -> Draining -> Stopped`. New work enters only while `Running`;
//! a drain waits for in-flight requests under a wall-clock budget, then the
//! gate moves to `Stopped` regardless. The state is a watch channel so the
//! sweeper and transports observe transitions without polling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Running,
    Draining,
    Stopped,
}

struct GateInner {
    state: watch::Sender<ServerState>,
    active: AtomicUsize,
    drained: Notify,
}

/// Cooperative request gate shared by every transport.
#[derive(Clone)]
pub struct ShutdownGate {
    inner: Arc<GateInner>,
}

impl Default for ShutdownGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ServerState::Running);
        Self {
            inner: Arc::new(GateInner {
                state,
                active: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    pub fn state(&self) -> ServerState {
        *self.inner.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// Observe state transitions (used by the sweeper and transports).
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.inner.state.subscribe()
    }

    pub fn active_requests(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Register a request. Returns `None` once draining has begun; the
    /// guard releases the slot on drop.
    pub fn try_enter(&self) -> Option<RequestGuard> {
        if !self.is_running() {
            return None;
        }
        self.inner.active.fetch_add(1, Ordering::AcqRel);
        // the state may have flipped between the check and the increment
        if !self.is_running() {
            release(&self.inner);
            return None;
        }
        Some(RequestGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Transition to `Draining`, wait for in-flight requests up to
    /// `timeout`, then transition to `Stopped`. Returns whether the drain
    /// completed before the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let _ = self.inner.state.send(ServerState::Draining);

        let deadline = tokio::time::Instant::now() + timeout;
        let drained = loop {
            if self.active_requests() == 0 {
                break true;
            }
            let notified = self.inner.drained.notified();
            if self.active_requests() == 0 {
                break true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                break self.active_requests() == 0;
            }
        };

        let _ = self.inner.state.send(ServerState::Stopped);
        drained
    }
}

fn release(inner: &GateInner) {
    if inner.active.fetch_sub(1, Ordering::AcqRel) == 1 {
        inner.drained.notify_waiters();
    }
}

/// In-flight request marker; dropping it releases the gate slot.
pub struct RequestGuard {
    inner: Arc<GateInner>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        release(&self.inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn requests_enter_while_running() {
        let gate = ShutdownGate::new();
        let guard = gate.try_enter().unwrap();
        assert_eq!(gate.active_requests(), 1);
        drop(guard);
        assert_eq!(gate.active_requests(), 0);
    }

    #[tokio::test]
    async fn draining_rejects_new_requests() {
        let gate = ShutdownGate::new();
        assert!(gate.drain(Duration::from_millis(10)).await);
        assert_eq!(gate.state(), ServerState::Stopped);
        assert!(gate.try_enter().is_none());
    }

    #[tokio::test]
    async fn drain_waits_for_in_flight_requests() {
        let gate = ShutdownGate::new();
        let guard = gate.try_enter().unwrap();

        let drainer = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.drain(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(gate.state(), ServerState::Draining);

        drop(guard);
        assert!(drainer.await.unwrap());
        assert_eq!(gate.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn drain_times_out_with_stuck_requests() {
        let gate = ShutdownGate::new();
        let _guard = gate.try_enter().unwrap();
        let drained = gate.drain(Duration::from_millis(30)).await;
        assert!(!drained);
        assert_eq!(gate.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let gate = ShutdownGate::new();
        let mut rx = gate.subscribe();
        let gate2 = gate.clone();
        tokio::spawn(async move {
            gate2.drain(Duration::from_millis(5)).await;
        });
        rx.changed().await.unwrap();
        assert_ne!(*rx.borrow(), ServerState::Running);
    }
}
