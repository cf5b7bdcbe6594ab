//! Readiness gate
//!
//! Every operation joins a FIFO queue the moment it is issued. A ready owner
//! dispatches the queue right away on a spawned task; a not-ready owner keeps
//! it parked until it becomes ready. Either way calls run one at a time and in
//! submission order, and a call already issued never overtakes the backlog.

use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::common::{ClientError, ClientResult};

/// A deferred operation with its arguments already captured
pub(crate) type PendingCall = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

#[derive(Default)]
struct GateState {
    ready: bool,
    draining: bool,
    closed: bool,
    queue: VecDeque<PendingCall>,
}

pub(crate) struct ReadinessGate {
    owner: String,
    state: Mutex<GateState>,
}

impl ReadinessGate {
    pub(crate) fn new(owner: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            owner: owner.into(),
            state: Mutex::new(GateState::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.state().ready
    }

    pub(crate) fn pending(&self) -> usize {
        self.state().queue.len()
    }

    /// Submit `op` to the queue. It is dispatched now if the owner is ready and
    /// replayed later otherwise.
    ///
    /// The call runs even if the returned future is dropped. The future
    /// resolves to `ClientError::Closed` if the gate is closed (or dropped)
    /// before the call gets to run.
    pub(crate) fn run<T, F, Fut>(self: &Arc<Self>, op: F) -> BoxFuture<'static, ClientResult<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ClientResult<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let call: PendingCall = Box::new(move || {
            Box::pin(async move {
                let _ = tx.send(op().await);
            })
        });

        self.submit(call);
        Box::pin(async move { rx.await.unwrap_or(Err(ClientError::Closed)) })
    }

    fn submit(self: &Arc<Self>, call: PendingCall) {
        {
            let mut state = self.state();
            if state.closed {
                debug!(owner = %self.owner, "gate closed, dropping call");
                return;
            }
            state.queue.push_back(call);
            if !state.ready {
                debug!(owner = %self.owner, queued = state.queue.len(), "owner not ready, call queued");
                return;
            }
            if state.draining {
                return;
            }
            state.draining = true;
        }
        self.spawn_drain();
    }

    /// Mark the owner ready and replay the backlog.
    ///
    /// The backlog is drained on a spawned task, so the caller does not wait
    /// for queued operations to finish.
    pub(crate) fn open(self: &Arc<Self>) {
        {
            let mut state = self.state();
            if state.closed {
                return;
            }
            state.ready = true;
            if state.draining || state.queue.is_empty() {
                return;
            }
            state.draining = true;
            info!(owner = %self.owner, pending = state.queue.len(), "owner ready, replaying queued calls");
        }

        self.spawn_drain();
    }

    fn spawn_drain(self: &Arc<Self>) {
        let gate = Arc::clone(self);
        tokio::spawn(async move { gate.drain().await });
    }

    async fn drain(&self) {
        loop {
            let next = {
                let mut state = self.state();
                if !state.ready {
                    state.draining = false;
                    return;
                }
                match state.queue.pop_front() {
                    Some(call) => call,
                    None => {
                        state.draining = false;
                        debug!(owner = %self.owner, "queue drained");
                        return;
                    }
                }
            };
            next().await;
        }
    }

    /// Return to the not-ready state; later calls queue again.
    pub(crate) fn shut(&self) {
        self.state().ready = false;
    }

    /// Refuse all further calls and drop the backlog.
    pub(crate) fn close(&self) {
        let dropped = {
            let mut state = self.state();
            state.closed = true;
            state.ready = false;
            std::mem::take(&mut state.queue)
        };
        if !dropped.is_empty() {
            debug!(owner = %self.owner, dropped = dropped.len(), "gate closed with queued calls");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Mutex as AsyncMutex;

    fn record(
        log: &Arc<AsyncMutex<Vec<&'static str>>>,
        entry: &'static str,
    ) -> impl FnOnce() -> BoxFuture<'static, ClientResult<&'static str>> + Send + 'static {
        let log = Arc::clone(log);
        move || {
            Box::pin(async move {
                log.lock().await.push(entry);
                Ok(entry)
            })
        }
    }

    #[tokio::test]
    async fn test_runs_immediately_when_ready() {
        let gate = ReadinessGate::new("test");
        gate.open();
        let log = Arc::new(AsyncMutex::new(Vec::new()));

        let result = gate.run(record(&log, "a")).await;

        assert_eq!(result, Ok("a"));
        assert_eq!(*log.lock().await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_ready_calls_run_in_issue_order() {
        let gate = ReadinessGate::new("test");
        gate.open();
        let log = Arc::new(AsyncMutex::new(Vec::new()));

        let first = gate.run(record(&log, "first"));
        let second = gate.run(record(&log, "second"));

        assert_eq!(second.await, Ok("second"));
        assert_eq!(*log.lock().await, vec!["first", "second"]);
        assert_eq!(first.await, Ok("first"));
    }

    #[tokio::test]
    async fn test_dropped_future_still_runs_when_ready() {
        let gate = ReadinessGate::new("test");
        gate.open();
        let log = Arc::new(AsyncMutex::new(Vec::new()));

        drop(gate.run(record(&log, "detached")));
        assert_eq!(gate.run(record(&log, "last")).await, Ok("last"));

        assert_eq!(*log.lock().await, vec!["detached", "last"]);
    }

    #[tokio::test]
    async fn test_queued_calls_replay_in_fifo_order() {
        let gate = ReadinessGate::new("test");
        let log = Arc::new(AsyncMutex::new(Vec::new()));

        let first = gate.run(record(&log, "first"));
        let second = gate.run(record(&log, "second"));
        assert_eq!(gate.pending(), 2);

        // Await the later call first: replay order is still submission order.
        gate.open();
        assert_eq!(second.await, Ok("second"));
        assert_eq!(first.await, Ok("first"));
        assert_eq!(*log.lock().await, vec!["first", "second"]);
        assert_eq!(gate.pending(), 0);
    }

    #[tokio::test]
    async fn test_dropped_future_still_runs_queued_call() {
        let gate = ReadinessGate::new("test");
        let log = Arc::new(AsyncMutex::new(Vec::new()));

        drop(gate.run(record(&log, "detached")));
        let last = gate.run(record(&log, "last"));

        gate.open();
        assert_eq!(last.await, Ok("last"));
        assert_eq!(*log.lock().await, vec!["detached", "last"]);
    }

    #[tokio::test]
    async fn test_calls_during_drain_wait_their_turn() {
        let gate = ReadinessGate::new("test");
        let log = Arc::new(AsyncMutex::new(Vec::new()));
        let release = Arc::new(tokio::sync::Notify::new());

        let slow = gate.run({
            let log = Arc::clone(&log);
            let release = Arc::clone(&release);
            move || async move {
                release.notified().await;
                log.lock().await.push("slow");
                Ok("slow")
            }
        });

        gate.open();
        while gate.pending() > 0 {
            tokio::task::yield_now().await;
        }
        // The drain task is now blocked inside "slow"; a new call must queue.
        let late = gate.run(record(&log, "late"));
        assert_eq!(gate.pending(), 1);
        assert!(log.lock().await.is_empty());

        release.notify_one();
        assert_eq!(late.await, Ok("late"));
        assert_eq!(slow.await, Ok("slow"));
        assert_eq!(*log.lock().await, vec!["slow", "late"]);
    }

    #[tokio::test]
    async fn test_never_opened_gate_keeps_calls_queued() {
        let gate = ReadinessGate::new("test");
        let log = Arc::new(AsyncMutex::new(Vec::new()));

        let result =
            tokio::time::timeout(Duration::from_millis(50), gate.run(record(&log, "x"))).await;

        assert!(result.is_err(), "call must not run before the gate opens");
        assert!(log.lock().await.is_empty());
        assert!(!gate.is_ready());
        assert_eq!(gate.pending(), 1);
    }

    #[tokio::test]
    async fn test_close_fails_queued_calls() {
        let gate = ReadinessGate::new("test");
        let log = Arc::new(AsyncMutex::new(Vec::new()));

        let waiting = gate.run(record(&log, "never"));
        gate.close();

        assert_eq!(waiting.await, Err(ClientError::Closed));
        assert_eq!(gate.run(record(&log, "after")).await, Err(ClientError::Closed));
        gate.open();
        assert!(!gate.is_ready());
        assert!(log.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_shut_gate_queues_again() {
        let gate = ReadinessGate::new("test");
        gate.open();
        gate.shut();
        assert!(!gate.is_ready());

        let log = Arc::new(AsyncMutex::new(Vec::new()));
        let waiting = gate.run(record(&log, "resumed"));
        assert_eq!(gate.pending(), 1);

        gate.open();
        assert_eq!(waiting.await, Ok("resumed"));
    }
}
