//! Registry of permission questions waiting on a human.
//!
//! Flow for one tool-use attempt:
//!
//! 1. [`PendingApprovals::register`] inserts a resolver under the request id.
//!    This is synchronous, so it always happens before the question is
//!    published and a fast answer cannot be lost.
//! 2. The caller publishes the question to the client.
//! 3. [`PendingApproval::wait`] suspends until exactly one of an explicit
//!    [`PendingApprovals::resolve`], the timeout, or the cancellation signal
//!    settles it. Whichever path removes the registry entry first wins.
//!
//! Dropping an unsettled [`PendingApproval`] removes its entry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use agentdeck_core::CancelReason;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::decision::Decision;

/// How long to wait and what can cut the wait short.
#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    /// Wait limit; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Fires when the runtime abandons the attempt.
    pub signal: Option<CancellationToken>,
}

impl WaitOptions {
    /// Options with the given timeout in milliseconds, where 0 disables it.
    #[must_use]
    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self {
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            signal: None,
        }
    }

    /// Attach a cancellation signal.
    #[must_use]
    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// Keyed store of outstanding approvals.
///
/// Safe for concurrent registration and resolution from different tasks. Each
/// operation holds the lock only for the map access itself.
#[derive(Debug, Default)]
pub struct PendingApprovals {
    entries: Mutex<HashMap<String, Entry>>,
    next_ticket: AtomicU64,
}

/// A resolver plus the ticket of the [`PendingApproval`] that owns it.
#[derive(Debug)]
struct Entry {
    ticket: u64,
    sender: oneshot::Sender<Decision>,
}

impl PendingApprovals {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a question under `request_id`.
    ///
    /// Request ids are expected to be unique. Registering an id that is already
    /// pending replaces the older entry, whose waiter then settles as
    /// [`Decision::Cancelled`]. The older waiter never removes the newer entry.
    pub fn register(
        self: &Arc<Self>,
        request_id: impl Into<String>,
        options: WaitOptions,
    ) -> PendingApproval {
        let request_id = request_id.into();
        let (sender, rx) = oneshot::channel();
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        if self
            .entries()
            .insert(request_id.clone(), Entry { ticket, sender })
            .is_some()
        {
            warn!(request_id = %request_id, "Replaced an approval that was still pending");
        }
        debug!(request_id = %request_id, timeout = ?options.timeout, "Registered pending approval");

        PendingApproval {
            registry: Arc::clone(self),
            request_id,
            ticket,
            receiver: Some(rx),
            options,
            settled: false,
        }
    }

    /// Deliver a decision.
    ///
    /// Returns `false` and does nothing if `request_id` is not pending, which
    /// covers late answers for settled questions.
    pub fn resolve(&self, request_id: &str, decision: Decision) -> bool {
        let Some(Entry { sender, .. }) = self.entries().remove(request_id) else {
            debug!(request_id = %request_id, "Ignoring decision for unknown approval");
            return false;
        };

        debug!(request_id = %request_id, decision = %decision, "Resolving pending approval");
        if sender.send(decision).is_err() {
            // The waiter was dropped between our removal and the send.
            debug!(request_id = %request_id, "Approval waiter went away before the decision arrived");
        }
        true
    }

    /// Whether `request_id` is still waiting.
    #[must_use]
    pub fn is_pending(&self, request_id: &str) -> bool {
        self.entries().contains_key(request_id)
    }

    /// Number of outstanding approvals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Settle every outstanding approval as [`Decision::Cancelled`].
    ///
    /// Returns the number of approvals cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.entries().drain().collect();
        let count = drained.len();
        for (request_id, Entry { sender, .. }) in drained {
            debug!(request_id = %request_id, "Cancelling pending approval");
            let _ = sender.send(Decision::Cancelled);
        }
        count
    }

    /// Remove `request_id` only if it still belongs to `ticket`.
    fn release(&self, request_id: &str, ticket: u64) -> bool {
        let mut entries = self.entries();
        if entries.get(request_id).is_some_and(|e| e.ticket == ticket) {
            entries.remove(request_id);
            true
        } else {
            false
        }
    }
}

/// One registered question, ready to be awaited.
#[derive(Debug)]
pub struct PendingApproval {
    registry: Arc<PendingApprovals>,
    request_id: String,
    ticket: u64,
    receiver: Option<oneshot::Receiver<Decision>>,
    options: WaitOptions,
    settled: bool,
}

enum Interrupted {
    Signal,
    Timer,
}

impl PendingApproval {
    /// The id this approval is registered under.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wait for the approval to settle.
    ///
    /// `on_cancel` runs exactly once when the wait ends by timeout or by the
    /// cancellation signal, and never when a decision is delivered. A signal
    /// that is already set returns [`Decision::Cancelled`] without arming the
    /// timer. Cancellation takes precedence over the timer when both are ready.
    pub async fn wait<F, Fut>(mut self, on_cancel: F) -> Decision
    where
        F: FnOnce(CancelReason) -> Fut,
        Fut: Future<Output = ()>,
    {
        let Some(mut receiver) = self.receiver.take() else {
            self.settled = true;
            return Decision::Cancelled;
        };
        let signal = self.options.signal.clone();
        let timeout = self.options.timeout;

        let interrupted = if signal.as_ref().is_some_and(CancellationToken::is_cancelled) {
            Interrupted::Signal
        } else {
            let cancelled = async {
                match &signal {
                    Some(token) => token.cancelled().await,
                    None => std::future::pending().await,
                }
            };
            let timer = async {
                match timeout {
                    Some(limit) => tokio::time::sleep(limit).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                () = cancelled => Interrupted::Signal,
                result = &mut receiver => {
                    self.settled = true;
                    // A dropped sender means the entry was replaced or the
                    // registry went away.
                    return result.unwrap_or(Decision::Cancelled);
                },
                () = timer => Interrupted::Timer,
            }
        };

        self.settled = true;
        if !self.registry.release(&self.request_id, self.ticket) {
            // A resolve removed the entry first and its decision is in flight,
            // or a newer registration replaced it and the receiver is closed.
            return receiver.await.unwrap_or(Decision::Cancelled);
        }

        let (reason, decision) = match interrupted {
            Interrupted::Signal => (CancelReason::Cancelled, Decision::Cancelled),
            Interrupted::Timer => (CancelReason::Timeout, Decision::TimedOut),
        };
        debug!(request_id = %self.request_id, reason = %reason, "Pending approval withdrawn");
        on_cancel(reason).await;
        decision
    }
}

impl Drop for PendingApproval {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.release(&self.request_id, self.ticket);
        }
    }
}
