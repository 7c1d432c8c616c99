//! Process-wide UI-busy resource.
//!
//! While any [`BusyGuard`] is alive the UI is blocked. Blocking is not
//! nested: a second `block()` while busy extends the same busy state, and the
//! overlay clears only when the last guard is dropped.
//!
//! Guards release on drop, so the UI unblocks on every exit path, including
//! errors, panics that unwind through the holder, and dropped futures.

use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;

static GLOBAL: OnceLock<Arc<UiBusy>> = OnceLock::new();

/// Lifetime acquire/release counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusyStats {
    pub acquired: u64,
    pub released: u64,
}

#[derive(Default)]
struct BusyState {
    holders: usize,
    stats: BusyStats,
}

/// The UI-busy flag. Subscribers see `true` while blocked.
pub struct UiBusy {
    state: Mutex<BusyState>,
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl UiBusy {
    /// Create an independent busy resource.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            state: Mutex::new(BusyState::default()),
            tx,
            rx,
        }
    }

    /// The process-wide instance.
    pub fn global() -> Arc<UiBusy> {
        GLOBAL.get_or_init(|| Arc::new(UiBusy::new())).clone()
    }

    /// Block the UI until the returned guard is dropped.
    pub fn block(self: &Arc<Self>, reason: &str) -> BusyGuard {
        let mut state = self.state.lock();
        state.holders += 1;
        state.stats.acquired += 1;
        if state.holders == 1 {
            tracing::debug!("UI blocked ({})", reason);
        } else {
            tracing::debug!("UI already blocked, extending ({})", reason);
        }
        // Published under the lock so subscribers see transitions in order.
        self.tx.send_replace(state.holders > 0);
        drop(state);

        BusyGuard {
            busy: Arc::clone(self),
            reason: reason.to_string(),
        }
    }

    /// Check whether the UI is currently blocked.
    pub fn is_busy(&self) -> bool {
        self.state.lock().holders > 0
    }

    /// Number of live guards.
    pub fn holders(&self) -> usize {
        self.state.lock().holders
    }

    pub fn stats(&self) -> BusyStats {
        self.state.lock().stats
    }

    /// Subscribe to busy-state changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    fn release(&self, reason: &str) {
        let mut state = self.state.lock();
        state.holders = state.holders.saturating_sub(1);
        state.stats.released += 1;
        if state.holders == 0 {
            tracing::debug!("UI unblocked ({})", reason);
        }
        self.tx.send_replace(state.holders > 0);
    }
}

impl Default for UiBusy {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped hold on the busy resource.
#[must_use = "the UI unblocks as soon as the guard is dropped"]
pub struct BusyGuard {
    busy: Arc<UiBusy>,
    reason: String,
}

impl BusyGuard {
    /// Release now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.release(&self.reason);
    }
}
