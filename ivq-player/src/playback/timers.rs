//! Cancellable engine timers
//!
//! The engine owns one timer slot per concern (countdown, fade-in, progress
//! debounce). Arming a slot asks a [`TimerService`] for a one-shot firing and
//! stores the returned [`TimerToken`]; the firing comes back to the engine as
//! an input carrying the same token. A firing whose token no longer matches
//! the slot is stale and is ignored, so cancelling can never race a firing
//! that is already queued.

use crate::runtime::EngineInput;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Timer concern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// 1 s countdown-to-continue tick
    Countdown,
    /// One step of the resume volume ramp
    FadeIn,
    /// Progress snapshot debounce window
    ProgressDebounce,
}

/// Identifies one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub kind: TimerKind,
    pub id: u64,
}

/// Source of one-shot timer firings
pub trait TimerService: Send {
    /// Arm a timer that fires once after `delay`
    fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerToken;

    /// Cancel an armed timer (no-op if it already fired)
    fn cancel(&mut self, token: TimerToken);
}

/// Engine-side slots, one per concern
#[derive(Debug, Default)]
pub struct TimerSlots {
    countdown: Option<TimerToken>,
    fade: Option<TimerToken>,
    debounce: Option<TimerToken>,
}

impl TimerSlots {
    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<TimerToken> {
        match kind {
            TimerKind::Countdown => &mut self.countdown,
            TimerKind::FadeIn => &mut self.fade,
            TimerKind::ProgressDebounce => &mut self.debounce,
        }
    }

    /// Arm `kind`, replacing (and cancelling) whatever the slot held
    pub fn arm(&mut self, timers: &mut dyn TimerService, kind: TimerKind, delay: Duration) {
        if let Some(previous) = self.slot_mut(kind).take() {
            timers.cancel(previous);
        }
        let token = timers.schedule(kind, delay);
        *self.slot_mut(kind) = Some(token);
    }

    /// Cancel the timer in `kind`'s slot, if any
    pub fn cancel(&mut self, timers: &mut dyn TimerService, kind: TimerKind) {
        if let Some(token) = self.slot_mut(kind).take() {
            timers.cancel(token);
        }
    }

    pub fn cancel_all(&mut self, timers: &mut dyn TimerService) {
        for kind in [TimerKind::Countdown, TimerKind::FadeIn, TimerKind::ProgressDebounce] {
            self.cancel(timers, kind);
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::Countdown => self.countdown.is_some(),
            TimerKind::FadeIn => self.fade.is_some(),
            TimerKind::ProgressDebounce => self.debounce.is_some(),
        }
    }

    /// Consume a firing; false if the token is stale
    pub fn take_fired(&mut self, token: TimerToken) -> bool {
        let slot = self.slot_mut(token.kind);
        if *slot == Some(token) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

fn next_token(kind: TimerKind) -> TimerToken {
    TimerToken {
        kind,
        id: NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed),
    }
}

/// Timer service backed by tokio sleeps
///
/// Each armed timer is a spawned task that sleeps and then posts
/// [`EngineInput::Timer`] to the engine's input channel. Cancel aborts the
/// task; dropping the service aborts everything still pending.
pub struct TokioTimers {
    tx: mpsc::UnboundedSender<EngineInput>,
    pending: HashMap<TimerToken, JoinHandle<()>>,
}

impl TokioTimers {
    pub fn new(tx: mpsc::UnboundedSender<EngineInput>) -> Self {
        Self {
            tx,
            pending: HashMap::new(),
        }
    }

    /// Number of timers armed and not yet cancelled or reaped
    pub fn pending_count(&self) -> usize {
        self.pending.values().filter(|h| !h.is_finished()).count()
    }
}

impl TimerService for TokioTimers {
    fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerToken {
        // Reap finished handles so the map does not grow for a whole session
        self.pending.retain(|_, handle| !handle.is_finished());

        let token = next_token(kind);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the runtime shut down
            let _ = tx.send(EngineInput::Timer(token));
        });
        trace!("Armed {:?} timer {} for {:?}", kind, token.id, delay);
        self.pending.insert(token, handle);
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(handle) = self.pending.remove(&token) {
            handle.abort();
            trace!("Cancelled {:?} timer {}", token.kind, token.id);
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

/// Timer service that never fires on its own
///
/// Tests read the armed tokens and hand them back to the engine explicitly.
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ManualTimers {
    inner: Arc<Mutex<ManualTimersInner>>,
}

#[derive(Debug, Default)]
struct ManualTimersInner {
    armed: Vec<(TimerToken, Duration)>,
    cancelled: usize,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently armed timer of `kind`, oldest first
    pub fn armed(&self, kind: TimerKind) -> Option<TimerToken> {
        self.inner
            .lock()
            .ok()?
            .armed
            .iter()
            .find(|(t, _)| t.kind == kind)
            .map(|(t, _)| *t)
    }

    /// Delay requested for `kind`'s armed timer
    pub fn armed_delay(&self, kind: TimerKind) -> Option<Duration> {
        self.inner
            .lock()
            .ok()?
            .armed
            .iter()
            .find(|(t, _)| t.kind == kind)
            .map(|(_, d)| *d)
    }

    /// Remove `kind`'s armed timer as if it fired, returning its token
    pub fn fire(&self, kind: TimerKind) -> Option<TimerToken> {
        let mut inner = self.inner.lock().ok()?;
        let pos = inner.armed.iter().position(|(t, _)| t.kind == kind)?;
        Some(inner.armed.remove(pos).0)
    }

    pub fn armed_count(&self) -> usize {
        self.inner.lock().map(|i| i.armed.len()).unwrap_or(0)
    }

    pub fn cancelled_count(&self) -> usize {
        self.inner.lock().map(|i| i.cancelled).unwrap_or(0)
    }
}

impl TimerService for ManualTimers {
    fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerToken {
        let token = next_token(kind);
        if let Ok(mut inner) = self.inner.lock() {
            inner.armed.push((token, delay));
        }
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Ok(mut inner) = self.inner.lock() {
            let before = inner.armed.len();
            inner.armed.retain(|(t, _)| *t != token);
            if inner.armed.len() < before {
                inner.cancelled += 1;
            }
        }
    }
}
