//! One-shot wakeup scheduling for the session.
//!
//! The session never sleeps. It asks a [`Scheduler`] to deliver a [`Wakeup`]
//! later and keeps the returned handle so the wakeup can be cancelled. The
//! tokio implementation sends wakeups down a channel owned by the event loop;
//! [`VirtualClock`] keeps them in memory until a test advances time.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// What a scheduled wakeup is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeupKind {
    /// One second of the question countdown has elapsed.
    Tick,
    /// The post-answer lock delay is over.
    LockElapsed,
}

/// A scheduled event. `epoch` ties it to the countdown or lock delay that
/// requested it; the session drops wakeups whose epoch is no longer current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wakeup {
    pub epoch: u64,
    pub kind: WakeupKind,
}

impl Wakeup {
    pub fn tick(epoch: u64) -> Self {
        Self {
            epoch,
            kind: WakeupKind::Tick,
        }
    }

    pub fn lock_elapsed(epoch: u64) -> Self {
        Self {
            epoch,
            kind: WakeupKind::LockElapsed,
        }
    }
}

/// Handle to a pending wakeup.
pub trait Cancel {
    fn cancel(&mut self);
}

/// Capability to deliver a wakeup once after `delay`.
pub trait Scheduler {
    type Handle: Cancel;

    /// Time elapsed on this scheduler's timeline.
    fn now(&self) -> Duration;

    fn schedule_once(&self, delay: Duration, wakeup: Wakeup) -> Self::Handle;
}

/// Scheduler backed by tokio timers.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<Wakeup>,
    origin: Instant,
}

impl TokioScheduler {
    /// Create a scheduler and the receiver the event loop drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Wakeup>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            origin: Instant::now(),
        };
        (scheduler, rx)
    }
}

/// Aborts the sleeping task on cancel.
#[derive(Debug)]
pub struct TaskHandle(JoinHandle<()>);

impl Cancel for TaskHandle {
    fn cancel(&mut self) {
        self.0.abort();
    }
}

impl Scheduler for TokioScheduler {
    type Handle = TaskHandle;

    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn schedule_once(&self, delay: Duration, wakeup: Wakeup) -> TaskHandle {
        let tx = self.tx.clone();
        TaskHandle(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the session was torn down.
            let _ = tx.send(wakeup);
        }))
    }
}

struct PendingWakeup {
    seq: u64,
    deadline: Duration,
    wakeup: Wakeup,
    cancelled: Rc<Cell<bool>>,
}

#[derive(Default)]
struct ClockState {
    now: Duration,
    next_seq: u64,
    pending: Vec<PendingWakeup>,
}

/// Deterministic scheduler for tests. Time only moves through [`VirtualClock::pop_due`]
/// or [`VirtualClock::advance`]. Clones share the same timeline.
#[derive(Clone, Default)]
pub struct VirtualClock {
    state: Rc<RefCell<ClockState>>,
}

pub struct VirtualHandle {
    cancelled: Rc<Cell<bool>>,
}

impl Cancel for VirtualHandle {
    fn cancel(&mut self) {
        self.cancelled.set(true);
    }
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Number of wakeups still waiting to fire.
    pub fn pending(&self) -> usize {
        self.state
            .borrow()
            .pending
            .iter()
            .filter(|p| !p.cancelled.get())
            .count()
    }

    /// Remove and return the earliest live wakeup due at or before `until`,
    /// moving the clock to its deadline.
    pub fn pop_due(&self, until: Duration) -> Option<Wakeup> {
        let mut state = self.state.borrow_mut();
        state.pending.retain(|p| !p.cancelled.get());

        let position = state
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.deadline <= until)
            .min_by_key(|(_, p)| (p.deadline, p.seq))
            .map(|(i, _)| i)?;

        let due = state.pending.remove(position);
        state.now = state.now.max(due.deadline);
        Some(due.wakeup)
    }

    /// Move time forward without delivering anything; returns every wakeup that
    /// became due, in order. Wakeups scheduled while the caller handles these
    /// are not included, so sessions should use their own `advance`.
    pub fn advance(&self, by: Duration) -> Vec<Wakeup> {
        let until = self.now() + by;
        let mut due = Vec::new();
        while let Some(wakeup) = self.pop_due(until) {
            due.push(wakeup);
        }
        self.state.borrow_mut().now = until;
        due
    }

    pub(crate) fn set_now(&self, now: Duration) {
        let mut state = self.state.borrow_mut();
        state.now = state.now.max(now);
    }
}

impl Scheduler for VirtualClock {
    type Handle = VirtualHandle;

    fn now(&self) -> Duration {
        VirtualClock::now(self)
    }

    fn schedule_once(&self, delay: Duration, wakeup: Wakeup) -> VirtualHandle {
        let cancelled = Rc::new(Cell::new(false));
        let mut state = self.state.borrow_mut();
        let seq = state.next_seq;
        state.next_seq += 1;
        let deadline = state.now + delay;
        state.pending.push(PendingWakeup {
            seq,
            deadline,
            wakeup,
            cancelled: Rc::clone(&cancelled),
        });
        VirtualHandle { cancelled }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_orders_by_deadline() {
        let clock = VirtualClock::new();
        clock.schedule_once(Duration::from_secs(2), Wakeup::lock_elapsed(1));
        clock.schedule_once(Duration::from_secs(1), Wakeup::tick(2));

        let due = clock.advance(Duration::from_secs(3));
        assert_eq!(due, vec![Wakeup::tick(2), Wakeup::lock_elapsed(1)]);
        assert_eq!(clock.now(), Duration::from_secs(3));
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_virtual_clock_skips_cancelled() {
        let clock = VirtualClock::new();
        let mut handle = clock.schedule_once(Duration::from_secs(1), Wakeup::tick(1));
        clock.schedule_once(Duration::from_secs(1), Wakeup::tick(2));
        handle.cancel();

        assert_eq!(clock.pending(), 1);
        assert_eq!(clock.advance(Duration::from_secs(1)), vec![Wakeup::tick(2)]);
    }

    #[test]
    fn test_virtual_clock_holds_future_wakeups() {
        let clock = VirtualClock::new();
        clock.schedule_once(Duration::from_secs(5), Wakeup::tick(1));
        assert!(clock.advance(Duration::from_secs(4)).is_empty());
        assert_eq!(clock.pending(), 1);
        assert_eq!(clock.advance(Duration::from_secs(1)), vec![Wakeup::tick(1)]);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_delivers_and_cancels() {
        let (scheduler, mut rx) = TokioScheduler::new();
        let mut cancelled = scheduler.schedule_once(Duration::from_millis(50), Wakeup::tick(1));
        scheduler.schedule_once(Duration::from_millis(10), Wakeup::lock_elapsed(2));
        cancelled.cancel();

        assert_eq!(rx.recv().await, Some(Wakeup::lock_elapsed(2)));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(rx.try_recv().is_err());
    }
}
