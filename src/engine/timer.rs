//! Per-question countdown.

use std::time::Duration;

use super::scheduler::{Cancel, Scheduler, Wakeup};

/// Seconds each question allows unless configured otherwise.
pub const DEFAULT_QUESTION_SECS: u32 = 30;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining_secs: u32 },
    Expired,
}

/// Countdown that schedules one wakeup per second and reports expiry once.
///
/// Only one tick is ever outstanding. Ticks carry the epoch passed to
/// [`Timer::start`]; anything else is ignored. Tick deadlines are measured
/// from the start of the countdown, so late delivery does not push later
/// ticks back.
pub struct Timer<H: Cancel> {
    duration_secs: u32,
    remaining_secs: u32,
    epoch: u64,
    running: bool,
    started_at: Duration,
    handle: Option<H>,
}

impl<H: Cancel> Timer<H> {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            epoch: 0,
            running: false,
            started_at: Duration::ZERO,
            handle: None,
        }
    }

    pub fn start<S>(&mut self, scheduler: &S, epoch: u64)
    where
        S: Scheduler<Handle = H>,
    {
        self.cancel();
        self.remaining_secs = self.duration_secs;
        self.epoch = epoch;
        self.running = true;
        self.started_at = scheduler.now();
        self.schedule_next(scheduler);
    }

    pub fn cancel(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
        }
        self.running = false;
    }

    /// Handle a tick wakeup. Returns `None` for stale or unexpected ticks.
    pub fn on_tick<S>(&mut self, scheduler: &S, epoch: u64) -> Option<TimerEvent>
    where
        S: Scheduler<Handle = H>,
    {
        if !self.running || epoch != self.epoch {
            return None;
        }

        self.handle = None;
        self.remaining_secs = self.remaining_secs.saturating_sub(1);

        if self.remaining_secs == 0 {
            self.running = false;
            return Some(TimerEvent::Expired);
        }

        self.schedule_next(scheduler);
        Some(TimerEvent::Tick {
            remaining_secs: self.remaining_secs,
        })
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn schedule_next<S>(&mut self, scheduler: &S)
    where
        S: Scheduler<Handle = H>,
    {
        let elapsed_ticks = self.duration_secs - self.remaining_secs;
        let deadline = self.started_at + TICK * (elapsed_ticks + 1);
        let delay = deadline.saturating_sub(scheduler.now());
        self.handle = Some(scheduler.schedule_once(delay, Wakeup::tick(self.epoch)));
    }
}

impl<H: Cancel> Drop for Timer<H> {
    fn drop(&mut self) {
        self.cancel();
    }
}
