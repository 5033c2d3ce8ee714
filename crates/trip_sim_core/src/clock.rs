//! Schedule-once timers for the replay engine.
//!
//! [`Scheduler`] is the only timing primitive the engine needs. Two backends:
//!
//! - [`TokioScheduler`]: wall-clock timers, one spawned task per tick.
//! - [`ManualClock`]: virtual time advanced explicitly, for tests, benches and
//!   headless replays. Timers fire in (due time, insertion) order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;

use crate::error::SimulationError;

pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`. The returned handle cancels it.
    fn schedule_once(&self, delay: Duration, task: ScheduledTask) -> TimerHandle;
}

/// Cancellation handle for a scheduled task.
///
/// Dropping the handle leaves the task scheduled. Cancelling a task that
/// already ran is a no-op.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Wall-clock scheduler backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime of the calling context.
    pub fn current() -> Result<Self, SimulationError> {
        Ok(Self::new(Handle::try_current()?))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, delay: Duration, task: ScheduledTask) -> TimerHandle {
        let deadline = tokio::time::Instant::now() + delay;
        let join = self.handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            task();
        });
        let abort = join.abort_handle();
        TimerHandle::new(move || abort.abort())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Due {
    at_ms: u64,
    seq: u64,
}

impl Ord for Due {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by due time.
        other
            .at_ms
            .cmp(&self.at_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Due {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct ClockState {
    now_ms: u64,
    next_seq: u64,
    queue: BinaryHeap<Due>,
    /// Live tasks by sequence number. Cancelled timers are removed here and
    /// their queue entries skipped when popped.
    tasks: HashMap<u64, ScheduledTask>,
}

/// Virtual-time scheduler. Clones share the same timeline.
#[derive(Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ClockState>>,
}

fn lock_state(state: &Mutex<ClockState>) -> MutexGuard<'_, ClockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds since creation.
    pub fn now_ms(&self) -> u64 {
        lock_state(&self.state).now_ms
    }

    /// Number of timers that are scheduled and not cancelled.
    pub fn pending(&self) -> usize {
        lock_state(&self.state).tasks.len()
    }

    /// Due time of the next live timer.
    pub fn next_due_ms(&self) -> Option<u64> {
        let mut state = lock_state(&self.state);
        loop {
            let due = *state.queue.peek()?;
            if state.tasks.contains_key(&due.seq) {
                return Some(due.at_ms);
            }
            state.queue.pop();
        }
    }

    /// Pop the next live task due at or before `until`, moving the clock to its
    /// due time. The lock is released before the task runs so it can schedule.
    fn pop_due(&self, until: Option<u64>) -> Option<ScheduledTask> {
        let mut state = lock_state(&self.state);
        loop {
            let due = *state.queue.peek()?;
            if until.is_some_and(|limit| due.at_ms > limit) {
                return None;
            }
            state.queue.pop();
            if let Some(task) = state.tasks.remove(&due.seq) {
                state.now_ms = due.at_ms;
                return Some(task);
            }
        }
    }

    /// Jump to the next timer and run it. Returns `false` when nothing is scheduled.
    pub fn run_next(&self) -> bool {
        match self.pop_due(None) {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Advance virtual time by `by`, running every timer that falls due,
    /// including ones scheduled along the way. Returns the number run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now_ms().saturating_add(duration_ms(by));
        let mut ran = 0;
        while let Some(task) = self.pop_due(Some(target)) {
            task();
            ran += 1;
        }
        lock_state(&self.state).now_ms = target;
        ran
    }

    /// Run timers until none remain or `max_steps` have run.
    pub fn run_until_idle(&self, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps && self.run_next() {
            steps += 1;
        }
        steps
    }
}

impl Scheduler for ManualClock {
    fn schedule_once(&self, delay: Duration, task: ScheduledTask) -> TimerHandle {
        let seq = {
            let mut state = lock_state(&self.state);
            let seq = state.next_seq;
            state.next_seq += 1;
            let at_ms = state.now_ms.saturating_add(duration_ms(delay));
            state.queue.push(Due { at_ms, seq });
            state.tasks.insert(seq, task);
            seq
        };
        let weak = Arc::downgrade(&self.state);
        TimerHandle::new(move || {
            if let Some(state) = weak.upgrade() {
                lock_state(&state).tasks.remove(&seq);
            }
        })
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock_state(&self.state);
        f.debug_struct("ManualClock")
            .field("now_ms", &state.now_ms)
            .field("pending", &state.tasks.len())
            .finish()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
