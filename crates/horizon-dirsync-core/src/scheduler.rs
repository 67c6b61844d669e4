//! Timed task scheduling.
//!
//! The scheduler keeps one-shot and repeating tasks ordered by their next
//! run time. It never reads the clock itself: callers pass `now` in, which
//! lets the event loop drive it from either a real or a manual clock.
//!
//! Task closures are taken out of the scheduler while they run and put back
//! afterwards, so a running task may schedule, reschedule or cancel tasks
//! (including itself) through the shared scheduler.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Result, SchedulerError};

new_key_type! {
    /// A unique identifier for a scheduled task.
    pub struct ScheduledTaskId;
}

/// Shortest interval a repeating task may use. Anything shorter would make
/// the task due again before the loop could observe any other work.
pub const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

/// The type of scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTaskKind {
    /// Executes once at the scheduled time.
    OneShot,
    /// Executes repeatedly at the specified interval.
    Repeating,
}

type BoxedScheduledTask = Box<dyn FnMut() + Send + 'static>;

struct ScheduledTaskData {
    next_run: Instant,
    interval: Duration,
    kind: ScheduledTaskKind,
    /// `None` while the task is running.
    task: Option<BoxedScheduledTask>,
}

/// An entry in the scheduler queue (min-heap by run time, then insertion).
#[derive(Debug, Clone, Copy)]
struct SchedulerQueueEntry {
    id: ScheduledTaskId,
    run_time: Instant,
    sequence: u64,
}

impl PartialEq for SchedulerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.run_time == other.run_time && self.sequence == other.sequence
    }
}

impl Eq for SchedulerQueueEntry {}

impl PartialOrd for SchedulerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchedulerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap and we want the earliest entry on top.
        other
            .run_time
            .cmp(&self.run_time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// A task that is due and has been checked out of the scheduler.
pub(crate) struct DueTask {
    id: ScheduledTaskId,
    run_time: Instant,
    task: BoxedScheduledTask,
}

/// Priority queue of timed tasks.
pub struct TaskScheduler {
    tasks: SlotMap<ScheduledTaskId, ScheduledTaskData>,
    queue: BinaryHeap<SchedulerQueueEntry>,
    sequence: u64,
}

impl TaskScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            tasks: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            sequence: 0,
        }
    }

    fn push_entry(&mut self, id: ScheduledTaskId, run_time: Instant) {
        self.sequence += 1;
        self.queue.push(SchedulerQueueEntry {
            id,
            run_time,
            sequence: self.sequence,
        });
    }

    fn insert(
        &mut self,
        next_run: Instant,
        interval: Duration,
        kind: ScheduledTaskKind,
        task: BoxedScheduledTask,
    ) -> ScheduledTaskId {
        let id = self.tasks.insert(ScheduledTaskData {
            next_run,
            interval,
            kind,
            task: Some(task),
        });
        self.push_entry(id, next_run);
        id
    }

    /// Schedule a one-shot task to run `delay` after `now`.
    pub fn schedule_once<F>(&mut self, now: Instant, delay: Duration, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.insert(now + delay, delay, ScheduledTaskKind::OneShot, Box::new(task))
    }

    /// Schedule a one-shot task at a specific instant. Instants in the past
    /// are due on the next processing pass.
    pub fn schedule_at<F>(&mut self, instant: Instant, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.insert(
            instant,
            Duration::ZERO,
            ScheduledTaskKind::OneShot,
            Box::new(task),
        )
    }

    /// Schedule a task that first runs `interval` after `now` and then every
    /// `interval`. Intervals shorter than [`MIN_REPEAT_INTERVAL`] are raised
    /// to it.
    pub fn schedule_repeating<F>(
        &mut self,
        now: Instant,
        interval: Duration,
        task: F,
    ) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        let interval = interval.max(MIN_REPEAT_INTERVAL);
        self.insert(
            now + interval,
            interval,
            ScheduledTaskKind::Repeating,
            Box::new(task),
        )
    }

    /// Cancel a task. A task cancelled while running is dropped once it returns.
    pub fn cancel(&mut self, id: ScheduledTaskId) -> Result<()> {
        if self.tasks.remove(id).is_some() {
            Ok(())
        } else {
            Err(SchedulerError::InvalidTaskId.into())
        }
    }

    /// Move a task's next run to `delay` after `now`.
    pub fn reschedule(&mut self, id: ScheduledTaskId, now: Instant, delay: Duration) -> Result<()> {
        let Some(task) = self.tasks.get_mut(id) else {
            return Err(SchedulerError::InvalidTaskId.into());
        };
        task.next_run = now + delay;
        let next_run = task.next_run;
        // The old heap entry becomes stale and is skipped when popped.
        self.push_entry(id, next_run);
        Ok(())
    }

    /// Whether the task is still scheduled (or currently running).
    pub fn is_active(&self, id: ScheduledTaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Number of scheduled tasks.
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    fn is_live(&self, entry: &SchedulerQueueEntry) -> bool {
        self.tasks
            .get(entry.id)
            .is_some_and(|t| t.next_run == entry.run_time && t.task.is_some())
    }

    fn discard_stale(&mut self) {
        while let Some(entry) = self.queue.peek() {
            if self.is_live(entry) {
                break;
            }
            self.queue.pop();
        }
    }

    /// When the earliest scheduled task is due, if any.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.discard_stale();
        self.queue.peek().map(|entry| entry.run_time)
    }

    /// Check out the earliest task that is due at `now`, if any.
    pub(crate) fn take_due(&mut self, now: Instant) -> Option<DueTask> {
        self.discard_stale();
        let entry = *self.queue.peek()?;
        if entry.run_time > now {
            return None;
        }
        self.queue.pop();
        let task = self.tasks.get_mut(entry.id)?.task.take()?;
        Some(DueTask {
            id: entry.id,
            run_time: entry.run_time,
            task,
        })
    }

    /// Return a task after it ran: repeating tasks are re-queued, one-shot
    /// tasks are removed. A task cancelled while it ran is simply dropped.
    pub(crate) fn finish(&mut self, due: DueTask) {
        let Some(data) = self.tasks.get_mut(due.id) else {
            return;
        };
        match data.kind {
            ScheduledTaskKind::OneShot if data.next_run == due.run_time => {
                self.tasks.remove(due.id);
            }
            ScheduledTaskKind::OneShot => {
                // Rescheduled while running: keep it for the new time.
                data.task = Some(due.task);
                let next_run = data.next_run;
                self.push_entry(due.id, next_run);
            }
            ScheduledTaskKind::Repeating => {
                // Advance from the scheduled time so the period does not drift.
                if data.next_run == due.run_time {
                    data.next_run = due.run_time + data.interval;
                }
                data.task = Some(due.task);
                let next_run = data.next_run;
                self.push_entry(due.id, next_run);
            }
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// A thread-safe wrapper around `TaskScheduler` for use from the event loop.
pub(crate) struct SharedTaskScheduler {
    inner: Mutex<TaskScheduler>,
}

impl SharedTaskScheduler {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TaskScheduler::new()),
        }
    }

    pub fn schedule_once<F>(&self, now: Instant, delay: Duration, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.lock().schedule_once(now, delay, task)
    }

    pub fn schedule_at<F>(&self, instant: Instant, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.lock().schedule_at(instant, task)
    }

    pub fn schedule_repeating<F>(&self, now: Instant, interval: Duration, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.lock().schedule_repeating(now, interval, task)
    }

    pub fn cancel(&self, id: ScheduledTaskId) -> Result<()> {
        self.inner.lock().cancel(id)
    }

    pub fn reschedule(&self, id: ScheduledTaskId, now: Instant, delay: Duration) -> Result<()> {
        self.inner.lock().reschedule(id, now, delay)
    }

    pub fn is_active(&self, id: ScheduledTaskId) -> bool {
        self.inner.lock().is_active(id)
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active_count()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner.lock().next_deadline()
    }

    /// Run every task due at `now`, earliest first. The lock is not held
    /// while a task runs.
    #[tracing::instrument(skip(self), target = "horizon_dirsync_core::scheduler", level = "trace")]
    pub fn process_due(&self, now: Instant) -> usize {
        let mut executed = 0;
        loop {
            let Some(mut due) = self.inner.lock().take_due(now) else {
                break;
            };
            tracing::trace!(target: "horizon_dirsync_core::scheduler", id = ?due.id, "executing scheduled task");
            (due.task)();
            executed += 1;
            self.inner.lock().finish(due);
        }
        executed
    }
}

impl Default for SharedTaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}
