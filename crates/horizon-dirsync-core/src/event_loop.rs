//! The single-threaded host event loop.
//!
//! Every callback the direction synchronizer registers (observer
//! deliveries, the sweep timer, deferred reconciles) runs from here, one at a
//! time and to completion. Two kinds of work are queued:
//!
//! - **Deferred tasks** posted with [`EventLoop::post_task`] run on the next
//!   turn, in post order.
//! - **Scheduled tasks** run when their deadline is reached on the loop's
//!   [`Clock`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use horizon_dirsync_core::{EventLoop, ManualClock};
//!
//! let event_loop = EventLoop::with_clock(Arc::new(ManualClock::new()));
//! event_loop.schedule_repeating(Duration::from_secs(1), || println!("tick"));
//!
//! // Runs three ticks without actually waiting.
//! let executed = event_loop.run_for(Duration::from_secs(3));
//! assert_eq!(executed, 3);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::scheduler::{ScheduledTaskId, SharedTaskScheduler};
use crate::task::{SharedTaskQueue, TaskId};

/// The host execution queue.
pub struct EventLoop {
    clock: Arc<dyn Clock>,
    tasks: SharedTaskQueue,
    scheduler: SharedTaskScheduler,
    should_quit: AtomicBool,
}

impl EventLoop {
    /// Create an event loop driven by the real clock.
    pub fn new() -> Arc<Self> {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an event loop driven by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            tasks: SharedTaskQueue::new(),
            scheduler: SharedTaskScheduler::new(),
            should_quit: AtomicBool::new(false),
        })
    }

    /// The loop's current time.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    // -------------------------------------------------------------------------
    // Deferred tasks
    // -------------------------------------------------------------------------

    /// Post a task to run on the next turn of the loop.
    pub fn post_task<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.tasks.post(task)
    }

    /// Cancel a posted task that has not run yet.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        self.tasks.cancel(id)
    }

    /// Number of posted tasks waiting to run.
    pub fn pending_task_count(&self) -> usize {
        self.tasks.pending_count()
    }

    // -------------------------------------------------------------------------
    // Scheduled tasks
    // -------------------------------------------------------------------------

    /// Run `task` once, `delay` from now.
    pub fn schedule_once<F>(&self, delay: Duration, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.scheduler.schedule_once(self.now(), delay, task)
    }

    /// Run `task` once at `instant`.
    pub fn schedule_at<F>(&self, instant: Instant, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.scheduler.schedule_at(instant, task)
    }

    /// Run `task` every `interval`, starting one interval from now.
    pub fn schedule_repeating<F>(&self, interval: Duration, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.scheduler.schedule_repeating(self.now(), interval, task)
    }

    /// Cancel a scheduled task.
    pub fn cancel_scheduled(&self, id: ScheduledTaskId) -> Result<()> {
        self.scheduler.cancel(id)
    }

    /// Push a scheduled task's next run to `delay` from now.
    pub fn reschedule(&self, id: ScheduledTaskId, delay: Duration) -> Result<()> {
        self.scheduler.reschedule(id, self.now(), delay)
    }

    /// Whether a scheduled task is still pending.
    pub fn is_scheduled(&self, id: ScheduledTaskId) -> bool {
        self.scheduler.is_active(id)
    }

    /// Number of scheduled tasks.
    pub fn scheduled_count(&self) -> usize {
        self.scheduler.active_count()
    }

    /// Deadline of the earliest scheduled task, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    // -------------------------------------------------------------------------
    // Running
    // -------------------------------------------------------------------------

    /// Run posted tasks and due scheduled tasks until nothing is ready at the
    /// current time. Returns the number of tasks executed.
    pub fn run_until_idle(&self) -> usize {
        let mut executed = 0;
        loop {
            let ran = self.tasks.process_all() + self.scheduler.process_due(self.now());
            if ran == 0 {
                break;
            }
            executed += ran;
        }
        executed
    }

    /// Run the loop for `duration` of clock time, waiting on the clock
    /// between deadlines. Returns the number of tasks executed.
    ///
    /// Stops early if [`quit`](Self::quit) is called.
    #[tracing::instrument(skip(self), target = "horizon_dirsync_core::event_loop", level = "debug")]
    pub fn run_for(&self, duration: Duration) -> usize {
        let end = self.now() + duration;
        let mut executed = 0;
        loop {
            executed += self.run_until_idle();
            if self.should_quit() || self.now() >= end {
                break;
            }
            let wake = self.next_deadline().map_or(end, |deadline| deadline.min(end));
            self.clock.sleep_until(wake);
        }
        tracing::trace!(target: "horizon_dirsync_core::event_loop", executed, "run_for finished");
        executed
    }

    /// Ask a running [`run_for`](Self::run_for) to return.
    pub fn quit(&self) {
        tracing::debug!(target: "horizon_dirsync_core::event_loop", "quit requested");
        self.should_quit.store(true, Ordering::SeqCst);
    }

    /// Whether [`quit`](Self::quit) has been called.
    pub fn should_quit(&self) -> bool {
        self.should_quit.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("pending_tasks", &self.pending_task_count())
            .field("scheduled_tasks", &self.scheduled_count())
            .field("should_quit", &self.should_quit())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(EventLoop: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use parking_lot::Mutex;

    use super::*;
    use crate::clock::ManualClock;

    fn manual_loop() -> (Arc<ManualClock>, Arc<EventLoop>) {
        let clock = Arc::new(ManualClock::new());
        let event_loop = EventLoop::with_clock(clock.clone());
        (clock, event_loop)
    }

    #[test]
    fn test_run_until_idle_drains_chained_tasks() {
        let (_, event_loop) = manual_loop();
        let order = Arc::new(Mutex::new(Vec::new()));

        let loop_clone = event_loop.clone();
        let order_clone = order.clone();
        event_loop.post_task(move || {
            order_clone.lock().push(1);
            let order_inner = order_clone.clone();
            loop_clone.post_task(move || order_inner.lock().push(2));
        });

        assert_eq!(event_loop.run_until_idle(), 2);
        assert_eq!(*order.lock(), vec![1, 2]);
        assert_eq!(event_loop.pending_task_count(), 0);
    }

    #[test]
    fn test_run_for_manual_clock_does_not_sleep() {
        let (clock, event_loop) = manual_loop();
        let start = clock.now();
        let ticks = Arc::new(AtomicUsize::new(0));

        let ticks_clone = ticks.clone();
        event_loop.schedule_repeating(Duration::from_secs(1), move || {
            ticks_clone.fetch_add(1, Ordering::SeqCst);
        });

        let real_start = Instant::now();
        event_loop.run_for(Duration::from_secs(60));
        assert!(real_start.elapsed() < Duration::from_secs(5));

        assert_eq!(ticks.load(Ordering::SeqCst), 60);
        assert_eq!(clock.now() - start, Duration::from_secs(60));
    }

    #[test]
    fn test_one_shot_fires_after_delay_only() {
        let (_, event_loop) = manual_loop();
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_clone = fired.clone();
        let id = event_loop.schedule_once(Duration::from_millis(500), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        event_loop.run_for(Duration::from_millis(499));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(event_loop.is_scheduled(id));

        event_loop.run_for(Duration::from_millis(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!event_loop.is_scheduled(id));
    }

    #[test]
    fn test_cancel_scheduled() {
        let (_, event_loop) = manual_loop();
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_clone = fired.clone();
        let id = event_loop.schedule_repeating(Duration::from_millis(100), move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        event_loop.run_for(Duration::from_millis(250));
        event_loop.cancel_scheduled(id).unwrap();
        event_loop.run_for(Duration::from_secs(1));

        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert!(event_loop.cancel_scheduled(id).is_err());
    }

    #[test]
    fn test_quit_stops_run_for() {
        let (clock, event_loop) = manual_loop();
        let start = clock.now();

        let loop_clone = event_loop.clone();
        event_loop.schedule_once(Duration::from_secs(2), move || loop_clone.quit());

        event_loop.run_for(Duration::from_secs(10));
        assert!(event_loop.should_quit());
        assert_eq!(clock.now() - start, Duration::from_secs(2));
    }

    #[test]
    fn test_posted_task_from_timer_runs_same_turn() {
        let (_, event_loop) = manual_loop();
        let order = Arc::new(Mutex::new(Vec::new()));

        let loop_clone = event_loop.clone();
        let order_clone = order.clone();
        event_loop.schedule_once(Duration::from_millis(10), move || {
            order_clone.lock().push("timer");
            let order_inner = order_clone.clone();
            loop_clone.post_task(move || order_inner.lock().push("posted"));
        });

        event_loop.run_for(Duration::from_millis(10));
        assert_eq!(*order.lock(), vec!["timer", "posted"]);
    }
}
