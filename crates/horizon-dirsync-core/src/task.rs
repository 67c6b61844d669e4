//! Deferred task queue.
//!
//! Tasks posted here run on the next turn of the event loop, in the order
//! they were posted. Mutation-observer delivery uses this queue the way a
//! browser uses its microtask checkpoint.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// A unique identifier for a deferred task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

type BoxedTask = Box<dyn FnOnce() + Send + 'static>;

struct TaskData {
    id: TaskId,
    task: BoxedTask,
}

/// FIFO of pending deferred tasks.
pub struct TaskQueue {
    tasks: VecDeque<TaskData>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Append a task. Returns an id usable with [`cancel`](Self::cancel).
    pub fn post<F>(&mut self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = next_task_id();
        self.tasks.push_back(TaskData {
            id,
            task: Box::new(task),
        });
        id
    }

    /// Remove a pending task. Returns `true` if it had not run yet.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        if let Some(pos) = self.tasks.iter().position(|t| t.id == id) {
            self.tasks.remove(pos);
            true
        } else {
            false
        }
    }

    /// Number of tasks waiting to run.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Take every pending task, oldest first, leaving the queue empty.
    fn drain(&mut self) -> Vec<TaskData> {
        self.tasks.drain(..).collect()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// A thread-safe wrapper around `TaskQueue` for use from the event loop.
pub(crate) struct SharedTaskQueue {
    inner: Mutex<TaskQueue>,
}

impl SharedTaskQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TaskQueue::new()),
        }
    }

    pub fn post<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.lock().post(task)
    }

    pub fn cancel(&self, id: TaskId) -> bool {
        self.inner.lock().cancel(id)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending_count()
    }

    /// Run every task that was pending when this call started.
    ///
    /// The queue lock is released before any task runs, so tasks may post
    /// further tasks; those run on the next call.
    pub fn process_all(&self) -> usize {
        let batch = self.inner.lock().drain();
        let count = batch.len();
        for task_data in batch {
            tracing::trace!(
                target: "horizon_dirsync_core::task",
                id = task_data.id.as_u64(),
                "running deferred task"
            );
            (task_data.task)();
        }
        count
    }
}

impl Default for SharedTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
