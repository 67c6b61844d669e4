//! Core runtime for Horizon DirSync.
//!
//! This crate provides the single-threaded host environment the direction
//! synchronizer runs in:
//!
//! - **Event Loop**: deferred tasks and timed tasks, run to completion one at a time
//! - **Clock**: real or manual time, so timer behavior can be simulated
//! - **Scheduler**: one-shot and repeating timed tasks
//! - **Signals**: typed notifications with connectable slots
//! - **Properties**: value cells with change detection
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use horizon_dirsync_core::{EventLoop, ManualClock, Signal};
//!
//! let event_loop = EventLoop::with_clock(Arc::new(ManualClock::new()));
//! let loaded = Arc::new(Signal::<()>::new());
//! loaded.connect(|_| println!("loaded"));
//!
//! let loaded_clone = loaded.clone();
//! event_loop.schedule_once(Duration::from_millis(500), move || loaded_clone.emit(()));
//! event_loop.run_for(Duration::from_secs(1));
//! ```

mod clock;
mod error;
mod event_loop;
pub mod logging;
pub mod property;
mod scheduler;
pub mod signal;
mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result, SchedulerError};
pub use event_loop::EventLoop;
pub use logging::PerfSpan;
pub use property::Property;
pub use scheduler::{ScheduledTaskId, ScheduledTaskKind, TaskScheduler, MIN_REPEAT_INTERVAL};
pub use signal::{ConnectionId, Signal};
pub use task::{TaskId, TaskQueue};
