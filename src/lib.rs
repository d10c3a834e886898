//! A single-threaded cooperative task scheduler for resource-constrained
//! targets (microcontrollers, bare-metal firmware).
//!
//! Applications express logically-concurrent activities as straight-line
//! "coroutine" bodies that voluntarily yield at well-defined suspension
//! points (see [`suspend`]); a central [`Scheduler`](sched::Scheduler)
//! multiplexes them onto one stack, driven by a host-supplied millisecond
//! tick (see [`tick`]).
//!
//! This crate does not preempt, does not allocate, and does not touch
//! hardware. The host supplies a tick source and, optionally, an idle body;
//! everything else lives in the fixed-capacity task table.
#![cfg_attr(not(test), no_std)]

pub mod error;
pub mod idle;
pub mod mutex;
pub mod sched;
pub mod suspend;
pub mod task;
pub mod tick;

pub use error::SchedError;
pub use mutex::CoMutex;
pub use sched::{Handle, Scheduler};
pub use task::{Arg, Callback, SwitchState, TaskState};
pub use tick::{TickSource, Ticks};

/// Maximum number of user-created coroutines a single [`Scheduler`] can
/// hold, not counting the reserved idle slot at index 0.
pub const MAX_TASKS: usize = 31;

/// Total slot count of a scheduler at maximum capacity (`MAX_TASKS` user
/// tasks plus the idle task).
pub const MAX_SLOTS: usize = MAX_TASKS + 1;
