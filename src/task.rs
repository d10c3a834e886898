// src/task.rs
//! Per-task record: the coroutine's state, resume anchor, timeout, and the
//! user callback + opaque argument the dispatcher invokes it with.

/// Opaque, pointer-sized datum handed back to the callback unmodified.
/// Applications that need to pass a pointer cast it to `usize` themselves
/// (this crate never allocates and never dereferences it).
pub type Arg = usize;

/// A coroutine body. Invoked by the dispatcher with the `arg` supplied at
/// [`create_task`](crate::sched::Scheduler::create_task) time; it must
/// consult [`suspend::begin`](crate::suspend::begin) as its first act and
/// jump to the returned anchor (see the crate-level suspension protocol
/// docs in [`crate::suspend`]).
pub type Callback = fn(Arg);

/// The eight states a coroutine record can occupy. See invariant 1 in the
/// crate docs: exactly one slot is `Running` at any instant outside a
/// callback invocation no slot is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Slot has never held a task (or was never assigned by `create_task`).
    None,
    /// Assigned by `create_task`, not yet forced to `Ready` by the first
    /// `run()` pass. Kept as a distinct observable state rather than folded
    /// into `Ready`.
    Created,
    Ready,
    Running,
    /// Blocked on mutex contention; woken only by the coroutine's own retry
    /// of `mutex_lock` at its next dispatch (see [`crate::mutex`]).
    Blocked,
    /// Sleeping; the timeout manager advances `timeout` toward zero and
    /// flips the state to `Ready` once it reaches zero.
    Waiting,
    /// Paused by an external `suspend` call; woken only by `resume`.
    Suspended,
    /// Terminal. A body that falls off its end without a prior suspension
    /// call is re-armed to `Ready` by the dispatcher instead (see
    /// [`crate::sched`]); nothing in this crate transitions a task to
    /// `Terminated` on its own.
    Terminated,
}

/// Tracks whether a coroutine's next `begin()` call should record a fresh
/// anchor or return the one already on record.
///
/// Owned entirely by [`crate::suspend::begin`] and the suspension
/// primitives that set it to `Abort` ([`crate::suspend::yield_now`],
/// `suspend`, [`crate::mutex::CoMutex::lock`] on contention) — the
/// dispatcher never touches it. A task starts `Normal` and flips to `Abort`
/// the moment its body first suspends; it stays `Abort` for the rest of its
/// life, since every suspension point after the first is itself a
/// re-entry. Resetting this field to `Normal` before every dispatch would
/// make `begin()` treat every invocation as a fresh entry and silently
/// break resumption for any body with more than one suspension point, so
/// the dispatcher deliberately never does that (see DESIGN.md).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SwitchState {
    /// No suspension has been recorded yet; the next `begin()` call records
    /// `start_label` as the resume anchor.
    Normal,
    /// The body has suspended at least once; the next `begin()` call
    /// returns the anchor already on record instead of overwriting it.
    Abort,
}

/// One task table slot.
#[derive(Copy, Clone)]
pub(crate) struct Task {
    pub(crate) callback: Option<Callback>,
    pub(crate) arg: Arg,
    pub(crate) resume_anchor: Option<u32>,
    pub(crate) state: TaskState,
    pub(crate) switch_state: SwitchState,
    pub(crate) timeout: u32,
}

impl Task {
    pub(crate) const fn empty() -> Self {
        Task {
            callback: None,
            arg: 0,
            resume_anchor: None,
            state: TaskState::None,
            switch_state: SwitchState::Normal,
            timeout: 0,
        }
    }

    pub(crate) fn assign(callback: Callback, arg: Arg) -> Self {
        Task {
            callback: Some(callback),
            arg,
            resume_anchor: None,
            state: TaskState::Created,
            switch_state: SwitchState::Normal,
            timeout: 0,
        }
    }
}
