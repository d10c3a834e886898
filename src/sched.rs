// src/sched.rs
//! The scheduler singleton: task table, round-robin dispatcher, and
//! timeout manager.
//!
//! Mirrors the fixed-size, `spin`-guarded run queue this crate is
//! descended from — one process-wide table behind a single lock, never
//! touched from outside the dispatch thread (see the crate-level
//! concurrency notes: this is not safe to call from an interrupt context).

use heapless::Vec;
use spin::Mutex;

use crate::error::SchedError;
use crate::idle;
use crate::task::{Arg, Callback, Task, TaskState};
use crate::tick::{TickSource, Ticks};
use crate::MAX_SLOTS;

/// A stable index into the task table, returned by
/// [`Scheduler::create_task`]. Stays valid for the lifetime of the task
/// (until [`Scheduler::deinit`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Handle(pub(crate) usize);

impl Handle {
    /// The raw slot index this handle addresses.
    pub fn index(self) -> usize {
        self.0
    }
}

struct Inner {
    table: Vec<Task, MAX_SLOTS>,
    /// Slot count: user-requested capacity + 1 for the idle slot.
    capacity: usize,
    /// Next unassigned slot; slots are handed out sequentially and never
    /// reused within one init cycle (see crate docs on handle stability).
    next_free: usize,
    current_id: usize,
    tick_source: Option<TickSource>,
    last_tick: Ticks,
    initialized: bool,
}

impl Inner {
    const fn new() -> Self {
        Inner {
            table: Vec::new(),
            capacity: 0,
            next_free: 1,
            current_id: 0,
            tick_source: None,
            last_tick: Ticks(0),
            initialized: false,
        }
    }
}

static SCHED: Mutex<Inner> = Mutex::new(Inner::new());

/// Marker type carrying the scheduler's associated functions. There is
/// never more than one instance; the table itself lives in a module-private
/// static, matching the "process-wide singleton" framing of the data model.
pub struct Scheduler;

impl Scheduler {
    /// Initializes the scheduler with `capacity` user task slots (plus one
    /// reserved idle slot) and a host-supplied tick source.
    ///
    /// `capacity` must be in `1..=31`. Fails (without side effects) if
    /// already initialized or if `capacity` is out of range.
    pub fn init(capacity: usize, tick_source: TickSource) -> Result<(), SchedError> {
        if !(1..=crate::MAX_TASKS).contains(&capacity) {
            return Err(SchedError::InvalidCapacity);
        }
        let mut inner = SCHED.lock();
        if inner.initialized {
            return Err(SchedError::AlreadyInitialized);
        }

        inner.table.clear();
        for _ in 0..=capacity {
            // Capacity is bounded by MAX_TASKS above, so this always fits
            // within the MAX_SLOTS-sized backing array. Slots are
            // pre-allocated empty here and assigned in place by
            // `create_task`, never pushed onto afterwards.
            let _ = inner.table.push(Task::empty());
        }
        inner.table[0] = Task::assign(idle::default_idle, 0);
        inner.table[0].state = TaskState::Ready;

        inner.capacity = capacity + 1;
        inner.next_free = 1;
        inner.current_id = 0;
        inner.tick_source = Some(tick_source);
        inner.last_tick = Ticks(tick_source());
        inner.initialized = true;

        log::debug!("scheduler initialized: capacity={capacity} (+1 idle)");
        Ok(())
    }

    /// Releases the task table and clears the initialized flag. Idempotent.
    ///
    /// Calling `deinit` while `run()` is executing on the same table is
    /// undefined; in practice the only caller that could do so is the
    /// running coroutine itself, which is responsible for not doing that.
    pub fn deinit() {
        let mut inner = SCHED.lock();
        inner.table.clear();
        inner.capacity = 0;
        inner.next_free = 1;
        inner.current_id = 0;
        inner.tick_source = None;
        inner.initialized = false;
        log::debug!("scheduler deinitialized");
    }

    /// Assigns the next free slot to `callback`/`arg` and returns its
    /// handle. Slots are assigned strictly sequentially within one `init`
    /// cycle; there is no slot reuse (see crate docs on handle stability).
    pub fn create_task(callback: Callback, arg: Arg) -> Result<Handle, SchedError> {
        let mut inner = SCHED.lock();
        if !inner.initialized {
            return Err(SchedError::NotInitialized);
        }
        if inner.next_free >= inner.capacity {
            return Err(SchedError::TableFull);
        }
        let id = inner.next_free;
        inner.table[id] = Task::assign(callback, arg);
        inner.next_free += 1;
        log::trace!("created task at slot {id}");
        Ok(Handle(id))
    }

    /// Registers the idle body invoked at slot 0 when no other slot is
    /// ready. Must be called before `run()`; see [`crate::idle`].
    pub fn set_idle(callback: Callback) -> Result<(), SchedError> {
        let mut inner = SCHED.lock();
        if !inner.initialized {
            return Err(SchedError::NotInitialized);
        }
        inner.table[0].callback = Some(callback);
        Ok(())
    }

    /// Runs the dispatch loop. Never returns in normal operation; returns
    /// `Err(NotInitialized)` immediately if `init` was never called.
    ///
    /// Each pass: advances the timeout manager, selects the next `Ready` (or
    /// `Blocked`, so mutex-contended tasks get a turn to retry their lock)
    /// slot round-robin from `current_id + 1` (skipping slot 0 unless
    /// nothing else is selectable), invokes its callback, and re-arms it to
    /// `Ready` if it returned still `Running` (a body that fell off its end
    /// without suspending).
    pub fn run() -> Result<core::convert::Infallible, SchedError> {
        {
            let inner = SCHED.lock();
            if !inner.initialized {
                return Err(SchedError::NotInitialized);
            }
        }
        loop {
            dispatch_once();
        }
    }

    /// Runs exactly one dispatch pass and returns. A hosted-simulation hook
    /// so an embedder or a test harness can drive the scheduler
    /// deterministically one turn at a time instead of handing it the whole
    /// execution context. `run()` is just this called in a loop.
    pub fn step() -> Result<(), SchedError> {
        {
            let inner = SCHED.lock();
            if !inner.initialized {
                return Err(SchedError::NotInitialized);
            }
        }
        dispatch_once();
        Ok(())
    }
}

/// One dispatch pass: advance the timeout manager, pick the next `Ready`
/// slot, run it, and re-arm it to `Ready` if it fell off its end still
/// `Running`. Shared by `run()`'s infinite loop and `step()`'s single call.
fn dispatch_once() {
    force_all_ready();
    advance_timeouts();
    let id = {
        let mut inner = SCHED.lock();
        let id = pick_next(&inner);
        inner.current_id = id;
        inner.table[id].state = TaskState::Running;
        id
    };
    log::trace!("dispatch: slot {id} -> Running");
    // The callback is invoked with the lock released: a suspension
    // primitive called from inside it (begin/yield/sleep/mutex_lock)
    // re-locks the same mutex to mutate its own slot.
    let (callback, arg) = {
        let inner = SCHED.lock();
        (inner.table[id].callback, inner.table[id].arg)
    };
    if let Some(callback) = callback {
        callback(arg);
    }
    let mut inner = SCHED.lock();
    if inner.table[id].state == TaskState::Running {
        log::trace!("dispatch: slot {id} fell through without suspending, re-armed to Ready");
        inner.table[id].state = TaskState::Ready;
    }
}

/// Forces every `Created` slot to `Ready`, collapsing the vestigial
/// `Created` state into an observable one-time transition. A no-op after
/// the first dispatch pass, since nothing ever transitions a slot back to
/// `Created`; called on every pass rather than gated behind a separate
/// "have we run yet" flag because doing so is equivalent and simpler.
fn force_all_ready() {
    let mut inner = SCHED.lock();
    for (id, task) in inner.table.iter_mut().enumerate() {
        if task.state == TaskState::Created {
            task.state = TaskState::Ready;
            log::trace!("dispatch: slot {id} Created -> Ready");
        }
    }
}

fn pick_next(inner: &Inner) -> usize {
    let capacity = inner.capacity;
    let mut next = (inner.current_id + 1) % capacity;
    for _ in 0..capacity {
        // `Blocked` is selectable alongside `Ready`: a mutex-contended
        // coroutine is re-polled on each subsequent dispatch, retrying
        // `lock` from its own anchor, and that retry is the only wake path
        // it ever gets — if the dispatcher only selected `Ready` slots a
        // `Blocked` task would never run again to attempt it.
        if next != 0
            && matches!(inner.table[next].state, TaskState::Ready | TaskState::Blocked)
        {
            return next;
        }
        next = (next + 1) % capacity;
    }
    0
}

fn advance_timeouts() {
    let mut inner = SCHED.lock();
    let Some(tick_source) = inner.tick_source else {
        return;
    };
    let now = Ticks(tick_source());
    let elapsed = now.elapsed_since(inner.last_tick);
    for (id, task) in inner.table.iter_mut().enumerate() {
        if task.state == TaskState::Waiting {
            if task.timeout > elapsed {
                task.timeout -= elapsed;
            } else {
                task.timeout = 0;
                task.state = TaskState::Ready;
                log::trace!("timeout: slot {id} Waiting -> Ready");
            }
        }
    }
    inner.last_tick = now;
}

// --- crate-private accessors used by the suspension protocol and mutex ---

pub(crate) fn current_id() -> Option<usize> {
    let inner = SCHED.lock();
    if inner.initialized {
        Some(inner.current_id)
    } else {
        None
    }
}

pub(crate) fn with_current<R>(f: impl FnOnce(&mut Task) -> R) -> Option<R> {
    let mut inner = SCHED.lock();
    if !inner.initialized {
        return None;
    }
    let id = inner.current_id;
    Some(f(&mut inner.table[id]))
}

pub(crate) fn with_slot<R>(handle: Handle, f: impl FnOnce(&mut Task) -> R) -> Option<R> {
    let mut inner = SCHED.lock();
    if !inner.initialized || handle.0 >= inner.table.len() {
        return None;
    }
    Some(f(&mut inner.table[handle.0]))
}

/// Every `#[cfg(test)] mod tests` block in this crate shares the one
/// `SCHED` singleton; cargo's default test harness runs `#[test]` functions
/// on multiple threads within the same process, so two tests calling
/// `Scheduler::init`/`deinit` concurrently would race on the same table.
/// Tests take this guard first to serialize themselves against each other;
/// it has nothing to do with the scheduler's own dispatch-thread-only
/// contract (see the crate-level concurrency notes) and is test-only
/// plumbing, not part of the public API.
#[cfg(test)]
pub(crate) fn test_guard() -> std::sync::MutexGuard<'static, ()> {
    static GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());
    GUARD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
