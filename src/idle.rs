// src/idle.rs
//! The idle coroutine installed at slot 0 by [`Scheduler::init`].
//!
//! Applications override it with a registration call — see
//! [`Scheduler::set_idle`](crate::sched::Scheduler::set_idle) — rather than
//! linking in a replacement symbol. The default body installed by `init`
//! does nothing but trace once per turn: it runs on the shared dispatch
//! stack like every other coroutine and must itself return every
//! invocation, since there is no per-task stack to park it on.

use crate::task::Arg;

/// Default idle body. Invoked only when no other slot is `Ready`. Does
/// nothing and returns immediately — the dispatcher already treats a body
/// that falls off its end as "finished a turn, stay `Ready`", so this alone
/// keeps the scheduler live without the coroutine ever suspending.
///
/// Applications running on real hardware should override this with
/// [`Scheduler::set_idle`](crate::sched::Scheduler::set_idle) before calling
/// `run()`, typically to enter a low-power wait until the next tick.
pub fn default_idle(_arg: Arg) {
    log::trace!("idle: no task ready, default idle body ran (override with set_idle)");
}
