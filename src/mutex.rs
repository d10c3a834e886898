// src/mutex.rs
//! A mutex that serializes critical sections across cooperative coroutines
//! without ever blocking the CPU — contention is resolved by transitioning
//! the caller to `Blocked` and returning control to the dispatcher, not by
//! spinning.
//!
//! This offers no protection against concurrent hardware activity (DMA, an
//! ISR); it only orders access between coroutines sharing this one
//! execution context. See the crate-level concurrency notes.

use crate::sched;
use crate::task::TaskState;

/// A 32-bit interest bitmap; bit `i` set means coroutine `i` holds or is
/// contending for the resource. Zero means free. Bit width matches the
/// crate's 31-user-task limit (`current_id` never exceeds 31).
#[derive(Debug, Default)]
pub struct CoMutex(u32);

impl CoMutex {
    /// A free mutex.
    pub const fn new() -> Self {
        CoMutex(0)
    }

    /// Non-blocking lock attempt. If free, sets the caller's bit and
    /// returns `true` — the caller holds the mutex and may enter its
    /// critical section immediately, no suspension needed.
    ///
    /// If held, transitions the caller to `Blocked` (recording `anchor` as
    /// where to resume, the same way the caller supplies anchors to
    /// [`crate::suspend::yield_now`]) and returns `false`; the body must
    /// then return immediately and retry `lock` from the same anchor on its
    /// next dispatch.
    pub fn lock(&mut self, anchor: u32) -> bool {
        let Some(id) = sched::current_id() else {
            return false;
        };
        if self.0 == 0 {
            self.0 |= 1 << id;
            log::trace!("mutex: slot {id} acquired an uncontended lock");
            true
        } else {
            log::trace!("mutex: slot {id} blocked on a held lock, retry anchor {anchor}");
            sched::with_current(|t| {
                t.resume_anchor = Some(anchor);
                t.state = TaskState::Blocked;
                t.timeout = 0;
                t.switch_state = crate::task::SwitchState::Abort;
            });
            false
        }
    }

    /// Clears the caller's bit. Any coroutine blocked on this mutex wakes
    /// only by retrying `lock` itself at its next dispatch — there is no
    /// eager wake path (see the crate's open design questions); no
    /// fairness between contenders is guaranteed.
    pub fn unlock(&mut self) {
        if let Some(id) = sched::current_id() {
            self.0 &= !(1 << id);
            log::trace!("mutex: slot {id} released its lock");
        }
    }

    /// `true` if no coroutine currently holds this mutex.
    pub fn is_free(&self) -> bool {
        self.0 == 0
    }
}
