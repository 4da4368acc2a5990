//! Timeout primitives for Shardgate services.
//!
//! Two independent tools share this crate because every higher layer
//! uses them together:
//!
//! - [`Timeout`] — a per-entity interval tracker for rate limiting
//!   ("has at least N ms passed since the last allowed request?").
//! - [`TimerQueue`] — cancelable one-shot timers for delayed cleanup
//!   (cache eviction, grace-window expiry, deferred session disposal).
//!
//! # Time model
//!
//! Nothing in this crate reads a clock. Every operation takes an
//! explicit `now_ms` (unix epoch milliseconds by convention), and due
//! timers fire only when the owner calls [`TimerQueue::pop_due`]. In
//! production a sweeper task drives the queue with wall-clock time; in
//! tests the caller advances time by passing larger timestamps. Timer
//! events therefore never race with request handlers: both run under
//! the owning service's lock.
//!
//! # Generation checks
//!
//! A scheduled event frequently outlives the state it targets (an
//! account evicted and re-created, a session rebound). The queue stays
//! generic: consumers embed a monotonically increasing instance id in
//! the event payload at schedule time and compare it against the live
//! instance id at fire time. A mismatch means the slot was reused —
//! the fire is a silent no-op, not an error.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

// ---------------------------------------------------------------------------
// TimerHandle
// ---------------------------------------------------------------------------

/// Opaque id for a scheduled timer. `NONE` (0) means "no timer".
///
/// Holders keep the handle in their own state; canceling through
/// [`TimerQueue::cancel`] zeroes it, so at most one live timer can
/// ever be referenced per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// The "no timer scheduled" sentinel.
    pub const NONE: TimerHandle = TimerHandle(0);

    /// Returns `true` if this handle refers to a scheduled timer.
    ///
    /// Note this only tracks whether the handle was ever issued and
    /// not canceled — a timer that already fired also reads as
    /// inactive once the owner clears the field.
    pub fn is_active(self) -> bool {
        self.0 != 0
    }
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::NONE
    }
}

// ---------------------------------------------------------------------------
// TimerQueue
// ---------------------------------------------------------------------------

/// A queue of cancelable one-shot timers carrying event payloads.
///
/// Not thread-safe by itself — it is owned by a single service and
/// accessed under that service's mutex, the same way the rest of the
/// service state is.
pub struct TimerQueue<E> {
    /// Min-heap of `(fire_at_ms, id)`. Canceled ids stay in the heap
    /// and are skipped when they surface; the `events` map is the
    /// source of truth for liveness.
    heap: BinaryHeap<Reverse<(i64, u64)>>,

    /// Live events keyed by timer id. `cancel` removes from here only.
    events: HashMap<u64, E>,

    /// Next timer id. Starts at 1 so 0 stays the NONE sentinel.
    next_id: u64,
}

impl<E> TimerQueue<E> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            events: HashMap::new(),
            next_id: 1,
        }
    }

    /// Schedules `event` to fire once `now_ms >= fire_at_ms`.
    pub fn schedule(&mut self, fire_at_ms: i64, event: E) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse((fire_at_ms, id)));
        self.events.insert(id, event);
        TimerHandle(id)
    }

    /// Cancels a pending timer and zeroes the handle.
    ///
    /// Returns the event if the timer was still pending, `None` if it
    /// already fired, was already canceled, or the handle was `NONE`.
    pub fn cancel(&mut self, handle: &mut TimerHandle) -> Option<E> {
        let id = std::mem::replace(handle, TimerHandle::NONE).0;
        if id == 0 {
            return None;
        }
        self.events.remove(&id)
    }

    /// Removes and returns every event due at `now_ms`, in fire order.
    ///
    /// Canceled entries are skipped silently. Firing an event consumes
    /// it — one-shot semantics.
    pub fn pop_due(&mut self, now_ms: i64) -> Vec<E> {
        let mut due = Vec::new();
        while let Some(Reverse((fire_at, id))) = self.heap.peek().copied() {
            if fire_at > now_ms {
                break;
            }
            self.heap.pop();
            if let Some(event) = self.events.remove(&id) {
                due.push(event);
            }
        }
        due
    }

    /// The earliest pending deadline, or `None` if the queue is empty.
    ///
    /// May report the deadline of a canceled entry that hasn't been
    /// skipped yet; the sweep after that deadline is simply a no-op.
    pub fn next_deadline(&self) -> Option<i64> {
        self.heap.peek().map(|Reverse((at, _))| *at)
    }

    /// Number of pending (not canceled, not fired) timers.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no timers are pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Timeout (interval tracker)
// ---------------------------------------------------------------------------

/// Per-entity minimum-interval tracker.
///
/// Records the earliest timestamp at which the next request is
/// allowed. [`check_interval`](Self::check_interval) is the only
/// mutating check: a rejected request leaves the tracker untouched, so
/// hammering a rate-limited endpoint does not push the window further
/// out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timeout {
    next_allowed_ms: i64,
    interval_ms: i64,
}

impl Timeout {
    /// Creates an idle tracker that allows everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker armed with `interval_ms` whose first check is
    /// allowed immediately. The common shape for rate limiters: the
    /// first request passes and starts the window.
    pub fn with_interval(interval_ms: i64) -> Self {
        Self {
            next_allowed_ms: i64::MIN,
            interval_ms,
        }
    }

    /// The timestamp at which the next request becomes allowed.
    /// Owners use this to prune trackers idle far past their window.
    pub fn next_allowed_ms(&self) -> i64 {
        self.next_allowed_ms
    }

    /// Arms the tracker: the next request is allowed at
    /// `now_ms + interval_ms`, and every allowed request after that
    /// re-arms with the same interval.
    pub fn set_interval(&mut self, now_ms: i64, interval_ms: i64) {
        self.interval_ms = interval_ms;
        self.next_allowed_ms = now_ms + interval_ms;
    }

    /// Returns `true` and re-arms if the request is allowed, `false`
    /// (without mutating) if it arrived inside the minimum interval.
    pub fn check_interval(&mut self, now_ms: i64) -> bool {
        if self.interval_ms == 0 {
            return true;
        }
        if now_ms >= self.next_allowed_ms {
            self.next_allowed_ms = now_ms + self.interval_ms;
            return true;
        }
        false
    }

    /// Disarms the tracker and clears both fields.
    pub fn clear(&mut self) {
        self.next_allowed_ms = 0;
        self.interval_ms = 0;
    }
}

// =========================================================================
// Tests
// =========================================================================
