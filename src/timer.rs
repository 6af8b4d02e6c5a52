//! C2 — timer heap.
//!
//! A min-heap of per-connection deadlines, per spec.md §4.2. `std::collections::BinaryHeap`
//! has no decrease-key/remove operation, so `adjust`/`cancel` use the standard lazy-deletion
//! trick: each push carries a monotonically increasing generation number, a side table
//! tracks the *current* generation per token, and `tick` discards any popped entry whose
//! generation doesn't match the table — it was superseded by a later `adjust` or already
//! canceled. This is the idiomatic Rust shape for a heap-based timer wheel (the same
//! `BinaryHeap<Reverse<_>>` pattern used for discrete-event scheduling elsewhere in the
//! ecosystem) and is behaviorally equivalent to the spec's "sift to restore heap order".

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use mio::Token;

struct Entry {
    deadline: Instant,
    token: Token,
    generation: u64,
}

impl Entry {
    fn key(&self) -> Reverse<(Instant, u64)> {
        Reverse((self.deadline, self.generation))
    }
}

/// Per-connection deadline, keyed by generation so stale heap entries can be ignored.
struct Live {
    deadline: Instant,
    generation: u64,
}

/// Min-heap of `(deadline, fd)` with `add`/`adjust`/`cancel`/`tick`, per spec.md §4.2.
///
/// Contains at most one *live* entry per connection (spec.md §3's timer-entry
/// invariant); stale entries left behind by `adjust` are skipped lazily in `tick`.
#[derive(Default)]
pub struct TimerHeap {
    heap: BinaryHeap<Reverse<(Instant, u64)>>,
    entries: HashMap<u64, Entry>,
    live: HashMap<Token, Live>,
    next_generation: u64,
}

impl TimerHeap {
    /// Creates an empty timer heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `(now + ttl, token)`. Requires `token` not already present.
    pub fn add(&mut self, token: Token, ttl: Duration, now: Instant) {
        debug_assert!(!self.live.contains_key(&token), "token already has a timer");
        let generation = self.next_generation;
        self.next_generation += 1;
        let deadline = now + ttl;

        self.live.insert(token, Live { deadline, generation });
        self.heap.push(Reverse((deadline, generation)));
        self.entries.insert(
            generation,
            Entry {
                deadline,
                token,
                generation,
            },
        );
    }

    /// Sets `token`'s deadline to `now + ttl`. A no-op if `token` has no timer.
    pub fn adjust(&mut self, token: Token, ttl: Duration, now: Instant) {
        let Some(live) = self.live.get_mut(&token) else {
            return;
        };

        let generation = self.next_generation;
        self.next_generation += 1;
        let deadline = now + ttl;

        live.deadline = deadline;
        live.generation = generation;
        self.heap.push(Reverse((deadline, generation)));
        self.entries.insert(
            generation,
            Entry {
                deadline,
                token,
                generation,
            },
        );
    }

    /// Removes `token`'s timer. A no-op if absent (spec.md §8's idempotence property).
    pub fn cancel(&mut self, token: Token) {
        self.live.remove(&token);
        // The heap entry is left in place and filtered out lazily by `tick`.
    }

    /// Pops every entry whose deadline has passed, invoking `on_expire(token)` for each
    /// connection that is still live (not superseded by a later `adjust`, not
    /// canceled), then returns the number of milliseconds until the new earliest
    /// deadline, or `None` if the heap is now empty.
    ///
    /// `on_expire` is expected to close the connection; per spec.md §4.2's tie-break
    /// note, entries that expire in the same tick run in FIFO insertion order.
    pub fn tick(&mut self, now: Instant, mut on_expire: impl FnMut(Token)) -> Option<u64> {
        while let Some(&Reverse((deadline, generation))) = self.heap.peek() {
            if deadline > now {
                break;
            }
            self.heap.pop();
            let Some(entry) = self.entries.remove(&generation) else {
                continue;
            };

            let is_current = self
                .live
                .get(&entry.token)
                .map(|live| live.generation == entry.generation)
                .unwrap_or(false);

            if is_current {
                self.live.remove(&entry.token);
                on_expire(entry.token);
            }
        }

        loop {
            match self.heap.peek() {
                Some(&Reverse((deadline, generation))) => {
                    let is_current = self
                        .entries
                        .get(&generation)
                        .map(|e| {
                            self.live
                                .get(&e.token)
                                .map(|live| live.generation == e.generation)
                                .unwrap_or(false)
                        })
                        .unwrap_or(false);
                    if is_current {
                        let millis = deadline.saturating_duration_since(now).as_millis();
                        return Some(millis.min(u128::from(u64::MAX)) as u64);
                    }
                    self.heap.pop();
                    self.entries.remove(&generation);
                }
                None => return None,
            }
        }
    }

    /// Number of connections currently tracked.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_tick_before_deadline_does_not_expire() {
        let mut heap = TimerHeap::new();
        let now = Instant::now();
        heap.add(Token(1), Duration::from_millis(500), now);

        let mut fired = Vec::new();
        let next = heap.tick(now, |t| fired.push(t));

        assert!(fired.is_empty());
        assert_eq!(1, heap.len());
        assert!(next.unwrap() <= 500);
    }

    #[test]
    fn tick_past_deadline_expires_exactly_once() {
        let mut heap = TimerHeap::new();
        let now = Instant::now();
        heap.add(Token(1), Duration::from_millis(10), now);

        let later = now + Duration::from_millis(20);
        let mut fired = Vec::new();
        let next = heap.tick(later, |t| fired.push(t));

        assert_eq!(vec![Token(1)], fired);
        assert_eq!(None, next);
        assert_eq!(0, heap.len());
    }

    #[test]
    fn adjust_postpones_expiry_and_invalidates_old_entry() {
        let mut heap = TimerHeap::new();
        let now = Instant::now();
        heap.add(Token(1), Duration::from_millis(10), now);
        heap.adjust(Token(1), Duration::from_millis(1000), now);

        let mut fired = Vec::new();
        heap.tick(now + Duration::from_millis(20), |t| fired.push(t));

        assert!(fired.is_empty(), "adjusted deadline should not have expired yet");
        assert_eq!(1, heap.len());
    }

    #[test]
    fn cancel_on_absent_token_is_a_no_op() {
        let mut heap = TimerHeap::new();
        heap.cancel(Token(42));
        assert_eq!(0, heap.len());
    }

    #[test]
    fn cancel_prevents_expiry() {
        let mut heap = TimerHeap::new();
        let now = Instant::now();
        heap.add(Token(1), Duration::from_millis(10), now);
        heap.cancel(Token(1));

        let mut fired = Vec::new();
        let next = heap.tick(now + Duration::from_millis(20), |t| fired.push(t));

        assert!(fired.is_empty());
        assert_eq!(None, next);
    }

    #[test]
    fn same_tick_expiries_run_in_fifo_insertion_order() {
        let mut heap = TimerHeap::new();
        let now = Instant::now();
        heap.add(Token(1), Duration::from_millis(10), now);
        heap.add(Token(2), Duration::from_millis(10), now);
        heap.add(Token(3), Duration::from_millis(10), now);

        let mut fired = Vec::new();
        heap.tick(now + Duration::from_millis(20), |t| fired.push(t));

        assert_eq!(vec![Token(1), Token(2), Token(3)], fired);
    }
}
