//! A timer wheel driving per-connection idle timeouts.
//!
//! `mio` has no per-connection timer primitive of its own; the event loop instead computes
//! the next deadline across all connections and passes it as `poll`'s timeout argument, then
//! drains whatever expired once `poll` returns. Expired-but-superseded entries (a connection
//! whose timer was reset after it was scheduled) are filtered out with a per-token
//! generation counter rather than by searching and removing from the heap.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    time::Instant,
};

use mio::Token;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    deadline: Instant,
    token: usize,
    generation: u64,
}

/// A min-heap of pending deadlines keyed by connection token.
#[derive(Debug, Default)]
pub struct TimerWheel {
    heap: BinaryHeap<Reverse<Entry>>,
    generation: HashMap<usize, u64>,
}

impl TimerWheel {
    /// Creates an empty wheel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules (or reschedules) `token` to expire at `deadline`, invalidating any
    /// previously scheduled deadline for the same token.
    pub fn schedule(&mut self, token: Token, deadline: Instant) {
        let generation = self.generation.entry(token.0).or_insert(0);
        *generation += 1;
        self.heap.push(Reverse(Entry {
            deadline,
            token: token.0,
            generation: *generation,
        }));
    }

    /// Removes `token` from the wheel. Any already-queued heap entry for it becomes stale
    /// and is discarded the next time it is popped.
    pub fn cancel(&mut self, token: Token) {
        *self.generation.entry(token.0).or_insert(0) += 1;
    }

    /// The next deadline due, if any live entry remains.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(e)| e.deadline)
    }

    /// Removes and returns every token whose deadline is at or before `now`, skipping any
    /// entry superseded by a later `schedule` call.
    pub fn pop_expired(&mut self, now: Instant) -> Vec<Token> {
        let mut expired = Vec::new();

        while let Some(Reverse(entry)) = self.heap.peek() {
            if entry.deadline > now {
                break;
            }

            let Reverse(entry) = self.heap.pop().expect("just peeked");
            if self.generation.get(&entry.token) == Some(&entry.generation) {
                expired.push(Token(entry.token));
            }
        }

        expired
    }
}
