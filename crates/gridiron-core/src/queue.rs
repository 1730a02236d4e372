//! The bounded, prioritized learning queue.
//!
//! Learning events drain asynchronously so settlement never blocks on
//! weight updates or memory writes. The queue is bounded; under
//! backpressure it sheds normal-priority events first and never drops
//! high or very-high priority work (catastrophic misses always get
//! learned from).
//!
//! Priority bands: very-high (9) catastrophic misses, high (8)
//! exceptional hits, medium (7) peer broadcasts, normal (5) everything
//! else. Within a band the queue is FIFO.

use std::collections::{BTreeMap, VecDeque};

use gridiron_types::{LearningEvent, QueuePriority};

/// Default queue capacity.
pub const DEFAULT_CAPACITY: usize = 1_024;

/// Outcome of an enqueue attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The event was accepted.
    Accepted,
    /// The event was accepted after shedding a lower-priority event.
    AcceptedAfterShedding,
    /// The event was rejected (queue full of equal-or-higher priority).
    Rejected,
}

/// Bounded priority queue of learning events.
#[derive(Debug)]
pub struct LearningQueue {
    buckets: BTreeMap<QueuePriority, VecDeque<LearningEvent>>,
    capacity: usize,
    dropped: u64,
}

impl LearningQueue {
    /// Create a queue with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: BTreeMap::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Total queued events across all bands.
    pub fn len(&self) -> usize {
        self.buckets.values().map(VecDeque::len).sum()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(VecDeque::is_empty)
    }

    /// Events dropped under backpressure so far.
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Enqueue an event, shedding lower-priority work if full.
    ///
    /// Shedding removes the *oldest* event from the *lowest* non-empty
    /// band strictly below the incoming priority. An incoming event that
    /// cannot displace anything is rejected; high and very-high events
    /// are only ever rejected if the queue is entirely full of equal or
    /// higher priority work.
    pub fn push(&mut self, event: LearningEvent) -> EnqueueOutcome {
        if self.len() < self.capacity {
            self.buckets
                .entry(event.priority)
                .or_default()
                .push_back(event);
            return EnqueueOutcome::Accepted;
        }

        // Full: find the lowest band strictly below the incoming priority.
        let victim_band = self
            .buckets
            .iter()
            .filter(|(priority, bucket)| **priority < event.priority && !bucket.is_empty())
            .map(|(priority, _)| *priority)
            .next();

        match victim_band {
            Some(band) => {
                if let Some(bucket) = self.buckets.get_mut(&band) {
                    let shed = bucket.pop_front();
                    if let Some(shed) = shed {
                        self.dropped = self.dropped.saturating_add(1);
                        tracing::warn!(
                            shed_priority = ?shed.priority,
                            incoming_priority = ?event.priority,
                            "learning queue full; shed lower-priority event"
                        );
                    }
                }
                self.buckets
                    .entry(event.priority)
                    .or_default()
                    .push_back(event);
                EnqueueOutcome::AcceptedAfterShedding
            }
            None => {
                self.dropped = self.dropped.saturating_add(1);
                tracing::warn!(
                    priority = ?event.priority,
                    "learning queue full; event rejected"
                );
                EnqueueOutcome::Rejected
            }
        }
    }

    /// Pop the next event: highest priority first, FIFO within a band.
    pub fn pop(&mut self) -> Option<LearningEvent> {
        let band = self
            .buckets
            .iter()
            .rev()
            .find(|(_, bucket)| !bucket.is_empty())
            .map(|(priority, _)| *priority)?;
        self.buckets.get_mut(&band).and_then(VecDeque::pop_front)
    }
}

impl Default for LearningQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
