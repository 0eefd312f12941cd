//! Priority queue ordered by tier, then insertion order.

use crate::job::JobPriority;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug)]
struct QueueEntry<T> {
    priority: JobPriority,
    seq: u64,
    item: T,
}

impl<T> QueueEntry<T> {
    fn key(&self) -> (JobPriority, Reverse<u64>) {
        (self.priority, Reverse(self.seq))
    }
}

impl<T> PartialEq for QueueEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for QueueEntry<T> {}

impl<T> PartialOrd for QueueEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueueEntry<T> {
    // Max-heap: higher tier first, then the lower sequence number (FIFO).
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Unbounded priority queue.
///
/// `High` items leave before `Normal`, `Normal` before `Low`; within a tier
/// items leave in the order they were pushed. Sequence numbers are assigned
/// by the queue and never reused, so an item pushed again goes to the back of
/// its tier.
#[derive(Debug)]
pub struct PriorityQueue<T> {
    heap: BinaryHeap<QueueEntry<T>>,
    next_seq: u64,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Append an item; returns the sequence number it was given.
    pub fn enqueue(&mut self, priority: JobPriority, item: T) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueueEntry {
            priority,
            seq,
            item,
        });
        seq
    }

    /// Remove the highest-priority, oldest item.
    pub fn dequeue_next(&mut self) -> Option<T> {
        self.heap.pop().map(|entry| entry.item)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain<T>(queue: &mut PriorityQueue<T>) -> Vec<T> {
        std::iter::from_fn(|| queue.dequeue_next()).collect()
    }

    #[test]
    fn test_high_before_normal() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(JobPriority::Normal, "normal");
        queue.enqueue(JobPriority::High, "high");

        assert_eq!(drain(&mut queue), vec!["high", "normal"]);
    }

    #[test]
    fn test_fifo_within_tier() {
        let mut queue = PriorityQueue::new();
        for n in 0..100 {
            queue.enqueue(JobPriority::Normal, n);
        }

        assert_eq!(drain(&mut queue), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_mixed_tiers() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(JobPriority::Low, "low-1");
        queue.enqueue(JobPriority::Normal, "normal-1");
        queue.enqueue(JobPriority::High, "high-1");
        queue.enqueue(JobPriority::Low, "low-2");
        queue.enqueue(JobPriority::High, "high-2");
        queue.enqueue(JobPriority::Normal, "normal-2");

        assert_eq!(
            drain(&mut queue),
            vec!["high-1", "high-2", "normal-1", "normal-2", "low-1", "low-2"]
        );
    }

    #[test]
    fn test_reinserted_item_goes_to_back_of_tier() {
        let mut queue = PriorityQueue::new();
        let first = queue.enqueue(JobPriority::Normal, "a");
        queue.enqueue(JobPriority::Normal, "b");

        let popped = queue.dequeue_next().unwrap();
        let again = queue.enqueue(JobPriority::Normal, popped);

        assert!(again > first);
        assert_eq!(drain(&mut queue), vec!["b", "a"]);
    }

    #[test]
    fn test_empty_queue() {
        let mut queue: PriorityQueue<u32> = PriorityQueue::default();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.dequeue_next(), None);
    }
}
