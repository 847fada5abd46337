use crate::executor::{TaskId, TaskPriority};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;

/// Heap key for one queued task.
///
/// Ordered by priority first, then by id. Ids grow with every enqueue, so
/// among equal priorities the most recently queued task sorts highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub priority: TaskPriority,
    pub id: TaskId,
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Max-heap of `(priority, id)` keys.
///
/// The queue holds keys only. Task bodies live in the pool's task table, and
/// entries whose id has since been cancelled are skipped by the caller when
/// popped.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<QueueEntry>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, id: TaskId, priority: TaskPriority) {
        self.heap.push(QueueEntry { priority, id });
    }

    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.heap.pop()
    }

    /// Drop every entry whose id fails `is_live`.
    pub fn retain_live(&mut self, mut is_live: impl FnMut(TaskId) -> bool) {
        self.heap.retain(|entry| is_live(entry.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> TaskId {
        TaskId::from_raw(raw).unwrap()
    }

    fn drain(queue: &mut PriorityQueue) -> Vec<u64> {
        std::iter::from_fn(|| queue.pop()).map(|e| e.id.get()).collect()
    }

    #[test]
    fn test_priority_queue() {
        let mut queue = PriorityQueue::new();

        queue.push(id(1), TaskPriority::Low);
        queue.push(id(2), TaskPriority::Critical);
        queue.push(id(3), TaskPriority::Normal);

        assert_eq!(queue.pop().map(|e| e.priority), Some(TaskPriority::Critical));
        assert_eq!(queue.pop().map(|e| e.priority), Some(TaskPriority::Normal));
        assert_eq!(queue.pop().map(|e| e.priority), Some(TaskPriority::Low));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_same_priority_pops_newest_first() {
        let mut queue = PriorityQueue::new();

        queue.push(id(1), TaskPriority::High);
        queue.push(id(2), TaskPriority::High);
        queue.push(id(3), TaskPriority::High);

        assert_eq!(drain(&mut queue), vec![3, 2, 1]);
    }

    #[test]
    fn test_priority_beats_recency() {
        let mut queue = PriorityQueue::new();

        queue.push(id(1), TaskPriority::Critical);
        queue.push(id(2), TaskPriority::Lowest);

        assert_eq!(drain(&mut queue), vec![1, 2]);
    }

    #[test]
    fn test_retain_live() {
        let mut queue = PriorityQueue::new();
        for raw in 1..=6 {
            queue.push(id(raw), TaskPriority::Normal);
        }

        queue.retain_live(|id| id.get() % 2 == 0);
        assert_eq!(drain(&mut queue), vec![6, 4, 2]);
    }
}
