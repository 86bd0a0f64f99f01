//! Indirect binary min-heap event queue (§4.1).
//!
//! Supports `push`/`pop`/`update`/`remove`/`peek` in O(log n), is stable
//! under equal times (FIFO via an insertion sequence number), and never
//! reuses event ids within a run.

use fxhash::FxHashMap;

use crate::numeric::{DomainId, EventId, IdGenerator, Time};

#[derive(Clone, Copy, Debug)]
struct HeapKey {
    time: Time,
    sequence: u64,
}

impl PartialEq for HeapKey {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.sequence == other.sequence
    }
}
impl Eq for HeapKey {}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time
            .partial_cmp(&other.time)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

#[derive(Clone, Debug)]
struct HeapEntry {
    key: HeapKey,
    event_id: EventId,
    domain: DomainId,
}

/// A scheduled `(time, domain-id)` event, returned by [`EventQueue::pop`]/[`EventQueue::peek`].
#[derive(Clone, Copy, Debug)]
pub struct Event {
    pub event_id: EventId,
    pub time: Time,
    pub domain: DomainId,
}

/// Indirect min-heap keyed by `(time, insertion sequence)`, with an
/// id-to-heap-index map for O(log n) `update`/`remove`.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: Vec<HeapEntry>,
    index_of: FxHashMap<EventId, usize>,
    id_gen: IdGenerator,
    sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            index_of: FxHashMap::default(),
            id_gen: IdGenerator::new(),
            sequence: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Schedules `domain` to fire at `time`, returning the new event's id.
    pub fn push(&mut self, time: Time, domain: DomainId) -> EventId {
        let event_id = self.id_gen.new_event_id();
        let sequence = self.next_sequence();
        let index = self.heap.len();
        self.heap.push(HeapEntry {
            key: HeapKey { time, sequence },
            event_id,
            domain,
        });
        self.index_of.insert(event_id, index);
        self.sift_up(index);
        event_id
    }

    /// Removes and returns the minimum-time event, or `None` if empty.
    pub fn pop(&mut self) -> Option<Event> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let entry = self.heap.pop().expect("checked non-empty above");
        self.index_of.remove(&entry.event_id);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(Event {
            event_id: entry.event_id,
            time: entry.key.time,
            domain: entry.domain,
        })
    }

    /// Returns the minimum-time event without removing it.
    pub fn peek(&self) -> Option<Event> {
        self.heap.first().map(|e| Event {
            event_id: e.event_id,
            time: e.key.time,
            domain: e.domain,
        })
    }

    /// Reschedules an existing event to `new_time`, preserving its id and domain.
    ///
    /// Panics if `event_id` is not currently scheduled; callers always hold
    /// a valid event id per invariant 2 (§3).
    pub fn update(&mut self, event_id: EventId, new_time: Time) {
        let index = *self
            .index_of
            .get(&event_id)
            .expect("update() called with an unscheduled event id");
        let sequence = self.next_sequence();
        self.heap[index].key = HeapKey {
            time: new_time,
            sequence,
        };
        self.sift_up(index);
        self.sift_down(index);
    }

    /// Removes a scheduled event before it fires (used when bursting).
    pub fn remove(&mut self, event_id: EventId) {
        let index = match self.index_of.get(&event_id) {
            Some(&i) => i,
            None => return,
        };
        let last = self.heap.len() - 1;
        self.swap(index, last);
        self.heap.pop();
        self.index_of.remove(&event_id);
        if index < self.heap.len() {
            self.sift_up(index);
            self.sift_down(index);
        }
    }

    fn next_sequence(&mut self) -> u64 {
        let s = self.sequence;
        self.sequence += 1;
        s
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.index_of.insert(self.heap[a].event_id, a);
        self.index_of.insert(self.heap[b].event_id, b);
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].key < self.heap[parent].key {
                self.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let left = 2 * index + 1;
            let right = 2 * index + 2;
            let mut smallest = index;
            if left < self.heap.len() && self.heap[left].key < self.heap[smallest].key {
                smallest = left;
            }
            if right < self.heap.len() && self.heap[right].key < self.heap[smallest].key {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.swap(index, smallest);
            index = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(raw: u64) -> DomainId {
        DomainId::from_raw(raw)
    }

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.push(3.0, d(0));
        q.push(1.0, d(1));
        q.push(2.0, d(2));
        assert_eq!(q.pop().unwrap().domain, d(1));
        assert_eq!(q.pop().unwrap().domain, d(2));
        assert_eq!(q.pop().unwrap().domain, d(0));
        assert!(q.pop().is_none());
    }

    #[test]
    fn equal_times_are_fifo() {
        let mut q = EventQueue::new();
        q.push(1.0, d(0));
        q.push(1.0, d(1));
        q.push(1.0, d(2));
        assert_eq!(q.pop().unwrap().domain, d(0));
        assert_eq!(q.pop().unwrap().domain, d(1));
        assert_eq!(q.pop().unwrap().domain, d(2));
    }

    #[test]
    fn update_reorders() {
        let mut q = EventQueue::new();
        let e0 = q.push(5.0, d(0));
        q.push(1.0, d(1));
        q.update(e0, 0.0);
        assert_eq!(q.pop().unwrap().domain, d(0));
    }

    #[test]
    fn remove_takes_event_out_of_contention() {
        let mut q = EventQueue::new();
        let e0 = q.push(1.0, d(0));
        q.push(2.0, d(1));
        q.remove(e0);
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop().unwrap().domain, d(1));
    }

    #[test]
    fn stress_matches_sorted_order() {
        let mut q = EventQueue::new();
        let mut times: Vec<Time> = (0..500).map(|i| ((i * 7919) % 1000) as Time).collect();
        for (i, &t) in times.iter().enumerate() {
            q.push(t, d(i as u64));
        }
        times.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut popped = Vec::new();
        while let Some(e) = q.pop() {
            popped.push(e.time);
        }
        assert_eq!(popped, times);
    }
}
