//! Pending sync points, kept in a binary min-heap over a `Vec`.
//!
//! `std::collections::BinaryHeap` cannot remove an element that is not at
//! the top, so the heap is maintained by hand. Push and pop are O(log n);
//! cancelling a specific point is a linear scan followed by one sift.

use crate::{DeviceId, EmuTime};

/// A registered "call me back at this instant".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SyncPoint {
    pub(crate) time: EmuTime,
    pub(crate) device: DeviceId,
    pub(crate) tag: u32,
    /// Registration order. Breaks ties between equal times.
    seq: u64,
}

impl SyncPoint {
    pub(crate) fn new(time: EmuTime, device: DeviceId, tag: u32, seq: u64) -> Self {
        Self {
            time,
            device,
            tag,
            seq,
        }
    }

    fn key(&self) -> (EmuTime, u64) {
        (self.time, self.seq)
    }
}

#[derive(Debug, Default)]
pub(crate) struct SyncPointQueue {
    heap: Vec<SyncPoint>,
}

impl SyncPointQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The earliest point; among equal times, the first registered.
    pub(crate) fn front(&self) -> Option<&SyncPoint> {
        self.heap.first()
    }

    /// Time of the earliest point, or [`EmuTime::INFINITY`] when empty.
    pub(crate) fn front_time(&self) -> EmuTime {
        self.front().map_or(EmuTime::INFINITY, |sp| sp.time)
    }

    pub(crate) fn push(&mut self, point: SyncPoint) {
        self.heap.push(point);
        let last = self.heap.len() - 1;
        self.sift_up(last);
    }

    pub(crate) fn pop(&mut self) -> Option<SyncPoint> {
        if self.heap.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    pub(crate) fn contains(&self, pred: impl Fn(&SyncPoint) -> bool) -> bool {
        self.heap.iter().any(pred)
    }

    /// Remove one point matching `pred`. Which one is unspecified when
    /// several match.
    pub(crate) fn remove_first(&mut self, pred: impl Fn(&SyncPoint) -> bool) -> Option<SyncPoint> {
        let idx = self.heap.iter().position(pred)?;
        Some(self.remove_at(idx))
    }

    /// Remove every point matching `pred`, returning how many went.
    pub(crate) fn remove_all(&mut self, pred: impl Fn(&SyncPoint) -> bool) -> usize {
        let before = self.heap.len();
        self.heap.retain(|sp| !pred(sp));
        let removed = before - self.heap.len();
        if removed > 0 {
            self.heapify();
        }
        removed
    }

    fn remove_at(&mut self, idx: usize) -> SyncPoint {
        let point = self.heap.swap_remove(idx);
        if idx < self.heap.len() {
            // The former last element now sits at idx and may belong
            // either above or below it.
            let idx = self.sift_up(idx);
            self.sift_down(idx);
        }
        point
    }

    fn sift_up(&mut self, mut idx: usize) -> usize {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.heap[idx].key() >= self.heap[parent].key() {
                break;
            }
            self.heap.swap(idx, parent);
            idx = parent;
        }
        idx
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * idx + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.heap[right].key() < self.heap[left].key() {
                right
            } else {
                left
            };
            if self.heap[child].key() >= self.heap[idx].key() {
                break;
            }
            self.heap.swap(idx, child);
            idx = child;
        }
    }

    fn heapify(&mut self) {
        for idx in (0..self.heap.len() / 2).rev() {
            self.sift_down(idx);
        }
    }

    #[cfg(test)]
    fn is_heap(&self) -> bool {
        (1..self.heap.len()).all(|i| self.heap[(i - 1) / 2].key() <= self.heap[i].key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(index: u32) -> DeviceId {
        DeviceId::new(index, 0)
    }

    fn queue_with(points: &[(u64, u32, u32)]) -> SyncPointQueue {
        let mut queue = SyncPointQueue::new();
        for (seq, &(time, device, tag)) in points.iter().enumerate() {
            queue.push(SyncPoint::new(
                EmuTime::from_ticks(time),
                dev(device),
                tag,
                seq as u64,
            ));
        }
        queue
    }

    fn drain(queue: &mut SyncPointQueue) -> Vec<(u64, u32, u32)> {
        std::iter::from_fn(|| queue.pop())
            .map(|sp| (sp.time.ticks(), sp.device.index(), sp.tag))
            .collect()
    }

    #[test]
    fn pops_in_time_order() {
        let mut queue = queue_with(&[(50, 0, 0), (10, 1, 0), (30, 2, 0), (20, 3, 0), (40, 4, 0)]);
        assert_eq!(queue.front_time(), EmuTime::from_ticks(10));
        let times: Vec<u64> = drain(&mut queue).iter().map(|p| p.0).collect();
        assert_eq!(times, vec![10, 20, 30, 40, 50]);
        assert_eq!(queue.front_time(), EmuTime::INFINITY);
    }

    #[test]
    fn equal_times_pop_in_registration_order() {
        let mut queue = queue_with(&[(10, 0, 0), (10, 1, 0), (5, 9, 0), (10, 2, 0), (10, 3, 0)]);
        assert_eq!(
            drain(&mut queue),
            vec![(5, 9, 0), (10, 0, 0), (10, 1, 0), (10, 2, 0), (10, 3, 0)]
        );
    }

    #[test]
    fn interior_removal_keeps_heap_and_tie_order() {
        let mut queue = queue_with(&[
            (10, 0, 0),
            (10, 1, 0),
            (10, 2, 0),
            (20, 3, 0),
            (10, 4, 0),
            (15, 5, 0),
            (10, 6, 0),
        ]);
        let removed = queue.remove_first(|sp| sp.device == dev(2));
        assert_eq!(removed.map(|sp| sp.device), Some(dev(2)));
        assert!(queue.is_heap());
        let order: Vec<u32> = drain(&mut queue).iter().map(|p| p.1).collect();
        assert_eq!(order, vec![0, 1, 4, 6, 5, 3]);
    }

    #[test]
    fn remove_first_takes_exactly_one() {
        let mut queue = queue_with(&[(10, 0, 7), (20, 0, 7), (30, 0, 8)]);
        assert!(queue.remove_first(|sp| sp.tag == 7).is_some());
        assert_eq!(queue.len(), 2);
        assert!(queue.contains(|sp| sp.tag == 7));
        assert!(queue.remove_first(|sp| sp.tag == 9).is_none());
    }

    #[test]
    fn remove_all_rebuilds_heap() {
        let mut queue = queue_with(&[
            (60, 0, 0),
            (10, 1, 0),
            (50, 0, 0),
            (20, 1, 0),
            (40, 0, 0),
            (30, 1, 0),
        ]);
        assert_eq!(queue.remove_all(|sp| sp.device == dev(1)), 3);
        assert!(queue.is_heap());
        let times: Vec<u64> = drain(&mut queue).iter().map(|p| p.0).collect();
        assert_eq!(times, vec![40, 50, 60]);
    }

    #[test]
    fn pop_on_empty_is_none() {
        let mut queue = SyncPointQueue::new();
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }
}
