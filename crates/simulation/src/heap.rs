//! Binary min-heap keyed by a caller-supplied scoring function.
//!
//! The pathfinder's open set. Scores are computed once at insertion, so an
//! entry's priority is fixed after `push`; re-ranking a node means pushing a
//! fresh entry and skipping the stale one on pop.

use std::cmp::Ordering;

pub struct MinHeap<T, F>
where
    F: Fn(&T) -> f32,
{
    entries: Vec<(f32, T)>,
    score: F,
}

impl<T, F> MinHeap<T, F>
where
    F: Fn(&T) -> f32,
{
    pub fn new(score: F) -> Self {
        Self {
            entries: Vec::new(),
            score,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, item: T) {
        let key = (self.score)(&item);
        self.entries.push((key, item));
        self.sift_up(self.entries.len() - 1);
    }

    /// Removes and returns the lowest-scored item.
    pub fn pop(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.entries.swap(0, last);
        let (_, item) = self.entries.pop()?;
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(item)
    }

    pub fn peek(&self) -> Option<&T> {
        self.entries.first().map(|(_, item)| item)
    }

    /// Iterates remaining items in arbitrary (heap) order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, item)| item)
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.entries[a]
            .0
            .partial_cmp(&self.entries[b].0)
            .unwrap_or(Ordering::Equal)
            == Ordering::Less
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.less(idx, parent) {
                break;
            }
            self.entries.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.entries.len();
        loop {
            let left = idx * 2 + 1;
            let right = left + 1;
            let mut smallest = idx;
            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == idx {
                break;
            }
            self.entries.swap(idx, smallest);
            idx = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_pop_returns_minimum_first() {
        let mut heap = MinHeap::new(|v: &f32| *v);
        for v in [5.0, 1.0, 4.0, 2.0, 3.0] {
            heap.push(v);
        }
        let drained: Vec<f32> = std::iter::from_fn(|| heap.pop()).collect();
        assert_eq!(drained, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_heap_invariant_random_sequences() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let mut heap = MinHeap::new(|v: &f32| *v);
            let n = rng.gen_range(1..200);
            let mut values: Vec<f32> = (0..n).map(|_| rng.gen_range(0.0..1000.0)).collect();
            for &v in &values {
                heap.push(v);
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let drained: Vec<f32> = std::iter::from_fn(|| heap.pop()).collect();
            assert_eq!(drained, values);
        }
    }

    #[test]
    fn test_interleaved_push_pop() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut heap = MinHeap::new(|v: &u32| *v as f32);
        let mut last_popped = 0u32;
        for round in 0..100 {
            for _ in 0..3 {
                // Keep pushed values >= the last popped so the ordering check
                // below stays meaningful under interleaving.
                heap.push(last_popped + rng.gen_range(0..50));
            }
            if round % 2 == 0 {
                if let Some(v) = heap.pop() {
                    assert!(v >= last_popped);
                    last_popped = v;
                }
            }
        }
    }

    #[test]
    fn test_scoring_function_drives_order() {
        // Max-heap behavior by negating the score.
        let mut heap = MinHeap::new(|v: &f32| -*v);
        for v in [1.0, 3.0, 2.0] {
            heap.push(v);
        }
        assert_eq!(heap.pop(), Some(3.0));
        assert_eq!(heap.pop(), Some(2.0));
        assert_eq!(heap.pop(), Some(1.0));
    }

    #[test]
    fn test_peek_and_len() {
        let mut heap = MinHeap::new(|v: &f32| *v);
        assert!(heap.is_empty());
        heap.push(2.0);
        heap.push(1.0);
        assert_eq!(heap.peek(), Some(&1.0));
        assert_eq!(heap.len(), 2);
    }
}
