use std::collections::VecDeque;

use rand::seq::index;
use rand::Rng;

/// Fixed-capacity FIFO buffer of training samples. The oldest entry is
/// evicted when a push exceeds the capacity.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> ReplayBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay capacity must be > 0");
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a sample, evicting the oldest when full.
    pub fn push(&mut self, item: T) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(item);
    }

    /// Sample `batch_size` distinct entries uniformly at random.
    pub fn sample<R: Rng>(&self, batch_size: usize, rng: &mut R) -> Vec<T> {
        assert!(batch_size <= self.buffer.len(), "Not enough samples to draw from");
        let indices = index::sample(rng, self.buffer.len(), batch_size);
        indices.iter().map(|i| self.buffer[i].clone()).collect()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_push_and_len() {
        let mut buf = ReplayBuffer::new(10);
        assert!(buf.is_empty());

        buf.push(1);
        assert_eq!(buf.len(), 1);

        for i in 0..9 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn test_keeps_newest_entries() {
        let mut buf = ReplayBuffer::new(100);
        for i in 0..150 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 100);
        let kept: Vec<i32> = buf.iter().copied().collect();
        assert_eq!(kept, (50..150).collect::<Vec<_>>());
    }

    #[test]
    fn test_sample_is_distinct() {
        let mut buf = ReplayBuffer::new(100);
        for i in 0..50 {
            buf.push(i);
        }
        let mut rng = StdRng::seed_from_u64(8);
        let mut batch = buf.sample(10, &mut rng);
        assert_eq!(batch.len(), 10);
        batch.sort();
        batch.dedup();
        assert_eq!(batch.len(), 10);
    }

    #[test]
    #[should_panic(expected = "Not enough samples")]
    fn test_sample_too_many() {
        let mut buf = ReplayBuffer::new(10);
        buf.push(0);
        buf.sample(5, &mut StdRng::seed_from_u64(0));
    }
}
