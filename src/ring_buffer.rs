//! Fixed-capacity circular buffer used as the storage for every sliding window.

use crate::{utils::safe_cast::usize_to_f64, Error, Result};
use std::num::NonZeroUsize;

/// A 1-D ring buffer holding the last `capacity` appended values.
///
/// Storage is allocated once at construction; [`RingBuffer::reset`] keeps the
/// allocation around.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    // Index of the most recently written slot
    head: usize,
}

impl<T: Copy> RingBuffer<T> {
    /// Create an empty buffer
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if `capacity` is zero
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::ConfigError(
                "RingBuffer capacity must be a positive number".to_string(),
            ));
        }
        Ok(Self {
            data: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        })
    }

    /// Create an empty buffer with a capacity known to be non-zero
    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            data: Vec::with_capacity(capacity.get()),
            capacity: capacity.get(),
            head: 0,
        }
    }

    /// Add a value, overwriting the oldest entry once full
    pub fn append(&mut self, value: T) {
        if self.data.len() < self.capacity {
            self.data.push(value);
            self.head = self.data.len() - 1;
        } else {
            self.head = (self.head + 1) % self.capacity;
            self.data[self.head] = value;
        }
    }

    /// Most recently appended value
    #[must_use]
    pub fn get_head(&self) -> Option<T> {
        self.data.get(self.head).copied()
    }

    /// Oldest retained value
    #[must_use]
    pub fn get_tail(&self) -> Option<T> {
        if self.data.is_empty() {
            None
        } else {
            self.data.get((self.head + 1) % self.data.len()).copied()
        }
    }

    /// All retained values ordered oldest to newest
    #[must_use]
    pub fn get_continuous(&self) -> Vec<T> {
        if self.is_full() {
            let split = self.head + 1;
            let mut out = Vec::with_capacity(self.capacity);
            out.extend_from_slice(&self.data[split..]);
            out.extend_from_slice(&self.data[..split]);
            out
        } else {
            self.data.clone()
        }
    }

    /// Clear to the empty state without changing capacity
    pub fn reset(&mut self) {
        self.data.clear();
        self.head = 0;
    }

    /// Number of values currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }
}

impl RingBuffer<f64> {
    /// Mean of the retained values
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.iter().sum::<f64>() / usize_to_f64(self.data.len()))
    }

    /// Median of the retained values (average of the middle pair for even counts)
    #[must_use]
    pub fn median(&self) -> Option<f64> {
        median_of(&self.data)
    }

    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::min)
    }

    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::max)
    }
}

/// Median of a slice, `None` when empty
#[must_use]
pub fn median_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let len = sorted.len();
    if len % 2 == 0 {
        Some((sorted[len / 2 - 1] + sorted[len / 2]) / 2.0)
    } else {
        Some(sorted[len / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(RingBuffer::<f64>::new(0), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_continuous_order() {
        let mut buffer = RingBuffer::new(4).unwrap();
        for i in 1..=4 {
            buffer.append(f64::from(i));
        }
        assert_eq!(buffer.get_continuous(), vec![1.0, 2.0, 3.0, 4.0]);

        buffer.append(5.0);
        assert_eq!(buffer.get_continuous(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_head_and_tail() {
        let mut buffer = RingBuffer::new(3).unwrap();
        assert_eq!(buffer.get_head(), None);
        assert_eq!(buffer.get_tail(), None);

        buffer.append(1.0);
        assert_eq!(buffer.get_head(), Some(1.0));
        assert_eq!(buffer.get_tail(), Some(1.0));

        buffer.append(2.0);
        assert_eq!(buffer.get_head(), Some(2.0));
        assert_eq!(buffer.get_tail(), Some(1.0));

        buffer.append(3.0);
        buffer.append(4.0);
        assert_eq!(buffer.get_head(), Some(4.0));
        assert_eq!(buffer.get_tail(), Some(2.0));
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut buffer = RingBuffer::new(3).unwrap();
        buffer.append(1.0);
        buffer.append(2.0);
        buffer.reset();

        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 3);
        assert_eq!(buffer.mean(), None);

        buffer.append(7.0);
        assert_eq!(buffer.get_continuous(), vec![7.0]);
    }

    #[test]
    fn test_statistics_partial_window() {
        let mut buffer = RingBuffer::new(10).unwrap();
        for value in [3.0, 1.0, 2.0] {
            buffer.append(value);
        }
        assert_eq!(buffer.mean(), Some(2.0));
        assert_eq!(buffer.median(), Some(2.0));
        assert_eq!(buffer.min(), Some(1.0));
        assert_eq!(buffer.max(), Some(3.0));

        buffer.append(10.0);
        assert_eq!(buffer.median(), Some(2.5));
    }

    proptest! {
        #[test]
        fn prop_keeps_last_values(
            capacity in 1usize..32,
            values in proptest::collection::vec(-1e6f64..1e6, 0..100)
        ) {
            let mut buffer = RingBuffer::new(capacity).unwrap();
            for &value in &values {
                buffer.append(value);
            }
            let keep = values.len().min(capacity);
            prop_assert_eq!(buffer.len(), keep);
            prop_assert_eq!(buffer.get_continuous(), values[values.len() - keep..].to_vec());
        }
    }
}
