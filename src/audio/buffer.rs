use parking_lot::Mutex;
use std::collections::VecDeque;

/// Bounded sample FIFO between the decoder thread and the output callback.
pub struct AudioBuffer {
    data: Mutex<VecDeque<f32>>,
    capacity: usize,
}

impl AudioBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Copies as many samples as fit and returns how many were taken.
    pub fn push_samples(&self, samples: &[f32]) -> usize {
        let mut data = self.data.lock();
        let to_write = samples.len().min(self.capacity - data.len());
        data.extend(&samples[..to_write]);
        to_write
    }

    pub fn pop_samples(&self, out: &mut [f32]) -> usize {
        let mut data = self.data.lock();
        let to_read = out.len().min(data.len());
        for (slot, sample) in out.iter_mut().zip(data.drain(..to_read)) {
            *slot = sample;
        }
        to_read
    }

    pub fn available_space(&self) -> usize {
        self.capacity - self.data.lock().len()
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    pub fn clear(&self) {
        self.data.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_stops_at_capacity() {
        let buffer = AudioBuffer::new(4);
        assert_eq!(buffer.push_samples(&[0.1, 0.2, 0.3]), 3);
        assert_eq!(buffer.push_samples(&[0.4, 0.5]), 1);
        assert_eq!(buffer.available_space(), 0);
    }

    #[test]
    fn test_pop_is_fifo() {
        let buffer = AudioBuffer::new(8);
        buffer.push_samples(&[1.0, 2.0, 3.0]);

        let mut out = [0.0; 2];
        assert_eq!(buffer.pop_samples(&mut out), 2);
        assert_eq!(out, [1.0, 2.0]);

        let mut out = [0.0; 4];
        assert_eq!(buffer.pop_samples(&mut out), 1);
        assert_eq!(out[0], 3.0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear() {
        let buffer = AudioBuffer::new(8);
        buffer.push_samples(&[1.0; 6]);
        buffer.clear();
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.available_space(), 8);
    }
}
