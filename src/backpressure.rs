use crate::buffer::RingBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Watermark-based flow control.
///
/// When downstream buffer utilization exceeds the high watermark the
/// producer pauses; it resumes, from exactly where it stopped, once
/// utilization falls below the low watermark.
pub struct BackpressureController {
    /// Threshold at which backpressure is triggered (percentage)
    high_watermark: u32,
    /// Threshold at which backpressure is released (percentage)
    low_watermark: u32,
    /// Whether backpressure is currently active
    is_active: Arc<AtomicBool>,
}

impl BackpressureController {
    /// Create a new backpressure controller
    /// Default: high=80%, low=40%
    pub fn new() -> Self {
        Self::with_watermarks(80, 40)
    }

    /// Set custom watermark thresholds
    pub fn with_watermarks(high: u32, low: u32) -> Self {
        Self {
            high_watermark: high.min(100),
            low_watermark: low.min(100),
            is_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check the buffer and update backpressure state
    /// Returns true if backpressure is now active
    pub fn check_and_update<T>(&self, buffer: &RingBuffer<T>) -> bool {
        let utilization = buffer.utilization();
        let was_active = self.is_active.load(Ordering::Relaxed);

        let is_now_active = if was_active {
            // Already under backpressure, check if we should release
            utilization > self.low_watermark
        } else {
            // Not under backpressure, check if we should activate
            utilization >= self.high_watermark
        };

        if is_now_active != was_active {
            self.is_active.store(is_now_active, Ordering::Relaxed);
        }

        is_now_active
    }

    /// Block until backpressure is released, re-sampling the buffer as it
    /// drains. Exponential backoff with a cap.
    pub fn throttle<T>(&self, buffer: &RingBuffer<T>) {
        let mut iteration = 0u32;
        while self.check_and_update(buffer) {
            let backoff_micros = (1u64 << iteration.min(10)).min(1000);
            thread::sleep(Duration::from_micros(backoff_micros));
            iteration += 1;
        }
    }

    /// Get whether backpressure is currently active
    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }

    /// Reset the backpressure state
    pub fn reset(&self) {
        self.is_active.store(false, Ordering::Relaxed);
    }
}

impl Default for BackpressureController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backpressure_activation() {
        let controller = BackpressureController::with_watermarks(80, 40);
        let buffer = RingBuffer::new(10);

        // Fill buffer to 90%
        for i in 0..9 {
            buffer.push(i);
        }

        assert!(controller.check_and_update(&buffer));
        assert!(controller.is_active());
    }

    #[test]
    fn test_backpressure_release() {
        let controller = BackpressureController::with_watermarks(80, 40);
        let buffer = RingBuffer::new(10);

        // Activate backpressure
        for i in 0..9 {
            buffer.push(i);
        }
        assert!(controller.check_and_update(&buffer));

        // Drain buffer
        while buffer.pop().is_some() {}

        // Should release
        assert!(!controller.check_and_update(&buffer));
        assert!(!controller.is_active());
    }

    #[test]
    fn test_throttle_waits_for_drain() {
        let controller = BackpressureController::with_watermarks(80, 40);
        let buffer = RingBuffer::new(10);
        for i in 0..9 {
            buffer.push(i);
        }
        assert!(controller.check_and_update(&buffer));

        let drainer = {
            let buffer = buffer.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                while buffer.pop().is_some() {}
            })
        };
        controller.throttle(&buffer);
        assert!(!controller.is_active());
        drainer.join().unwrap();
    }
}
