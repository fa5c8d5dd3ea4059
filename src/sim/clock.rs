use super::time::TimeKey;

/// A simulation clock that walks quantized time over a fixed run.
///
/// The `Clock` yields keys from `start` (inclusive) to `end` (exclusive),
/// advancing by a whole number of quantization steps per tick.
///
/// # Examples
///
/// ```
/// use tes_seasonal_control::sim::clock::Clock;
/// use tes_seasonal_control::sim::time::TimeKey;
///
/// let mut clock = Clock::new(TimeKey::new(0), TimeKey::new(3), 1);
/// let mut keys = Vec::new();
///
/// clock.run(|key| keys.push(key.index()));
/// assert_eq!(keys, vec![0, 1, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    /// Next key to hand out
    current: TimeKey,
    /// First key past the run
    end: TimeKey,
    /// Steps advanced per tick
    stride: i64,
}

impl Clock {
    /// Creates a clock over `[start, end)`.
    ///
    /// # Arguments
    ///
    /// * `start` - First key of the run
    /// * `end` - First key after the run
    /// * `stride` - Quantization steps per tick, at least 1
    pub fn new(start: TimeKey, end: TimeKey, stride: i64) -> Self {
        Self {
            current: start,
            end,
            stride: stride.max(1),
        }
    }

    /// Advances the clock by one tick.
    ///
    /// # Returns
    ///
    /// * `Some(key)` - The current key before advancing
    /// * `None` - If the run is complete
    pub fn tick(&mut self) -> Option<TimeKey> {
        if self.current < self.end {
            let key = self.current;
            self.current = self.current.offset(self.stride);
            Some(key)
        } else {
            None
        }
    }

    /// Runs a function for each remaining tick.
    pub fn run(&mut self, mut f: impl FnMut(TimeKey)) {
        while let Some(key) = self.tick() {
            f(key);
        }
    }

    /// Number of ticks left in the run.
    pub fn remaining(&self) -> usize {
        let steps = self.end.steps_since(self.current).max(0);
        usize::try_from((steps + self.stride - 1) / self.stride).unwrap_or(0)
    }

    pub fn end(&self) -> TimeKey {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick() {
        let mut clock = Clock::new(TimeKey::new(0), TimeKey::new(2), 1);
        assert_eq!(clock.tick(), Some(TimeKey::new(0)));
        assert_eq!(clock.tick(), Some(TimeKey::new(1)));
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn test_stride() {
        let mut clock = Clock::new(TimeKey::new(0), TimeKey::new(25), 10);
        assert_eq!(clock.remaining(), 3);
        let mut keys = Vec::new();
        clock.run(|k| keys.push(k.index()));
        assert_eq!(keys, vec![0, 10, 20]);
        assert_eq!(clock.remaining(), 0);
    }

    #[test]
    fn test_empty_clock() {
        let mut clock = Clock::new(TimeKey::new(5), TimeKey::new(5), 1);
        assert_eq!(clock.tick(), None);

        let mut was_called = false;
        clock.run(|_| was_called = true);
        assert!(!was_called);
    }

    #[test]
    fn test_zero_stride_is_clamped() {
        let mut clock = Clock::new(TimeKey::new(0), TimeKey::new(2), 0);
        assert_eq!(clock.tick(), Some(TimeKey::new(0)));
        assert_eq!(clock.tick(), Some(TimeKey::new(1)));
    }
}
