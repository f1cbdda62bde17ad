/// One step of the simulation clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub step: usize,
    pub prev_unix_time: f64,
    pub now_unix_time: f64,
}

/// A simulation clock that walks fixed-length steps in unix time.
///
/// Step `t` covers `[start + t·dt, start + (t+1)·dt]`.
///
/// # Examples
///
/// ```
/// use evse_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(0.0, 60.0, 3);
/// let mut ends = Vec::new();
///
/// clock.run(|tick| ends.push(tick.now_unix_time));
/// assert_eq!(ends, vec![60.0, 120.0, 180.0]);
/// ```
pub struct Clock {
    start_unix_time: f64,
    step_secs: f64,
    /// Current step of the simulation
    current: usize,
    /// Total steps to run in the simulation
    total: usize,
}

impl Clock {
    /// Creates a clock of `total` steps of `step_secs` seconds each.
    pub fn new(start_unix_time: f64, step_secs: f64, total: usize) -> Self {
        Self {
            start_unix_time,
            step_secs,
            current: 0,
            total,
        }
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some(tick)` - The step that was just entered
    /// * `None` - If the clock has reached its total steps
    pub fn tick(&mut self) -> Option<Tick> {
        if self.current < self.total {
            let step = self.current;
            self.current += 1;
            Some(Tick {
                step,
                prev_unix_time: self.start_unix_time + step as f64 * self.step_secs,
                now_unix_time: self.start_unix_time + (step + 1) as f64 * self.step_secs,
            })
        } else {
            None
        }
    }

    /// Runs a function for each remaining step in the clock.
    pub fn run(&mut self, mut f: impl FnMut(Tick)) {
        while let Some(tick) = self.tick() {
            f(tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clock() {
        let clock = Clock::new(0.0, 60.0, 5);
        assert_eq!(clock.current, 0);
        assert_eq!(clock.total, 5);
    }

    #[test]
    fn test_tick() {
        let mut clock = Clock::new(100.0, 30.0, 2);
        let first = clock.tick().expect("first tick");
        assert_eq!(first.step, 0);
        assert_eq!(first.prev_unix_time, 100.0);
        assert_eq!(first.now_unix_time, 130.0);
        let second = clock.tick().expect("second tick");
        assert_eq!(second.prev_unix_time, first.now_unix_time);
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn test_empty_clock() {
        let mut clock = Clock::new(0.0, 60.0, 0);
        assert_eq!(clock.tick(), None);

        let mut was_called = false;
        clock.run(|_| was_called = true);
        assert!(!was_called);
    }
}
