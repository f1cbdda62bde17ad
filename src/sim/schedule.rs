/// Repeating per-step setpoint schedule.
///
/// Step `t` reads entry `t % len`, so a one-day schedule repeats daily.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SetpointSchedule {
    values: Vec<f64>,
}

impl SetpointSchedule {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Same value at every step.
    pub fn flat(value: f64) -> Self {
        Self {
            values: vec![value],
        }
    }

    /// Value for step `t`, or `None` for an empty schedule.
    pub fn at(&self, t: usize) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values[t % self.values.len()])
    }
}
