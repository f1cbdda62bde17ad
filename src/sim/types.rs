//! Core simulation types: run configuration and per-step records.

use std::fmt;

use crate::devices::types::SePower;

use super::port::ChargingStatus;

/// Timing of one simulation run.
///
/// # Examples
///
/// ```
/// use evse_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(0.0, 900.0, 96, 42);
/// assert_eq!(cfg.dt_hours(), 0.25);
/// assert_eq!(cfg.end_unix_time(), 86_400.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Unix time at the start of step 0.
    pub start_unix_time: f64,
    /// Length of one step in seconds.
    pub step_secs: f64,
    /// Number of steps to run.
    pub steps: usize,
    /// Master random seed for reproducibility.
    pub seed: u64,
}

impl SimConfig {
    /// # Panics
    ///
    /// Panics if `step_secs` is not positive or `start_unix_time` is not finite.
    pub fn new(start_unix_time: f64, step_secs: f64, steps: usize, seed: u64) -> Self {
        assert!(start_unix_time.is_finite(), "start_unix_time must be finite");
        assert!(step_secs > 0.0, "step_secs must be > 0");
        Self {
            start_unix_time,
            step_secs,
            steps,
            seed,
        }
    }

    pub fn dt_hours(&self) -> f64 {
        self.step_secs / 3600.0
    }

    /// Unix time at the start of step `t`.
    pub fn unix_time_at(&self, t: usize) -> f64 {
        self.start_unix_time + t as f64 * self.step_secs
    }

    pub fn end_unix_time(&self) -> f64 {
        self.unix_time_at(self.steps)
    }
}

/// Port readings available to the controller before a step.
#[derive(Debug, Clone)]
pub struct StepInput {
    pub timestep: usize,
    pub now_unix_time: f64,
    /// `true` while a session is active.
    pub occupied: bool,
    /// `true` if the active session expects an external P3 setpoint.
    pub managed: bool,
    pub soc: Option<f64>,
}

/// Complete record of one simulation timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub timestep: usize,
    /// Unix time at the end of the step.
    pub unix_time: f64,
    pub soc: Option<f64>,
    pub power: SePower,
    pub status: ChargingStatus,
    pub new_session_started: bool,
    /// P3 setpoint applied this step, if any.
    pub target_p3_kw: Option<f64>,
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let soc = self
            .soc
            .map_or_else(|| "   -".to_string(), |soc| format!("{soc:>5.1}%"));
        write!(
            f,
            "t={:>4} ({:>10.0}) | SoC={} | P2={:>6.2} kW  P3={:>6.2} kW  Q3={:>6.2} kVAr | {}{}",
            self.timestep,
            self.unix_time,
            soc,
            self.power.p2_kw,
            self.power.p3_kw,
            self.power.q3_kvar,
            self.status,
            if self.new_session_started { " (new)" } else { "" },
        )
    }
}
