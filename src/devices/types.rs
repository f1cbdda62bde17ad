//! Common types and traits for per-session device models.

use std::fmt;

/// DC power at or below this level counts as "not charging" (kW).
pub const NEGLIGIBLE_POWER_KW: f64 = 1e-4;

/// Power flow at the supply equipment over one step.
///
/// `p1_kw` is measured at the battery terminals, `p2_kw` on the DC side of the
/// converter and `p3_kw`/`q3_kvar` on the AC grid side. Positive values are
/// consumption.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SePower {
    pub time_step_duration_hrs: f64,
    pub p1_kw: f64,
    pub p2_kw: f64,
    pub p3_kw: f64,
    pub q3_kvar: f64,
}

impl SePower {
    /// Standby draw over `time_step_duration_hrs`: AC only, no DC flow.
    pub fn standby(time_step_duration_hrs: f64, p3_kw: f64, q3_kvar: f64) -> Self {
        Self {
            time_step_duration_hrs,
            p1_kw: 0.0,
            p2_kw: 0.0,
            p3_kw,
            q3_kvar,
        }
    }
}

/// Battery state at the end of one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatteryState {
    /// SOC at the end of the step (percent).
    pub soc_t1: f64,
    pub p1_kw: f64,
    pub p2_kw: f64,
    pub time_step_duration_hrs: f64,
}

/// Charge physics of one connected vehicle.
///
/// Implementations are owned by exactly one active session and dropped when it
/// ends.
pub trait BatteryModel: fmt::Debug + Send {
    /// Advances the battery from `prev_unix_time` to `now_unix_time`.
    ///
    /// Returns `(charge_complete, state)`.
    fn advance(
        &mut self,
        prev_unix_time: f64,
        now_unix_time: f64,
        per_unit_voltage: f64,
    ) -> (bool, BatteryState);

    /// Returns `true` once the vehicle is physically at the port.
    fn has_arrived(&self, now_unix_time: f64) -> bool;

    /// Returns `true` while the vehicle is still plugged in.
    fn is_connected(&self, now_unix_time: f64) -> bool;

    /// Requests a DC-side (P2) charging power. Values are clamped by the model.
    fn set_target_dc_power(&mut self, p2_kw: f64);

    /// Current SOC in percent.
    fn soc(&self) -> f64;
}
