//! Charge event requests and their control tags.

use serde::Deserialize;

/// When a session should end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopChargingCriterion {
    /// Stop once the departure SOC is reached, regardless of the clock.
    TargetSoc,
    /// Stop at the departure time, regardless of SOC.
    DepartureTime,
    /// Stop at whichever of the two happens first.
    #[default]
    WhicheverFirst,
}

impl StopChargingCriterion {
    pub fn uses_target_soc(self) -> bool {
        matches!(self, Self::TargetSoc | Self::WhicheverFirst)
    }

    pub fn uses_departure_time(self) -> bool {
        matches!(self, Self::DepartureTime | Self::WhicheverFirst)
    }
}

/// Energy-management mode for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyControl {
    /// Charge as fast as the port allows.
    #[default]
    Uncontrolled,
    /// Wait for an external real-power setpoint.
    External,
}

/// Reactive-power mode for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactiveControl {
    /// Reactive power follows the charger's power-factor curve.
    #[default]
    FixedPowerFactor,
    /// Reactive power follows an external setpoint.
    Setpoint,
}

/// Control-strategy tag carried by a charge event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlStrategy {
    pub energy: EnergyControl,
    pub reactive: ReactiveControl,
}

impl ControlStrategy {
    /// Returns `true` when an energy-management controller owns the setpoint.
    pub fn manages_energy(&self) -> bool {
        self.energy != EnergyControl::Uncontrolled
    }

    /// Returns `true` when the session needs an independently controllable Q3.
    pub fn uses_reactive_setpoint(&self) -> bool {
        self.reactive == ReactiveControl::Setpoint
    }
}

/// A requested charging session.
///
/// Times are unix seconds, SOC values are percent (0–100). Events are ordered
/// by arrival time inside [`super::queue::ChargeEventQueue`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChargeEvent {
    pub charge_event_id: u64,
    #[serde(default)]
    pub vehicle_id: u64,
    pub vehicle_type: String,
    pub arrival_unix_time: f64,
    pub departure_unix_time: f64,
    pub arrival_soc: f64,
    pub departure_soc: f64,
    #[serde(default)]
    pub stop_charging: StopChargingCriterion,
    #[serde(default)]
    pub control: ControlStrategy,
}

impl ChargeEvent {
    /// Creates an uncontrolled event that stops at whichever target comes first.
    ///
    /// # Panics
    ///
    /// Panics if the times are not finite, `departure_unix_time < arrival_unix_time`,
    /// or either SOC is outside `[0, 100]`.
    pub fn new(
        charge_event_id: u64,
        vehicle_type: impl Into<String>,
        arrival_unix_time: f64,
        departure_unix_time: f64,
        arrival_soc: f64,
        departure_soc: f64,
    ) -> Self {
        assert!(arrival_unix_time.is_finite() && departure_unix_time.is_finite());
        assert!(departure_unix_time >= arrival_unix_time);
        assert!((0.0..=100.0).contains(&arrival_soc));
        assert!((0.0..=100.0).contains(&departure_soc));

        Self {
            charge_event_id,
            vehicle_id: charge_event_id,
            vehicle_type: vehicle_type.into(),
            arrival_unix_time,
            departure_unix_time,
            arrival_soc,
            departure_soc,
            stop_charging: StopChargingCriterion::default(),
            control: ControlStrategy::default(),
        }
    }

    pub fn with_vehicle_id(mut self, vehicle_id: u64) -> Self {
        self.vehicle_id = vehicle_id;
        self
    }

    pub fn with_stop_charging(mut self, stop_charging: StopChargingCriterion) -> Self {
        self.stop_charging = stop_charging;
        self
    }

    pub fn with_control(mut self, control: ControlStrategy) -> Self {
        self.control = control;
        self
    }

    /// Parked duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.departure_unix_time - self.arrival_unix_time
    }

    /// Length of the intersection of both `[arrival, departure)` windows in seconds.
    pub fn overlap_secs(&self, other: &Self) -> f64 {
        let start = self.arrival_unix_time.max(other.arrival_unix_time);
        let end = self.departure_unix_time.min(other.departure_unix_time);
        (end - start).max(0.0)
    }
}
