//! Per-port state machine serving one charging session at a time.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::event::{ChargeEvent, ControlStrategy, StopChargingCriterion};
use super::queue::ChargeEventQueue;
use crate::devices::converter::{Converter, ConverterLimits, ConverterModel};
use crate::devices::ev_charger::ChargerSpec;
use crate::devices::inventory::ChargeModelResolver;
use crate::devices::types::{BatteryModel, NEGLIGIBLE_POWER_KW, SePower};
use crate::error::SimError;
use crate::profile::{ChargeProfile, ChargeProfileResult};

/// Uncontrolled sessions ask for this multiple of the port limit, which the
/// clamp then brings back to the limit.
const UNCONTROLLED_TARGET_FACTOR: f64 = 1.3;

/// Reported state of a port after a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChargingStatus {
    #[default]
    NoEvPluggedIn,
    EvPluggedInNotCharging,
    EvCharging,
    EvChargeComplete,
    EvChargeEndedEarly,
}

impl ChargingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoEvPluggedIn => "no_ev_plugged_in",
            Self::EvPluggedInNotCharging => "ev_plugged_in_not_charging",
            Self::EvCharging => "ev_charging",
            Self::EvChargeComplete => "ev_charge_complete",
            Self::EvChargeEndedEarly => "ev_charge_ended_early",
        }
    }
}

impl fmt::Display for ChargingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live record of one vehicle's occupancy of the port.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub charge_event_id: u64,
    pub vehicle_id: u64,
    pub vehicle_type: String,
    pub arrival_unix_time: f64,
    pub departure_unix_time: f64,
    pub arrival_soc: f64,
    pub departure_soc: f64,
    pub stop_charging: StopChargingCriterion,
    pub now_unix_time: f64,
    pub now_soc: f64,
    /// AC energy delivered above the standby draw (kWh).
    pub energy_kwh: f64,
    pub dc_power_kw: f64,
    pub ac_power_kw: f64,
    pub reactive_power_kvar: f64,
    /// Set when the session was interrupted before its stop criterion.
    pub ended_early: bool,
}

impl Session {
    fn from_event(event: &ChargeEvent, now_unix_time: f64) -> Self {
        Self {
            charge_event_id: event.charge_event_id,
            vehicle_id: event.vehicle_id,
            vehicle_type: event.vehicle_type.clone(),
            arrival_unix_time: event.arrival_unix_time,
            departure_unix_time: event.departure_unix_time,
            arrival_soc: event.arrival_soc,
            departure_soc: event.departure_soc,
            stop_charging: event.stop_charging,
            now_unix_time,
            now_soc: event.arrival_soc,
            energy_kwh: 0.0,
            dc_power_kw: 0.0,
            ac_power_kw: 0.0,
            reactive_power_kvar: 0.0,
            ended_early: false,
        }
    }
}

/// Models owned by the session being served.
#[derive(Debug)]
struct ActiveSession {
    session: Session,
    battery: Box<dyn BatteryModel>,
    converter: ConverterModel,
    profile: Arc<dyn ChargeProfile>,
    control: ControlStrategy,
    limits: ConverterLimits,
}

/// Result of one [`SupplyEquipment::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortStep {
    /// SOC at the end of the step, `None` when no vehicle is being served.
    pub soc: Option<f64>,
    pub power: SePower,
    pub status: ChargingStatus,
    pub new_session_started: bool,
}

/// Static description of a port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortConfig {
    pub se_id: u64,
    pub charger_type: String,
    /// Upper bound for any AC real-power target (kW).
    pub power_limit_p3_kw: f64,
    pub standby_p3_kw: f64,
    pub standby_q3_kvar: f64,
}

impl PortConfig {
    /// Port rated at the charger's own limit and standby draw.
    pub fn from_charger(se_id: u64, charger: &ChargerSpec) -> Self {
        Self {
            se_id,
            charger_type: charger.name.clone(),
            power_limit_p3_kw: charger.max_p3_kw,
            standby_p3_kw: charger.standby_p3_kw,
            standby_q3_kvar: charger.standby_q3_kvar,
        }
    }
}

/// One charging port ("supply equipment").
///
/// Owns its queue and at most one active session. The resolver is shared
/// read-only with other ports.
pub struct SupplyEquipment {
    config: PortConfig,
    resolver: Arc<dyn ChargeModelResolver>,
    queue: ChargeEventQueue,
    active: Option<ActiveSession>,
    status: ChargingStatus,
    completed: Vec<Session>,
    last_unix_time: Option<f64>,
}

impl fmt::Debug for SupplyEquipment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupplyEquipment")
            .field("config", &self.config)
            .field("status", &self.status)
            .field("queued", &self.queue.len())
            .field("active", &self.active.as_ref().map(|a| &a.session))
            .field("completed", &self.completed.len())
            .finish_non_exhaustive()
    }
}

impl SupplyEquipment {
    /// # Panics
    ///
    /// Panics if the power limit is not positive or standby power is negative.
    pub fn new(
        config: PortConfig,
        resolver: Arc<dyn ChargeModelResolver>,
        queue: ChargeEventQueue,
    ) -> Self {
        assert!(config.power_limit_p3_kw > 0.0);
        assert!(config.standby_p3_kw >= 0.0);

        Self {
            config,
            resolver,
            queue,
            active: None,
            status: ChargingStatus::NoEvPluggedIn,
            completed: Vec::new(),
            last_unix_time: None,
        }
    }

    /// Queues a charge event. Returns events evicted by the queue policy,
    /// or the event itself if its times are not finite.
    pub fn add_charge_event(&mut self, event: ChargeEvent) -> Vec<ChargeEvent> {
        self.queue.insert(event)
    }

    /// Advances the port from `prev_unix_time` to `now_unix_time`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::NonMonotonicTime` if time moves backwards, and
    /// converter errors from the active session's curves.
    pub fn advance(
        &mut self,
        prev_unix_time: f64,
        now_unix_time: f64,
        per_unit_voltage: f64,
    ) -> Result<PortStep, SimError> {
        let last = self.last_unix_time.unwrap_or(prev_unix_time).max(prev_unix_time);
        if now_unix_time < last {
            return Err(SimError::NonMonotonicTime {
                last,
                now: now_unix_time,
            });
        }
        self.last_unix_time = Some(now_unix_time);

        let step_hrs = (now_unix_time - prev_unix_time) / 3600.0;
        let standby = SePower::standby(step_hrs, self.config.standby_p3_kw, self.config.standby_q3_kvar);

        let mut new_session_started = false;
        if self.active.is_none() && self.queue.next_available(now_unix_time) {
            if let Some(event) = self.queue.dequeue() {
                new_session_started = self.start_session(event, now_unix_time)?;
            }
        }

        let Some(active) = self.active.as_mut() else {
            self.status = ChargingStatus::NoEvPluggedIn;
            return Ok(PortStep {
                soc: None,
                power: standby,
                status: self.status,
                new_session_started,
            });
        };
        if !active.battery.has_arrived(now_unix_time) {
            self.status = ChargingStatus::NoEvPluggedIn;
            return Ok(PortStep {
                soc: None,
                power: standby,
                status: self.status,
                new_session_started,
            });
        }

        let (complete, state) = active
            .battery
            .advance(prev_unix_time, now_unix_time, per_unit_voltage);
        let charging = state.p2_kw > NEGLIGIBLE_POWER_KW;
        let power = if charging {
            active
                .converter
                .convert(state.p1_kw, state.p2_kw, state.time_step_duration_hrs)?
        } else {
            standby
        };

        let session = &mut active.session;
        if power.p3_kw > standby.p3_kw {
            session.energy_kwh += power.p3_kw * power.time_step_duration_hrs;
        }
        session.now_unix_time = now_unix_time;
        session.now_soc = state.soc_t1;
        session.dc_power_kw = state.p2_kw;
        session.ac_power_kw = power.p3_kw;
        session.reactive_power_kvar = power.q3_kvar;

        self.status = if complete {
            ChargingStatus::EvChargeComplete
        } else if charging {
            ChargingStatus::EvCharging
        } else {
            ChargingStatus::EvPluggedInNotCharging
        };
        debug!(
            se_id = self.config.se_id,
            t = now_unix_time,
            soc = state.soc_t1,
            p3_kw = power.p3_kw,
            status = %self.status,
            "port step"
        );

        if complete {
            self.archive(false);
        }

        Ok(PortStep {
            soc: Some(state.soc_t1),
            power,
            status: self.status,
            new_session_started,
        })
    }

    fn start_session(&mut self, event: ChargeEvent, now_unix_time: f64) -> Result<bool, SimError> {
        let models = match self.resolver.resolve(&event, &self.config.charger_type) {
            Ok(models) => models,
            Err(reason) => {
                warn!(
                    se_id = self.config.se_id,
                    charge_event_id = event.charge_event_id,
                    %reason,
                    "charge event dropped"
                );
                return Ok(false);
            }
        };

        let limits = models.converter.limits;
        let converter = ConverterModel::for_strategy(&event.control, models.converter);
        info!(
            se_id = self.config.se_id,
            charge_event_id = event.charge_event_id,
            vehicle_type = %event.vehicle_type,
            arrival_soc = event.arrival_soc,
            departure_soc = event.departure_soc,
            "session started"
        );

        let control = event.control;
        self.active = Some(ActiveSession {
            session: Session::from_event(&event, now_unix_time),
            battery: models.battery,
            converter,
            profile: models.profile,
            control,
            limits,
        });

        let initial_target = if control.manages_energy() {
            0.0
        } else {
            UNCONTROLLED_TARGET_FACTOR * self.config.power_limit_p3_kw
        };
        self.set_target_p3_kw(initial_target)?;
        Ok(true)
    }

    fn archive(&mut self, ended_early: bool) {
        if let Some(active) = self.active.take() {
            let mut session = active.session;
            session.ended_early = ended_early;
            info!(
                se_id = self.config.se_id,
                charge_event_id = session.charge_event_id,
                soc = session.now_soc,
                energy_kwh = session.energy_kwh,
                ended_early,
                "session archived"
            );
            self.completed.push(session);
        }
    }

    /// Applies an AC real-power target to the active session.
    ///
    /// The target is clamped to `[0, power_limit_p3_kw]` and translated to a
    /// DC target through the converter. Returns `false` when the port is idle.
    ///
    /// # Errors
    ///
    /// Returns a converter error if the efficiency curve cannot be inverted.
    pub fn set_target_p3_kw(&mut self, p3_kw: f64) -> Result<bool, SimError> {
        let p3_kw = p3_kw.clamp(0.0, self.config.power_limit_p3_kw);
        let Some(active) = self.active.as_mut() else {
            return Ok(false);
        };
        let p2_kw = active.converter.approximate_dc_power_for(p3_kw)?;
        active.battery.set_target_dc_power(p2_kw);
        Ok(true)
    }

    /// Applies a reactive-power target. Returns `false` if there is no active
    /// session or its converter ignores reactive setpoints.
    pub fn set_target_q3_kvar(&mut self, q3_kvar: f64) -> bool {
        self.active
            .as_mut()
            .is_some_and(|active| active.converter.set_target_q3_kvar(q3_kvar))
    }

    /// Ends the active session early. Returns `false` if the port was idle.
    pub fn stop_active_session(&mut self, now_unix_time: f64) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        active.session.now_unix_time = now_unix_time;
        self.status = ChargingStatus::EvChargeEndedEarly;
        self.archive(true);
        true
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    pub fn status(&self) -> ChargingStatus {
        self.status
    }

    pub fn is_occupied(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active.as_ref().map(|a| &a.session)
    }

    pub fn active_control(&self) -> Option<ControlStrategy> {
        self.active.as_ref().map(|a| a.control)
    }

    pub fn completed_sessions(&self) -> &[Session] {
        &self.completed
    }

    /// Drains the completed-session list.
    pub fn take_completed_sessions(&mut self) -> Vec<Session> {
        std::mem::take(&mut self.completed)
    }

    /// Limits of the active vehicle/charger pair.
    pub fn converter_limits(&self) -> Option<ConverterLimits> {
        self.active.as_ref().map(|a| a.limits)
    }

    pub fn supports_reactive_setpoint(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.converter.supports_reactive_setpoint())
    }

    pub fn queue(&self) -> &ChargeEventQueue {
        &self.queue
    }

    fn forecast_context(&self, setpoint_p3_kw: f64) -> Option<(&ActiveSession, f64)> {
        let active = self.active.as_ref()?;
        Some((active, setpoint_p3_kw.clamp(0.0, self.config.power_limit_p3_kw)))
    }

    /// Charging from the current SOC to `target_soc` at `setpoint_p3_kw`.
    ///
    /// `None` when no session is active.
    pub fn forecast_to_soc(&self, setpoint_p3_kw: f64, target_soc: f64) -> Option<ChargeProfileResult> {
        let (active, setpoint) = self.forecast_context(setpoint_p3_kw)?;
        let soc = active.session.now_soc;
        if target_soc <= soc {
            return Some(ChargeProfileResult::already_met());
        }
        Some(active.profile.result_for_soc(setpoint, soc, target_soc))
    }

    /// Charging from now until `target_unix_time` at `setpoint_p3_kw`.
    pub fn forecast_to_time(
        &self,
        setpoint_p3_kw: f64,
        target_unix_time: f64,
    ) -> Option<ChargeProfileResult> {
        let (active, setpoint) = self.forecast_context(setpoint_p3_kw)?;
        let hours = (target_unix_time - active.session.now_unix_time) / 3600.0;
        if hours <= 0.0 {
            return Some(ChargeProfileResult::already_met());
        }
        Some(
            active
                .profile
                .result_for_duration(setpoint, active.session.now_soc, hours),
        )
    }

    /// Forecast to the active session's own stop criterion.
    ///
    /// With `WhicheverFirst` both bounds are computed and the one with the
    /// shorter total charge time wins; on a tie the SOC-bounded result is
    /// returned.
    pub fn forecast_for_session(&self, setpoint_p3_kw: f64) -> Option<ChargeProfileResult> {
        let session = self.active_session()?;
        let (departure_soc, departure_unix_time) =
            (session.departure_soc, session.departure_unix_time);
        match session.stop_charging {
            StopChargingCriterion::TargetSoc => self.forecast_to_soc(setpoint_p3_kw, departure_soc),
            StopChargingCriterion::DepartureTime => {
                self.forecast_to_time(setpoint_p3_kw, departure_unix_time)
            }
            StopChargingCriterion::WhicheverFirst => {
                let by_soc = self.forecast_to_soc(setpoint_p3_kw, departure_soc)?;
                let by_time = self.forecast_to_time(setpoint_p3_kw, departure_unix_time)?;
                if by_time.total_charge_time_hrs < by_soc.total_charge_time_hrs {
                    Some(by_time)
                } else {
                    Some(by_soc)
                }
            }
        }
    }

    /// Chained forecasts through each SOC in `target_socs`.
    pub fn forecast_soc_series(
        &self,
        setpoint_p3_kw: f64,
        target_socs: &[f64],
    ) -> Option<Vec<ChargeProfileResult>> {
        let (active, setpoint) = self.forecast_context(setpoint_p3_kw)?;
        Some(
            active
                .profile
                .results_for_socs(setpoint, active.session.now_soc, target_socs),
        )
    }

    /// Chained forecasts up to each unix time in `target_unix_times`.
    pub fn forecast_time_series(
        &self,
        setpoint_p3_kw: f64,
        target_unix_times: &[f64],
    ) -> Option<Vec<ChargeProfileResult>> {
        let (active, setpoint) = self.forecast_context(setpoint_p3_kw)?;
        let now = active.session.now_unix_time;
        let elapsed_hrs: Vec<f64> = target_unix_times
            .iter()
            .map(|t| (t - now) / 3600.0)
            .collect();
        Some(
            active
                .profile
                .results_for_durations(setpoint, active.session.now_soc, &elapsed_hrs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::battery::{ChargeLimits, VehicleChargeModel};
    use crate::devices::inventory::{ChargeModels, Incompatibility, Inventory};
    use crate::profile::ALREADY_MET_CHARGE_TIME_HRS;
    use crate::sim::event::{EnergyControl, ReactiveControl};
    use crate::sim::queue::QueuingMode;

    const STEP: f64 = 60.0;

    fn port(charger: &str, mode: QueuingMode) -> SupplyEquipment {
        let inventory = Inventory::reference().expect("builtin catalog is valid");
        let config = PortConfig::from_charger(1, inventory.charger(charger).expect("builtin charger"));
        SupplyEquipment::new(config, Arc::new(inventory), ChargeEventQueue::new(mode))
    }

    fn l2_port() -> SupplyEquipment {
        port("L2", QueuingMode::OverlapAllowed)
    }

    fn step(port: &mut SupplyEquipment, i: usize) -> PortStep {
        let prev = i as f64 * STEP;
        port.advance(prev, prev + STEP, 1.0).expect("valid step")
    }

    #[test]
    fn idle_port_reports_standby_only() {
        let mut port = l2_port();
        let s = step(&mut port, 0);
        assert_eq!(s.status, ChargingStatus::NoEvPluggedIn);
        assert_eq!(s.soc, None);
        assert!(!s.new_session_started);
        assert_eq!(s.power.p3_kw, port.config().standby_p3_kw);
        assert_eq!(s.power.q3_kvar, port.config().standby_q3_kvar);
        assert_eq!(s.power.p2_kw, 0.0);
        assert!((s.power.time_step_duration_hrs - STEP / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn session_runs_to_completion_and_is_archived() {
        let mut port = l2_port();
        port.add_charge_event(ChargeEvent::new(11, "compact_bev", 0.0, 36_000.0, 70.0, 80.0));

        let first = step(&mut port, 0);
        assert!(first.new_session_started);
        assert_eq!(first.status, ChargingStatus::EvCharging);
        assert!(first.power.p3_kw <= port.config().power_limit_p3_kw);

        let standby = port.config().standby_p3_kw;
        let mut integral = if first.power.p3_kw > standby {
            first.power.p3_kw * first.power.time_step_duration_hrs
        } else {
            0.0
        };
        let mut finished = None;
        for i in 1..120 {
            let s = step(&mut port, i);
            if s.power.p3_kw > standby {
                integral += s.power.p3_kw * s.power.time_step_duration_hrs;
            }
            if s.status == ChargingStatus::EvChargeComplete {
                finished = Some(i);
                break;
            }
            assert_eq!(s.status, ChargingStatus::EvCharging);
        }
        assert!(finished.is_some(), "session should finish within two hours");
        assert!(!port.is_occupied());

        let done = &port.completed_sessions()[0];
        assert_eq!(done.charge_event_id, 11);
        assert!(done.now_soc >= done.arrival_soc);
        assert!((done.now_soc - 80.0).abs() < 1e-6);
        assert!(!done.ended_early);
        assert!((done.energy_kwh - integral).abs() < 1e-9);

        let after = step(&mut port, 200);
        assert_eq!(after.status, ChargingStatus::NoEvPluggedIn);
    }

    #[test]
    fn second_event_waits_for_the_port() {
        let mut port = l2_port();
        port.add_charge_event(ChargeEvent::new(1, "compact_bev", 0.0, 36_000.0, 70.0, 75.0));
        port.add_charge_event(ChargeEvent::new(2, "compact_bev", 30.0, 36_000.0, 50.0, 55.0));

        let mut starts = Vec::new();
        for i in 0..240 {
            let s = step(&mut port, i);
            if s.new_session_started {
                starts.push(port.active_session().map(|a| a.charge_event_id));
            }
            if port.is_occupied() {
                assert_eq!(port.queue().len() + port.completed_sessions().len(), 1);
            }
        }
        assert_eq!(starts, vec![Some(1), Some(2)]);
        let ids: Vec<u64> = port.completed_sessions().iter().map(|s| s.charge_event_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn incompatible_event_is_dropped() {
        let mut port = port("dc_fast", QueuingMode::default());
        port.add_charge_event(ChargeEvent::new(5, "phev", 0.0, 3600.0, 20.0, 80.0));
        let s = step(&mut port, 0);
        assert_eq!(s.status, ChargingStatus::NoEvPluggedIn);
        assert!(!s.new_session_started);
        assert!(!port.is_occupied());
        assert!(port.queue().is_empty());
        assert!(port.completed_sessions().is_empty());
    }

    #[test]
    fn managed_session_waits_for_a_setpoint() {
        let mut port = l2_port();
        let control = ControlStrategy {
            energy: EnergyControl::External,
            reactive: ReactiveControl::FixedPowerFactor,
        };
        port.add_charge_event(
            ChargeEvent::new(3, "long_range_bev", 0.0, 36_000.0, 20.0, 80.0).with_control(control),
        );

        let s = step(&mut port, 0);
        assert!(s.new_session_started);
        assert_eq!(s.status, ChargingStatus::EvPluggedInNotCharging);
        assert_eq!(s.power.p3_kw, port.config().standby_p3_kw);
        assert_eq!(port.active_session().map(|a| a.energy_kwh), Some(0.0));

        assert!(port.set_target_p3_kw(5.0).expect("invertible"));
        let s = step(&mut port, 1);
        assert_eq!(s.status, ChargingStatus::EvCharging);
        assert!((s.power.p3_kw - 5.0).abs() < 1e-3);
    }

    #[test]
    fn reactive_setpoint_session_tracks_q3() {
        let mut port = l2_port();
        let control = ControlStrategy {
            energy: EnergyControl::Uncontrolled,
            reactive: ReactiveControl::Setpoint,
        };
        port.add_charge_event(
            ChargeEvent::new(4, "compact_bev", 0.0, 36_000.0, 20.0, 80.0).with_control(control),
        );
        step(&mut port, 0);
        assert!(port.supports_reactive_setpoint());
        assert!(port.set_target_q3_kvar(-2.0));
        let s = step(&mut port, 1);
        assert!((s.power.q3_kvar + 2.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_pf_session_ignores_reactive_setpoint() {
        let mut port = l2_port();
        port.add_charge_event(ChargeEvent::new(4, "compact_bev", 0.0, 36_000.0, 20.0, 80.0));
        step(&mut port, 0);
        assert!(!port.supports_reactive_setpoint());
        assert!(!port.set_target_q3_kvar(-2.0));
    }

    #[test]
    fn stop_active_session_ends_early() {
        let mut port = l2_port();
        port.add_charge_event(ChargeEvent::new(6, "long_range_bev", 0.0, 36_000.0, 10.0, 90.0));
        step(&mut port, 0);
        step(&mut port, 1);
        assert!(port.stop_active_session(120.0));
        assert_eq!(port.status(), ChargingStatus::EvChargeEndedEarly);
        assert!(!port.is_occupied());
        let done = &port.completed_sessions()[0];
        assert!(done.ended_early);
        assert!(done.energy_kwh > 0.0);
        assert!(!port.stop_active_session(180.0));
    }

    #[test]
    fn time_going_backwards_is_an_error() {
        let mut port = l2_port();
        step(&mut port, 5);
        let err = port.advance(100.0, 200.0, 1.0).expect_err("backwards");
        assert!(matches!(err, SimError::NonMonotonicTime { .. }));
    }

    #[test]
    fn forecasts_need_an_active_session() {
        let port = l2_port();
        assert!(port.forecast_to_soc(7.0, 80.0).is_none());
        assert!(port.forecast_for_session(7.0).is_none());
        assert!(port.forecast_time_series(7.0, &[3600.0]).is_none());
    }

    #[test]
    fn forecasts_follow_the_active_session() {
        let mut port = l2_port();
        port.add_charge_event(ChargeEvent::new(8, "compact_bev", 0.0, 7200.0, 20.0, 90.0));
        step(&mut port, 0);

        let to_soc = port.forecast_to_soc(7.0, 60.0).expect("active");
        assert!(to_soc.is_reachable());
        assert!(to_soc.e3_kwh > to_soc.e2_kwh && to_soc.e2_kwh > to_soc.e1_kwh);

        let met = port.forecast_to_soc(7.0, 10.0).expect("active");
        assert_eq!(met.total_charge_time_hrs, ALREADY_MET_CHARGE_TIME_HRS);
        assert_eq!(met.incremental_charge_time_hrs, -1.0);
        let past = port.forecast_to_time(7.0, 0.0).expect("active");
        assert!(past.is_already_met());

        // 70% of 40 kWh takes longer than the two hours left before departure
        let session = port.forecast_for_session(7.0).expect("active");
        let by_time = port.forecast_to_time(7.0, 7200.0).expect("active");
        assert_eq!(session, by_time);

        let series = port.forecast_time_series(7.0, &[1860.0, 3660.0]).expect("active");
        assert_eq!(series.len(), 2);
        assert!(series[1].total_charge_time_hrs > series[0].total_charge_time_hrs);
        let socs = port.forecast_soc_series(7.0, &[30.0, 40.0]).expect("active");
        assert_eq!(socs.len(), 2);
    }

    #[test]
    fn whichever_first_prefers_soc_when_it_is_sooner() {
        let mut port = l2_port();
        port.add_charge_event(ChargeEvent::new(9, "compact_bev", 0.0, 36_000.0, 70.0, 75.0));
        step(&mut port, 0);
        let session = port.forecast_for_session(7.0).expect("active");
        let by_soc = port.forecast_to_soc(7.0, 75.0).expect("active");
        assert_eq!(session, by_soc);
    }

    /// Profile whose two bounds always take the same time but differ in SOC gained.
    #[derive(Debug)]
    struct EqualTimeProfile;

    impl ChargeProfile for EqualTimeProfile {
        fn result_for_soc(&self, _: f64, start_soc: f64, end_soc: f64) -> ChargeProfileResult {
            ChargeProfileResult {
                soc_increase: end_soc - start_soc,
                e1_kwh: 1.0,
                e2_kwh: 1.1,
                e3_kwh: 1.2,
                cum_q3_kvarh: 0.0,
                total_charge_time_hrs: 2.0,
                incremental_charge_time_hrs: 2.0,
            }
        }

        fn result_for_duration(&self, _: f64, _: f64, _: f64) -> ChargeProfileResult {
            ChargeProfileResult {
                soc_increase: 1.0,
                e1_kwh: 0.5,
                e2_kwh: 0.6,
                e3_kwh: 0.7,
                cum_q3_kvarh: 0.0,
                total_charge_time_hrs: 2.0,
                incremental_charge_time_hrs: 2.0,
            }
        }
    }

    struct EqualTimeResolver;

    impl ChargeModelResolver for EqualTimeResolver {
        fn resolve(
            &self,
            event: &ChargeEvent,
            _: &str,
        ) -> Result<ChargeModels, Incompatibility> {
            let limits = ChargeLimits {
                capacity_kwh: 40.0,
                max_p2_kw: 7.0,
                taper_start_soc: 80.0,
                battery_efficiency: 0.95,
            };
            Ok(ChargeModels {
                battery: Box::new(VehicleChargeModel::new(limits, false, event)),
                converter: ChargerSpec::level2()
                    .characteristics()
                    .expect("builtin curves are valid"),
                profile: Arc::new(EqualTimeProfile),
            })
        }
    }

    #[test]
    fn whichever_first_tie_returns_soc_bound() {
        let config = PortConfig::from_charger(1, &ChargerSpec::level2());
        let mut port = SupplyEquipment::new(
            config,
            Arc::new(EqualTimeResolver),
            ChargeEventQueue::new(QueuingMode::OverlapAllowed),
        );
        port.add_charge_event(ChargeEvent::new(12, "compact_bev", 0.0, 36_000.0, 20.0, 90.0));
        step(&mut port, 0);

        let by_soc = port.forecast_to_soc(7.0, 90.0).expect("active");
        let by_time = port.forecast_to_time(7.0, 36_000.0).expect("active");
        assert_eq!(by_soc.total_charge_time_hrs, by_time.total_charge_time_hrs);
        assert_ne!(by_soc, by_time);
        assert_eq!(port.forecast_for_session(7.0), Some(by_soc));
    }
}
