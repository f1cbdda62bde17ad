//! Simulation engine that steps one port under a controller.

use tracing::info;

use crate::error::SimError;

use super::clock::Clock;
use super::controller::Controller;
use super::port::SupplyEquipment;
use super::types::{SimConfig, StepInput, StepResult};

/// Simulation engine owning the port, controller, and configuration.
///
/// Generic over `C: Controller` for static dispatch.
pub struct Engine<C: Controller> {
    config: SimConfig,
    port: SupplyEquipment,
    controller: C,
    per_unit_voltage: f64,
}

impl<C: Controller> Engine<C> {
    /// Creates a new simulation engine.
    ///
    /// # Arguments
    ///
    /// * `config` - Simulation timing
    /// * `port` - Port with its queue already filled
    /// * `controller` - Setpoint controller
    /// * `per_unit_voltage` - Grid voltage seen by the port, held for the whole run
    pub fn new(config: SimConfig, port: SupplyEquipment, controller: C, per_unit_voltage: f64) -> Self {
        Self {
            config,
            port,
            controller,
            per_unit_voltage,
        }
    }

    /// Executes timestep `t` and returns its record.
    ///
    /// The controller sees the port before the step. A P3 setpoint only
    /// reaches sessions whose control strategy manages energy.
    ///
    /// # Errors
    ///
    /// Propagates port errors (non-monotonic time, converter failures).
    pub fn step(&mut self, t: usize) -> Result<StepResult, SimError> {
        let prev_unix_time = self.config.unix_time_at(t);
        let now_unix_time = self.config.unix_time_at(t + 1);

        let managed = self
            .port
            .active_control()
            .is_some_and(|control| control.manages_energy());
        let input = StepInput {
            timestep: t,
            now_unix_time: prev_unix_time,
            occupied: self.port.is_occupied(),
            managed,
            soc: self.port.active_session().map(|s| s.now_soc),
        };
        let setpoint = self.controller.setpoint(&input);

        let mut target_p3_kw = None;
        if managed {
            if let Some(p3_kw) = setpoint.p3_kw {
                self.port.set_target_p3_kw(p3_kw)?;
                target_p3_kw = Some(p3_kw);
            }
        }
        if let Some(q3_kvar) = setpoint.q3_kvar {
            self.port.set_target_q3_kvar(q3_kvar);
        }

        let step = self
            .port
            .advance(prev_unix_time, now_unix_time, self.per_unit_voltage)?;

        Ok(StepResult {
            timestep: t,
            unix_time: now_unix_time,
            soc: step.soc,
            power: step.power,
            status: step.status,
            new_session_started: step.new_session_started,
            target_p3_kw,
        })
    }

    /// Executes all timesteps, then ends any session still running.
    pub fn run(&mut self) -> Result<Vec<StepResult>, SimError> {
        let mut clock = Clock::new(self.config.start_unix_time, self.config.step_secs, self.config.steps);
        let mut results = Vec::with_capacity(self.config.steps);
        while let Some(tick) = clock.tick() {
            results.push(self.step(tick.step)?);
        }

        let end = self.config.end_unix_time();
        if self.port.stop_active_session(end) {
            info!(end_unix_time = end, "simulation ended with a session still active");
        }
        Ok(results)
    }

    pub fn port(&self) -> &SupplyEquipment {
        &self.port
    }

    /// Consumes the engine, handing back the port with its archived sessions.
    pub fn into_port(self) -> SupplyEquipment {
        self.port
    }

    /// Returns a reference to the simulation configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::devices::inventory::Inventory;
    use crate::sim::controller::{ScheduledSetpoint, Uncontrolled};
    use crate::sim::event::{ChargeEvent, ControlStrategy, EnergyControl};
    use crate::sim::port::{ChargingStatus, PortConfig};
    use crate::sim::queue::{ChargeEventQueue, QueuingMode};
    use crate::sim::schedule::SetpointSchedule;

    fn l2_port(events: Vec<ChargeEvent>) -> SupplyEquipment {
        let inventory = Inventory::reference().expect("builtin catalog is valid");
        let config = PortConfig::from_charger(1, inventory.charger("L2").expect("builtin charger"));
        let mut queue = ChargeEventQueue::new(QueuingMode::OverlapAllowed);
        queue.extend(events);
        SupplyEquipment::new(config, Arc::new(inventory), queue)
    }

    #[test]
    fn run_produces_one_result_per_step() {
        let port = l2_port(vec![]);
        let mut engine = Engine::new(SimConfig::new(0.0, 60.0, 30, 1), port, Uncontrolled, 1.0);
        let results = engine.run().expect("run succeeds");
        assert_eq!(results.len(), 30);
        assert!(results.iter().all(|r| r.status == ChargingStatus::NoEvPluggedIn));
        assert_eq!(results[29].unix_time, 1800.0);
    }

    #[test]
    fn run_ends_unfinished_session_early() {
        let event = ChargeEvent::new(1, "long_range_bev", 0.0, 86_400.0, 10.0, 90.0);
        let mut engine = Engine::new(SimConfig::new(0.0, 60.0, 10, 1), l2_port(vec![event]), Uncontrolled, 1.0);
        engine.run().expect("run succeeds");
        let done = engine.port().completed_sessions();
        assert_eq!(done.len(), 1);
        assert!(done[0].ended_early);
        assert_eq!(done[0].now_unix_time, 600.0);
    }

    #[test]
    fn schedule_drives_managed_sessions_only() {
        let managed = ControlStrategy {
            energy: EnergyControl::External,
            ..ControlStrategy::default()
        };
        let event = ChargeEvent::new(1, "long_range_bev", 0.0, 86_400.0, 10.0, 90.0).with_control(managed);
        let controller = ScheduledSetpoint::new(SetpointSchedule::flat(4.0), SetpointSchedule::default());
        let mut engine = Engine::new(SimConfig::new(0.0, 60.0, 5, 1), l2_port(vec![event]), controller, 1.0);
        let results = engine.run().expect("run succeeds");

        assert_eq!(results[0].status, ChargingStatus::EvPluggedInNotCharging);
        assert_eq!(results[0].target_p3_kw, None);
        for r in &results[1..] {
            assert_eq!(r.target_p3_kw, Some(4.0));
            assert!((r.power.p3_kw - 4.0).abs() < 1e-3);
        }
    }

    #[test]
    fn schedule_is_ignored_by_uncontrolled_sessions() {
        let event = ChargeEvent::new(1, "long_range_bev", 0.0, 86_400.0, 10.0, 90.0);
        let controller = ScheduledSetpoint::new(SetpointSchedule::flat(4.0), SetpointSchedule::default());
        let mut engine = Engine::new(SimConfig::new(0.0, 60.0, 3, 1), l2_port(vec![event]), controller, 1.0);
        let results = engine.run().expect("run succeeds");
        assert!(results.iter().all(|r| r.target_p3_kw.is_none()));
        assert!(results[2].power.p3_kw > 10.0);
    }
}
