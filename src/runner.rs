//! Builds a port from a scenario and runs it to completion.

use std::sync::Arc;

use tracing::info;

use crate::config::ScenarioConfig;
use crate::devices::Inventory;
use crate::error::SimError;
use crate::sim::arrivals::ArrivalSampler;
use crate::sim::controller::{Controller, ScheduledSetpoint, Uncontrolled};
use crate::sim::engine::Engine;
use crate::sim::event::ChargeEvent;
use crate::sim::kpi::KpiReport;
use crate::sim::port::{PortConfig, Session, SupplyEquipment};
use crate::sim::queue::ChargeEventQueue;
use crate::sim::schedule::SetpointSchedule;
use crate::sim::types::{SimConfig, StepResult};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct SimulationResult {
    pub config: SimConfig,
    pub results: Vec<StepResult>,
    /// Sessions archived during the run, in completion order.
    pub sessions: Vec<Session>,
    /// Events the queue evicted while being filled.
    pub evicted: Vec<ChargeEvent>,
    pub kpi: KpiReport,
}

/// Runs `config` end to end.
///
/// Explicit `[[events]]` are queued first, then generated arrivals
/// numbered after the largest explicit id.
///
/// # Errors
///
/// Returns `SimError::InvalidScenario` if validation fails, and any
/// inventory or port error raised while running.
pub fn run_scenario(config: &ScenarioConfig) -> Result<SimulationResult, SimError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(SimError::InvalidScenario(errors));
    }

    let (vehicles, chargers) = config.catalog();
    let inventory = Inventory::new(vehicles, chargers)?;
    let charger = inventory
        .charger(&config.port.charger_type)
        .ok_or_else(|| SimError::UnknownCharger(config.port.charger_type.clone()))?;

    let mut port_config = PortConfig::from_charger(config.port.se_id, charger);
    if let Some(limit) = config.port.power_limit_p3_kw {
        port_config.power_limit_p3_kw = limit;
    }
    if let Some(standby) = config.port.standby_p3_kw {
        port_config.standby_p3_kw = standby;
    }
    if let Some(standby) = config.port.standby_q3_kvar {
        port_config.standby_q3_kvar = standby;
    }
    let standby_p3_kw = port_config.standby_p3_kw;

    let queue = ChargeEventQueue::new(config.queue.queuing_mode().unwrap_or_default())
        .with_min_remaining_charge_secs(config.queue.min_remaining_charge_secs);
    let mut port = SupplyEquipment::new(port_config, Arc::new(inventory), queue);

    let sim = &config.simulation;
    let sim_config = SimConfig::new(sim.start_unix_time, sim.step_secs, sim.steps, sim.seed);

    let mut evicted = Vec::new();
    for event in scenario_events(config) {
        evicted.extend(port.add_charge_event(event));
    }
    info!(
        queued = port.queue().len(),
        evicted = evicted.len(),
        charger = %config.port.charger_type,
        "queue filled"
    );

    let (results, mut port) = match sim.controller.as_str() {
        "schedule" => {
            let sched = &config.schedule;
            let controller = ScheduledSetpoint::new(
                SetpointSchedule::new(sched.per_step(&sched.p3_kw, sim.step_secs)),
                SetpointSchedule::new(sched.per_step(&sched.q3_kvar, sim.step_secs)),
            );
            drive(sim_config.clone(), port, controller, sim.per_unit_voltage)?
        }
        _ => drive(sim_config.clone(), port, Uncontrolled, sim.per_unit_voltage)?,
    };

    let sessions = port.take_completed_sessions();
    let kpi = KpiReport::from_results(&results, &sessions, standby_p3_kw);
    info!(
        steps = results.len(),
        sessions = sessions.len(),
        energy_kwh = kpi.total_energy_kwh,
        "simulation finished"
    );

    Ok(SimulationResult {
        config: sim_config,
        results,
        sessions,
        evicted,
        kpi,
    })
}

/// Explicit events followed by generated arrivals covering the whole run.
fn scenario_events(config: &ScenarioConfig) -> Vec<ChargeEvent> {
    let mut events = config.events.clone();
    if config.arrivals.sessions_per_day > 0 {
        let first_id = events.iter().map(|e| e.charge_event_id).max().map_or(1, |id| id + 1);
        let mut sampler = ArrivalSampler::new(config.arrivals.profile(), config.simulation.seed)
            .with_first_id(first_id);
        events.extend(sampler.sample(config.simulation.start_unix_time, config.simulation.days()));
    }
    events
}

fn drive<C: Controller>(
    config: SimConfig,
    port: SupplyEquipment,
    controller: C,
    per_unit_voltage: f64,
) -> Result<(Vec<StepResult>, SupplyEquipment), SimError> {
    let mut engine = Engine::new(config, port, controller, per_unit_voltage);
    let results = engine.run()?;
    Ok((results, engine.into_port()))
}
