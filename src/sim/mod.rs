/// Seeded random charge-event generation.
pub mod arrivals;
/// Simulation clock for timestep management.
pub mod clock;
pub mod controller;
pub mod engine;
/// Charge event definitions.
pub mod event;
pub mod kpi;
/// Per-port state machine.
pub mod port;
/// Arrival-ordered queue with overlap policies.
pub mod queue;
/// Setpoint scheduling utilities.
pub mod schedule;
pub mod types;
