//! Single-port EV charging simulator: charge event queue, supply equipment
//! state machine, converter models and charge-profile forecasts.

pub mod cli;
pub mod config;
/// Piecewise polynomial curves used for efficiency and power factor.
pub mod curve;
pub mod devices;
pub mod error;
pub mod io;
pub mod profile;
pub mod runner;
/// Simulation engine, queue, port, scheduling, and event modules.
pub mod sim;
