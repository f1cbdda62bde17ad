//! Per-session device models: vehicle battery, charger converter and the
//! catalog that pairs them.

/// Vehicle battery acceptance model.
pub mod battery;
/// AC/DC converter variants.
pub mod converter;
/// Charger catalog entries.
pub mod ev_charger;
pub mod inventory;
pub mod types;

// Re-export the main types for convenience
pub use battery::{ChargeLimits, VehicleChargeModel, VehicleSpec};
pub use converter::{Converter, ConverterLimits, ConverterModel};
pub use ev_charger::{ChargerLevel, ChargerSpec};
pub use inventory::{ChargeModelResolver, Incompatibility, Inventory};
pub use types::{BatteryModel, BatteryState, SePower};
