//! Vehicle and charger catalog, and the per-pair models built from it.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::devices::battery::{ChargeLimits, VehicleChargeModel, VehicleSpec};
use crate::devices::converter::{ConverterCharacteristics, ConverterLimits, FixedPowerFactorConverter};
use crate::devices::ev_charger::{ChargerLevel, ChargerSpec};
use crate::devices::types::BatteryModel;
use crate::error::SimError;
use crate::profile::{ChargeProfile, ModeledChargeProfile};
use crate::sim::event::ChargeEvent;

/// Everything a port needs to serve one session.
#[derive(Debug)]
pub struct ChargeModels {
    pub battery: Box<dyn BatteryModel>,
    pub converter: ConverterCharacteristics,
    pub profile: Arc<dyn ChargeProfile>,
}

/// A vehicle/charger pairing that cannot charge.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("vehicle type `{vehicle_type}` cannot charge on `{charger_type}`: {reason}")]
pub struct Incompatibility {
    pub vehicle_type: String,
    pub charger_type: String,
    pub reason: String,
}

/// Shared, read-only source of per-session models.
pub trait ChargeModelResolver: Send + Sync {
    /// Builds fresh models for `event` on a charger of `charger_type`.
    fn resolve(&self, event: &ChargeEvent, charger_type: &str) -> Result<ChargeModels, Incompatibility>;
}

#[derive(Debug)]
struct PairModels {
    limits: ChargeLimits,
    voltage_limited: bool,
    converter: ConverterCharacteristics,
    profile: Arc<dyn ChargeProfile>,
}

/// Catalog of vehicle and charger types with precomputed charge profiles.
///
/// Built once and shared between ports behind an `Arc`; never mutated after
/// construction.
#[derive(Debug)]
pub struct Inventory {
    vehicles: BTreeMap<String, VehicleSpec>,
    chargers: BTreeMap<String, ChargerSpec>,
    pairs: BTreeMap<(String, String), PairModels>,
}

/// Built-in vehicle and charger types.
pub fn default_catalog() -> (Vec<VehicleSpec>, Vec<ChargerSpec>) {
    let vehicles = vec![
        VehicleSpec::new("compact_bev", 40.0, 7.2, 50.0),
        VehicleSpec::new("long_range_bev", 82.0, 11.0, 150.0),
        VehicleSpec::new("phev", 14.0, 3.3, 0.0),
    ];
    let chargers = vec![ChargerSpec::level1(), ChargerSpec::level2(), ChargerSpec::dc_fast()];
    (vehicles, chargers)
}

fn incompatible_reason(vehicle: &VehicleSpec, charger: &ChargerSpec) -> Option<&'static str> {
    if charger.level == ChargerLevel::DcFast && !vehicle.supports_dc_fast() {
        Some("vehicle has no DC fast-charge inlet")
    } else {
        None
    }
}

impl Inventory {
    /// Validates the catalog and builds a profile for every compatible pair.
    ///
    /// # Errors
    ///
    /// Returns `SimError::DuplicateType` for repeated names and curve or
    /// converter errors from any charger.
    pub fn new(vehicles: Vec<VehicleSpec>, chargers: Vec<ChargerSpec>) -> Result<Self, SimError> {
        let mut vehicle_map = BTreeMap::new();
        for vehicle in vehicles {
            if vehicle_map.contains_key(&vehicle.name) {
                return Err(SimError::DuplicateType {
                    kind: "vehicle",
                    name: vehicle.name,
                });
            }
            vehicle_map.insert(vehicle.name.clone(), vehicle);
        }

        let mut charger_map = BTreeMap::new();
        let mut base = BTreeMap::new();
        for charger in chargers {
            if charger_map.contains_key(&charger.name) {
                return Err(SimError::DuplicateType {
                    kind: "charger",
                    name: charger.name,
                });
            }
            base.insert(charger.name.clone(), charger.characteristics()?);
            charger_map.insert(charger.name.clone(), charger);
        }

        let mut pairs = BTreeMap::new();
        for vehicle in vehicle_map.values() {
            for charger in charger_map.values() {
                if incompatible_reason(vehicle, charger).is_some() {
                    continue;
                }
                let Some(characteristics) = base.get(&charger.name) else {
                    continue;
                };
                let pair = Self::build_pair(vehicle, charger, characteristics)?;
                debug!(
                    vehicle = %vehicle.name,
                    charger = %charger.name,
                    max_p2_kw = pair.limits.max_p2_kw,
                    max_p3_kw = pair.converter.limits.max_p3_kw,
                    "built charge profile"
                );
                pairs.insert((vehicle.name.clone(), charger.name.clone()), pair);
            }
        }

        Ok(Self {
            vehicles: vehicle_map,
            chargers: charger_map,
            pairs,
        })
    }

    /// Inventory over [`default_catalog`].
    pub fn reference() -> Result<Self, SimError> {
        let (vehicles, chargers) = default_catalog();
        Self::new(vehicles, chargers)
    }

    fn build_pair(
        vehicle: &VehicleSpec,
        charger: &ChargerSpec,
        characteristics: &ConverterCharacteristics,
    ) -> Result<PairModels, SimError> {
        let mut limits = vehicle.charge_limits(charger.level);
        let charger_p2_kw = characteristics.approximate_dc_power_for(charger.max_p3_kw)?;
        limits.max_p2_kw = limits.max_p2_kw.min(charger_p2_kw);

        let max_p3_kw = characteristics.p3_for(limits.max_p2_kw)?;
        let converter = characteristics.clone().with_limits(ConverterLimits {
            min_p3_kw: charger.min_p3_kw.min(max_p3_kw),
            max_p3_kw,
        });
        let profile = ModeledChargeProfile::new(limits, &FixedPowerFactorConverter::new(converter.clone()))?;

        Ok(PairModels {
            limits,
            voltage_limited: charger.level.is_ac(),
            converter,
            profile: Arc::new(profile),
        })
    }

    pub fn vehicle(&self, name: &str) -> Option<&VehicleSpec> {
        self.vehicles.get(name)
    }

    pub fn charger(&self, name: &str) -> Option<&ChargerSpec> {
        self.chargers.get(name)
    }

    pub fn vehicle_types(&self) -> impl Iterator<Item = &str> {
        self.vehicles.keys().map(String::as_str)
    }

    pub fn is_compatible(&self, vehicle_type: &str, charger_type: &str) -> bool {
        self.pairs
            .contains_key(&(vehicle_type.to_string(), charger_type.to_string()))
    }

    fn incompatibility(&self, vehicle_type: &str, charger_type: &str) -> Incompatibility {
        let reason = match (self.vehicles.get(vehicle_type), self.chargers.get(charger_type)) {
            (None, _) => "unknown vehicle type",
            (_, None) => "unknown charger type",
            (Some(vehicle), Some(charger)) => {
                incompatible_reason(vehicle, charger).unwrap_or("no charge profile for this pair")
            }
        };
        Incompatibility {
            vehicle_type: vehicle_type.to_string(),
            charger_type: charger_type.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ChargeModelResolver for Inventory {
    fn resolve(&self, event: &ChargeEvent, charger_type: &str) -> Result<ChargeModels, Incompatibility> {
        let key = (event.vehicle_type.clone(), charger_type.to_string());
        let pair = self
            .pairs
            .get(&key)
            .ok_or_else(|| self.incompatibility(&event.vehicle_type, charger_type))?;

        Ok(ChargeModels {
            battery: Box::new(VehicleChargeModel::new(pair.limits, pair.voltage_limited, event)),
            converter: pair.converter.clone(),
            profile: Arc::clone(&pair.profile),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_catalog_builds_every_compatible_pair() {
        let inventory = Inventory::reference().expect("builtin catalog is valid");
        assert!(inventory.is_compatible("long_range_bev", "dc_fast"));
        assert!(inventory.is_compatible("phev", "L2"));
        assert!(!inventory.is_compatible("phev", "dc_fast"));
        assert_eq!(inventory.vehicle_types().count(), 3);
    }

    #[test]
    fn resolved_limits_respect_both_sides() {
        let inventory = Inventory::reference().expect("builtin catalog is valid");
        let limits = |vehicle_type: &str, charger_type: &str| {
            let event = ChargeEvent::new(1, vehicle_type, 0.0, 3600.0, 20.0, 80.0);
            let models = inventory.resolve(&event, charger_type).expect("compatible");
            models.converter.limits
        };
        // 3.3 kW on-board charger is the bottleneck
        let phev_l2 = limits("phev", "L2");
        assert!(phev_l2.max_p3_kw > 3.3 && phev_l2.max_p3_kw < 4.0);
        // 50 kW charger is the bottleneck
        let bev_dc = limits("long_range_bev", "dc_fast");
        assert!(bev_dc.max_p3_kw <= 50.0 + 1e-6 && bev_dc.max_p3_kw > 49.0);
    }

    #[test]
    fn resolve_reports_incompatibility() {
        let inventory = Inventory::reference().expect("builtin catalog is valid");
        let event = ChargeEvent::new(7, "phev", 0.0, 3600.0, 20.0, 80.0);
        let err = inventory.resolve(&event, "dc_fast").expect_err("no DC inlet");
        assert_eq!(err.vehicle_type, "phev");
        assert!(err.reason.contains("DC"));

        let unknown = ChargeEvent::new(8, "tractor", 0.0, 3600.0, 20.0, 80.0);
        let err = inventory.resolve(&unknown, "L2").expect_err("unknown type");
        assert_eq!(err.reason, "unknown vehicle type");
    }

    #[test]
    fn resolve_starts_battery_at_arrival_soc() {
        let inventory = Inventory::reference().expect("builtin catalog is valid");
        let event = ChargeEvent::new(9, "compact_bev", 0.0, 3600.0, 35.0, 80.0);
        let models = inventory.resolve(&event, "L2").expect("compatible");
        assert_eq!(models.battery.soc(), 35.0);
        let forecast = models.profile.result_for_soc(7.0, 35.0, 80.0);
        assert!(forecast.is_reachable());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (mut vehicles, chargers) = default_catalog();
        vehicles.push(VehicleSpec::new("phev", 10.0, 3.3, 0.0));
        let err = Inventory::new(vehicles, chargers).expect_err("duplicate");
        assert!(matches!(err, SimError::DuplicateType { kind: "vehicle", .. }));
    }
}
