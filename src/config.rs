//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::devices::inventory::default_catalog;
use crate::devices::{ChargerLevel, ChargerSpec, VehicleSpec};
use crate::sim::arrivals::ArrivalProfile;
use crate::sim::event::ChargeEvent;
use crate::sim::queue::{DEFAULT_MIN_REMAINING_CHARGE_SECS, QueuingMode};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// The simulated port.
    #[serde(default)]
    pub port: PortSection,
    /// Queue conflict policy.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Random event generator.
    #[serde(default)]
    pub arrivals: ArrivalsConfig,
    /// Explicit charge events, queued before any generated ones.
    #[serde(default)]
    pub events: Vec<ChargeEvent>,
    /// Setpoints followed by the `"schedule"` controller.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Vehicle types added to (or replacing) the built-in catalog.
    #[serde(default)]
    pub vehicles: Vec<VehicleSpec>,
    /// Charger types added to (or replacing) the built-in catalog.
    #[serde(default)]
    pub chargers: Vec<ChargerSpec>,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Unix time at the start of the run.
    pub start_unix_time: f64,
    /// Step length in seconds (must be > 0).
    pub step_secs: f64,
    /// Number of steps to run (must be > 0).
    pub steps: usize,
    /// Master random seed.
    pub seed: u64,
    /// Grid voltage at the port, per unit of nominal.
    pub per_unit_voltage: f64,
    /// Controller type: `"uncontrolled"` or `"schedule"`.
    pub controller: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_unix_time: 0.0,
            step_secs: 60.0,
            steps: 1440,
            seed: 42,
            per_unit_voltage: 1.0,
            controller: "uncontrolled".to_string(),
        }
    }
}

impl SimulationConfig {
    /// Whole days touched by the run, at least one.
    pub fn days(&self) -> usize {
        let span = self.steps as f64 * self.step_secs;
        ((span / 86_400.0).ceil() as usize).max(1)
    }
}

/// Port parameters. Unset overrides fall back to the charger's catalog values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortSection {
    pub se_id: u64,
    /// Catalog name of the installed charger.
    pub charger_type: String,
    /// Caps AC real power below the charger rating (kW).
    pub power_limit_p3_kw: Option<f64>,
    pub standby_p3_kw: Option<f64>,
    pub standby_q3_kvar: Option<f64>,
}

impl Default for PortSection {
    fn default() -> Self {
        Self {
            se_id: 1,
            charger_type: "L2".to_string(),
            power_limit_p3_kw: None,
            standby_p3_kw: None,
            standby_q3_kvar: None,
        }
    }
}

/// Queue conflict policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// `"overlap_limited"` or `"overlap_allowed"`.
    pub mode: String,
    /// Overlap tolerated before the older event is evicted (s).
    pub max_allowed_overlap_secs: f64,
    /// Queued events leaving sooner than this are purged (s).
    pub min_remaining_charge_secs: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mode: "overlap_limited".to_string(),
            max_allowed_overlap_secs: 60.0,
            min_remaining_charge_secs: DEFAULT_MIN_REMAINING_CHARGE_SECS,
        }
    }
}

impl QueueConfig {
    /// Queue mode, or `None` for an unknown mode string.
    pub fn queuing_mode(&self) -> Option<QueuingMode> {
        match self.mode.as_str() {
            "overlap_limited" => Some(QueuingMode::OverlapLimited {
                max_allowed_overlap_secs: self.max_allowed_overlap_secs,
            }),
            "overlap_allowed" => Some(QueuingMode::OverlapAllowed),
            _ => None,
        }
    }
}

/// Random charge event generator. `sessions_per_day = 0` disables it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArrivalsConfig {
    pub sessions_per_day: usize,
    /// Arrival window, hours after midnight.
    pub earliest_arrival_hr: f64,
    pub latest_arrival_hr: f64,
    pub dwell_hrs_min: f64,
    pub dwell_hrs_max: f64,
    /// Arrival SOC range (percent).
    pub arrival_soc_min: f64,
    pub arrival_soc_max: f64,
    /// Requested departure SOC (percent).
    pub departure_soc: f64,
    /// Catalog vehicle types drawn uniformly.
    pub vehicle_types: Vec<String>,
    /// Share of events that follow external P3 setpoints (0.0-1.0).
    pub managed_fraction: f64,
}

impl Default for ArrivalsConfig {
    fn default() -> Self {
        Self {
            sessions_per_day: 3,
            earliest_arrival_hr: 7.0,
            latest_arrival_hr: 19.0,
            dwell_hrs_min: 1.0,
            dwell_hrs_max: 4.0,
            arrival_soc_min: 15.0,
            arrival_soc_max: 50.0,
            departure_soc: 85.0,
            vehicle_types: vec!["compact_bev".to_string(), "long_range_bev".to_string()],
            managed_fraction: 0.0,
        }
    }
}

impl ArrivalsConfig {
    pub fn profile(&self) -> ArrivalProfile {
        ArrivalProfile {
            sessions_per_day: self.sessions_per_day,
            earliest_arrival_hr: self.earliest_arrival_hr,
            latest_arrival_hr: self.latest_arrival_hr,
            dwell_hrs_min: self.dwell_hrs_min,
            dwell_hrs_max: self.dwell_hrs_max,
            arrival_soc_min: self.arrival_soc_min,
            arrival_soc_max: self.arrival_soc_max,
            departure_soc: self.departure_soc,
            vehicle_types: self.vehicle_types.clone(),
            managed_fraction: self.managed_fraction,
        }
    }
}

/// Repeating setpoint schedules for the `"schedule"` controller.
///
/// Each entry holds for `interval_secs` (one step when unset); the list
/// wraps when exhausted. An empty list sends no setpoint of that kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    pub interval_secs: Option<f64>,
    pub p3_kw: Vec<f64>,
    pub q3_kvar: Vec<f64>,
}

impl ScheduleConfig {
    /// Expands `values` to one entry per simulation step.
    pub fn per_step(&self, values: &[f64], step_secs: f64) -> Vec<f64> {
        let repeat = self
            .interval_secs
            .map_or(1, |interval| ((interval / step_secs).round() as usize).max(1));
        values
            .iter()
            .flat_map(|&v| std::iter::repeat_n(v, repeat))
            .collect()
    }
}

/// A validation error with the offending field path and a human-readable message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.step_secs"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: one day on an L2 port, uncontrolled.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the managed preset: every session follows an hourly P3
    /// schedule that backs off during the evening peak.
    pub fn managed() -> Self {
        let mut p3_kw = vec![7.0; 24];
        for hour in p3_kw.iter_mut().take(21).skip(17) {
            *hour = 2.0;
        }
        Self {
            simulation: SimulationConfig {
                controller: "schedule".to_string(),
                ..SimulationConfig::default()
            },
            arrivals: ArrivalsConfig {
                sessions_per_day: 2,
                earliest_arrival_hr: 15.0,
                latest_arrival_hr: 18.0,
                dwell_hrs_min: 4.0,
                dwell_hrs_max: 6.0,
                managed_fraction: 1.0,
                ..ArrivalsConfig::default()
            },
            schedule: ScheduleConfig {
                interval_secs: Some(3600.0),
                p3_kw,
                q3_kvar: Vec::new(),
            },
            ..Self::default()
        }
    }

    /// Returns the fleet preset: a busy DC-fast port over two days with
    /// five-minute steps and overlapping arrivals kept in the queue.
    pub fn fleet() -> Self {
        Self {
            simulation: SimulationConfig {
                step_secs: 300.0,
                steps: 576,
                ..SimulationConfig::default()
            },
            port: PortSection {
                charger_type: "dc_fast".to_string(),
                ..PortSection::default()
            },
            queue: QueueConfig {
                mode: "overlap_allowed".to_string(),
                ..QueueConfig::default()
            },
            arrivals: ArrivalsConfig {
                sessions_per_day: 10,
                earliest_arrival_hr: 6.0,
                latest_arrival_hr: 22.0,
                dwell_hrs_min: 0.5,
                dwell_hrs_max: 1.5,
                arrival_soc_min: 10.0,
                arrival_soc_max: 40.0,
                departure_soc: 80.0,
                ..ArrivalsConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "managed", "fleet"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "managed" => Ok(Self::managed()),
            "fleet" => Ok(Self::fleet()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Built-in catalog with `[[vehicles]]` and `[[chargers]]` applied.
    ///
    /// An entry whose name matches a built-in type replaces it.
    pub fn catalog(&self) -> (Vec<VehicleSpec>, Vec<ChargerSpec>) {
        let (mut vehicles, mut chargers) = default_catalog();
        vehicles.retain(|v| self.vehicles.iter().all(|o| o.name != v.name));
        vehicles.extend(self.vehicles.iter().cloned());
        chargers.retain(|c| self.chargers.iter().all(|o| o.name != c.name));
        chargers.extend(self.chargers.iter().cloned());
        (vehicles, chargers)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let (vehicles, chargers) = self.catalog();

        let s = &self.simulation;
        if !s.start_unix_time.is_finite() {
            errors.push(ConfigError::new("simulation.start_unix_time", "must be finite"));
        }
        if !(s.step_secs > 0.0 && s.step_secs.is_finite()) {
            errors.push(ConfigError::new("simulation.step_secs", "must be > 0"));
        }
        if s.steps == 0 {
            errors.push(ConfigError::new("simulation.steps", "must be > 0"));
        }
        if !(s.per_unit_voltage > 0.0 && s.per_unit_voltage.is_finite()) {
            errors.push(ConfigError::new("simulation.per_unit_voltage", "must be > 0"));
        }
        if s.controller != "uncontrolled" && s.controller != "schedule" {
            errors.push(ConfigError::new(
                "simulation.controller",
                format!(
                    "must be \"uncontrolled\" or \"schedule\", got \"{}\"",
                    s.controller
                ),
            ));
        }

        let port = &self.port;
        match chargers.iter().find(|c| c.name == port.charger_type) {
            None => errors.push(ConfigError::new(
                "port.charger_type",
                format!("unknown charger type \"{}\"", port.charger_type),
            )),
            Some(charger) => {
                if let Some(limit) = port.power_limit_p3_kw {
                    if !(limit > 0.0 && limit <= charger.max_p3_kw) {
                        errors.push(ConfigError::new(
                            "port.power_limit_p3_kw",
                            format!("must be in (0, {}]", charger.max_p3_kw),
                        ));
                    }
                }
            }
        }
        if port.standby_p3_kw.is_some_and(|p| !(p >= 0.0)) {
            errors.push(ConfigError::new("port.standby_p3_kw", "must be >= 0"));
        }

        let q = &self.queue;
        if q.queuing_mode().is_none() {
            errors.push(ConfigError::new(
                "queue.mode",
                format!(
                    "must be \"overlap_limited\" or \"overlap_allowed\", got \"{}\"",
                    q.mode
                ),
            ));
        }
        if !(q.max_allowed_overlap_secs >= 0.0) {
            errors.push(ConfigError::new("queue.max_allowed_overlap_secs", "must be >= 0"));
        }
        if !(q.min_remaining_charge_secs >= 0.0) {
            errors.push(ConfigError::new("queue.min_remaining_charge_secs", "must be >= 0"));
        }

        let a = &self.arrivals;
        if a.sessions_per_day > 0 {
            if !(a.earliest_arrival_hr >= 0.0) || a.earliest_arrival_hr > a.latest_arrival_hr {
                errors.push(ConfigError::new(
                    "arrivals.earliest_arrival_hr",
                    "must be >= 0 and <= arrivals.latest_arrival_hr",
                ));
            }
            if !(a.dwell_hrs_min > 0.0) || a.dwell_hrs_min > a.dwell_hrs_max {
                errors.push(ConfigError::new(
                    "arrivals.dwell_hrs_min",
                    "must be > 0 and <= arrivals.dwell_hrs_max",
                ));
            }
            if !(a.arrival_soc_min >= 0.0)
                || a.arrival_soc_min > a.arrival_soc_max
                || a.arrival_soc_max > 100.0
            {
                errors.push(ConfigError::new(
                    "arrivals.arrival_soc_min",
                    "arrival SOC range must lie in [0, 100] with min <= max",
                ));
            }
            if !(0.0..=100.0).contains(&a.departure_soc) {
                errors.push(ConfigError::new("arrivals.departure_soc", "must be in [0, 100]"));
            }
            if !(0.0..=1.0).contains(&a.managed_fraction) {
                errors.push(ConfigError::new(
                    "arrivals.managed_fraction",
                    "must be in [0.0, 1.0]",
                ));
            }
            if a.vehicle_types.is_empty() {
                errors.push(ConfigError::new("arrivals.vehicle_types", "must not be empty"));
            }
            for name in &a.vehicle_types {
                if vehicles.iter().all(|v| &v.name != name) {
                    errors.push(ConfigError::new(
                        "arrivals.vehicle_types",
                        format!("unknown vehicle type \"{name}\""),
                    ));
                }
            }
        }

        for (i, e) in self.events.iter().enumerate() {
            if !e.arrival_unix_time.is_finite() {
                errors.push(ConfigError::new(
                    format!("events[{i}].arrival_unix_time"),
                    "must be finite",
                ));
            }
            if !e.departure_unix_time.is_finite() {
                errors.push(ConfigError::new(
                    format!("events[{i}].departure_unix_time"),
                    "must be finite",
                ));
            } else if !(e.departure_unix_time >= e.arrival_unix_time) {
                errors.push(ConfigError::new(
                    format!("events[{i}].departure_unix_time"),
                    "must be >= arrival_unix_time",
                ));
            }
            if !(0.0..=100.0).contains(&e.arrival_soc) || !(0.0..=100.0).contains(&e.departure_soc) {
                errors.push(ConfigError::new(
                    format!("events[{i}].arrival_soc"),
                    "SOC values must be in [0, 100]",
                ));
            }
            if vehicles.iter().all(|v| v.name != e.vehicle_type) {
                errors.push(ConfigError::new(
                    format!("events[{i}].vehicle_type"),
                    format!("unknown vehicle type \"{}\"", e.vehicle_type),
                ));
            }
        }

        let sched = &self.schedule;
        if sched.interval_secs.is_some_and(|i| !(i > 0.0)) {
            errors.push(ConfigError::new("schedule.interval_secs", "must be > 0"));
        }
        if s.controller == "schedule" && sched.p3_kw.is_empty() && sched.q3_kvar.is_empty() {
            errors.push(ConfigError::new(
                "schedule.p3_kw",
                "the schedule controller needs p3_kw or q3_kvar values",
            ));
        }
        if sched.p3_kw.iter().any(|p| !(*p >= 0.0)) {
            errors.push(ConfigError::new("schedule.p3_kw", "values must be >= 0"));
        }

        for (i, v) in self.vehicles.iter().enumerate() {
            if !(v.capacity_kwh > 0.0) || !(v.max_ac_kw > 0.0) || !(v.max_dc_kw >= 0.0) {
                errors.push(ConfigError::new(
                    format!("vehicles[{i}]"),
                    "capacity and AC acceptance must be > 0, DC acceptance >= 0",
                ));
            }
            if !(v.battery_efficiency > 0.0 && v.battery_efficiency <= 1.0) {
                errors.push(ConfigError::new(
                    format!("vehicles[{i}].battery_efficiency"),
                    "must be in (0.0, 1.0]",
                ));
            }
            if !(0.0..=100.0).contains(&v.taper_start_soc) {
                errors.push(ConfigError::new(
                    format!("vehicles[{i}].taper_start_soc"),
                    "must be in [0, 100]",
                ));
            }
        }
        for (i, c) in self.chargers.iter().enumerate() {
            if !(c.max_p3_kw > 0.0) || !(c.min_p3_kw >= 0.0) || c.min_p3_kw > c.max_p3_kw {
                errors.push(ConfigError::new(
                    format!("chargers[{i}].max_p3_kw"),
                    "must be > 0 and >= min_p3_kw >= 0",
                ));
            }
            if !(c.max_apparent_power_kva >= c.max_p3_kw) {
                errors.push(ConfigError::new(
                    format!("chargers[{i}].max_apparent_power_kva"),
                    "must be >= max_p3_kw",
                ));
            }
            if !(c.standby_p3_kw >= 0.0) {
                errors.push(ConfigError::new(
                    format!("chargers[{i}].standby_p3_kw"),
                    "must be >= 0",
                ));
            }
            if !c.standby_q3_kvar.is_finite() {
                errors.push(ConfigError::new(
                    format!("chargers[{i}].standby_q3_kvar"),
                    "must be finite",
                ));
            }
        }

        errors
    }

    /// Charger level of the configured port, if the type is known.
    pub fn port_level(&self) -> Option<ChargerLevel> {
        let (_, chargers) = self.catalog();
        chargers
            .into_iter()
            .find(|c| c.name == self.port.charger_type)
            .map(|c| c.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
        assert!(e.to_string().starts_with("config error: preset:"));
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
start_unix_time = 1700000000
step_secs = 300
steps = 288
seed = 99
controller = "schedule"

[port]
se_id = 7
charger_type = "dc_fast"
standby_p3_kw = 0.05

[queue]
mode = "overlap_allowed"
min_remaining_charge_secs = 120

[arrivals]
sessions_per_day = 0

[[events]]
charge_event_id = 1
vehicle_type = "compact_bev"
arrival_unix_time = 1700003600
departure_unix_time = 1700007200
arrival_soc = 20
departure_soc = 80
stop_charging = "target_soc"
control = { energy = "external" }

[schedule]
interval_secs = 3600
p3_kw = [20.0, 40.0]
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.steps), Some(288));
        assert_eq!(cfg.as_ref().map(|c| &*c.port.charger_type), Some("dc_fast"));
        assert_eq!(cfg.as_ref().map(|c| c.events.len()), Some(1));
        assert_eq!(
            cfg.as_ref().and_then(|c| c.queue.queuing_mode()),
            Some(QueuingMode::OverlapAllowed)
        );
        let errors = cfg.map(|c| c.validate()).unwrap_or_default();
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
steps = 24
bogus_field = true
"#;
        let result = ScenarioConfig::from_toml_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn validation_catches_zero_steps() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.steps = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.steps"));
    }

    #[test]
    fn validation_catches_bad_controller() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.controller = "bogus".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.controller"));
    }

    #[test]
    fn validation_catches_unknown_charger() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.port.charger_type = "L9".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "port.charger_type"));
    }

    #[test]
    fn validation_catches_bad_queue_mode() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.queue.mode = "fifo".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "queue.mode"));
    }

    #[test]
    fn validation_catches_inverted_event() {
        let mut cfg = ScenarioConfig::baseline();
        let mut event = ChargeEvent::new(1, "phev", 100.0, 200.0, 20.0, 80.0);
        event.departure_unix_time = 50.0;
        cfg.events.push(event);
        let errors = cfg.validate();
        assert!(
            errors
                .iter()
                .any(|e| e.field == "events[0].departure_unix_time")
        );
    }

    #[test]
    fn validation_catches_non_finite_event_times() {
        let toml = r#"
[[events]]
charge_event_id = 1
vehicle_type = "phev"
arrival_unix_time = inf
departure_unix_time = inf
arrival_soc = 20.0
departure_soc = 80.0
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).expect("parses");
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "events[0].arrival_unix_time"));
        assert!(errors.iter().any(|e| e.field == "events[0].departure_unix_time"));
    }

    #[test]
    fn validation_catches_negative_charger_standby() {
        let mut cfg = ScenarioConfig::baseline();
        let mut charger = ChargerSpec::level2();
        charger.standby_p3_kw = -0.5;
        charger.standby_q3_kvar = f64::NAN;
        cfg.chargers.push(charger);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "chargers[0].standby_p3_kw"));
        assert!(errors.iter().any(|e| e.field == "chargers[0].standby_q3_kvar"));
    }

    #[test]
    fn validation_catches_taper_knee_out_of_range() {
        let mut cfg = ScenarioConfig::baseline();
        let mut vehicle = VehicleSpec::new("van", 70.0, 11.0, 80.0);
        vehicle.taper_start_soc = 120.0;
        cfg.vehicles.push(vehicle);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "vehicles[0].taper_start_soc"));
    }

    #[test]
    fn schedule_controller_needs_values() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.controller = "schedule".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "schedule.p3_kw"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn fleet_uses_dc_fast() {
        let fleet = ScenarioConfig::fleet();
        assert_eq!(fleet.port_level(), Some(ChargerLevel::DcFast));
        assert_eq!(fleet.simulation.days(), 2);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[simulation]
seed = 99
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok());
        let cfg = cfg.ok();
        // seed overridden
        assert_eq!(cfg.as_ref().map(|c| c.simulation.seed), Some(99));
        // steps kept default
        assert_eq!(cfg.as_ref().map(|c| c.simulation.steps), Some(1440));
        // port kept default
        assert_eq!(cfg.as_ref().map(|c| &*c.port.charger_type), Some("L2"));
    }

    #[test]
    fn catalog_overrides_replace_by_name() {
        let toml = r#"
[[vehicles]]
name = "phev"
capacity_kwh = 18.0
max_ac_kw = 6.6

[[vehicles]]
name = "van"
capacity_kwh = 70.0
max_ac_kw = 11.0
max_dc_kw = 80.0
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).expect("parses");
        let (vehicles, chargers) = cfg.catalog();
        assert_eq!(vehicles.len(), 4);
        let phev = vehicles.iter().find(|v| v.name == "phev").expect("phev present");
        assert_eq!(phev.capacity_kwh, 18.0);
        assert_eq!(chargers.len(), 3);
    }

    #[test]
    fn hourly_schedule_expands_per_step() {
        let sched = ScheduleConfig {
            interval_secs: Some(3600.0),
            p3_kw: vec![1.0, 2.0],
            q3_kvar: Vec::new(),
        };
        let per_step = sched.per_step(&sched.p3_kw, 900.0);
        assert_eq!(per_step, vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0]);
        let unset = ScheduleConfig::default();
        assert_eq!(unset.per_step(&[3.0], 60.0), vec![3.0]);
    }
}
