use serde::Deserialize;

use crate::devices::ev_charger::ChargerLevel;
use crate::devices::types::{BatteryModel, BatteryState};
use crate::sim::event::{ChargeEvent, StopChargingCriterion};

/// Fraction of the rated acceptance left at 100% SOC after the taper.
const TAPER_FLOOR_FRACTION: f64 = 0.05;
/// Target SOC counts as reached within this margin (percent).
const SOC_TOLERANCE: f64 = 1e-6;
/// Longest integration sub-step inside one `advance` call.
const MAX_SUBSTEP_SECS: f64 = 30.0;

fn default_taper_start_soc() -> f64 {
    80.0
}

fn default_battery_efficiency() -> f64 {
    0.95
}

/// Catalog entry for a vehicle type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleSpec {
    pub name: String,
    /// Usable battery capacity in kWh.
    pub capacity_kwh: f64,
    /// On-board charger acceptance on AC levels (kW, DC side).
    pub max_ac_kw: f64,
    /// DC-fast acceptance (kW). Zero means the vehicle has no DC inlet.
    #[serde(default)]
    pub max_dc_kw: f64,
    /// SOC (percent) at which acceptance starts to taper.
    #[serde(default = "default_taper_start_soc")]
    pub taper_start_soc: f64,
    /// Fraction of P2 that reaches the cells.
    #[serde(default = "default_battery_efficiency")]
    pub battery_efficiency: f64,
}

impl VehicleSpec {
    /// # Panics
    ///
    /// Panics if capacity or AC acceptance is not positive.
    pub fn new(name: impl Into<String>, capacity_kwh: f64, max_ac_kw: f64, max_dc_kw: f64) -> Self {
        assert!(capacity_kwh > 0.0);
        assert!(max_ac_kw > 0.0);
        assert!(max_dc_kw >= 0.0);

        Self {
            name: name.into(),
            capacity_kwh,
            max_ac_kw,
            max_dc_kw,
            taper_start_soc: default_taper_start_soc(),
            battery_efficiency: default_battery_efficiency(),
        }
    }

    pub fn supports_dc_fast(&self) -> bool {
        self.max_dc_kw > 0.0
    }

    /// Acceptance limits of this vehicle on a charger of the given level.
    pub fn charge_limits(&self, level: ChargerLevel) -> ChargeLimits {
        let max_p2_kw = if level.is_ac() {
            self.max_ac_kw
        } else {
            self.max_dc_kw
        };
        ChargeLimits {
            capacity_kwh: self.capacity_kwh,
            max_p2_kw,
            taper_start_soc: self.taper_start_soc,
            battery_efficiency: self.battery_efficiency,
        }
    }
}

/// DC acceptance law shared by the battery model and the charge profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeLimits {
    pub capacity_kwh: f64,
    pub max_p2_kw: f64,
    pub taper_start_soc: f64,
    pub battery_efficiency: f64,
}

impl ChargeLimits {
    /// Maximum P2 the vehicle accepts at `soc`.
    ///
    /// Flat up to `taper_start_soc`, then linear down to a small floor at 100%.
    pub fn max_p2_kw_at(&self, soc: f64) -> f64 {
        if soc <= self.taper_start_soc || self.taper_start_soc >= 100.0 {
            return self.max_p2_kw;
        }
        let floor = self.max_p2_kw * TAPER_FLOOR_FRACTION;
        let progress = ((soc - self.taper_start_soc) / (100.0 - self.taper_start_soc)).min(1.0);
        self.max_p2_kw - (self.max_p2_kw - floor) * progress
    }

    /// SOC gained (percent) from `p2_kw` held for `hours`.
    pub fn soc_gain(&self, p2_kw: f64, hours: f64) -> f64 {
        p2_kw * self.battery_efficiency * hours / self.capacity_kwh * 100.0
    }
}

/// Reference battery model for one charge event.
///
/// Integrates the SOC-dependent acceptance in short sub-steps and reports the
/// average power over the whole step.
#[derive(Debug, Clone)]
pub struct VehicleChargeModel {
    limits: ChargeLimits,
    voltage_limited: bool,
    soc: f64,
    target_p2_kw: f64,
    arrival_unix_time: f64,
    departure_unix_time: f64,
    departure_soc: f64,
    criterion: StopChargingCriterion,
}

impl VehicleChargeModel {
    /// Creates a model starting at the event's arrival SOC with a zero target.
    ///
    /// `voltage_limited` scales acceptance by the per-unit voltage (AC levels).
    pub fn new(limits: ChargeLimits, voltage_limited: bool, event: &ChargeEvent) -> Self {
        Self {
            limits,
            voltage_limited,
            soc: event.arrival_soc,
            target_p2_kw: 0.0,
            arrival_unix_time: event.arrival_unix_time,
            departure_unix_time: event.departure_unix_time,
            departure_soc: event.departure_soc,
            criterion: event.stop_charging,
        }
    }

    pub fn target_p2_kw(&self) -> f64 {
        self.target_p2_kw
    }

    fn soc_cap(&self) -> f64 {
        if self.criterion.uses_target_soc() {
            self.departure_soc.min(100.0)
        } else {
            100.0
        }
    }

    fn is_complete(&self, now_unix_time: f64) -> bool {
        let soc_met = self.soc >= self.departure_soc - SOC_TOLERANCE;
        let time_met = now_unix_time >= self.departure_unix_time;
        match self.criterion {
            StopChargingCriterion::TargetSoc => soc_met,
            StopChargingCriterion::DepartureTime => time_met,
            StopChargingCriterion::WhicheverFirst => soc_met || time_met,
        }
    }
}

impl BatteryModel for VehicleChargeModel {
    fn advance(
        &mut self,
        prev_unix_time: f64,
        now_unix_time: f64,
        per_unit_voltage: f64,
    ) -> (bool, BatteryState) {
        let step_hrs = ((now_unix_time - prev_unix_time) / 3600.0).max(0.0);

        let start = prev_unix_time.max(self.arrival_unix_time);
        let end = if self.criterion.uses_departure_time() {
            now_unix_time.min(self.departure_unix_time)
        } else {
            now_unix_time
        };
        let window_secs = (end - start).max(0.0);

        let voltage_factor = if self.voltage_limited {
            per_unit_voltage.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let soc_cap = self.soc_cap();

        let mut e2_kwh = 0.0;
        if window_secs > 0.0 && self.target_p2_kw > 0.0 && self.soc < soc_cap {
            let substeps = (window_secs / MAX_SUBSTEP_SECS).ceil().max(1.0) as usize;
            let h = window_secs / substeps as f64 / 3600.0;
            for _ in 0..substeps {
                if self.soc >= soc_cap {
                    break;
                }
                let p2 = self
                    .target_p2_kw
                    .min(self.limits.max_p2_kw_at(self.soc) * voltage_factor);
                if p2 <= 0.0 {
                    break;
                }
                let gain = self.limits.soc_gain(p2, h);
                let headroom = soc_cap - self.soc;
                if gain >= headroom {
                    e2_kwh += p2 * h * headroom / gain;
                    self.soc = soc_cap;
                    break;
                }
                e2_kwh += p2 * h;
                self.soc += gain;
            }
        }

        let p2_kw = if step_hrs > 0.0 { e2_kwh / step_hrs } else { 0.0 };
        let state = BatteryState {
            soc_t1: self.soc,
            p1_kw: p2_kw * self.limits.battery_efficiency,
            p2_kw,
            time_step_duration_hrs: step_hrs,
        };
        (self.is_complete(now_unix_time), state)
    }

    fn has_arrived(&self, now_unix_time: f64) -> bool {
        now_unix_time >= self.arrival_unix_time
    }

    fn is_connected(&self, now_unix_time: f64) -> bool {
        self.has_arrived(now_unix_time) && now_unix_time < self.departure_unix_time
    }

    fn set_target_dc_power(&mut self, p2_kw: f64) {
        self.target_p2_kw = p2_kw.clamp(0.0, self.limits.max_p2_kw);
    }

    fn soc(&self) -> f64 {
        self.soc
    }
}
