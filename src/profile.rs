//! Charge-profile lookups used for forecasting.
//!
//! A profile answers "what does it take to go from SOC A to SOC B" or "where
//! does this much charge time get me" for one vehicle/charger pair at a given
//! AC setpoint, without touching any live session.

use std::fmt;

use crate::devices::battery::ChargeLimits;
use crate::devices::converter::{Converter, ConverterError};
use crate::devices::types::NEGLIGIBLE_POWER_KW;

/// Charge time reported for a target that is already met (hours).
///
/// Non-zero so callers can divide by it.
pub const ALREADY_MET_CHARGE_TIME_HRS: f64 = 1e-6;

/// Points in the sampled P2 → (P3, Q3) table.
const TABLE_POINTS: usize = 101;
/// SOC integration bin (percent).
const SOC_BIN: f64 = 0.1;

/// Outcome of a profile query.
///
/// Energies are per query (or per leg in a batch). `total_charge_time_hrs` is
/// cumulative across a batch; `incremental_charge_time_hrs` is the leg alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeProfileResult {
    pub soc_increase: f64,
    /// Energy into the cells.
    pub e1_kwh: f64,
    /// Energy on the DC side of the converter.
    pub e2_kwh: f64,
    /// Energy drawn from the grid.
    pub e3_kwh: f64,
    pub cum_q3_kvarh: f64,
    pub total_charge_time_hrs: f64,
    pub incremental_charge_time_hrs: f64,
}

impl ChargeProfileResult {
    pub fn already_met() -> Self {
        Self {
            soc_increase: 0.0,
            e1_kwh: 0.0,
            e2_kwh: 0.0,
            e3_kwh: 0.0,
            cum_q3_kvarh: 0.0,
            total_charge_time_hrs: ALREADY_MET_CHARGE_TIME_HRS,
            incremental_charge_time_hrs: -1.0,
        }
    }

    /// The target cannot be reached at the requested setpoint.
    pub fn unreachable() -> Self {
        Self {
            soc_increase: 0.0,
            e1_kwh: 0.0,
            e2_kwh: 0.0,
            e3_kwh: 0.0,
            cum_q3_kvarh: 0.0,
            total_charge_time_hrs: f64::INFINITY,
            incremental_charge_time_hrs: f64::INFINITY,
        }
    }

    pub fn is_already_met(&self) -> bool {
        self.incremental_charge_time_hrs < 0.0
    }

    pub fn is_reachable(&self) -> bool {
        self.total_charge_time_hrs.is_finite()
    }
}

/// Read-only charge-curve lookup for one vehicle/charger pair.
///
/// Implementations never fail: unreachable targets give
/// [`ChargeProfileResult::unreachable`] and met targets give
/// [`ChargeProfileResult::already_met`].
pub trait ChargeProfile: fmt::Debug + Send + Sync {
    /// Charging from `start_soc` to `end_soc` at `setpoint_p3_kw`.
    fn result_for_soc(&self, setpoint_p3_kw: f64, start_soc: f64, end_soc: f64)
    -> ChargeProfileResult;

    /// Charging from `start_soc` for `charge_time_hrs` at `setpoint_p3_kw`.
    fn result_for_duration(
        &self,
        setpoint_p3_kw: f64,
        start_soc: f64,
        charge_time_hrs: f64,
    ) -> ChargeProfileResult;

    /// One result per entry of `end_socs`, each leg starting where the
    /// previous one ended.
    fn results_for_socs(
        &self,
        setpoint_p3_kw: f64,
        start_soc: f64,
        end_socs: &[f64],
    ) -> Vec<ChargeProfileResult> {
        let mut chain = Chain::new(start_soc);
        end_socs
            .iter()
            .map(|&end_soc| {
                let leg = if chain.stalled {
                    ChargeProfileResult::unreachable()
                } else {
                    self.result_for_soc(setpoint_p3_kw, chain.soc, end_soc)
                };
                chain.push(leg)
            })
            .collect()
    }

    /// One result per entry of `elapsed_hrs`, which are cumulative times from
    /// the start of charging.
    fn results_for_durations(
        &self,
        setpoint_p3_kw: f64,
        start_soc: f64,
        elapsed_hrs: &[f64],
    ) -> Vec<ChargeProfileResult> {
        let mut chain = Chain::new(start_soc);
        let mut previous = 0.0;
        elapsed_hrs
            .iter()
            .map(|&elapsed| {
                let leg = self.result_for_duration(setpoint_p3_kw, chain.soc, elapsed - previous);
                previous = previous.max(elapsed);
                chain.push(leg)
            })
            .collect()
    }
}

/// Running totals for the batch queries.
struct Chain {
    soc: f64,
    time_hrs: f64,
    q3_kvarh: f64,
    stalled: bool,
}

impl Chain {
    fn new(soc: f64) -> Self {
        Self {
            soc,
            time_hrs: 0.0,
            q3_kvarh: 0.0,
            stalled: false,
        }
    }

    fn push(&mut self, mut leg: ChargeProfileResult) -> ChargeProfileResult {
        if !leg.is_reachable() {
            self.stalled = true;
            return leg;
        }
        if leg.is_already_met() {
            leg.total_charge_time_hrs = self.time_hrs.max(ALREADY_MET_CHARGE_TIME_HRS);
            leg.cum_q3_kvarh = self.q3_kvarh;
            return leg;
        }
        self.soc += leg.soc_increase;
        self.time_hrs += leg.incremental_charge_time_hrs;
        self.q3_kvarh += leg.cum_q3_kvarh;
        leg.total_charge_time_hrs = self.time_hrs;
        leg.cum_q3_kvarh = self.q3_kvarh;
        leg
    }
}

#[derive(Debug, Clone, Copy)]
struct TablePoint {
    p2_kw: f64,
    p3_kw: f64,
    q3_kvar: f64,
}

/// Reference profile built from the vehicle acceptance law and a sampled
/// converter response.
///
/// Assumes nominal voltage.
#[derive(Debug, Clone)]
pub struct ModeledChargeProfile {
    limits: ChargeLimits,
    table: Vec<TablePoint>,
}

/// Energy and time accumulated while integrating over SOC bins.
#[derive(Default)]
struct Totals {
    soc_increase: f64,
    e1_kwh: f64,
    e2_kwh: f64,
    e3_kwh: f64,
    q3_kvarh: f64,
    hours: f64,
}

impl Totals {
    fn into_result(self) -> ChargeProfileResult {
        ChargeProfileResult {
            soc_increase: self.soc_increase,
            e1_kwh: self.e1_kwh,
            e2_kwh: self.e2_kwh,
            e3_kwh: self.e3_kwh,
            cum_q3_kvarh: self.q3_kvarh,
            total_charge_time_hrs: self.hours,
            incremental_charge_time_hrs: self.hours,
        }
    }
}

impl ModeledChargeProfile {
    /// Samples `converter` over the vehicle's DC acceptance range.
    ///
    /// # Errors
    ///
    /// Returns the first `ConverterError` hit while sampling, so a bad curve
    /// fails at construction rather than in a forecast.
    pub fn new(limits: ChargeLimits, converter: &impl Converter) -> Result<Self, ConverterError> {
        let table = (0..TABLE_POINTS)
            .map(|i| {
                let p2_kw = limits.max_p2_kw * i as f64 / (TABLE_POINTS - 1) as f64;
                let power = converter.convert(p2_kw * limits.battery_efficiency, p2_kw, 1.0)?;
                Ok(TablePoint {
                    p2_kw,
                    p3_kw: power.p3_kw,
                    q3_kvar: power.q3_kvar,
                })
            })
            .collect::<Result<Vec<_>, ConverterError>>()?;
        Ok(Self { limits, table })
    }

    pub fn limits(&self) -> &ChargeLimits {
        &self.limits
    }

    /// Grid-side power for `p2_kw`, linearly interpolated.
    fn ac_power_for(&self, p2_kw: f64) -> (f64, f64) {
        let step = self.limits.max_p2_kw / (TABLE_POINTS - 1) as f64;
        if step <= 0.0 {
            return (0.0, 0.0);
        }
        let pos = (p2_kw / step).clamp(0.0, (TABLE_POINTS - 1) as f64);
        let i = (pos.floor() as usize).min(TABLE_POINTS - 2);
        let frac = pos - i as f64;
        let (a, b) = (self.table[i], self.table[i + 1]);
        (
            a.p3_kw + (b.p3_kw - a.p3_kw) * frac,
            a.q3_kvar + (b.q3_kvar - a.q3_kvar) * frac,
        )
    }

    /// Largest P2 whose grid draw stays within `p3_kw`.
    fn dc_cap_for(&self, p3_kw: f64) -> f64 {
        let idx = self.table.partition_point(|t| t.p3_kw <= p3_kw);
        if idx == 0 {
            return 0.0;
        }
        if idx == self.table.len() {
            return self.limits.max_p2_kw;
        }
        let (a, b) = (self.table[idx - 1], self.table[idx]);
        let span = b.p3_kw - a.p3_kw;
        if span <= 0.0 {
            return a.p2_kw;
        }
        a.p2_kw + (b.p2_kw - a.p2_kw) * (p3_kw - a.p3_kw) / span
    }

    fn p2_at(&self, p2_cap: f64, soc: f64) -> f64 {
        p2_cap.min(self.limits.max_p2_kw_at(soc))
    }

    /// Accounts for `hours` spent at `p2_kw`.
    fn accumulate(&self, totals: &mut Totals, p2_kw: f64, hours: f64, soc_gain: f64) {
        let (p3_kw, q3_kvar) = self.ac_power_for(p2_kw);
        totals.soc_increase += soc_gain;
        totals.e1_kwh += p2_kw * self.limits.battery_efficiency * hours;
        totals.e2_kwh += p2_kw * hours;
        totals.e3_kwh += p3_kw * hours;
        totals.q3_kvarh += q3_kvar * hours;
        totals.hours += hours;
    }
}

impl ChargeProfile for ModeledChargeProfile {
    fn result_for_soc(
        &self,
        setpoint_p3_kw: f64,
        start_soc: f64,
        end_soc: f64,
    ) -> ChargeProfileResult {
        let end_soc = end_soc.min(100.0);
        if end_soc <= start_soc {
            return ChargeProfileResult::already_met();
        }
        let p2_cap = self.dc_cap_for(setpoint_p3_kw);
        let mut totals = Totals::default();
        let mut soc = start_soc;
        while soc < end_soc {
            let p2 = self.p2_at(p2_cap, soc);
            if p2 <= NEGLIGIBLE_POWER_KW {
                return ChargeProfileResult::unreachable();
            }
            let bin = SOC_BIN.min(end_soc - soc);
            let hours = bin / self.limits.soc_gain(p2, 1.0);
            self.accumulate(&mut totals, p2, hours, bin);
            soc += bin;
        }
        totals.into_result()
    }

    fn result_for_duration(
        &self,
        setpoint_p3_kw: f64,
        start_soc: f64,
        charge_time_hrs: f64,
    ) -> ChargeProfileResult {
        if charge_time_hrs <= 0.0 || start_soc >= 100.0 {
            return ChargeProfileResult::already_met();
        }
        let p2_cap = self.dc_cap_for(setpoint_p3_kw);
        let mut totals = Totals::default();
        let mut soc = start_soc;
        while soc < 100.0 && totals.hours < charge_time_hrs {
            let p2 = self.p2_at(p2_cap, soc);
            if p2 <= NEGLIGIBLE_POWER_KW {
                // Stalled: the clock runs without any charge.
                totals.hours = charge_time_hrs;
                break;
            }
            let rate = self.limits.soc_gain(p2, 1.0);
            let bin = SOC_BIN.min(100.0 - soc);
            let remaining = charge_time_hrs - totals.hours;
            let (gain, hours) = if bin / rate > remaining {
                (rate * remaining, remaining)
            } else {
                (bin, bin / rate)
            };
            self.accumulate(&mut totals, p2, hours, gain);
            soc += gain;
        }
        totals.into_result()
    }
}
