//! Post-hoc KPI computation from simulation results.

use std::fmt;

use super::port::{ChargingStatus, Session};
use super::types::StepResult;

/// Sessions finishing this far below their departure SOC count as unmet (percent).
const UNMET_SOC_MARGIN: f64 = 0.1;

/// Aggregate key performance indicators derived from a complete simulation run.
///
/// Computed post-hoc from the step records and archived sessions so the
/// report always agrees with the exported time series.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiReport {
    /// AC energy drawn over the whole run, standby included (kWh).
    pub total_energy_kwh: f64,
    /// AC energy drawn above the standby level (kWh).
    pub charging_energy_kwh: f64,
    /// AC energy drawn at or below the standby level (kWh).
    pub standby_energy_kwh: f64,
    /// Reactive energy, signed (kVArh).
    pub reactive_energy_kvarh: f64,
    pub peak_p3_kw: f64,
    /// Largest reactive power magnitude (kVAr).
    pub peak_q3_kvar: f64,
    /// Steps reported as `ev_charging`.
    pub charging_steps: usize,
    pub sessions_completed: usize,
    pub sessions_ended_early: usize,
    /// Mean SOC at the end of archived sessions, if any.
    pub mean_final_soc: Option<f64>,
    /// Archived sessions that stopped below their departure SOC.
    pub unmet_soc_targets: usize,
}

impl KpiReport {
    /// Computes all KPIs.
    ///
    /// # Arguments
    ///
    /// * `results` - Complete simulation step results
    /// * `sessions` - Sessions archived during the run
    /// * `standby_p3_kw` - Port standby draw separating idle from charging energy
    pub fn from_results(results: &[StepResult], sessions: &[Session], standby_p3_kw: f64) -> Self {
        let mut total = 0.0;
        let mut charging = 0.0;
        let mut reactive = 0.0;
        let mut peak_p3 = 0.0_f64;
        let mut peak_q3 = 0.0_f64;
        let mut charging_steps = 0;

        for r in results {
            let dt = r.power.time_step_duration_hrs;
            let energy = r.power.p3_kw * dt;
            total += energy;
            if r.power.p3_kw > standby_p3_kw {
                charging += energy;
            }
            reactive += r.power.q3_kvar * dt;
            peak_p3 = peak_p3.max(r.power.p3_kw);
            peak_q3 = peak_q3.max(r.power.q3_kvar.abs());
            if r.status == ChargingStatus::EvCharging {
                charging_steps += 1;
            }
        }

        let ended_early = sessions.iter().filter(|s| s.ended_early).count();
        let mean_final_soc = if sessions.is_empty() {
            None
        } else {
            Some(sessions.iter().map(|s| s.now_soc).sum::<f64>() / sessions.len() as f64)
        };
        let unmet = sessions
            .iter()
            .filter(|s| s.now_soc < s.departure_soc - UNMET_SOC_MARGIN)
            .count();

        Self {
            total_energy_kwh: total,
            charging_energy_kwh: charging,
            standby_energy_kwh: total - charging,
            reactive_energy_kvarh: reactive,
            peak_p3_kw: peak_p3,
            peak_q3_kvar: peak_q3,
            charging_steps,
            sessions_completed: sessions.len() - ended_early,
            sessions_ended_early: ended_early,
            mean_final_soc,
            unmet_soc_targets: unmet,
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(
            f,
            "AC energy:             {:.2} kWh ({:.2} charging, {:.3} standby)",
            self.total_energy_kwh, self.charging_energy_kwh, self.standby_energy_kwh
        )?;
        writeln!(f, "Reactive energy:       {:.2} kVArh", self.reactive_energy_kvarh)?;
        writeln!(f, "Peak P3:               {:.2} kW", self.peak_p3_kw)?;
        writeln!(f, "Peak |Q3|:             {:.2} kVAr", self.peak_q3_kvar)?;
        writeln!(f, "Charging steps:        {}", self.charging_steps)?;
        writeln!(
            f,
            "Sessions:              {} completed, {} ended early",
            self.sessions_completed, self.sessions_ended_early
        )?;
        match self.mean_final_soc {
            Some(soc) => writeln!(f, "Mean final SoC:        {soc:.1}%")?,
            None => writeln!(f, "Mean final SoC:        -")?,
        }
        write!(f, "Unmet SoC targets:     {}", self.unmet_soc_targets)
    }
}
