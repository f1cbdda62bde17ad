use serde::Deserialize;

use crate::curve::{CurveConfig, OutOfBoundsPolicy, SegmentConfig};
use crate::devices::converter::{ConverterCharacteristics, ConverterLimits};
use crate::error::SimError;

/// Charger power class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargerLevel {
    L1,
    L2,
    DcFast,
}

impl ChargerLevel {
    /// AC levels charge through the vehicle's on-board charger.
    pub fn is_ac(self) -> bool {
        matches!(self, Self::L1 | Self::L2)
    }
}

/// Catalog entry for a charger type.
///
/// `efficiency` maps P2 (kW) to the conversion efficiency and `power_factor`
/// maps P3 (kW) to the signed power factor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChargerSpec {
    pub name: String,
    pub level: ChargerLevel,
    pub max_p3_kw: f64,
    #[serde(default)]
    pub min_p3_kw: f64,
    pub max_apparent_power_kva: f64,
    #[serde(default)]
    pub standby_p3_kw: f64,
    #[serde(default)]
    pub standby_q3_kvar: f64,
    pub efficiency: CurveConfig,
    pub power_factor: CurveConfig,
}

fn curve(segments: &[(f64, f64, &[f64])]) -> CurveConfig {
    CurveConfig {
        segments: segments
            .iter()
            .map(|(lower, upper, c)| SegmentConfig {
                lower: *lower,
                upper: *upper,
                coefficients: c.to_vec(),
            })
            .collect(),
        take_abs_of_x: true,
        boundary_tolerance: 1e-6,
        out_of_bounds: OutOfBoundsPolicy::Clamp,
    }
}

impl ChargerSpec {
    /// 120 V, 12 A residential outlet.
    pub fn level1() -> Self {
        Self {
            name: "L1".to_string(),
            level: ChargerLevel::L1,
            max_p3_kw: 1.44,
            min_p3_kw: 0.0,
            max_apparent_power_kva: 1.5,
            standby_p3_kw: 0.005,
            standby_q3_kvar: 0.0,
            efficiency: curve(&[(0.0, 2.5, &[0.06, 0.78])]),
            power_factor: curve(&[(0.0, 3.0, &[0.0, 0.98])]),
        }
    }

    /// 240 V, 48 A wall box.
    pub fn level2() -> Self {
        Self {
            name: "L2".to_string(),
            level: ChargerLevel::L2,
            max_p3_kw: 11.5,
            min_p3_kw: 0.0,
            max_apparent_power_kva: 12.0,
            standby_p3_kw: 0.01,
            standby_q3_kvar: 0.002,
            efficiency: curve(&[(0.0, 1.0, &[0.4, 0.5]), (1.0, 20.0, &[-0.0005, 0.0105, 0.89])]),
            power_factor: curve(&[(0.0, 25.0, &[0.002, 0.95])]),
        }
    }

    /// 50 kW DC fast charger.
    pub fn dc_fast() -> Self {
        Self {
            name: "dc_fast".to_string(),
            level: ChargerLevel::DcFast,
            max_p3_kw: 50.0,
            min_p3_kw: 0.0,
            max_apparent_power_kva: 55.0,
            standby_p3_kw: 0.1,
            standby_q3_kvar: 0.02,
            efficiency: curve(&[
                (0.0, 5.0, &[0.03, 0.75]),
                (5.0, 60.0, &[-0.00002, 0.0015, 0.893]),
            ]),
            power_factor: curve(&[(0.0, 70.0, &[0.0005, 0.96])]),
        }
    }

    /// Port-level AC real-power bounds of this charger alone.
    pub fn limits(&self) -> ConverterLimits {
        ConverterLimits {
            min_p3_kw: self.min_p3_kw,
            max_p3_kw: self.max_p3_kw,
        }
    }

    /// Builds both curves into converter characteristics.
    ///
    /// # Errors
    ///
    /// Returns `SimError::ChargerCurve` naming the curve that failed validation.
    pub fn characteristics(&self) -> Result<ConverterCharacteristics, SimError> {
        let efficiency = self.efficiency.build().map_err(|source| SimError::ChargerCurve {
            charger: self.name.clone(),
            curve: "efficiency",
            source,
        })?;
        let power_factor = self
            .power_factor
            .build()
            .map_err(|source| SimError::ChargerCurve {
                charger: self.name.clone(),
                curve: "power_factor",
                source,
            })?;
        Ok(ConverterCharacteristics {
            efficiency,
            power_factor,
            limits: self.limits(),
            s_max_kva: self.max_apparent_power_kva,
        })
    }
}
