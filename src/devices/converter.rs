//! AC/DC conversion between the DC side (P2) and the grid side (P3, Q3).

use thiserror::Error;

use crate::curve::{CurveError, PiecewisePolynomialCurve};
use crate::devices::types::{NEGLIGIBLE_POWER_KW, SePower};
use crate::sim::event::ControlStrategy;

/// Fixed-point refinements in [`ConverterCharacteristics::approximate_dc_power_for`].
const INVERSE_ITERATIONS: usize = 6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConverterError {
    #[error(transparent)]
    Curve(#[from] CurveError),
    #[error("efficiency curve gives {efficiency} at P2 = {p2_kw} kW, expected a value in (0, 1]")]
    InvalidEfficiency { p2_kw: f64, efficiency: f64 },
    #[error("power factor curve gives {power_factor} at P3 = {p3_kw} kW, expected 0 < |pf| <= 1")]
    InvalidPowerFactor { p3_kw: f64, power_factor: f64 },
}

/// Achievable AC real power for one vehicle/charger pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConverterLimits {
    pub min_p3_kw: f64,
    pub max_p3_kw: f64,
}

impl ConverterLimits {
    pub fn clamp(&self, p3_kw: f64) -> f64 {
        p3_kw.min(self.max_p3_kw).max(self.min_p3_kw)
    }
}

/// Curves and ratings shared by every converter variant.
#[derive(Debug, Clone)]
pub struct ConverterCharacteristics {
    /// Efficiency as a function of P2.
    pub efficiency: PiecewisePolynomialCurve,
    /// Signed power factor as a function of P3.
    pub power_factor: PiecewisePolynomialCurve,
    pub limits: ConverterLimits,
    pub s_max_kva: f64,
}

impl ConverterCharacteristics {
    /// Same curves with tighter pair-specific limits.
    pub fn with_limits(mut self, limits: ConverterLimits) -> Self {
        self.limits = limits;
        self
    }

    fn efficiency_at(&self, p2_kw: f64) -> Result<f64, ConverterError> {
        let efficiency = self.efficiency.evaluate(p2_kw)?;
        if efficiency > 0.0 && efficiency <= 1.0 {
            Ok(efficiency)
        } else {
            Err(ConverterError::InvalidEfficiency { p2_kw, efficiency })
        }
    }

    /// AC real power drawn to deliver `p2_kw`, bounded by the limits.
    pub fn p3_for(&self, p2_kw: f64) -> Result<f64, ConverterError> {
        if p2_kw <= NEGLIGIBLE_POWER_KW {
            return Ok(0.0);
        }
        let efficiency = self.efficiency_at(p2_kw)?;
        Ok(self.limits.clamp(p2_kw / efficiency))
    }

    /// Reactive power implied by the power-factor curve at `p3_kw`.
    pub fn q3_for(&self, p3_kw: f64) -> Result<f64, ConverterError> {
        if p3_kw <= NEGLIGIBLE_POWER_KW {
            return Ok(0.0);
        }
        let power_factor = self.power_factor.evaluate(p3_kw)?;
        let magnitude = power_factor.abs();
        if !(magnitude > 0.0 && magnitude <= 1.0) {
            return Err(ConverterError::InvalidPowerFactor {
                p3_kw,
                power_factor,
            });
        }
        let q3 = p3_kw * (1.0 - magnitude * magnitude).sqrt() / magnitude;
        Ok(q3.copysign(power_factor))
    }

    /// Inverse of [`Self::p3_for`]: the P2 that draws about `p3_kw` from the grid.
    pub fn approximate_dc_power_for(&self, p3_kw: f64) -> Result<f64, ConverterError> {
        let p3_kw = p3_kw.clamp(0.0, self.limits.max_p3_kw);
        if p3_kw <= NEGLIGIBLE_POWER_KW {
            return Ok(0.0);
        }
        let (_, upper) = self.efficiency.domain();
        let mut p2_kw = p3_kw * self.efficiency_at(p3_kw.min(upper))?;
        for _ in 0..INVERSE_ITERATIONS {
            p2_kw = p3_kw * self.efficiency_at(p2_kw)?;
        }
        Ok(p2_kw)
    }
}

/// Capability shared by the converter variants.
pub trait Converter {
    /// Converts DC-side power over one step into grid-side power.
    fn convert(
        &self,
        p1_kw: f64,
        p2_kw: f64,
        time_step_duration_hrs: f64,
    ) -> Result<SePower, ConverterError>;

    fn approximate_dc_power_for(&self, p3_kw: f64) -> Result<f64, ConverterError>;

    /// Returns `true` if Q3 can be set independently of P3.
    fn supports_reactive_setpoint(&self) -> bool;

    /// Stores a reactive-power target. Returns `false` if the variant ignores it.
    fn set_target_q3_kvar(&mut self, q3_kvar: f64) -> bool;

    fn max_nominal_apparent_power_kva(&self) -> f64;
}

/// Q3 follows the power-factor curve.
#[derive(Debug, Clone)]
pub struct FixedPowerFactorConverter {
    characteristics: ConverterCharacteristics,
}

impl FixedPowerFactorConverter {
    pub fn new(characteristics: ConverterCharacteristics) -> Self {
        Self { characteristics }
    }
}

impl Converter for FixedPowerFactorConverter {
    fn convert(
        &self,
        p1_kw: f64,
        p2_kw: f64,
        time_step_duration_hrs: f64,
    ) -> Result<SePower, ConverterError> {
        let p3_kw = self.characteristics.p3_for(p2_kw)?;
        let q3_kvar = self.characteristics.q3_for(p3_kw)?;
        Ok(SePower {
            time_step_duration_hrs,
            p1_kw,
            p2_kw,
            p3_kw,
            q3_kvar,
        })
    }

    fn approximate_dc_power_for(&self, p3_kw: f64) -> Result<f64, ConverterError> {
        self.characteristics.approximate_dc_power_for(p3_kw)
    }

    fn supports_reactive_setpoint(&self) -> bool {
        false
    }

    fn set_target_q3_kvar(&mut self, _q3_kvar: f64) -> bool {
        false
    }

    fn max_nominal_apparent_power_kva(&self) -> f64 {
        self.characteristics.s_max_kva
    }
}

/// Q3 follows an external target, limited by the apparent-power rating.
#[derive(Debug, Clone)]
pub struct ReactiveSetpointConverter {
    characteristics: ConverterCharacteristics,
    target_q3_kvar: f64,
}

impl ReactiveSetpointConverter {
    pub fn new(characteristics: ConverterCharacteristics) -> Self {
        Self {
            characteristics,
            target_q3_kvar: 0.0,
        }
    }

    pub fn target_q3_kvar(&self) -> f64 {
        self.target_q3_kvar
    }
}

impl Converter for ReactiveSetpointConverter {
    fn convert(
        &self,
        p1_kw: f64,
        p2_kw: f64,
        time_step_duration_hrs: f64,
    ) -> Result<SePower, ConverterError> {
        let p3_kw = self.characteristics.p3_for(p2_kw)?;
        let s = self.characteristics.s_max_kva;
        let headroom = (s * s - p3_kw * p3_kw).max(0.0).sqrt();
        let q3_kvar = self.target_q3_kvar.abs().min(headroom).copysign(self.target_q3_kvar);
        Ok(SePower {
            time_step_duration_hrs,
            p1_kw,
            p2_kw,
            p3_kw,
            q3_kvar,
        })
    }

    fn approximate_dc_power_for(&self, p3_kw: f64) -> Result<f64, ConverterError> {
        self.characteristics.approximate_dc_power_for(p3_kw)
    }

    fn supports_reactive_setpoint(&self) -> bool {
        true
    }

    fn set_target_q3_kvar(&mut self, q3_kvar: f64) -> bool {
        self.target_q3_kvar = q3_kvar;
        true
    }

    fn max_nominal_apparent_power_kva(&self) -> f64 {
        self.characteristics.s_max_kva
    }
}

/// Closed set of converter variants selected at session start.
#[derive(Debug, Clone)]
pub enum ConverterModel {
    FixedPowerFactor(FixedPowerFactorConverter),
    ReactiveSetpoint(ReactiveSetpointConverter),
}

impl ConverterModel {
    /// Picks the variant the control strategy asks for.
    pub fn for_strategy(strategy: &ControlStrategy, characteristics: ConverterCharacteristics) -> Self {
        if strategy.uses_reactive_setpoint() {
            Self::ReactiveSetpoint(ReactiveSetpointConverter::new(characteristics))
        } else {
            Self::FixedPowerFactor(FixedPowerFactorConverter::new(characteristics))
        }
    }

    fn inner(&self) -> &dyn Converter {
        match self {
            Self::FixedPowerFactor(c) => c,
            Self::ReactiveSetpoint(c) => c,
        }
    }
}

impl Converter for ConverterModel {
    fn convert(
        &self,
        p1_kw: f64,
        p2_kw: f64,
        time_step_duration_hrs: f64,
    ) -> Result<SePower, ConverterError> {
        self.inner().convert(p1_kw, p2_kw, time_step_duration_hrs)
    }

    fn approximate_dc_power_for(&self, p3_kw: f64) -> Result<f64, ConverterError> {
        self.inner().approximate_dc_power_for(p3_kw)
    }

    fn supports_reactive_setpoint(&self) -> bool {
        self.inner().supports_reactive_setpoint()
    }

    fn set_target_q3_kvar(&mut self, q3_kvar: f64) -> bool {
        match self {
            Self::FixedPowerFactor(c) => c.set_target_q3_kvar(q3_kvar),
            Self::ReactiveSetpoint(c) => c.set_target_q3_kvar(q3_kvar),
        }
    }

    fn max_nominal_apparent_power_kva(&self) -> f64 {
        self.inner().max_nominal_apparent_power_kva()
    }
}
