//! Piecewise-polynomial curves for converter efficiency and power-factor modelling.

use serde::Deserialize;
use thiserror::Error;

/// Maximum gap tolerated between adjacent segment bounds.
const CONTIGUITY_TOLERANCE: f64 = 1e-9;

/// Errors raised while building or evaluating a [`PiecewisePolynomialCurve`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    #[error("curve has no segments")]
    Empty,
    #[error("segment {index}: {count} coefficients given, expected 2 to 5 (degree 1 to 4)")]
    InvalidDegree { index: usize, count: usize },
    #[error("segment {index}: bound or coefficient is not finite")]
    NonFinite { index: usize },
    #[error("segment {index}: lower bound {lower} is not below upper bound {upper}")]
    EmptyInterval { index: usize, lower: f64, upper: f64 },
    #[error("segment {index}: starts at {lower} but the previous segment ends at {previous_upper}")]
    Discontiguous {
        index: usize,
        lower: f64,
        previous_upper: f64,
    },
    #[error("x = {x} is outside the curve domain [{lower}, {upper}]")]
    OutOfDomain { x: f64, lower: f64, upper: f64 },
}

/// What to do when `x` falls outside every segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfBoundsPolicy {
    /// Report [`CurveError::OutOfDomain`].
    #[default]
    Error,
    /// Clamp `x` into the curve domain before evaluating.
    Clamp,
}

/// One polynomial piece valid on `[lower, upper)`.
///
/// Coefficients are stored as `[a, b, c, d, e]` for
/// `a·x⁴ + b·x³ + c·x² + d·x + e`; terms above the segment degree are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PolySegment {
    lower: f64,
    upper: f64,
    degree: usize,
    coefficients: [f64; 5],
}

impl PolySegment {
    /// Builds a segment from coefficients given highest power first.
    ///
    /// Two coefficients describe a line (`d·x + e`), five a quartic.
    ///
    /// # Errors
    ///
    /// Returns a `CurveError` if the coefficient count is outside 2..=5, a
    /// value is not finite, or `lower >= upper`.
    pub fn new(lower: f64, upper: f64, coefficients: &[f64]) -> Result<Self, CurveError> {
        Self::indexed(0, lower, upper, coefficients)
    }

    fn indexed(
        index: usize,
        lower: f64,
        upper: f64,
        coefficients: &[f64],
    ) -> Result<Self, CurveError> {
        let count = coefficients.len();
        if !(2..=5).contains(&count) {
            return Err(CurveError::InvalidDegree { index, count });
        }
        if !lower.is_finite() || !upper.is_finite() || coefficients.iter().any(|c| !c.is_finite())
        {
            return Err(CurveError::NonFinite { index });
        }
        if lower >= upper {
            return Err(CurveError::EmptyInterval {
                index,
                lower,
                upper,
            });
        }

        let mut padded = [0.0; 5];
        padded[5 - count..].copy_from_slice(coefficients);

        Ok(Self {
            lower,
            upper,
            degree: count - 1,
            coefficients: padded,
        })
    }

    /// Lower bound (inclusive).
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Upper bound (exclusive, except for the last segment of a curve).
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Polynomial degree, 1 to 4.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Evaluates the polynomial with Horner's rule over the active terms.
    pub fn value_at(&self, x: f64) -> f64 {
        self.coefficients[4 - self.degree..]
            .iter()
            .fold(0.0, |acc, c| acc * x + c)
    }
}

/// A scalar function defined by contiguous polynomial segments.
///
/// # Examples
///
/// ```
/// use evse_sim::curve::{PiecewisePolynomialCurve, PolySegment};
///
/// let curve = PiecewisePolynomialCurve::new(vec![
///     PolySegment::new(0.0, 1.0, &[2.0, 0.0]).unwrap(),
///     PolySegment::new(1.0, 2.0, &[1.0, 1.0]).unwrap(),
/// ])
/// .unwrap();
/// assert_eq!(curve.evaluate(0.5).unwrap(), 1.0);
/// assert_eq!(curve.evaluate(2.0).unwrap(), 3.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewisePolynomialCurve {
    segments: Vec<PolySegment>,
    take_abs_of_x: bool,
    boundary_tolerance: f64,
    out_of_bounds: OutOfBoundsPolicy,
}

impl PiecewisePolynomialCurve {
    /// Builds a curve from segments ordered by lower bound.
    ///
    /// # Errors
    ///
    /// Returns a `CurveError` if the list is empty or the segments leave a gap
    /// or overlap.
    pub fn new(segments: Vec<PolySegment>) -> Result<Self, CurveError> {
        if segments.is_empty() {
            return Err(CurveError::Empty);
        }
        for (index, pair) in segments.windows(2).enumerate() {
            if (pair[1].lower - pair[0].upper).abs() > CONTIGUITY_TOLERANCE {
                return Err(CurveError::Discontiguous {
                    index: index + 1,
                    lower: pair[1].lower,
                    previous_upper: pair[0].upper,
                });
            }
        }

        Ok(Self {
            segments,
            take_abs_of_x: false,
            boundary_tolerance: 0.0,
            out_of_bounds: OutOfBoundsPolicy::Error,
        })
    }

    /// Evaluate on `|x|` instead of `x`.
    pub fn with_abs_of_x(mut self, take_abs_of_x: bool) -> Self {
        self.take_abs_of_x = take_abs_of_x;
        self
    }

    /// Snap values within `tolerance` of the domain edges onto the edge.
    pub fn with_boundary_tolerance(mut self, tolerance: f64) -> Self {
        self.boundary_tolerance = tolerance.max(0.0);
        self
    }

    pub fn with_out_of_bounds(mut self, policy: OutOfBoundsPolicy) -> Self {
        self.out_of_bounds = policy;
        self
    }

    /// Returns `(lower, upper)` of the whole curve.
    pub fn domain(&self) -> (f64, f64) {
        let lower = self.segments.first().map_or(0.0, |s| s.lower);
        let upper = self.segments.last().map_or(0.0, |s| s.upper);
        (lower, upper)
    }

    pub fn segments(&self) -> &[PolySegment] {
        &self.segments
    }

    /// Evaluates the curve at `x`.
    ///
    /// Lookup is half-open (`lower <= x < upper`); the curve's upper domain
    /// bound belongs to the last segment.
    ///
    /// # Errors
    ///
    /// Returns [`CurveError::OutOfDomain`] if `x` lies outside the domain,
    /// beyond the boundary tolerance, and the policy is
    /// [`OutOfBoundsPolicy::Error`].
    pub fn evaluate(&self, x: f64) -> Result<f64, CurveError> {
        let x = if self.take_abs_of_x { x.abs() } else { x };
        let (lower, upper) = self.domain();

        let x = if x < lower {
            if x >= lower - self.boundary_tolerance
                || self.out_of_bounds == OutOfBoundsPolicy::Clamp
            {
                lower
            } else {
                return Err(CurveError::OutOfDomain { x, lower, upper });
            }
        } else if x > upper {
            if x <= upper + self.boundary_tolerance
                || self.out_of_bounds == OutOfBoundsPolicy::Clamp
            {
                upper
            } else {
                return Err(CurveError::OutOfDomain { x, lower, upper });
            }
        } else if x.is_nan() {
            return Err(CurveError::OutOfDomain { x, lower, upper });
        } else {
            x
        };

        let idx = self
            .segments
            .partition_point(|s| s.upper <= x)
            .min(self.segments.len() - 1);
        Ok(self.segments[idx].value_at(x))
    }
}

/// Serde form of a [`PolySegment`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentConfig {
    pub lower: f64,
    pub upper: f64,
    /// Highest power first, 2 to 5 entries.
    pub coefficients: Vec<f64>,
}

/// Serde form of a [`PiecewisePolynomialCurve`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurveConfig {
    pub segments: Vec<SegmentConfig>,
    #[serde(default)]
    pub take_abs_of_x: bool,
    #[serde(default)]
    pub boundary_tolerance: f64,
    #[serde(default)]
    pub out_of_bounds: OutOfBoundsPolicy,
}

impl CurveConfig {
    /// Validates and builds the curve.
    ///
    /// # Errors
    ///
    /// Returns the first `CurveError` found in the segment list.
    pub fn build(&self) -> Result<PiecewisePolynomialCurve, CurveError> {
        let segments = self
            .segments
            .iter()
            .enumerate()
            .map(|(i, s)| PolySegment::indexed(i, s.lower, s.upper, &s.coefficients))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PiecewisePolynomialCurve::new(segments)?
            .with_abs_of_x(self.take_abs_of_x)
            .with_boundary_tolerance(self.boundary_tolerance)
            .with_out_of_bounds(self.out_of_bounds))
    }
}
