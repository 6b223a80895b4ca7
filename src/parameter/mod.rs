//! The Parameter algebra (§4.3): position-dependent scalars used as
//! kernels, weights and delays. Like [`crate::mask::Mask`], a closed tagged
//! union rather than a boxed-trait hierarchy, composed via `Arc` so
//! `Product`/`Sum`/... share sub-expressions instead of cloning them.

use crate::error::{ConnectError, ConnectResult};
use crate::geometry::Position;
use crate::rng::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Parameter {
    Constant(f64),
    Linear { a: f64, c: f64 },
    Exponential { a: f64, tau: f64, c: f64 },
    Gaussian { p_center: f64, mean: f64, sigma: f64, c: f64 },
    /// Correlated 2D Gaussian falloff (§4.3): `ρ` couples the x/y terms.
    Gaussian2D { p_center: f64, mean_x: f64, sigma_x: f64, mean_y: f64, sigma_y: f64, rho: f64, c: f64 },
    Gamma { kappa: f64, theta: f64 },
    /// Draws independent of distance: a fresh random value per evaluation.
    Uniform { min: f64, max: f64 },
    /// Rejection-sampled into `[min, max)` (§4.3).
    Normal { mean: f64, sigma: f64, min: f64, max: f64 },
    /// Rejection-sampled into `[min, max)` (§4.3).
    Lognormal { mean: f64, sigma: f64, min: f64, max: f64 },
    /// Evaluated at the displacement from `anchor` rather than the raw
    /// source→target displacement passed in by the caller (§4.3).
    Anchored(Arc<Parameter>, Position),
    /// Evaluated at the negated displacement (i.e. target→source).
    Converse(Arc<Parameter>),
    Product(Arc<Parameter>, Arc<Parameter>),
    Quotient(Arc<Parameter>, Arc<Parameter>),
    Sum(Arc<Parameter>, Arc<Parameter>),
    Difference(Arc<Parameter>, Arc<Parameter>),
}

const MAX_REJECTION_ATTEMPTS: u32 = 10_000;

impl Parameter {
    pub fn product(a: Parameter, b: Parameter) -> Parameter {
        Parameter::Product(Arc::new(a), Arc::new(b))
    }
    pub fn quotient(a: Parameter, b: Parameter) -> Parameter {
        Parameter::Quotient(Arc::new(a), Arc::new(b))
    }
    pub fn sum(a: Parameter, b: Parameter) -> Parameter {
        Parameter::Sum(Arc::new(a), Arc::new(b))
    }
    pub fn difference(a: Parameter, b: Parameter) -> Parameter {
        Parameter::Difference(Arc::new(a), Arc::new(b))
    }
    pub fn anchored(a: Parameter, offset: Position) -> Parameter {
        Parameter::Anchored(Arc::new(a), offset)
    }
    pub fn converse(a: Parameter) -> Parameter {
        Parameter::Converse(Arc::new(a))
    }

    /// Checks the static constraints every variant's documentation lists
    /// (`σ>0`, `τ>0`, `min<max`, `|ρ|<1`, ...), recursing through
    /// composition. Called once at `ConnectionCreator` parse time (§4.9)
    /// rather than on every evaluation.
    pub fn validate(&self) -> ConnectResult<()> {
        match self {
            Parameter::Constant(_) | Parameter::Linear { .. } => Ok(()),
            Parameter::Exponential { tau, .. } => {
                if *tau <= 0.0 {
                    return Err(ConnectError::BadProperty("Exponential parameter requires tau > 0".into()));
                }
                Ok(())
            }
            Parameter::Gaussian { sigma, .. } => {
                if *sigma <= 0.0 {
                    return Err(ConnectError::BadProperty("Gaussian parameter requires sigma > 0".into()));
                }
                Ok(())
            }
            Parameter::Gaussian2D { sigma_x, sigma_y, rho, .. } => {
                if *sigma_x <= 0.0 || *sigma_y <= 0.0 {
                    return Err(ConnectError::BadProperty("Gaussian2D parameter requires sigma_x, sigma_y > 0".into()));
                }
                if rho.abs() >= 1.0 {
                    return Err(ConnectError::BadProperty("Gaussian2D parameter requires |rho| < 1".into()));
                }
                Ok(())
            }
            Parameter::Gamma { kappa, theta } => {
                if *kappa <= 0.0 || *theta <= 0.0 {
                    return Err(ConnectError::BadProperty("Gamma parameter requires kappa, theta > 0".into()));
                }
                Ok(())
            }
            Parameter::Uniform { min, max } => {
                if min >= max {
                    return Err(ConnectError::BadProperty("Uniform parameter requires min < max".into()));
                }
                Ok(())
            }
            Parameter::Normal { sigma, min, max, .. } | Parameter::Lognormal { sigma, min, max, .. } => {
                if *sigma <= 0.0 {
                    return Err(ConnectError::BadProperty("Normal/Lognormal parameter requires sigma > 0".into()));
                }
                if min >= max {
                    return Err(ConnectError::BadProperty("Normal/Lognormal parameter requires min < max".into()));
                }
                Ok(())
            }
            Parameter::Anchored(p, _) | Parameter::Converse(p) => p.validate(),
            Parameter::Product(a, b) | Parameter::Quotient(a, b) | Parameter::Sum(a, b) | Parameter::Difference(a, b) => {
                a.validate()?;
                b.validate()
            }
        }
    }

    /// Raw value at displacement `d`, with no cutoff/clamping applied.
    /// `rng` is only consulted by the stochastic variants
    /// (`Uniform`/`Normal`/`Lognormal`); `Gamma` is a deterministic radial
    /// falloff (the gamma distribution's density evaluated at `‖d‖`), not a
    /// sample.
    pub fn raw_value(&self, d: &Position, rng: &mut dyn Rng) -> ConnectResult<f64> {
        match self {
            Parameter::Constant(v) => Ok(*v),
            Parameter::Linear { a, c } => Ok(a * d.length() + c),
            Parameter::Exponential { a, tau, c } => {
                if *tau <= 0.0 {
                    return Err(ConnectError::BadProperty("Exponential parameter requires tau > 0".into()));
                }
                Ok(c + a * (-d.length() / tau).exp())
            }
            Parameter::Gaussian { p_center, mean, sigma, c } => {
                if *sigma <= 0.0 {
                    return Err(ConnectError::BadProperty("Gaussian parameter requires sigma > 0".into()));
                }
                let r = d.length();
                Ok(c + p_center * (-((r - mean).powi(2)) / (2.0 * sigma * sigma)).exp())
            }
            Parameter::Gaussian2D { p_center, mean_x, sigma_x, mean_y, sigma_y, rho, c } => {
                if *sigma_x <= 0.0 || *sigma_y <= 0.0 {
                    return Err(ConnectError::BadProperty("Gaussian2D parameter requires sigma_x, sigma_y > 0".into()));
                }
                if rho.abs() >= 1.0 {
                    return Err(ConnectError::BadProperty("Gaussian2D parameter requires |rho| < 1".into()));
                }
                if d.dim() < 2 {
                    return Err(ConnectError::DimensionMismatch { context: "Gaussian2D parameter".into(), expected: 2, found: d.dim() });
                }
                let x = d.get(0);
                let y = d.get(1);
                let q = (x - mean_x).powi(2) / (sigma_x * sigma_x) + (y - mean_y).powi(2) / (sigma_y * sigma_y)
                    - 2.0 * rho * (x - mean_x) * (y - mean_y) / (sigma_x * sigma_y);
                Ok(c + p_center * (-q / (2.0 * (1.0 - rho * rho))).exp())
            }
            Parameter::Gamma { kappa, theta } => {
                if *kappa <= 0.0 || *theta <= 0.0 {
                    return Err(ConnectError::BadProperty("Gamma parameter requires kappa, theta > 0".into()));
                }
                let r = d.length();
                if r == 0.0 {
                    return Ok(if *kappa == 1.0 {
                        1.0 / theta
                    } else if *kappa > 1.0 {
                        0.0
                    } else {
                        f64::INFINITY
                    });
                }
                let log_pdf = (kappa - 1.0) * r.ln() - r / theta - kappa * theta.ln() - ln_gamma(*kappa);
                Ok(log_pdf.exp())
            }
            Parameter::Uniform { min, max } => {
                if min >= max {
                    return Err(ConnectError::BadProperty("Uniform parameter requires min < max".into()));
                }
                Ok(min + rng.uniform() * (max - min))
            }
            Parameter::Normal { mean, sigma, min, max } => {
                if *sigma <= 0.0 || min >= max {
                    return Err(ConnectError::BadProperty("Normal parameter requires sigma > 0 and min < max".into()));
                }
                rejection_sample(min, max, || mean + sigma * rng.normal())
            }
            Parameter::Lognormal { mean, sigma, min, max } => {
                if *sigma <= 0.0 || min >= max {
                    return Err(ConnectError::BadProperty("Lognormal parameter requires sigma > 0 and min < max".into()));
                }
                rejection_sample(min, max, || (mean + sigma * rng.normal()).exp())
            }
            Parameter::Anchored(p, offset) => p.raw_value(&d.sub(offset)?, rng),
            Parameter::Converse(p) => p.raw_value(&d.neg(), rng),
            // Operands are combined via raw_value, not the cutoff-respecting
            // value: no dictionary key exposes a per-operand cutoff, and the
            // default cutoff is -infinity, so the two coincide in practice.
            Parameter::Product(a, b) => Ok(a.raw_value(d, rng)? * b.raw_value(d, rng)?),
            Parameter::Quotient(a, b) => {
                let denom = b.raw_value(d, rng)?;
                if denom == 0.0 {
                    return Err(ConnectError::BadProperty("Quotient parameter divided by zero".into()));
                }
                Ok(a.raw_value(d, rng)? / denom)
            }
            Parameter::Sum(a, b) => Ok(a.raw_value(d, rng)? + b.raw_value(d, rng)?),
            Parameter::Difference(a, b) => Ok(a.raw_value(d, rng)? - b.raw_value(d, rng)?),
        }
    }

    /// Value clamped against a cutoff: values strictly below `cutoff` are
    /// forced to zero (§4.3); the internal `raw_value` ignores cutoff and
    /// is what composition (`Product`/`Sum`/...) reads from its operands.
    pub fn value(&self, d: &Position, rng: &mut dyn Rng, cutoff: f64) -> ConnectResult<f64> {
        let raw = self.raw_value(d, rng)?;
        Ok(if raw < cutoff { 0.0 } else { raw })
    }
}

/// Rejects draws outside `[min, max)`. Bails out past a generous attempt
/// budget rather than looping forever on a pathological `(mean, sigma,
/// min, max)` combination.
fn rejection_sample(min: &f64, max: &f64, mut draw: impl FnMut() -> f64) -> ConnectResult<f64> {
    for _ in 0..MAX_REJECTION_ATTEMPTS {
        let v = draw();
        if v >= *min && v < *max {
            return Ok(v);
        }
    }
    Err(ConnectError::BadProperty(format!(
        "rejection sampling into [{min}, {max}) did not converge after {MAX_REJECTION_ATTEMPTS} attempts"
    )))
}

/// Lanczos approximation of `ln(Gamma(x))`, `x > 0`. Used to evaluate the
/// gamma density in [`Parameter::Gamma`] without pulling in a special-
/// functions crate for one formula.
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_312e-7,
    ];
    if x < 0.5 {
        (std::f64::consts::PI / (std::f64::consts::PI * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let t = x + G + 0.5;
        let mut a = COEFFS[0];
        for (i, c) in COEFFS.iter().enumerate().skip(1) {
            a += c / (x + i as f64);
        }
        0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DeterministicRng;

    #[test]
    fn constant_ignores_distance() {
        let p = Parameter::Constant(2.5);
        let mut rng = DeterministicRng::seeded(1);
        assert_eq!(p.raw_value(&Position::D2([100.0, -3.0]), &mut rng).unwrap(), 2.5);
    }

    #[test]
    fn gaussian_peaks_at_mean() {
        let p = Parameter::Gaussian { p_center: 1.0, mean: 0.0, sigma: 1.0, c: 0.0 };
        let mut rng = DeterministicRng::seeded(1);
        let at_zero = p.raw_value(&Position::D2([0.0, 0.0]), &mut rng).unwrap();
        let at_far = p.raw_value(&Position::D2([5.0, 0.0]), &mut rng).unwrap();
        assert!(at_zero > at_far);
        assert!((at_zero - 1.0).abs() < 1e-9);
    }

    #[test]
    fn value_below_cutoff_is_forced_to_zero() {
        let p = Parameter::Constant(0.4);
        let mut rng = DeterministicRng::seeded(1);
        let v = p.value(&Position::D2([0.0, 0.0]), &mut rng, 0.5).unwrap();
        assert_eq!(v, 0.0);
    }

    #[test]
    fn converse_negates_displacement() {
        let p = Parameter::Linear { a: 1.0, c: 0.0 };
        let c = Parameter::converse(p.clone());
        let mut rng1 = DeterministicRng::seeded(1);
        let mut rng2 = DeterministicRng::seeded(1);
        let d = Position::D2([3.0, 4.0]);
        assert_eq!(c.raw_value(&d, &mut rng1).unwrap(), p.raw_value(&d.neg(), &mut rng2).unwrap());
    }

    #[test]
    fn quotient_by_zero_is_bad_property() {
        let p = Parameter::quotient(Parameter::Constant(1.0), Parameter::Constant(0.0));
        let mut rng = DeterministicRng::seeded(1);
        assert!(matches!(p.raw_value(&Position::D2([0.0, 0.0]), &mut rng), Err(ConnectError::BadProperty(_))));
    }

    #[test]
    fn uniform_stays_within_bounds() {
        let p = Parameter::Uniform { min: -1.0, max: 1.0 };
        let mut rng = DeterministicRng::seeded(7);
        for _ in 0..100 {
            let v = p.raw_value(&Position::D2([0.0, 0.0]), &mut rng).unwrap();
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn normal_rejection_sampling_stays_in_bounds() {
        let p = Parameter::Normal { mean: 0.0, sigma: 1.0, min: -0.5, max: 0.5 };
        let mut rng = DeterministicRng::seeded(11);
        for _ in 0..200 {
            let v = p.raw_value(&Position::D2([0.0, 0.0]), &mut rng).unwrap();
            assert!((-0.5..0.5).contains(&v));
        }
    }

    #[test]
    fn gamma_is_a_deterministic_radial_falloff() {
        let p = Parameter::Gamma { kappa: 2.0, theta: 1.0 };
        let mut rng = DeterministicRng::seeded(1);
        let at_zero = p.raw_value(&Position::D2([0.0, 0.0]), &mut rng).unwrap();
        let at_one = p.raw_value(&Position::D2([1.0, 0.0]), &mut rng).unwrap();
        let at_one_again = p.raw_value(&Position::D2([0.0, 1.0]), &mut rng).unwrap();
        assert_eq!(at_zero, 0.0);
        assert!((at_one - at_one_again).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_non_positive_sigma() {
        let p = Parameter::Gaussian { p_center: 1.0, mean: 0.0, sigma: 0.0, c: 0.0 };
        assert!(matches!(p.validate(), Err(ConnectError::BadProperty(_))));
    }

    #[test]
    fn validate_rejects_out_of_range_rho() {
        let p = Parameter::Gaussian2D { p_center: 1.0, mean_x: 0.0, sigma_x: 1.0, mean_y: 0.0, sigma_y: 1.0, rho: 1.2, c: 0.0 };
        assert!(matches!(p.validate(), Err(ConnectError::BadProperty(_))));
    }
}
