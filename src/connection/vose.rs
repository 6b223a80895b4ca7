//! Vose's alias method (§4.7.5): O(n) construction, O(1) draw for an
//! arbitrary non-negative discrete distribution.

use crate::error::{ConnectError, ConnectResult};
use crate::rng::Rng;

pub struct VoseAlias {
    prob: Vec<f64>,
    alias: Vec<usize>,
}

impl VoseAlias {
    /// Builds the alias table over `weights`. Requires at least one
    /// strictly positive weight; an all-zero vector cannot be normalized
    /// into a distribution (§9 Open Question 2: this is a construction
    /// error, not an infinite loop).
    pub fn build(weights: &[f64]) -> ConnectResult<Self> {
        let n = weights.len();
        if n == 0 {
            return Err(ConnectError::BadProperty("Vose alias table requires at least one candidate".into()));
        }
        let total: f64 = weights.iter().sum();
        if !(total > 0.0) || weights.iter().any(|w| *w < 0.0) {
            return Err(ConnectError::BadProperty("Vose alias table requires non-negative weights with positive total mass".into()));
        }

        let scaled: Vec<f64> = weights.iter().map(|w| w * n as f64 / total).collect();
        let mut small = Vec::new();
        let mut large = Vec::new();
        for (i, s) in scaled.iter().enumerate() {
            if *s < 1.0 {
                small.push(i);
            } else {
                large.push(i);
            }
        }

        let mut prob = vec![0.0; n];
        let mut alias = vec![0usize; n];
        let mut scaled = scaled;

        while let (Some(s), Some(l)) = (small.pop(), large.pop()) {
            prob[s] = scaled[s];
            alias[s] = l;
            scaled[l] = scaled[l] + scaled[s] - 1.0;
            if scaled[l] < 1.0 {
                small.push(l);
            } else {
                large.push(l);
            }
        }
        for i in large {
            prob[i] = 1.0;
        }
        for i in small {
            prob[i] = 1.0;
        }

        Ok(Self { prob, alias })
    }

    pub fn len(&self) -> usize {
        self.prob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prob.is_empty()
    }

    /// Draw one index in `[0, n)`, O(1).
    pub fn draw(&self, rng: &mut dyn Rng) -> usize {
        let n = self.prob.len();
        let r = rng.uniform() * n as f64;
        let k = (r as usize).min(n - 1);
        let v = r - k as f64;
        if v < self.prob[k] {
            k
        } else {
            self.alias[k]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DeterministicRng;

    #[test]
    fn rejects_empty_and_all_zero_weights() {
        assert!(matches!(VoseAlias::build(&[]), Err(ConnectError::BadProperty(_))));
        assert!(matches!(VoseAlias::build(&[0.0, 0.0, 0.0]), Err(ConnectError::BadProperty(_))));
    }

    #[test]
    fn draws_only_nonzero_weighted_indices() {
        let table = VoseAlias::build(&[1.0, 0.0, 3.0]).unwrap();
        let mut rng = DeterministicRng::seeded(42);
        for _ in 0..1000 {
            let i = table.draw(&mut rng);
            assert_ne!(i, 1);
        }
    }

    #[test]
    fn empirical_frequency_converges_to_weights() {
        let weights = [1.0, 2.0, 3.0, 4.0];
        let total: f64 = weights.iter().sum();
        let table = VoseAlias::build(&weights).unwrap();
        let mut rng = DeterministicRng::seeded(7);
        let mut counts = [0u64; 4];
        let draws = 200_000;
        for _ in 0..draws {
            counts[table.draw(&mut rng)] += 1;
        }
        for (i, w) in weights.iter().enumerate() {
            let empirical = counts[i] as f64 / draws as f64;
            let expected = w / total;
            assert!((empirical - expected).abs() < 0.01, "index {i}: empirical {empirical}, expected {expected}");
        }
    }

    #[test]
    fn uniform_weights_yield_uniform_draws() {
        let table = VoseAlias::build(&[1.0, 1.0, 1.0, 1.0]).unwrap();
        let mut rng = DeterministicRng::seeded(3);
        let mut counts = [0u64; 4];
        for _ in 0..40_000 {
            counts[table.draw(&mut rng)] += 1;
        }
        for c in counts {
            let frac = c as f64 / 40_000.0;
            assert!((frac - 0.25).abs() < 0.02);
        }
    }
}
