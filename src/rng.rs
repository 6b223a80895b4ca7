//! The RNG capability (§1, §6): the core only ever *consumes* four methods.
//! It never constructs its own randomness source and never reseeds one —
//! that is the collaborator's job (a thread pool owns per-thread RNGs, a
//! single global RNG is shared by the divergent strategy).

/// Random-number capability required by the engine. A collaborator-supplied
/// implementation may wrap any PRNG; the engine only ever calls these four
/// methods.
pub trait Rng {
    /// Uniform real in `[0, 1)`.
    fn uniform(&mut self) -> f64;
    /// Uniform integer in `[0, n)`. `n` must be positive.
    fn uniform_int(&mut self, n: u64) -> u64;
    /// Standard normal draw, `N(0, 1)`.
    fn normal(&mut self) -> f64;
    /// Binomial draw `B(n, p)`.
    fn binomial(&mut self, n: u64, p: f64) -> u64;
}

/// The RNG provider collaborator (§6): hands out a dedicated RNG per worker
/// thread plus one global RNG shared by the divergent strategy (§5).
pub trait RngProvider {
    type R: Rng;
    fn get_rng(&self, thread: crate::sink::ThreadId) -> Self::R;
    fn get_global_rng(&self) -> Self::R;
}

/// A reference [`Rng`] backed by `rand`'s `StdRng`, used only by tests and
/// demos. The core never depends on `rand` directly; it only ever sees the
/// [`Rng`] trait.
pub struct DeterministicRng {
    inner: rand::rngs::StdRng,
}

impl DeterministicRng {
    pub fn seeded(seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            inner: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }
}

impl Rng for DeterministicRng {
    fn uniform(&mut self) -> f64 {
        use rand::Rng as _;
        self.inner.gen::<f64>()
    }

    fn uniform_int(&mut self, n: u64) -> u64 {
        use rand::Rng as _;
        assert!(n > 0, "uniform_int requires n > 0");
        self.inner.gen_range(0..n)
    }

    fn normal(&mut self) -> f64 {
        use rand_distr::Distribution;
        rand_distr::StandardNormal.sample(&mut self.inner)
    }

    fn binomial(&mut self, n: u64, p: f64) -> u64 {
        use rand_distr::Distribution;
        if n == 0 {
            return 0;
        }
        let dist = rand_distr::Binomial::new(n, p.clamp(0.0, 1.0)).expect("valid binomial parameters");
        dist.sample(&mut self.inner)
    }
}

/// A [`RngProvider`] that hands every caller an independently seeded
/// [`DeterministicRng`], derived from a single base seed — deterministic and
/// reproducible across thread counts, matching §5's reproducibility
/// requirement for the divergent strategy and §8's "same seed on N
/// processes" property.
pub struct DeterministicRngProvider {
    base_seed: u64,
}

impl DeterministicRngProvider {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }
}

impl RngProvider for DeterministicRngProvider {
    type R = DeterministicRng;

    fn get_rng(&self, thread: crate::sink::ThreadId) -> Self::R {
        DeterministicRng::seeded(self.base_seed.wrapping_add(1 + thread.0 as u64))
    }

    fn get_global_rng(&self) -> Self::R {
        DeterministicRng::seeded(self.base_seed)
    }
}
