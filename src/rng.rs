// =============================================================================
// Centralised pseudo-random number source
// =============================================================================
//
// Every stochastic draw in the engine (regime transitions, VIX/rate jitter,
// price shocks, IPO admission, ticker generation) goes through a single
// `SimRng` instance so the whole simulation can be reseeded deterministically
// for tests, instead of each component reaching for `rand::rng()` on its own.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct SimRng {
    inner: StdRng,
}

impl SimRng {
    /// Seed from OS entropy. Used by the running engine.
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_os_rng(),
        }
    }

    /// Seed deterministically. Used by tests that need reproducible draws.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    /// Uniform draw in `[lo, hi)`.
    pub fn uniform_range(&mut self, lo: f64, hi: f64) -> f64 {
        if lo >= hi {
            return lo;
        }
        self.inner.random_range(lo..hi)
    }

    /// Uniform integer draw in `[lo, hi]` inclusive.
    pub fn uniform_int(&mut self, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            return lo;
        }
        self.inner.random_range(lo..=hi)
    }

    /// `true` with probability `p` (clamped to `[0, 1]`).
    pub fn chance(&mut self, p: f64) -> bool {
        self.uniform() < p.clamp(0.0, 1.0)
    }

    /// Standard normal draw via the Box-Muller transform, ported from the
    /// original `utils.py::log_normal_random` helper's core formula.
    pub fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.uniform().max(f64::EPSILON);
        let u2 = self.uniform();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Log-normal draw: `exp(gaussian(mean, std_dev))`.
    pub fn log_normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        self.gaussian(mean, std_dev).exp()
    }

    /// Pick a uniformly random element from a non-empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let idx = self.uniform_int(0, items.len() as i64 - 1) as usize;
        &items[idx]
    }

    /// A random uppercase ASCII letter.
    pub fn letter(&mut self) -> char {
        (b'A' + self.uniform_int(0, 25) as u8) as char
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = SimRng::from_seed(42);
        let mut b = SimRng::from_seed(42);
        for _ in 0..50 {
            assert_eq!(a.uniform(), b.uniform());
        }
    }

    #[test]
    fn uniform_range_stays_in_bounds() {
        let mut rng = SimRng::from_seed(1);
        for _ in 0..1000 {
            let v = rng.uniform_range(-5.0, 5.0);
            assert!((-5.0..5.0).contains(&v));
        }
    }

    #[test]
    fn chance_zero_never_fires() {
        let mut rng = SimRng::from_seed(7);
        for _ in 0..1000 {
            assert!(!rng.chance(0.0));
        }
    }

    #[test]
    fn chance_one_always_fires() {
        let mut rng = SimRng::from_seed(7);
        for _ in 0..1000 {
            assert!(rng.chance(1.0));
        }
    }

    #[test]
    fn gaussian_has_roughly_correct_mean() {
        let mut rng = SimRng::from_seed(99);
        let n = 20_000;
        let sum: f64 = (0..n).map(|_| rng.gaussian(0.0, 1.0)).sum();
        let mean = sum / n as f64;
        assert!(mean.abs() < 0.05, "sample mean {mean} too far from 0");
    }

    #[test]
    fn letter_is_uppercase_ascii() {
        let mut rng = SimRng::from_seed(3);
        for _ in 0..100 {
            let c = rng.letter();
            assert!(c.is_ascii_uppercase());
        }
    }
}
