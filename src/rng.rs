//! Random-number source (§1: "the random-number source" is an external
//! collaborator; §5 requires the core to make only serial calls to it).
//!
//! The core is generic over any `rand::RngCore`, rather than depending on a
//! specific generator, so callers can plug in the reproducible source of
//! their choice (the reference tests use `rand_chacha::ChaCha8Rng` seeded
//! explicitly for determinism).

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::numeric::Real;

/// Draws an isotropic 3D Gaussian displacement with per-axis variance
/// `variance`, i.e. `N(0, variance)` independently on each axis. Used by the
/// Multi engine's BD sub-stepper (§4.9): a particle's attempted displacement
/// has variance `2*D*dt` per axis.
pub fn gaussian_displacement<R: Rng + ?Sized>(rng: &mut R, variance: Real) -> Vector3<Real> {
    let std_dev = variance.sqrt();
    let normal = Normal::new(0.0, std_dev).expect("variance must be finite and non-negative");
    Vector3::new(
        normal.sample(rng),
        normal.sample(rng),
        normal.sample(rng),
    )
}

/// Draws a uniformly random point on the unit sphere, used for dissociation
/// retry orientations (§4.11).
pub fn uniform_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vector3<Real> {
    // Marsaglia's method.
    loop {
        let x: Real = rng.gen_range(-1.0..1.0);
        let y: Real = rng.gen_range(-1.0..1.0);
        let s = x * x + y * y;
        if s < 1.0 && s > 1e-12 {
            let factor = 2.0 * (1.0 - s).sqrt();
            return Vector3::new(x * factor, y * factor, 1.0 - 2.0 * s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn gaussian_displacement_has_roughly_correct_variance() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let variance = 4.0;
        let n = 20_000;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let d = gaussian_displacement(&mut rng, variance);
            sum_sq += d.x * d.x;
        }
        let sample_variance = sum_sq / n as Real;
        assert!((sample_variance - variance).abs() / variance < 0.05);
    }

    #[test]
    fn uniform_unit_vector_has_unit_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = uniform_unit_vector(&mut rng);
            assert!((v.norm() - 1.0).abs() < 1e-9);
        }
    }
}
