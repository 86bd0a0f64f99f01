//! Cartesian coordinate system topology helpers for the periodic box.
//!
//! The teacher crate groups this kind of reference-frame bookkeeping in its
//! own `topology` module (see `lib.rs`'s `pub mod topology` doc comment,
//! "Helper types for cartesian coordinate system topology"); here it holds
//! the periodic-boundary arithmetic that every other component needs
//! (shell container neighbour queries, pair centre-of-mass, surface
//! projection) instead of a full background-grid topology.

use nalgebra::Vector3;

use crate::numeric::Real;

/// Applies the minimum-image convention for a cubic periodic box of side `side`,
/// returning the smallest-magnitude vector equivalent to `delta` under the
/// box's periodicity.
pub fn minimum_image(mut delta: Vector3<Real>, side: Real) -> Vector3<Real> {
    for component in delta.iter_mut() {
        *component -= side * (*component / side).round();
    }
    delta
}

/// Periodic Euclidean distance between two points in a cubic box of side `side`.
pub fn periodic_distance(a: Vector3<Real>, b: Vector3<Real>, side: Real) -> Real {
    minimum_image(a - b, side).norm()
}

/// Wraps a point back into `[0, side)^3`.
pub fn apply_boundary(mut point: Vector3<Real>, side: Real) -> Vector3<Real> {
    for component in point.iter_mut() {
        *component -= side * (*component / side).floor();
    }
    point
}

/// Returns the periodic image of `point` that is closest to `reference`,
/// i.e. `point` shifted by whole multiples of `side` such that the direct
/// (non-periodic) distance to `reference` equals the periodic distance.
///
/// This is the Rust analogue of `World.cyclic_transpose` in `gfrdbase.py`,
/// needed whenever a routine (surface projection, Miedema's algorithm) must
/// reason about a vector difference rather than a scalar distance.
pub fn cyclic_transpose(point: Vector3<Real>, reference: Vector3<Real>, side: Real) -> Vector3<Real> {
    reference + minimum_image(point - reference, side)
}

/// Mass-weighted centre of mass of a pair of diffusing particles, following
/// `World.calculate_pair_CoM` in `gfrdbase.py`: the heavier diffuser (larger
/// `D`) counts for *less* of the displacement needed to reach the midpoint,
/// so its position is weighted by the *other* particle's `D`.
pub fn pair_center_of_mass(
    pos1: Vector3<Real>,
    pos2: Vector3<Real>,
    d1: Real,
    d2: Real,
    side: Real,
) -> Vector3<Real> {
    let pos2_transposed = cyclic_transpose(pos2, pos1, side);
    let com = (d2 * pos1 + d1 * pos2_transposed) / (d1 + d2);
    apply_boundary(com, side)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_image_wraps_around_half_box() {
        let side = 10.0;
        let delta = Vector3::new(9.0, 0.0, 0.0);
        let wrapped = minimum_image(delta, side);
        assert!((wrapped.x - (-1.0)).abs() < 1e-12);
    }

    #[test]
    fn periodic_distance_is_symmetric_and_wraps() {
        let side = 10.0;
        let a = Vector3::new(0.5, 0.0, 0.0);
        let b = Vector3::new(9.5, 0.0, 0.0);
        let d = periodic_distance(a, b, side);
        assert!((d - 1.0).abs() < 1e-9, "expected wrap-around distance 1.0, got {d}");
    }

    #[test]
    fn pair_com_weights_towards_slower_diffuser() {
        let side = 100.0;
        let pos1 = Vector3::new(0.0, 0.0, 0.0);
        let pos2 = Vector3::new(10.0, 0.0, 0.0);
        // particle 1 is immobile, particle 2 diffuses: CoM should sit at pos1.
        let com = pair_center_of_mass(pos1, pos2, 0.0, 1.0, side);
        assert!((com - pos1).norm() < 1e-9);
    }
}
