//! Axis-aligned bounding box over particle positions.
//!
//! Adapted from the teacher crate's `aabb` module (`AxisAlignedBoundingBox3d`,
//! used there to size the marching-cubes background grid around a particle
//! cloud). Here the same shape is used to validate that the `World`'s
//! cuboidal region is consistent with the configured box side, and to
//! compute an enclosing box for diagnostics / the reference `World` fixture.

use nalgebra::Vector3;

use crate::numeric::Real;

/// An axis-aligned box in ℝ³, inclusive of both corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisAlignedBoundingBox3d {
    min: Vector3<Real>,
    max: Vector3<Real>,
}

impl AxisAlignedBoundingBox3d {
    /// Constructs a box from its lower and upper corners.
    pub fn new(min: Vector3<Real>, max: Vector3<Real>) -> Self {
        assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "AABB min must be component-wise <= max"
        );
        Self { min, max }
    }

    /// The smallest box enclosing all given points; panics on an empty slice.
    pub fn from_points(points: &[Vector3<Real>]) -> Self {
        let mut iter = points.iter();
        let first = *iter.next().expect("cannot build an AABB from zero points");
        let mut aabb = Self::new(first, first);
        for &p in iter {
            aabb.extend(p);
        }
        aabb
    }

    /// Grows the box (if necessary) to also enclose `point`.
    pub fn extend(&mut self, point: Vector3<Real>) {
        self.min = self.min.zip_map(&point, |a, b| a.min(b));
        self.max = self.max.zip_map(&point, |a, b| a.max(b));
    }

    /// Grows the box uniformly on all sides by `margin`.
    pub fn grow_uniformly(&mut self, margin: Real) {
        let m = Vector3::new(margin, margin, margin);
        self.min -= m;
        self.max += m;
    }

    pub fn min(&self) -> Vector3<Real> {
        self.min
    }

    pub fn max(&self) -> Vector3<Real> {
        self.max
    }

    /// The per-axis extents (max - min).
    pub fn extents(&self) -> Vector3<Real> {
        self.max - self.min
    }

    /// True if this box is a cube, within `tolerance` absolute difference
    /// between its extents; used to validate the §6 `World` contract
    /// ("world non-cuboidal" is a user error, §7).
    pub fn is_cube(&self, tolerance: Real) -> bool {
        let e = self.extents();
        (e.x - e.y).abs() <= tolerance && (e.y - e.z).abs() <= tolerance
    }

    pub fn contains(&self, point: Vector3<Real>) -> bool {
        point.x >= self.min.x
            && point.y >= self.min.y
            && point.z >= self.min.z
            && point.x <= self.max.x
            && point.y <= self.max.y
            && point.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_encloses_all_points() {
        let pts = vec![
            Vector3::new(0.0, 5.0, -2.0),
            Vector3::new(3.0, -1.0, 4.0),
            Vector3::new(-3.0, 2.0, 1.0),
        ];
        let aabb = AxisAlignedBoundingBox3d::from_points(&pts);
        for p in pts {
            assert!(aabb.contains(p));
        }
    }

    #[test]
    fn cube_detection() {
        let cube = AxisAlignedBoundingBox3d::new(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0));
        assert!(cube.is_cube(1e-9));
        let slab = AxisAlignedBoundingBox3d::new(Vector3::zeros(), Vector3::new(1.0, 1.0, 5.0));
        assert!(!slab.is_cube(1e-9));
    }
}
