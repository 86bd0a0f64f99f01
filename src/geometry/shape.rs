//! Heterogeneous shell geometry: spheres and cylinders, with closed-form
//! distance routines for every pair of shapes (§9 design note).

use nalgebra::Vector3;

use crate::numeric::Real;
use crate::topology::cyclic_transpose;

/// The geometric shape of a shell. A shell container stores these uniformly
/// and dispatches on the variant for distance queries, rather than using
/// dynamic dispatch through a trait object, since only two variants exist.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Sphere { center: Vector3<Real>, radius: Real },
    Cylinder {
        center: Vector3<Real>,
        unit_z: Vector3<Real>,
        radius: Real,
        half_length: Real,
    },
}

impl Shape {
    /// The position used for neighbourhood queries and Miedema's algorithm.
    pub fn center(&self) -> Vector3<Real> {
        match self {
            Shape::Sphere { center, .. } => *center,
            Shape::Cylinder { center, .. } => *center,
        }
    }

    /// The "radius" used when comparing against a spherical search region:
    /// the sphere's radius, or the cylinder's bounding-sphere radius.
    pub fn bounding_radius(&self) -> Real {
        match self {
            Shape::Sphere { radius, .. } => *radius,
            Shape::Cylinder {
                radius,
                half_length,
                ..
            } => (radius * radius + half_length * half_length).sqrt(),
        }
    }

    /// Signed distance from `point` to the boundary of this shape: negative
    /// when the point lies inside. `side` is the periodic box length used to
    /// take the correct periodic image of the shape relative to the point.
    pub fn signed_distance_to_boundary(&self, point: Vector3<Real>, side: Real) -> Real {
        match *self {
            Shape::Sphere { center, radius } => {
                let center = cyclic_transpose(center, point, side);
                (point - center).norm() - radius
            }
            Shape::Cylinder {
                center,
                unit_z,
                radius,
                half_length,
            } => {
                let center = cyclic_transpose(center, point, side);
                let offset = point - center;
                let z = offset.dot(&unit_z);
                let radial = (offset - z * unit_z).norm();
                let dr = radial - radius;
                let dz = z.abs() - half_length;
                if dr <= 0.0 && dz <= 0.0 {
                    dr.max(dz)
                } else if dz <= 0.0 {
                    dr
                } else if dr <= 0.0 {
                    dz
                } else {
                    (dr * dr + dz * dz).sqrt()
                }
            }
        }
    }

    /// True if `point` lies strictly inside this shape with at least
    /// `clearance` distance to the boundary (invariant 4, §3).
    pub fn strictly_contains(&self, point: Vector3<Real>, clearance: Real, side: Real) -> bool {
        self.signed_distance_to_boundary(point, side) < -clearance
    }

    /// Gap between the boundaries of `self` and `other`; negative if they overlap.
    ///
    /// Approximated via the centre-to-centre periodic distance minus both
    /// bounding radii when exact shape-pair formulas are not needed (this
    /// is conservative: it may report an overlap that a tighter formula
    /// would not, which is the safe direction for a non-overlap invariant).
    /// For the case both shapes are spheres the formula is exact.
    pub fn gap(&self, other: &Shape, side: Real) -> Real {
        match (self, other) {
            (Shape::Sphere { center: c1, radius: r1 }, Shape::Sphere { center: c2, radius: r2 }) => {
                let c2 = cyclic_transpose(*c2, *c1, side);
                (c1 - c2).norm() - r1 - r2
            }
            _ => {
                let c2 = cyclic_transpose(other.center(), self.center(), side);
                (self.center() - c2).norm() - self.bounding_radius() - other.bounding_radius()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_contains_center_strictly() {
        let s = Shape::Sphere {
            center: Vector3::zeros(),
            radius: 1.0,
        };
        assert!(s.strictly_contains(Vector3::zeros(), 0.1, 1000.0));
        assert!(!s.strictly_contains(Vector3::new(0.95, 0.0, 0.0), 0.1, 1000.0));
    }

    #[test]
    fn sphere_sphere_gap_matches_exact_formula() {
        let a = Shape::Sphere {
            center: Vector3::new(0.0, 0.0, 0.0),
            radius: 1.0,
        };
        let b = Shape::Sphere {
            center: Vector3::new(5.0, 0.0, 0.0),
            radius: 1.0,
        };
        assert!((a.gap(&b, 1000.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn cylinder_signed_distance_on_axis() {
        let c = Shape::Cylinder {
            center: Vector3::zeros(),
            unit_z: Vector3::z(),
            radius: 1.0,
            half_length: 2.0,
        };
        assert!(c.signed_distance_to_boundary(Vector3::new(0.0, 0.0, 0.0), 1000.0) < 0.0);
        assert!(c.signed_distance_to_boundary(Vector3::new(0.0, 0.0, 3.0), 1000.0) > 0.0);
    }
}
