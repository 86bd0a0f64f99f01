//! The `World` external collaborator (§6): periodic particle storage and
//! cell-list neighbour index. The core only depends on the [`World`] trait;
//! a brute-force [`reference_world::ReferenceWorld`] fixture is provided for
//! tests behind the `reference-world` feature.

use nalgebra::Vector3;

use crate::numeric::{ParticleId, Real, SpeciesId, StructureId};
use crate::topology;

/// A particle as tracked by the `World` (§3).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vector3<Real>,
    pub radius: Real,
    pub d: Real,
    pub species: SpeciesId,
    pub structure: StructureId,
}

/// A chemical species, queried by id from the `Model` (§6).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Species {
    pub d: Real,
    pub radius: Real,
    pub structure: StructureId,
}

/// An immutable structure (region or surface) that particles may live on (§3).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Structure {
    /// The 3D bulk.
    CuboidalRegion {
        origin: Vector3<Real>,
        extent: Vector3<Real>,
    },
    /// A 2D rectangle embedded in the bulk.
    PlanarSurface {
        origin: Vector3<Real>,
        unit_x: Vector3<Real>,
        unit_y: Vector3<Real>,
        half_extent_x: Real,
        half_extent_y: Real,
    },
    /// A 1D axis (rod) embedded in the bulk.
    CylindricalSurface {
        origin: Vector3<Real>,
        unit_z: Vector3<Real>,
        radius: Real,
        half_length: Real,
    },
}

impl Structure {
    /// The outward unit normal used for interaction-single orientation
    /// (`PlanarSurface.shape.unit_z` in the reference implementation).
    pub fn unit_z(&self) -> Vector3<Real> {
        match self {
            Structure::CuboidalRegion { .. } => Vector3::z(),
            Structure::PlanarSurface { unit_x, unit_y, .. } => unit_x.cross(unit_y).normalize(),
            Structure::CylindricalSurface { unit_z, .. } => *unit_z,
        }
    }

    /// Projects `point` (already cyclic-transposed relative to this
    /// structure's origin by the caller) onto the structure, returning
    /// `(projected_point, signed_distance_along_normal)`.
    ///
    /// Mirrors `Surface.projected_point` in `egfrd.py`, which is used by
    /// `try_interaction` (§4.8) before running Miedema's algorithm.
    pub fn projected_point(&self, point: Vector3<Real>) -> (Vector3<Real>, Real) {
        match *self {
            Structure::CuboidalRegion { .. } => (point, 0.0),
            Structure::PlanarSurface { origin, .. } => {
                let n = self.unit_z();
                let signed = (point - origin).dot(&n);
                (point - signed * n, signed)
            }
            Structure::CylindricalSurface {
                origin, unit_z, ..
            } => {
                let offset = point - origin;
                let z = offset.dot(&unit_z);
                (origin + z * unit_z, z)
            }
        }
    }
}

/// The `World` contract consumed by the core (§6).
///
/// Implementations own the authoritative particle storage and a cell-list
/// neighbour index; they are assumed to already provide efficient
/// `check_overlap`/`distance` queries, so the core never reimplements them.
pub trait World {
    /// Side length of the cubic periodic box.
    fn side(&self) -> Real;

    /// Periodic distance between two points.
    fn distance(&self, a: Vector3<Real>, b: Vector3<Real>) -> Real {
        topology::periodic_distance(a, b, self.side())
    }

    /// Returns the periodic image of `point` nearest to `reference`.
    fn cyclic_transpose(&self, point: Vector3<Real>, reference: Vector3<Real>) -> Vector3<Real> {
        topology::cyclic_transpose(point, reference, self.side())
    }

    /// Wraps `point` back into the primary periodic image.
    fn apply_boundary(&self, point: Vector3<Real>) -> Vector3<Real> {
        topology::apply_boundary(point, self.side())
    }

    /// Returns the ids of all particles overlapping the sphere
    /// `(center, radius)`, excluding `ignore`.
    fn check_overlap(
        &self,
        center: Vector3<Real>,
        radius: Real,
        ignore: &[ParticleId],
    ) -> Vec<ParticleId>;

    /// Inserts a new particle of the given species at `position`, returning its id.
    fn new_particle(&mut self, species: SpeciesId, position: Vector3<Real>) -> ParticleId;

    /// Removes a particle; panics if it did not exist, matching the
    /// reference implementation's assumption that only owning domains call this.
    fn remove_particle(&mut self, id: ParticleId);

    /// Overwrites an existing particle's state.
    fn update_particle(&mut self, id: ParticleId, particle: Particle);

    /// Looks up a particle by id.
    fn get_particle(&self, id: ParticleId) -> Option<Particle>;

    /// Looks up a species definition by id.
    fn get_species(&self, id: SpeciesId) -> Option<Species>;

    /// Looks up a structure definition by id.
    fn get_structure(&self, id: StructureId) -> Option<Structure>;

    /// Iterates over all particle ids currently tracked, in an
    /// implementation-defined but stable order. The simulator sorts this by
    /// id before use to guarantee deterministic initialization (§9).
    fn particle_ids(&self) -> Vec<ParticleId>;
}

#[cfg(any(test, feature = "reference-world"))]
pub mod reference_world {
    //! A minimal, brute-force [`World`] implementation for tests.
    //!
    //! Performance of the `World` adapter is explicitly out of scope (§1);
    //! this fixture favours clarity over a real cell-list index.

    use std::collections::HashMap;

    use super::*;

    /// Brute-force, single periodic cuboidal region `World` fixture.
    #[derive(Clone, Debug)]
    pub struct ReferenceWorld {
        side: Real,
        particles: HashMap<ParticleId, Particle>,
        species: HashMap<SpeciesId, Species>,
        structures: HashMap<StructureId, Structure>,
        next_particle_id: u64,
    }

    impl ReferenceWorld {
        pub fn new(side: Real) -> Self {
            let mut structures = HashMap::new();
            let bulk = StructureId::from_raw(0);
            structures.insert(
                bulk,
                Structure::CuboidalRegion {
                    origin: Vector3::zeros(),
                    extent: Vector3::new(side, side, side),
                },
            );
            Self {
                side,
                particles: HashMap::new(),
                species: HashMap::new(),
                structures,
                next_particle_id: 0,
            }
        }

        /// The id of the implicit bulk cuboidal region created by [`Self::new`].
        pub fn bulk_structure(&self) -> StructureId {
            StructureId::from_raw(0)
        }

        pub fn add_species(&mut self, id: SpeciesId, species: Species) {
            self.species.insert(id, species);
        }

        pub fn add_structure(&mut self, id: StructureId, structure: Structure) {
            self.structures.insert(id, structure);
        }

        pub fn num_particles(&self) -> usize {
            self.particles.len()
        }
    }

    impl World for ReferenceWorld {
        fn side(&self) -> Real {
            self.side
        }

        fn check_overlap(
            &self,
            center: Vector3<Real>,
            radius: Real,
            ignore: &[ParticleId],
        ) -> Vec<ParticleId> {
            self.particles
                .iter()
                .filter(|(id, _)| !ignore.contains(id))
                .filter(|(_, p)| self.distance(p.position, center) < p.radius + radius)
                .map(|(id, _)| *id)
                .collect()
        }

        fn new_particle(&mut self, species: SpeciesId, position: Vector3<Real>) -> ParticleId {
            let spec = *self
                .species
                .get(&species)
                .expect("unknown species passed to new_particle");
            let id = ParticleId::from_raw(self.next_particle_id);
            self.next_particle_id += 1;
            self.particles.insert(
                id,
                Particle {
                    position: self.apply_boundary(position),
                    radius: spec.radius,
                    d: spec.d,
                    species,
                    structure: spec.structure,
                },
            );
            id
        }

        fn remove_particle(&mut self, id: ParticleId) {
            self.particles
                .remove(&id)
                .expect("remove_particle called on an unknown particle");
        }

        fn update_particle(&mut self, id: ParticleId, particle: Particle) {
            self.particles.insert(id, particle);
        }

        fn get_particle(&self, id: ParticleId) -> Option<Particle> {
            self.particles.get(&id).copied()
        }

        fn get_species(&self, id: SpeciesId) -> Option<Species> {
            self.species.get(&id).copied()
        }

        fn get_structure(&self, id: StructureId) -> Option<Structure> {
            self.structures.get(&id).copied()
        }

        fn particle_ids(&self) -> Vec<ParticleId> {
            let mut ids: Vec<_> = self.particles.keys().copied().collect();
            ids.sort();
            ids
        }
    }
}
