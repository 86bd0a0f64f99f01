//! Shared fixtures for integration tests: a deterministic mock [`Propagator`]
//! that never calls into real Green's-function mathematics (out of scope,
//! see `DESIGN.md`), plus convenience builders for [`ReferenceWorld`] and
//! [`ReferenceModel`].

use egfrd_core::nalgebra::Vector3;
use egfrd_core::world::reference_world::ReferenceWorld;
use egfrd_core::{
    EventKind, InteractionSingle, NonInteractionSingle, PairDomain, PairPositions, Propagator,
    Real, Species, SpeciesId, Time,
};
use rand::{Rng, RngCore};

/// A `Propagator` mock: draws exponential dwell times from a fixed mean and
/// places particles at a uniformly random point of the box, ignoring the
/// domain's actual shell geometry. Good enough to drive the scheduler
/// through many events without needing the analytic math this crate
/// deliberately does not implement.
pub struct MockPropagator<R: RngCore> {
    pub rng: R,
    pub side: Real,
    pub mean_dt: Real,
    /// Probability that a `NonInteractionSingle`'s next event is a reaction
    /// rather than an escape.
    pub reaction_probability: Real,
    /// Probability that a freshly formed `PairDomain`'s next event is an
    /// inter-particle-vector reaction rather than a centre-of-mass escape.
    pub pair_reaction_probability: Real,
}

impl<R: RngCore> MockPropagator<R> {
    pub fn new(rng: R, side: Real, mean_dt: Real, reaction_probability: Real) -> Self {
        Self {
            rng,
            side,
            mean_dt,
            reaction_probability,
            pair_reaction_probability: 0.0,
        }
    }

    pub fn with_pair_reaction_probability(mut self, probability: Real) -> Self {
        self.pair_reaction_probability = probability;
        self
    }

    fn exponential_dt(&mut self) -> Time {
        let u: Real = self.rng.gen_range(1e-12..1.0);
        -self.mean_dt * u.ln()
    }

    fn random_point(&mut self) -> Vector3<Real> {
        Vector3::new(
            self.rng.gen_range(0.0..self.side),
            self.rng.gen_range(0.0..self.side),
            self.rng.gen_range(0.0..self.side),
        )
    }
}

impl<R: RngCore> Propagator for MockPropagator<R> {
    fn determine_next_event_single(&mut self, _single: &NonInteractionSingle) -> (Time, EventKind) {
        let dt = self.exponential_dt();
        let kind = if self.rng.gen::<Real>() < self.reaction_probability {
            EventKind::SingleReaction
        } else {
            EventKind::SingleEscape
        };
        (dt, kind)
    }

    fn draw_new_position_single(
        &mut self,
        _single: &NonInteractionSingle,
        _dt: Time,
        _event_kind: EventKind,
    ) -> Vector3<Real> {
        self.random_point()
    }

    fn determine_next_event_interaction(&mut self, _single: &InteractionSingle) -> (Time, EventKind) {
        (self.exponential_dt(), EventKind::IvEscape)
    }

    fn draw_new_position_interaction(
        &mut self,
        _single: &InteractionSingle,
        _dt: Time,
        _event_kind: EventKind,
    ) -> Vector3<Real> {
        self.random_point()
    }

    fn determine_next_event_pair(&mut self, _pair: &PairDomain, _r0: Real) -> (Time, EventKind) {
        let dt = self.exponential_dt();
        let kind = if self.rng.gen::<Real>() < self.pair_reaction_probability {
            EventKind::IvReaction
        } else {
            EventKind::ComEscape
        };
        (dt, kind)
    }

    fn draw_iv_event_type(&mut self, _pair: &PairDomain, _r0: Real) -> EventKind {
        EventKind::IvReaction
    }

    fn draw_new_com(&mut self, _pair: &PairDomain, _dt: Time, _event_kind: EventKind) -> Vector3<Real> {
        self.random_point()
    }

    fn draw_new_positions(
        &mut self,
        _pair: &PairDomain,
        _dt: Time,
        _event_kind: EventKind,
        new_com: Vector3<Real>,
    ) -> PairPositions {
        PairPositions {
            pos1: new_com,
            pos2: new_com,
        }
    }

    fn draw_burst_position_single(&mut self, _single: &NonInteractionSingle, _elapsed: Time) -> Vector3<Real> {
        self.random_point()
    }

    fn draw_burst_positions_pair(&mut self, _pair: &PairDomain, _elapsed: Time) -> PairPositions {
        PairPositions {
            pos1: self.random_point(),
            pos2: self.random_point(),
        }
    }
}

/// Builds an empty cubic [`ReferenceWorld`] with one registered species.
pub fn world_with_species(side: Real, species_id: SpeciesId, radius: Real, d: Real) -> ReferenceWorld {
    let mut world = ReferenceWorld::new(side);
    let bulk = world.bulk_structure();
    world.add_species(
        species_id,
        Species {
            d,
            radius,
            structure: bulk,
        },
    );
    world
}
