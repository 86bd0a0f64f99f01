//! A large, slow particle surrounded by three small, fast ones close enough
//! that the Constructor (§4.6) cannot fit a Pair shell around any one of
//! them without the others intruding, so it must fall through to forming a
//! `Multi` (§4.9) instead.

mod common;

use egfrd_core::model::reference_model::ReferenceModel;
use egfrd_core::nalgebra::Vector3;
use egfrd_core::{
    Domain, EventKind, InteractionSingle, NonInteractionSingle, PairDomain, PairPositions,
    Parameters, ParticleId, Propagator, Real, Simulator, SpeciesId, Time, World,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Keeps every redraw within a small cube around a fixed anchor, regardless
/// of which particle is moving, so a tightly packed cluster stays tightly
/// packed across repeated escape/diffusion events. `fast` always gets a
/// short `dt`, so it is always the first domain to fire after `initialize`.
struct ClusterPropagator {
    anchor: Vector3<Real>,
    fast: ParticleId,
    rng: ChaCha8Rng,
}

impl ClusterPropagator {
    fn jitter(&mut self) -> Vector3<Real> {
        let j = 0.05;
        self.anchor
            + Vector3::new(
                self.rng.gen_range(-j..j),
                self.rng.gen_range(-j..j),
                self.rng.gen_range(-j..j),
            )
    }
}

impl Propagator for ClusterPropagator {
    fn determine_next_event_single(&mut self, single: &NonInteractionSingle) -> (Time, EventKind) {
        let dt = if single.particle == self.fast { 0.001 } else { 1.0e9 };
        (dt, EventKind::SingleEscape)
    }

    fn draw_new_position_single(
        &mut self,
        _single: &NonInteractionSingle,
        _dt: Time,
        _event_kind: EventKind,
    ) -> Vector3<Real> {
        self.jitter()
    }

    fn determine_next_event_interaction(&mut self, _single: &InteractionSingle) -> (Time, EventKind) {
        (1.0e9, EventKind::IvEscape)
    }

    fn draw_new_position_interaction(
        &mut self,
        _single: &InteractionSingle,
        _dt: Time,
        _event_kind: EventKind,
    ) -> Vector3<Real> {
        self.jitter()
    }

    fn determine_next_event_pair(&mut self, _pair: &PairDomain, _r0: Real) -> (Time, EventKind) {
        (1.0e9, EventKind::ComEscape)
    }

    fn draw_iv_event_type(&mut self, _pair: &PairDomain, _r0: Real) -> EventKind {
        EventKind::IvReaction
    }

    fn draw_new_com(&mut self, _pair: &PairDomain, _dt: Time, _event_kind: EventKind) -> Vector3<Real> {
        self.jitter()
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
        self.jitter()
    }

    fn draw_burst_positions_pair(&mut self, _pair: &PairDomain, _elapsed: Time) -> PairPositions {
        let p = self.jitter();
        PairPositions { pos1: p, pos2: p }
    }
}

#[test]
fn crowded_cluster_forms_multi() {
    let side = 200.0;
    let big_radius = 20.0;
    let small_radius = 0.1;
    let anchor = Vector3::new(100.0, 100.0, 100.0);
    // Inside [big_radius + small_radius, big_radius * multi_shell_factor]
    // (= [20.1, 21.0] with the default 1.05 factor): close enough to trip
    // the multi_horizon check but never overlapping.
    let satellite_distance = 20.55;

    let big_species = SpeciesId::from_raw(0);
    let small_species = SpeciesId::from_raw(1);
    let mut world = common::world_with_species(side, big_species, big_radius, 1.0);
    world.add_species(
        small_species,
        egfrd_core::Species {
            d: 1.0,
            radius: small_radius,
            structure: egfrd_core::StructureId::from_raw(0),
        },
    );

    let big = world.new_particle(big_species, anchor);
    world.new_particle(small_species, anchor + Vector3::new(satellite_distance, 0.0, 0.0));
    world.new_particle(small_species, anchor + Vector3::new(0.0, satellite_distance, 0.0));
    world.new_particle(small_species, anchor + Vector3::new(0.0, 0.0, satellite_distance));

    let model = ReferenceModel::new();
    let rng = ChaCha8Rng::seed_from_u64(21);
    let propagator = ClusterPropagator {
        anchor,
        fast: big,
        rng: ChaCha8Rng::seed_from_u64(22),
    };
    let params = Parameters::for_world(side);

    let mut sim = Simulator::new(world, model, propagator, rng, params, vec![]);
    sim.initialize().expect("initialize should succeed for four non-overlapping particles");
    assert_eq!(sim.world().particle_ids().len(), 4);

    // The big particle's event is scheduled far ahead of the three small
    // ones', so this first step reconstructs its domain while its
    // neighbors are still exactly where they were placed.
    sim.step().expect("first step should reconstruct the crowded big particle");

    let formed_multi = sim.registry().iter().any(|(_, d)| matches!(d, Domain::Multi(_)));
    assert!(formed_multi, "the crowded big particle should be folded into a Multi");

    for _ in 0..50 {
        if sim.step().is_err() {
            break;
        }
    }
    assert_eq!(sim.world().particle_ids().len(), 4, "no reaction rules are registered, particle count must be stable");
}
