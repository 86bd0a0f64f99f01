//! A single particle with one zero-product decay rule: every fired event is
//! forced to be a `SingleReaction`, so the particle must be consumed on the
//! very first event and the world must end up empty.

mod common;

use egfrd_core::model::reference_model::ReferenceModel;
use egfrd_core::{Parameters, ReactionRule, ReactionType, Simulator, SpeciesId, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn forced_decay_removes_the_particle_and_is_counted() {
    let side = 100.0;
    let species = SpeciesId::from_raw(0);
    let mut world = common::world_with_species(side, species, 1.0, 1.0);
    world.new_particle(species, egfrd_core::nalgebra::Vector3::new(50.0, 50.0, 50.0));

    let mut model = ReferenceModel::new();
    model.add_monomolecular_rule(
        species,
        ReactionRule {
            rate: 1.0,
            products: Vec::new(),
            reaction_type: ReactionType::Decay,
        },
    );

    let rng = ChaCha8Rng::seed_from_u64(7);
    // reaction_probability = 1.0: the mock propagator always hands back a
    // SingleReaction event kind, forcing the decay path on the first fire.
    let propagator = common::MockPropagator::new(ChaCha8Rng::seed_from_u64(8), side, 1e-3, 1.0);
    let params = Parameters::for_world(side);

    let mut sim = Simulator::new(world, model, propagator, rng, params, Vec::new());
    sim.initialize().expect("initialize should succeed for a single isolated particle");

    sim.step().expect("the forced decay event should fire cleanly");

    assert!(sim.world().particle_ids().is_empty());
    assert_eq!(sim.stats().reaction_count, 1);

    // The event queue underflows once there is nothing left to schedule.
    let err = sim.step().expect_err("stepping an empty scheduler must fail");
    match err {
        egfrd_core::SimulationError::Invariant(egfrd_core::InvariantViolation::SchedulerUnderflow) => {}
        other => panic!("expected SchedulerUnderflow, got {other:?}"),
    }
}
