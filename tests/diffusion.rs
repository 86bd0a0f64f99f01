//! A single free particle in an empty box: the scheduler should run for many
//! events without tripping any debug-mode invariant (§8), and the particle's
//! domain should always track its real `World` position.

mod common;

use egfrd_core::model::reference_model::ReferenceModel;
use egfrd_core::{Parameters, Simulator, SpeciesId, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn single_free_particle_runs_many_events_without_invariant_violation() {
    let side = 100.0;
    let species = SpeciesId::from_raw(0);
    let mut world = common::world_with_species(side, species, 1.0, 1.0);
    world.new_particle(species, egfrd_core::nalgebra::Vector3::new(50.0, 50.0, 50.0));

    let model = ReferenceModel::new();
    let rng = ChaCha8Rng::seed_from_u64(1);
    let propagator = common::MockPropagator::new(ChaCha8Rng::seed_from_u64(2), side, 1e-3, 0.0);
    let params = Parameters::for_world(side);

    let mut sim = Simulator::new(world, model, propagator, rng, params, Vec::new());
    sim.initialize().expect("initialize should succeed for a single isolated particle");

    for _ in 0..200 {
        sim.step().expect("step should never trip an invariant for a lone particle");
    }

    assert_eq!(sim.world().particle_ids().len(), 1);
    assert_eq!(sim.stats().step_count, 200);
    assert_eq!(
        sim.stats().count_for(egfrd_core::EventKind::SingleEscape),
        200,
        "reaction_probability was 0.0, every fired event must be an escape"
    );
}
