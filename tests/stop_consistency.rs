//! `stop(t)` (§5) must burst every live domain up to `t` and leave the
//! scheduler in a state that passes every invariant in §8, exactly as if
//! each of those domains had fired its own event independently.

mod common;

use egfrd_core::model::reference_model::ReferenceModel;
use egfrd_core::nalgebra::Vector3;
use egfrd_core::{Parameters, Simulator, SpeciesId, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn stop_bursts_pending_domains_and_stays_consistent() {
    let side = 100.0;
    let species = SpeciesId::from_raw(0);
    let mut world = common::world_with_species(side, species, 1.0, 1.0);
    world.new_particle(species, Vector3::new(20.0, 50.0, 50.0));
    world.new_particle(species, Vector3::new(80.0, 50.0, 50.0));

    let model = ReferenceModel::new();
    let rng = ChaCha8Rng::seed_from_u64(31);
    // Long mean dt: every domain is still pending, none has fired yet, when
    // stop() is called well before the first scheduled event.
    let propagator = common::MockPropagator::new(ChaCha8Rng::seed_from_u64(32), side, 10.0, 0.0);
    let params = Parameters::for_world(side);

    let mut sim = Simulator::new(world, model, propagator, rng, params, Vec::new());
    sim.initialize().expect("initialize should succeed for two well-separated particles");

    let next = sim.get_next_time().expect("a domain must be scheduled after initialize");
    let stop_at = next / 2.0;

    sim.stop(stop_at).expect("stop() within range should succeed");
    assert_eq!(sim.t(), stop_at);
    assert_eq!(sim.world().particle_ids().len(), 2, "bursting must not change the particle count");
    sim.check().expect("scheduler must satisfy every invariant right after stop()");

    // Every domain bursted by stop() must be rescheduled strictly after the
    // time it was bursted at.
    for (_, domain) in sim.registry().iter() {
        assert!(domain.header().last_time == stop_at);
        assert!(sim.get_next_time().map(|t| t >= stop_at).unwrap_or(true));
    }

    // stop() past the next scheduled event must be rejected as a user error.
    let far_future = stop_at + 1_000_000.0;
    let err = sim.stop(far_future).expect_err("stop() past the next event must be rejected");
    match err {
        egfrd_core::SimulationError::User(egfrd_core::UserError::StopTimeOutOfRange { .. }) => {}
        other => panic!("expected StopTimeOutOfRange, got {other:?}"),
    }

    // The scheduler keeps running cleanly after a stop().
    for _ in 0..10 {
        if sim.step().is_err() {
            break;
        }
    }
    sim.check().expect("scheduler must remain consistent after further steps");
}
