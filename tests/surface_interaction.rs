//! A bulk particle placed just off a registered planar surface: the
//! Constructor's Priority-2 branch (§4.6) should fold it into an
//! `InteractionSingle` straddling the surface rather than leaving it a lone
//! `NonInteractionSingle`.

mod common;

use egfrd_core::model::reference_model::ReferenceModel;
use egfrd_core::nalgebra::Vector3;
use egfrd_core::{Domain, Parameters, SingleDomain, Simulator, SpeciesId, StructureId, Structure, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn particle_near_planar_surface_forms_interaction_single() {
    let side = 100.0;
    let species = SpeciesId::from_raw(0);
    let mut world = common::world_with_species(side, species, 1.0, 1.0);

    let surface_id = StructureId::from_raw(1);
    world.add_structure(
        surface_id,
        Structure::PlanarSurface {
            origin: Vector3::new(50.0, 50.0, 50.0),
            unit_x: Vector3::x(),
            unit_y: Vector3::y(),
            half_extent_x: 40.0,
            half_extent_y: 40.0,
        },
    );

    // 0.5 below the surface plane: well inside the particle's reaction
    // horizon (radius * single_shell_factor = 2.0) and far from any other
    // domain, so Priority 2 (Interaction) should win over Priority 3/4.
    world.new_particle(species, Vector3::new(50.0, 50.0, 49.5));

    let model = ReferenceModel::new();
    let rng = ChaCha8Rng::seed_from_u64(11);
    let propagator = common::MockPropagator::new(ChaCha8Rng::seed_from_u64(12), side, 1e-3, 0.0);
    let params = Parameters::for_world(side);

    let mut sim = Simulator::new(world, model, propagator, rng, params, vec![surface_id]);
    sim.initialize().expect("initialize should succeed for a single particle near a surface");

    let formed_interaction = sim
        .registry()
        .iter()
        .any(|(_, d)| matches!(d, Domain::Single(SingleDomain::Interaction(_))));
    assert!(formed_interaction, "particle near the surface should form an InteractionSingle");

    for _ in 0..20 {
        if sim.step().is_err() {
            break;
        }
    }
    assert_eq!(sim.world().particle_ids().len(), 1, "the single particle is never consumed");
}
