//!
//! Asynchronous event-driven scheduler and domain-construction core for
//! enhanced Green's Function Reaction Dynamics (eGFRD). Entry point is
//! [`simulator::Simulator`].
//!

pub mod check;
pub mod constructor;
pub mod domain;
pub mod error;
pub mod event_queue;
pub mod geometry;
pub mod model;
pub mod multi_engine;
pub mod numeric;
pub mod propagator;
pub mod registry;
pub mod rng;
pub mod shell_container;
pub mod simulator;
pub mod stats;
pub mod topology;
pub mod workspace;
pub mod world;

/// Re-export the version of nalgebra used by this crate.
pub use nalgebra;

pub use domain::{
    multi::MultiEvent, pair::PairDomain, single::{InteractionSingle, NonInteractionSingle, SingleDomain, StructureKind},
    Domain, DomainHeader, EventKind, MultiDomain,
};
pub use error::{InvariantViolation, SimulationError, UserError};
pub use event_queue::{Event, EventQueue};
pub use geometry::{AxisAlignedBoundingBox3d, Shape};
pub use model::{Model, ReactionRule, ReactionType};
pub use numeric::{DomainId, EventId, ParticleId, Real, ShellId, SpeciesId, StructureId, Time};
pub use propagator::{PairPositions, Propagator};
pub use registry::DomainRegistry;
pub use shell_container::{ShellContainer, StoredShell};
pub use simulator::{Parameters, Simulator};
pub use stats::Statistics;
pub use world::{Particle, Species, Structure, World};
