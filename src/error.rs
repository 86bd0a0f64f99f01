//! Error taxonomy for the simulator (§7).
//!
//! `NoSpace` deliberately has no variant here: it is caught locally inside
//! the reaction-placement handlers and converted into a rejection-counter
//! increment (see [`crate::simulator::Simulator`]), never propagated.

use thiserror::Error as ThisError;

use crate::numeric::{DomainId, EventId, ParticleId, ShellId, SpeciesId, Time};

/// Fatal invariant violations (§8, items 1-7). These indicate a bug in the
/// scheduler itself, never a property of the physical system being
/// simulated, and always halt the simulation.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum InvariantViolation {
    /// A domain's scheduled event time is behind the current simulation time.
    #[error("domain {domain} has event time {event_time} < simulator time {sim_time}")]
    EventBehindSimTime {
        domain: DomainId,
        event_time: Time,
        sim_time: Time,
    },
    /// Two shells belonging to different non-Multi domains overlap.
    #[error("shells {a} and {b} of distinct non-Multi domains overlap (distance {distance})")]
    ShellOverlap {
        a: ShellId,
        b: ShellId,
        distance: Time,
    },
    /// A particle is not strictly contained in any shell of its owning domain.
    #[error("particle of domain {domain} is not inside any of its shells")]
    ParticleOutsideShell { domain: DomainId },
    /// The particle count tracked by the `World` diverged from the domains' bookkeeping.
    #[error("world reports {world_count} particles but domains account for {domain_count}")]
    ParticleCountMismatch {
        world_count: usize,
        domain_count: usize,
    },
    /// The shell container's count diverged from the domains' bookkeeping.
    #[error("shell container reports {container_count} shells but domains account for {domain_count}")]
    ShellCountMismatch {
        container_count: usize,
        domain_count: usize,
    },
    /// An event in the queue has no matching domain, or vice versa.
    #[error("event {event} has no matching domain (or domain {domain} has no matching event)")]
    EventDomainMismatch { event: EventId, domain: DomainId },
    /// A Multi's internal shell graph is not connected.
    #[error("shells of multi {domain} are not contiguous")]
    DisconnectedMulti { domain: DomainId },
    /// `step()` found the event queue empty; this can only happen if every
    /// domain was removed without a replacement being scheduled.
    #[error("event queue underflowed: no events remain to pop")]
    SchedulerUnderflow,
    /// A particle id referenced by a domain/event no longer exists in the `World`.
    #[error("particle {particle} referenced by a live domain no longer exists in the world")]
    MissingParticle { particle: ParticleId },
    /// A species id referenced by a reaction rule or particle is not registered with the `Model`/`World`.
    #[error("species {species} referenced by a reaction rule is not registered")]
    MissingSpecies { species: SpeciesId },
    /// A domain id that the registry, shell container, or event queue should
    /// still own has already been removed.
    #[error("domain {domain} is referenced but no longer present in the registry")]
    MissingDomain { domain: DomainId },
}

/// Errors raised synchronously in response to caller misuse (§7, "user errors").
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum UserError {
    /// `stop(t)` was called with a `t` outside `[sim.t, queue.peek().time]`.
    #[error("stop({requested}) is out of range: simulator is at {sim_time}, next event at {next_event_time:?}")]
    StopTimeOutOfRange {
        requested: Time,
        sim_time: Time,
        next_event_time: Option<Time>,
    },
    /// The world's bounding region is not cuboidal, which every shell-sizing
    /// routine assumes when computing the max shell size.
    #[error("world is not cuboidal, cannot bound shell sizes")]
    NonCuboidalWorld,
    /// The model could not supply a rule or species the simulator asked for.
    #[error("model misconfiguration: {0}")]
    ModelMisconfiguration(String),
}

/// Top level error type returned by [`crate::simulator::Simulator::step`] and friends.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum SimulationError {
    /// A debug-mode or runtime invariant check failed; always a bug.
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),
    /// The caller did something the API contract forbids.
    #[error("user error: {0}")]
    User(#[from] UserError),
    /// Too many consecutive zero-`dt` steps fired without making progress;
    /// almost certainly a numerical live-lock between the constructor and
    /// the propagator.
    #[error("numerical live-lock: {consecutive_zero_dt_steps} consecutive zero-dt steps")]
    NumericalLiveLock {
        consecutive_zero_dt_steps: usize,
    },
    /// Any error from an external collaborator (propagator, world, model)
    /// that does not fit one of the above variants.
    #[error("external collaborator error: {0}")]
    External(anyhow::Error),
}

impl From<anyhow::Error> for SimulationError {
    fn from(error: anyhow::Error) -> Self {
        SimulationError::External(error)
    }
}
