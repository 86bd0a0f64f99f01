//! Domain variants: the unit of scheduling (§3, §9).
//!
//! Following the teacher's approach to polymorphism over algorithm variants
//! (a tagged enum dispatched on in `reconstruction.rs`'s octree visitor,
//! rather than a trait object), every domain kind is a variant of [`Domain`]
//! sharing a [`DomainHeader`] for the fields common to all of them
//! (event-id, timestamps) as recommended by §9's design note.

pub mod multi;
pub mod pair;
pub mod single;

pub use multi::MultiDomain;
pub use pair::PairDomain;
pub use single::{reset_non_interaction_single, InteractionSingle, NonInteractionSingle, SingleDomain};

use smallvec::SmallVec;

use crate::numeric::{DomainId, EventId, ParticleId, ShellId, Time};

/// Fields common to every domain variant (§9: "Shared behaviour ... lives in
/// a common header struct").
#[derive(Clone, Copy, Debug)]
pub struct DomainHeader {
    pub domain_id: DomainId,
    /// The single event this domain owns (invariant 2, §3). `None` only
    /// during the brief window between construction and scheduling.
    pub event_id: Option<EventId>,
    /// Simulation time at which this domain was last reset (propagated or burst).
    pub last_time: Time,
    /// Duration until the domain's scheduled event, as returned by the propagator.
    pub dt: Time,
}

impl DomainHeader {
    pub fn new(domain_id: DomainId, now: Time) -> Self {
        Self {
            domain_id,
            event_id: None,
            last_time: now,
            dt: 0.0,
        }
    }

    /// True if this domain was reset at exactly `now` and has not yet moved
    /// (`dt == 0`). Bursting such a domain is a no-op by construction (§4.10,
    /// flagged as an open question in §9: confirmed by `burst_idempotence`
    /// tests in this crate).
    pub fn is_reset(&self) -> bool {
        self.dt == 0.0
    }

    pub fn was_reset_at(&self, now: Time) -> bool {
        self.last_time == now
    }
}

/// The kind of event the propagator drew for a domain (§4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    SingleEscape,
    SingleReaction,
    IvEscape,
    IvReaction,
    IvInteraction,
    ComEscape,
    Burst,
    MultiDiffusion,
    MultiEscape,
    MultiUnimolecularReaction,
    MultiBimolecularReaction,
}

impl EventKind {
    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            EventKind::MultiDiffusion
                | EventKind::MultiEscape
                | EventKind::MultiUnimolecularReaction
                | EventKind::MultiBimolecularReaction
        )
    }
}

/// A domain owned by the registry: exactly one of Single / Pair / Multi (§3).
#[derive(Clone, Debug)]
pub enum Domain {
    Single(SingleDomain),
    Pair(PairDomain),
    Multi(MultiDomain),
}

impl Domain {
    pub fn header(&self) -> &DomainHeader {
        match self {
            Domain::Single(s) => s.header(),
            Domain::Pair(p) => &p.header,
            Domain::Multi(m) => &m.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut DomainHeader {
        match self {
            Domain::Single(s) => s.header_mut(),
            Domain::Pair(p) => &mut p.header,
            Domain::Multi(m) => &mut m.header,
        }
    }

    pub fn domain_id(&self) -> DomainId {
        self.header().domain_id
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Domain::Multi(_))
    }

    /// All shell ids owned by this domain (one for Single/Pair, 1..n for Multi).
    pub fn shell_ids(&self) -> SmallVec<[ShellId; 1]> {
        match self {
            Domain::Single(s) => SmallVec::from_elem(s.shell_id(), 1),
            Domain::Pair(p) => SmallVec::from_elem(p.shell, 1),
            Domain::Multi(m) => SmallVec::from_slice(&m.shells),
        }
    }

    /// All particle ids owned by this domain.
    pub fn particle_ids(&self) -> SmallVec<[ParticleId; 2]> {
        match self {
            Domain::Single(s) => SmallVec::from_elem(s.particle_id(), 1),
            Domain::Pair(p) => SmallVec::from_vec(vec![p.particle1, p.particle2]),
            Domain::Multi(m) => SmallVec::from_slice(&m.particles),
        }
    }
}
