//! Pair domains: two particles on the same structure sharing one enclosing
//! shell (§3).

use nalgebra::Vector3;

use crate::numeric::{ParticleId, Real, ShellId, StructureId};

use super::{DomainHeader, EventKind};

/// Two particles on the same structure, one enclosing shell.
#[derive(Clone, Copy, Debug)]
pub struct PairDomain {
    pub header: DomainHeader,
    pub particle1: ParticleId,
    pub particle2: ParticleId,
    pub shell: ShellId,
    pub structure: StructureId,
    /// Initial inter-particle distance `r0` at the moment the pair was formed.
    pub r0: Real,
    /// Mass-weighted centre of mass, fixed at formation time (late-binding
    /// `draw_iv_event_type` recomputes everything else at fire time, §4.4).
    pub com: Vector3<Real>,
    /// Which particle is allowed to react, set once the propagator resolves
    /// the event kind at firing time (§4.4's "late binding").
    pub reacting_particle: Option<ParticleId>,
    /// Decided at construction time by `Propagator::determine_next_event_pair`.
    /// `IV_REACTION` outcomes are additionally late-bound via
    /// `Propagator::draw_iv_event_type` at firing time.
    pub event_kind: EventKind,
}

impl PairDomain {
    pub fn other_particle(&self, particle: ParticleId) -> ParticleId {
        if particle == self.particle1 {
            self.particle2
        } else {
            self.particle1
        }
    }

    pub fn is_reset(&self) -> bool {
        self.header.is_reset()
    }
}
