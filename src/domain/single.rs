//! Single-particle domains: [`NonInteractionSingle`] and [`InteractionSingle`] (§3).

use crate::numeric::{ParticleId, ShellId, StructureId, Time};

use super::{DomainHeader, EventKind};

/// The structure topology a `NonInteractionSingle` lives on, which decides
/// which analytic propagator geometry applies (spherical/planar/cylindrical
/// sub-variants named in §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructureKind {
    /// In the 3D bulk: a spherical shell.
    Bulk,
    /// On a planar surface (membrane): a disk-like (cylindrical, flattened) shell.
    Planar,
    /// On a cylindrical surface (rod): a rod-segment shell.
    Cylindrical,
}

/// One particle, one shell, on one structure (§3).
#[derive(Clone, Copy, Debug)]
pub struct NonInteractionSingle {
    pub header: DomainHeader,
    pub particle: ParticleId,
    pub shell: ShellId,
    pub structure: StructureId,
    pub structure_kind: StructureKind,
    /// Decided alongside `dt` at construction time by
    /// `Propagator::determine_next_event_single` and reused unchanged at
    /// firing time (the propagator is not asked again).
    pub event_kind: EventKind,
}

/// One particle plus a reference to an approaching surface; its shell is a
/// cylinder straddling the bulk structure and the surface (§3).
#[derive(Clone, Copy, Debug)]
pub struct InteractionSingle {
    pub header: DomainHeader,
    pub particle: ParticleId,
    pub shell: ShellId,
    /// The bulk structure the particle is diffusing in.
    pub structure: StructureId,
    /// The surface it is interacting with.
    pub target_surface: StructureId,
    pub event_kind: EventKind,
}

/// Either flavour of Single domain.
#[derive(Clone, Copy, Debug)]
pub enum SingleDomain {
    NonInteraction(NonInteractionSingle),
    Interaction(InteractionSingle),
}

impl SingleDomain {
    pub fn header(&self) -> &DomainHeader {
        match self {
            SingleDomain::NonInteraction(s) => &s.header,
            SingleDomain::Interaction(s) => &s.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut DomainHeader {
        match self {
            SingleDomain::NonInteraction(s) => &mut s.header,
            SingleDomain::Interaction(s) => &mut s.header,
        }
    }

    pub fn particle_id(&self) -> ParticleId {
        match self {
            SingleDomain::NonInteraction(s) => s.particle,
            SingleDomain::Interaction(s) => s.particle,
        }
    }

    pub fn shell_id(&self) -> ShellId {
        match self {
            SingleDomain::NonInteraction(s) => s.shell,
            SingleDomain::Interaction(s) => s.shell,
        }
    }

    pub fn structure(&self) -> StructureId {
        match self {
            SingleDomain::NonInteraction(s) => s.structure,
            SingleDomain::Interaction(s) => s.structure,
        }
    }

    pub fn is_reset(&self) -> bool {
        self.header().is_reset()
    }

    pub fn as_non_interaction(&self) -> Option<&NonInteractionSingle> {
        match self {
            SingleDomain::NonInteraction(s) => Some(s),
            SingleDomain::Interaction(_) => None,
        }
    }
}

/// Constructs a fresh, zero-`dt` `NonInteractionSingle` at the current time,
/// the canonical shape of a freshly-burst or freshly-reset single (§4.10).
pub fn reset_non_interaction_single(
    header: DomainHeader,
    particle: ParticleId,
    shell: ShellId,
    structure: StructureId,
    structure_kind: StructureKind,
    now: Time,
) -> NonInteractionSingle {
    let mut header = header;
    header.last_time = now;
    header.dt = 0.0;
    NonInteractionSingle {
        header,
        particle,
        shell,
        structure,
        structure_kind,
        event_kind: EventKind::Burst,
    }
}
