//! Multi domains: a Brownian-dynamics cluster of overlapping spherical
//! shells (§3, §4.9).

use crate::numeric::{DomainId, ParticleId, Real, ShellId};

use super::DomainHeader;

/// The outcome of the most recent [`crate::multi_engine::fire_multi`] call,
/// set by the Multi engine and consumed by the simulator's dispatch logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MultiEvent {
    Diffusion,
    Escape,
    UnimolecularReaction,
    BimolecularReaction,
}

/// 1..n particles and 1..n overlapping spherical shells, treated as a single
/// Brownian-dynamics cluster (§3, §4.9).
#[derive(Clone, Debug)]
pub struct MultiDomain {
    pub header: DomainHeader,
    pub particles: Vec<ParticleId>,
    pub shells: Vec<ShellId>,
    pub last_event: MultiEvent,
    /// Scales the BD sub-step size relative to the diffusion-limited estimate (§4.9).
    pub step_size_factor: Real,
    /// Hard floor on the BD sub-step, guarding against a vanishing `dt`
    /// when `D_max` is large (mirrors `multi.py`'s `dt_hardcore_min`).
    pub dt_hardcore_min: Real,
    /// Reaction cushion distance, recomputed alongside `dt` each time the
    /// Multi is (re)initialized (`multi.py`'s `set_dt_and_reaction_length`).
    pub reaction_length: Real,
}

impl MultiDomain {
    pub fn new(domain_id: DomainId, now: Real, step_size_factor: Real, dt_hardcore_min: Real) -> Self {
        Self {
            header: DomainHeader::new(domain_id, now),
            particles: Vec::new(),
            shells: Vec::new(),
            last_event: MultiEvent::Diffusion,
            step_size_factor,
            dt_hardcore_min,
            reaction_length: 0.0,
        }
    }

    pub fn multiplicity(&self) -> usize {
        self.particles.len()
    }

    pub fn has_particle(&self, id: ParticleId) -> bool {
        self.particles.contains(&id)
    }

    pub fn add_particle(&mut self, id: ParticleId) {
        if !self.has_particle(id) {
            self.particles.push(id);
        }
    }

    pub fn add_shell(&mut self, id: ShellId) {
        if !self.shells.contains(&id) {
            self.shells.push(id);
        }
    }

    /// Absorbs another Multi's particles and shells (`merge_multis` in `egfrd.py`).
    pub fn merge_from(&mut self, other: &MultiDomain) {
        for &p in &other.particles {
            self.add_particle(p);
        }
        for &s in &other.shells {
            self.add_shell(s);
        }
    }
}
