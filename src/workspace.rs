//! Scratch buffers reused across steps to avoid reallocating on every event.
//!
//! Adapted from the teacher crate's `workspace` module: `splashsurf_lib`
//! keeps a [`ThreadLocal`](thread_local::ThreadLocal) per-worker-thread
//! workspace because its reconstruction pipeline runs on a `rayon` pool.
//! This crate is single-threaded and event-serial by design (§5), so the
//! `ThreadLocal`/`RefCell` indirection has no remaining use here and is
//! dropped (see `DESIGN.md`); what's kept is the teacher's core idea of one
//! owned, reusable workspace of scratch `Vec`s instead of allocating fresh
//! ones on every call into the constructor or Multi engine.

use std::fmt;
use std::fmt::Debug;

use crate::domain::Domain;
use crate::numeric::{DomainId, ParticleId};

/// Reusable scratch buffers for [`crate::constructor::make_new_domain`] and
/// the Multi engine's BD sub-stepper.
#[derive(Default)]
pub struct SimulatorWorkspace {
    /// Scratch list of domains bursted while handling one `make_new_domain` call.
    pub(crate) burst_buffer: Vec<Domain>,
    /// Scratch list of neighbour domain ids found during a radius query.
    pub(crate) intruder_buffer: Vec<DomainId>,
    /// Scratch particle id list used while assembling a Multi during
    /// `add_to_multi_recursive`.
    pub(crate) multi_sweep_buffer: Vec<ParticleId>,
}

impl SimulatorWorkspace {
    /// Constructs an empty workspace without allocating additional memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a workspace with pre-allocated capacity sized for `particle_count` particles.
    pub fn with_capacity(particle_count: usize) -> Self {
        Self {
            burst_buffer: Vec::with_capacity(8),
            intruder_buffer: Vec::with_capacity(8),
            multi_sweep_buffer: Vec::with_capacity(particle_count.min(64)),
        }
    }

    /// Clears all scratch buffers without releasing their backing allocations.
    pub(crate) fn clear(&mut self) {
        self.burst_buffer.clear();
        self.intruder_buffer.clear();
        self.multi_sweep_buffer.clear();
    }
}

impl Debug for SimulatorWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatorWorkspace").finish()
    }
}
