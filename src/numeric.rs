//! Scalar and identifier types shared by every component of the core.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Floating point type used throughout the simulator.
///
/// Unlike the teacher crate's generic `Real` trait (used there to support
/// both `f32` and `f64` background grids), the scheduler's correctness here
/// hinges on time-ordering and geometric containment, not on numeric
/// backend portability, so a single concrete type is used.
pub type Real = f64;

/// Simulation wall-clock time.
pub type Time = Real;

macro_rules! id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw integer as an id. Intended for (de)serialization and tests only.
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw integer backing this id.
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

id_type!(ParticleId, "Identifies a particle owned by the `World`.");
id_type!(SpeciesId, "Identifies a species defined by the `Model`.");
id_type!(StructureId, "Identifies a structure (region or surface).");
id_type!(ShellId, "Identifies a shell owned by exactly one domain.");
id_type!(DomainId, "Identifies a domain owned by the domain registry.");
id_type!(EventId, "Identifies a scheduled event in the event queue.");

/// Monotonically increasing id generator.
///
/// Every id space in the simulator (particles, shells, domains, events) is
/// generated from one of these so ids are never reused within a run, matching
/// the reference implementation's `*_id_generator` counters in `egfrd.py`.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Creates a generator that will hand out ids starting at zero.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Returns the next unused raw id.
    pub fn next_raw(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_generator {
    ($fn_name:ident, $id:ident) => {
        impl IdGenerator {
            #[doc = concat!("Generates a fresh, never-before-issued ", stringify!($id), ".")]
            pub fn $fn_name(&self) -> $id {
                $id::from_raw(self.next_raw())
            }
        }
    };
}

impl_generator!(new_particle_id, ParticleId);
impl_generator!(new_shell_id, ShellId);
impl_generator!(new_domain_id, DomainId);
impl_generator!(new_event_id, EventId);

/// Numerical slack applied when computing shell sizes so that floating point
/// rounding cannot push a particle exactly onto a shell boundary.
///
/// Mirrors the reference implementation's `SAFETY = 1 + 1e-5` constant used
/// throughout `egfrd.py`'s shell-sizing routines.
pub const SAFETY: Real = 1.0 + 1e-5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_never_reused() {
        let gen = IdGenerator::new();
        let a = gen.new_domain_id();
        let b = gen.new_domain_id();
        assert_ne!(a, b);
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
    }
}
