//! The analytic Green's-function propagator (§1, §4.4): an external
//! collaborator whose math is explicitly out of scope for this crate. The
//! core only depends on the [`Propagator`] trait.

use nalgebra::Vector3;

use crate::domain::{EventKind, InteractionSingle, NonInteractionSingle, PairDomain};
use crate::numeric::{ParticleId, Real, Time};

/// Per-particle draw used by [`Propagator::draw_new_positions`] for a pair move.
#[derive(Clone, Copy, Debug)]
pub struct PairPositions {
    pub pos1: Vector3<Real>,
    pub pos2: Vector3<Real>,
}

/// Contract for the (externally supplied) analytic Green's-function samplers
/// for free diffusion, radial escape/reaction, and planar/cylindrical
/// constrained diffusion (§1, §4.4). Implementations must be deterministic
/// given RNG state and reentrant only across independent simulator instances
/// (§5): a single instance calls this trait serially.
pub trait Propagator {
    /// Samples `(dt, event_kind)` from the joint distribution of first-exit
    /// vs. first-reaction for a `NonInteractionSingle`'s shell geometry.
    fn determine_next_event_single(&mut self, single: &NonInteractionSingle) -> (Time, EventKind);

    /// Samples the new position for a `NonInteractionSingle`, conditional on
    /// the event outcome drawn by [`Self::determine_next_event_single`].
    fn draw_new_position_single(
        &mut self,
        single: &NonInteractionSingle,
        dt: Time,
        event_kind: EventKind,
    ) -> Vector3<Real>;

    /// Samples `(dt, event_kind)` for an `InteractionSingle` (its shell is a
    /// cylinder straddling bulk and surface; `IV_INTERACTION` is only
    /// possible here).
    fn determine_next_event_interaction(&mut self, single: &InteractionSingle) -> (Time, EventKind);

    /// Samples the new position for an `InteractionSingle`.
    fn draw_new_position_interaction(
        &mut self,
        single: &InteractionSingle,
        dt: Time,
        event_kind: EventKind,
    ) -> Vector3<Real>;

    /// Samples `(dt, event_kind)` for a Pair at formation time, given the
    /// initial inter-particle distance `r0`.
    fn determine_next_event_pair(&mut self, pair: &PairDomain, r0: Real) -> (Time, EventKind);

    /// Late-bound draw of which reaction the pair's inter-particle-vector
    /// event resolves to, executed at firing time rather than formation time
    /// (§4.4: "additionally `draw_iv_event_type(r0)` at event firing time").
    fn draw_iv_event_type(&mut self, pair: &PairDomain, r0: Real) -> EventKind;

    /// Draws the new centre-of-mass position for a pair, independent of the
    /// inter-particle component (§4.4's split of the pair move).
    fn draw_new_com(&mut self, pair: &PairDomain, dt: Time, event_kind: EventKind) -> Vector3<Real>;

    /// Draws the new per-particle positions for a pair, given a freshly
    /// drawn centre of mass.
    fn draw_new_positions(
        &mut self,
        pair: &PairDomain,
        dt: Time,
        event_kind: EventKind,
        new_com: Vector3<Real>,
    ) -> PairPositions;

    /// Samples the interior position a bursted domain's particle should be
    /// placed at, given the elapsed time since it was last reset
    /// (`t_now - last_time`). Used for BURST outcomes (§4.4, §4.10).
    fn draw_burst_position_single(&mut self, single: &NonInteractionSingle, elapsed: Time) -> Vector3<Real>;

    /// Same as [`Self::draw_burst_position_single`] but for both members of a pair.
    fn draw_burst_positions_pair(&mut self, pair: &PairDomain, elapsed: Time) -> PairPositions;

    /// The particle id a `SINGLE_REACTION`/`IV_REACTION` should be applied
    /// to, when ambiguous (pairs only; singles always react on their own particle).
    fn reacting_particle(&self, pair: &PairDomain) -> ParticleId {
        pair.particle1
    }
}
