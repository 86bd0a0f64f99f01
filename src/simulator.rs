//! The top-level `Simulator` (§6 "Exposed API"): owns every piece of mutable
//! state and drives `step()`, tying together the event queue, shell
//! container, domain registry, and the `World`/`Model`/`Propagator`
//! external collaborators.

use nalgebra::Vector3;
use rand::{Rng, RngCore};

use crate::domain::single::StructureKind;
use crate::domain::{
    reset_non_interaction_single, Domain, DomainHeader, EventKind, InteractionSingle, MultiDomain,
    NonInteractionSingle, PairDomain, SingleDomain,
};
use crate::error::{InvariantViolation, SimulationError, UserError};
use crate::event_queue::EventQueue;
use crate::geometry::Shape;
use crate::model::Model;
use crate::numeric::{DomainId, IdGenerator, ParticleId, Real, StructureId, Time, SAFETY};
use crate::propagator::Propagator;
use crate::registry::DomainRegistry;
use crate::rng;
use crate::shell_container::ShellContainer;
use crate::stats::Statistics;
use crate::world::{Structure, World};
use crate::workspace::SimulatorWorkspace;

/// Tunable dimensionless factors and numerical knobs (§4.6, §4.9, §4.11).
///
/// Mirrors the teacher's `Parameters<R>` / `SpatialDecompositionParameters<R>`
/// structs: a plain, caller-supplied configuration value with no file-based
/// config format, since the model/parser is an external collaborator (§1).
#[derive(Clone, Copy, Debug)]
pub struct Parameters {
    /// `SINGLE_SHELL_FACTOR` (§4.6 default 2.0).
    pub single_shell_factor: Real,
    /// `MULTI_SHELL_FACTOR` (§4.6 default 1.05).
    pub multi_shell_factor: Real,
    /// Hard cap on any shell's radius/bounding size.
    pub max_shell_size: Real,
    /// Scales the Multi BD sub-step relative to the diffusion-limited estimate (§4.9).
    pub step_size_factor: Real,
    /// Floor under the Multi BD sub-step.
    pub dt_hardcore_min: Real,
    /// Number of random reorientations tried before a reaction placement is rejected (§4.11).
    pub dissociation_retry_moves: usize,
}

impl Parameters {
    /// Builds parameters sized for a cubic world of side `world_side`, using
    /// the defaults named in §4.6 for the shell factors.
    pub fn for_world(world_side: Real) -> Self {
        Self {
            single_shell_factor: 2.0,
            multi_shell_factor: 1.05,
            max_shell_size: world_side / 2.0,
            step_size_factor: 0.1,
            dt_hardcore_min: 1e-9,
            dissociation_retry_moves: 100,
        }
    }
}

/// Owns all simulator state and drives the event-serial main loop (§5).
pub struct Simulator<W, M, P, R> {
    pub(crate) world: W,
    pub(crate) model: M,
    pub(crate) propagator: P,
    pub(crate) rng: R,
    pub(crate) t: Time,
    pub(crate) events: EventQueue,
    pub(crate) registry: DomainRegistry,
    pub(crate) shells: ShellContainer,
    pub(crate) ids: IdGenerator,
    pub(crate) stats: Statistics,
    pub(crate) workspace: SimulatorWorkspace,
    pub(crate) params: Parameters,
    /// Every non-bulk structure id the `Model`/`World` define, used by the
    /// Constructor's closest-surface query (§4.6). The `World`/`Model`
    /// traits have no "list all structures" method, so the caller supplies
    /// this once at construction.
    pub(crate) structure_ids: Vec<StructureId>,
    consecutive_zero_dt_steps: usize,
}

impl<W: World, M: Model, P: Propagator, R: RngCore> Simulator<W, M, P, R> {
    pub fn new(
        world: W,
        model: M,
        propagator: P,
        rng: R,
        params: Parameters,
        structure_ids: Vec<StructureId>,
    ) -> Self {
        let side = world.side();
        Self {
            world,
            model,
            propagator,
            rng,
            t: 0.0,
            events: EventQueue::new(),
            registry: DomainRegistry::new(),
            shells: ShellContainer::new(side, params.max_shell_size),
            ids: IdGenerator::new(),
            stats: Statistics::new(),
            workspace: SimulatorWorkspace::new(),
            params,
            structure_ids,
            consecutive_zero_dt_steps: 0,
        }
    }

    pub fn t(&self) -> Time {
        self.t
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    pub fn shells(&self) -> &ShellContainer {
        &self.shells
    }

    pub fn get_next_time(&self) -> Option<Time> {
        self.events.peek().map(|e| e.time)
    }

    /// Seeds one fresh `NonInteractionSingle` per existing `World` particle,
    /// in ascending particle-id order (§9: deterministic initialization),
    /// then runs the Constructor on each so every particle starts in a
    /// properly sized domain.
    pub fn initialize(&mut self) -> Result<(), SimulationError> {
        self.validate_world()?;
        let mut ids = self.world.particle_ids();
        ids.sort();
        for pid in ids {
            self.spawn_fresh_single(pid)?;
        }
        // spawn_fresh_single schedules a minimal-shell domain; now grow each
        // one properly via the Constructor. Collect ids first since
        // make_new_domain mutates the registry.
        let domain_ids: Vec<DomainId> = self.registry.ids().collect();
        for domain_id in domain_ids {
            let single = match self.registry.get(domain_id) {
                Some(Domain::Single(SingleDomain::NonInteraction(s))) => *s,
                _ => continue,
            };
            if self.registry.get(domain_id).is_none() {
                continue;
            }
            self.remove_domain(domain_id);
            self.make_new_domain(single)?;
        }
        Ok(())
    }

    /// Advances the simulation by firing exactly one event (§5: `step()`
    /// runs to completion for one event, no suspension points).
    pub fn step(&mut self) -> Result<(), SimulationError> {
        self.workspace.clear();
        let event = self
            .events
            .pop()
            .ok_or(InvariantViolation::SchedulerUnderflow)?;
        if event.time < self.t {
            return Err(InvariantViolation::EventBehindSimTime {
                domain: event.domain,
                event_time: event.time,
                sim_time: self.t,
            }
            .into());
        }
        let fired_dt = self
            .registry
            .get(event.domain)
            .map(|d| d.header().dt)
            .unwrap_or(0.0);
        self.t = event.time;

        let domain = self.registry.remove(event.domain).ok_or(InvariantViolation::EventDomainMismatch {
            event: event.event_id,
            domain: event.domain,
        })?;
        for shell in domain.shell_ids() {
            self.shells.remove(shell);
        }
        match domain {
            Domain::Single(s) => self.fire_single(s)?,
            Domain::Pair(p) => self.fire_pair(p)?,
            Domain::Multi(m) => self.fire_multi(m)?,
        }

        if fired_dt <= 0.0 {
            self.consecutive_zero_dt_steps += 1;
        } else {
            self.consecutive_zero_dt_steps = 0;
        }
        let threshold = (3 * self.events.len()).max(10_000);
        if self.consecutive_zero_dt_steps > threshold {
            return Err(SimulationError::NumericalLiveLock {
                consecutive_zero_dt_steps: self.consecutive_zero_dt_steps,
            });
        }

        #[cfg(debug_assertions)]
        self.check()?;

        Ok(())
    }

    /// Drains the queue by bursting every domain scheduled up to `t` (§5).
    pub fn stop(&mut self, t: Time) -> Result<(), SimulationError> {
        let next = self.get_next_time();
        if t < self.t || next.map(|n| t > n).unwrap_or(false) {
            return Err(UserError::StopTimeOutOfRange {
                requested: t,
                sim_time: self.t,
                next_event_time: next,
            }
            .into());
        }
        self.t = t;
        let ids: Vec<DomainId> = self.registry.ids().collect();
        for id in ids {
            if self.registry.get(id).is_none() {
                continue;
            }
            self.burst_domain(id)?;
        }
        Ok(())
    }

    /// §7: every registered `CuboidalRegion` must actually be a cube of side
    /// `self.world.side()`, since every shell-sizing routine in the
    /// Constructor bounds itself by that single scalar.
    fn validate_world(&self) -> Result<(), SimulationError> {
        let side = self.world.side();
        for &id in &self.structure_ids {
            if let Some(Structure::CuboidalRegion { origin, extent }) = self.world.get_structure(id) {
                let aabb = crate::geometry::AxisAlignedBoundingBox3d::new(origin, origin + extent);
                let matches_side = (extent.x - side).abs() < 1e-9
                    && (extent.y - side).abs() < 1e-9
                    && (extent.z - side).abs() < 1e-9;
                if !aabb.is_cube(1e-9) || !matches_side {
                    return Err(UserError::NonCuboidalWorld.into());
                }
            }
        }
        Ok(())
    }

    fn structure_kind_of(&self, structure: StructureId) -> StructureKind {
        match self.world.get_structure(structure) {
            Some(Structure::CuboidalRegion { .. }) | None => StructureKind::Bulk,
            Some(Structure::PlanarSurface { .. }) => StructureKind::Planar,
            Some(Structure::CylindricalSurface { .. }) => StructureKind::Cylindrical,
        }
    }

    /// Creates and schedules a minimal (particle-radius) `NonInteractionSingle`
    /// for `particle`, the common tail of burst/break-up handlers.
    pub(crate) fn spawn_fresh_single(
        &mut self,
        particle: ParticleId,
    ) -> Result<NonInteractionSingle, SimulationError> {
        let p = self
            .world
            .get_particle(particle)
            .ok_or(InvariantViolation::MissingParticle { particle })?;
        let domain_id = self.ids.new_domain_id();
        let shell_id = self.ids.new_shell_id();
        self.shells.insert_or_update(
            shell_id,
            Shape::Sphere {
                center: p.position,
                radius: p.radius,
            },
            domain_id,
        );
        let structure_kind = self.structure_kind_of(p.structure);
        let fresh = reset_non_interaction_single(
            DomainHeader::new(domain_id, self.t),
            particle,
            shell_id,
            p.structure,
            structure_kind,
            self.t,
        );
        let (dt, kind) = self.propagator.determine_next_event_single(&fresh);
        let mut fresh = fresh;
        fresh.header.dt = dt;
        fresh.event_kind = kind;
        let event_id = self.events.push(self.t + dt, domain_id);
        fresh.header.event_id = Some(event_id);
        self.registry
            .insert(Domain::Single(SingleDomain::NonInteraction(fresh)));
        Ok(fresh)
    }

    /// Removes a domain from the registry, the shell container, and the
    /// event queue in one atomic sequence (§5 resource ownership: "all
    /// shells of the domain are de-registered ... before the domain is
    /// dropped").
    pub(crate) fn remove_domain(&mut self, id: DomainId) -> Option<Domain> {
        let domain = self.registry.remove(id)?;
        for shell in domain.shell_ids() {
            self.shells.remove(shell);
        }
        if let Some(event_id) = domain.header().event_id {
            self.events.remove(event_id);
        }
        Some(domain)
    }

    /// §4.10: forces `id` to its current-time position and replaces it with
    /// fresh `NonInteractionSingle`(s). No-op (but still returns the
    /// existing singles) if the domain was already reset this instant.
    pub(crate) fn burst_domain(&mut self, id: DomainId) -> Result<Vec<NonInteractionSingle>, SimulationError> {
        let domain = match self.registry.get(id) {
            Some(d) => d.clone(),
            None => return Ok(Vec::new()),
        };
        if domain.header().was_reset_at(self.t) && domain.header().is_reset() {
            if let Domain::Single(SingleDomain::NonInteraction(s)) = domain {
                return Ok(vec![s]);
            }
        }
        let domain = self
            .remove_domain(id)
            .ok_or(InvariantViolation::MissingDomain { domain: id })?;
        match domain {
            Domain::Single(SingleDomain::NonInteraction(s)) => Ok(vec![self.burst_non_interaction_single(s)?]),
            Domain::Single(SingleDomain::Interaction(s)) => Ok(vec![self.burst_interaction_single(s)?]),
            Domain::Pair(p) => self.burst_pair(p),
            Domain::Multi(m) => self.burst_multi(m),
        }
    }

    fn burst_non_interaction_single(
        &mut self,
        s: NonInteractionSingle,
    ) -> Result<NonInteractionSingle, SimulationError> {
        let elapsed = self.t - s.header.last_time;
        if elapsed > 0.0 {
            let new_pos = self.propagator.draw_burst_position_single(&s, elapsed);
            self.relocate_particle(s.particle, new_pos)?;
        }
        self.spawn_fresh_single(s.particle)
    }

    /// `InteractionSingle` bursting has no dedicated propagator method; the
    /// bulk-diffusion burst draw is reused via a throwaway
    /// `NonInteractionSingle` view over the same particle/shell, since only
    /// the particle and elapsed time matter for sampling an interior point.
    fn burst_interaction_single(
        &mut self,
        s: InteractionSingle,
    ) -> Result<NonInteractionSingle, SimulationError> {
        let elapsed = self.t - s.header.last_time;
        if elapsed > 0.0 {
            let proxy = NonInteractionSingle {
                header: s.header,
                particle: s.particle,
                shell: s.shell,
                structure: s.structure,
                structure_kind: StructureKind::Bulk,
                event_kind: EventKind::Burst,
            };
            let new_pos = self.propagator.draw_burst_position_single(&proxy, elapsed);
            self.relocate_particle(s.particle, new_pos)?;
        }
        self.spawn_fresh_single(s.particle)
    }

    fn burst_pair(&mut self, p: PairDomain) -> Result<Vec<NonInteractionSingle>, SimulationError> {
        let elapsed = self.t - p.header.last_time;
        if elapsed > 0.0 {
            let positions = self.propagator.draw_burst_positions_pair(&p, elapsed);
            self.relocate_particle(p.particle1, positions.pos1)?;
            self.relocate_particle(p.particle2, positions.pos2)?;
        }
        Ok(vec![
            self.spawn_fresh_single(p.particle1)?,
            self.spawn_fresh_single(p.particle2)?,
        ])
    }

    fn burst_multi(&mut self, m: MultiDomain) -> Result<Vec<NonInteractionSingle>, SimulationError> {
        m.particles
            .iter()
            .map(|&pid| self.spawn_fresh_single(pid))
            .collect()
    }

    pub(crate) fn relocate_particle(
        &mut self,
        id: ParticleId,
        new_pos: Vector3<Real>,
    ) -> Result<(), SimulationError> {
        let mut p = self
            .world
            .get_particle(id)
            .ok_or(InvariantViolation::MissingParticle { particle: id })?;
        p.position = self.world.apply_boundary(new_pos);
        self.world.update_particle(id, p);
        Ok(())
    }

    /// §4.5 `fire_single`.
    fn fire_single(&mut self, single: SingleDomain) -> Result<(), SimulationError> {
        match single {
            SingleDomain::NonInteraction(s) => self.fire_non_interaction_single(s),
            SingleDomain::Interaction(s) => self.fire_interaction_single(s),
        }
    }

    fn fire_non_interaction_single(&mut self, s: NonInteractionSingle) -> Result<(), SimulationError> {
        self.stats.record_event(s.event_kind);

        if s.header.dt.is_infinite() {
            // Immobile with no reaction: never rescheduled.
            self.registry
                .insert(Domain::Single(SingleDomain::NonInteraction(s)));
            return Ok(());
        }

        if s.event_kind == EventKind::SingleReaction {
            let p = self
                .world
                .get_particle(s.particle)
                .ok_or(InvariantViolation::MissingParticle { particle: s.particle })?;
            let new_pos = self.propagator.draw_new_position_single(&s, s.header.dt, s.event_kind);
            self.relocate_particle(s.particle, new_pos)?;
            if !self.fire_single_reaction(s.particle, p.species)? {
                self.reject_single(s)?;
            }
            return Ok(());
        }

        let p = self
            .world
            .get_particle(s.particle)
            .ok_or(InvariantViolation::MissingParticle { particle: s.particle })?;
        if p.d == 0.0 {
            // Immobile: redraw next event without moving.
            let domain_id = self.ids.new_domain_id();
            self.shells.insert_or_update(
                s.shell,
                Shape::Sphere {
                    center: p.position,
                    radius: p.radius,
                },
                domain_id,
            );
            let mut fresh = reset_non_interaction_single(
                DomainHeader::new(domain_id, s.header.last_time),
                s.particle,
                s.shell,
                s.structure,
                s.structure_kind,
                self.t,
            );
            let (dt, kind) = self.propagator.determine_next_event_single(&fresh);
            fresh.header.dt = dt;
            fresh.event_kind = kind;
            let event_id = self.events.push(self.t + dt, domain_id);
            fresh.header.event_id = Some(event_id);
            self.registry
                .insert(Domain::Single(SingleDomain::NonInteraction(fresh)));
            return Ok(());
        }

        // Escape or burst: commit the drawn position, then hand off to the Constructor.
        let new_pos = self.propagator.draw_new_position_single(&s, s.header.dt, s.event_kind);
        self.relocate_particle(s.particle, new_pos)?;
        let fresh = self.spawn_fresh_single(s.particle)?;
        self.remove_domain(fresh.header.domain_id);
        self.make_new_domain(fresh)?;
        Ok(())
    }

    fn fire_interaction_single(&mut self, s: InteractionSingle) -> Result<(), SimulationError> {
        self.stats.record_event(s.event_kind);

        if s.event_kind == EventKind::IvInteraction {
            let new_pos = self.propagator.draw_new_position_interaction(&s, s.header.dt, s.event_kind);
            self.relocate_particle(s.particle, new_pos)?;
            let p = self
                .world
                .get_particle(s.particle)
                .ok_or(InvariantViolation::MissingParticle { particle: s.particle })?;
            if !self.fire_single_reaction(s.particle, p.species)? {
                let proxy = NonInteractionSingle {
                    header: s.header,
                    particle: s.particle,
                    shell: s.shell,
                    structure: s.structure,
                    structure_kind: StructureKind::Bulk,
                    event_kind: EventKind::Burst,
                };
                self.reject_single(proxy)?;
            }
            return Ok(());
        }

        // Escape: the particle leaves the interaction cylinder back into the bulk.
        let new_pos = self.propagator.draw_new_position_interaction(&s, s.header.dt, s.event_kind);
        self.relocate_particle(s.particle, new_pos)?;
        let fresh = self.spawn_fresh_single(s.particle)?;
        self.remove_domain(fresh.header.domain_id);
        self.make_new_domain(fresh)?;
        Ok(())
    }

    /// Attempts a mono-molecular reaction for `particle`, placing 0, 1, or 2
    /// products. Returns `Ok(false)` if no valid orientation was found
    /// within `dissociation_retry_moves` tries; the caller is responsible
    /// for rejecting in that case (§4.11).
    pub(crate) fn fire_single_reaction(
        &mut self,
        particle: ParticleId,
        species: crate::numeric::SpeciesId,
    ) -> Result<bool, SimulationError> {
        let rules = self.model.monomolecular_rules(species).to_vec();
        if rules.is_empty() {
            return Ok(true);
        }
        let total_rate: Real = rules.iter().map(|r| r.rate).sum();
        let mut pick = self.rng.gen_range(0.0..total_rate);
        let rule = rules
            .iter()
            .find(|r| {
                if pick < r.rate {
                    true
                } else {
                    pick -= r.rate;
                    false
                }
            })
            .unwrap_or_else(|| rules.last().unwrap());

        let old = self
            .world
            .get_particle(particle)
            .ok_or(InvariantViolation::MissingParticle { particle })?;
        self.stats.record_reaction();

        match rule.products.len() {
            0 => {
                self.world.remove_particle(particle);
                Ok(true)
            }
            1 => {
                self.world.remove_particle(particle);
                let new_id = self.world.new_particle(rule.products[0], old.position);
                let new_species = self
                    .world
                    .get_species(rule.products[0])
                    .ok_or(InvariantViolation::MissingSpecies { species: rule.products[0] })?;
                if !self
                    .world
                    .check_overlap(old.position, new_species.radius, &[new_id])
                    .is_empty()
                {
                    self.world.remove_particle(new_id);
                    return Ok(false);
                }
                self.spawn_fresh_single(new_id)?;
                Ok(true)
            }
            2 => {
                let s1 = self
                    .world
                    .get_species(rule.products[0])
                    .ok_or(InvariantViolation::MissingSpecies { species: rule.products[0] })?;
                let s2 = self
                    .world
                    .get_species(rule.products[1])
                    .ok_or(InvariantViolation::MissingSpecies { species: rule.products[1] })?;
                let separation = (s1.radius + s2.radius) * SAFETY;
                for _ in 0..self.params.dissociation_retry_moves {
                    let axis = rng::uniform_unit_vector(&mut self.rng);
                    let weight1 = s2.radius / (s1.radius + s2.radius);
                    let pos1 = old.position - axis * (separation * weight1);
                    let pos2 = old.position + axis * (separation * (1.0 - weight1));
                    let pos1 = self.world.apply_boundary(pos1);
                    let pos2 = self.world.apply_boundary(pos2);
                    if !self.world.check_overlap(pos1, s1.radius, &[particle]).is_empty() {
                        continue;
                    }
                    if !self.world.check_overlap(pos2, s2.radius, &[particle]).is_empty() {
                        continue;
                    }
                    self.world.remove_particle(particle);
                    let id1 = self.world.new_particle(rule.products[0], pos1);
                    let id2 = self.world.new_particle(rule.products[1], pos2);
                    self.spawn_fresh_single(id1)?;
                    self.spawn_fresh_single(id2)?;
                    return Ok(true);
                }
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    /// §4.11: reinstalls a single unchanged and increments the rejection counter.
    fn reject_single(&mut self, mut s: NonInteractionSingle) -> Result<(), SimulationError> {
        log::info!("single reaction rejected: placing products failed");
        self.stats.record_rejection();
        s.header.last_time = self.t;
        let p = self
            .world
            .get_particle(s.particle)
            .ok_or(InvariantViolation::MissingParticle { particle: s.particle })?;
        self.shells.insert_or_update(
            s.shell,
            Shape::Sphere {
                center: p.position,
                radius: p.radius,
            },
            s.header.domain_id,
        );
        let (dt, kind) = self.propagator.determine_next_event_single(&s);
        s.header.dt = dt;
        s.event_kind = kind;
        let event_id = self.events.push(self.t + dt, s.header.domain_id);
        s.header.event_id = Some(event_id);
        self.registry
            .insert(Domain::Single(SingleDomain::NonInteraction(s)));
        Ok(())
    }

    /// §4.5/§4.4: fires a `PairDomain`'s drawn event.
    fn fire_pair(&mut self, mut pair: PairDomain) -> Result<(), SimulationError> {
        let kind = if pair.event_kind == EventKind::IvReaction {
            self.propagator.draw_iv_event_type(&pair, pair.r0)
        } else {
            pair.event_kind
        };
        self.stats.record_event(kind);

        if kind == EventKind::IvReaction {
            let reacting = self.propagator.reacting_particle(&pair);
            pair.reacting_particle = Some(reacting);
            let new_com = self.propagator.draw_new_com(&pair, pair.header.dt, kind);
            if !self.fire_pair_reaction(&pair, reacting, new_com)? {
                self.reject_pair(pair)?;
            }
            return Ok(());
        }

        // IV_ESCAPE / COM_ESCAPE / BURST: commit both particle positions,
        // then hand each particle off to the Constructor as a fresh single.
        let new_com = self.propagator.draw_new_com(&pair, pair.header.dt, kind);
        let positions = self
            .propagator
            .draw_new_positions(&pair, pair.header.dt, kind, new_com);
        self.relocate_particle(pair.particle1, positions.pos1)?;
        self.relocate_particle(pair.particle2, positions.pos2)?;
        let fresh1 = self.spawn_fresh_single(pair.particle1)?;
        let fresh2 = self.spawn_fresh_single(pair.particle2)?;
        self.remove_domain(fresh1.header.domain_id);
        self.make_new_domain(fresh1)?;
        self.remove_domain(fresh2.header.domain_id);
        self.make_new_domain(fresh2)?;
        Ok(())
    }

    /// Bimolecular analogue of `fire_single_reaction` (§4.11): neither
    /// particle is relocated until a non-overlapping placement for the
    /// product is confirmed, so a rejected draw leaves both particles
    /// exactly where the pair left them.
    fn fire_pair_reaction(
        &mut self,
        pair: &PairDomain,
        reacting: ParticleId,
        new_com: Vector3<Real>,
    ) -> Result<bool, SimulationError> {
        let other = pair.other_particle(reacting);
        let p_reacting = self
            .world
            .get_particle(reacting)
            .ok_or(InvariantViolation::MissingParticle { particle: reacting })?;
        let p_other = self
            .world
            .get_particle(other)
            .ok_or(InvariantViolation::MissingParticle { particle: other })?;
        let rules = self
            .model
            .bimolecular_rules(p_reacting.species, p_other.species)
            .to_vec();
        if rules.is_empty() {
            return Ok(true);
        }
        let total_rate: Real = rules.iter().map(|r| r.rate).sum();
        let mut pick = self.rng.gen_range(0.0..total_rate);
        let rule = rules
            .iter()
            .find(|r| {
                if pick < r.rate {
                    true
                } else {
                    pick -= r.rate;
                    false
                }
            })
            .cloned()
            .unwrap_or_else(|| rules.last().unwrap().clone());

        match rule.products.len() {
            0 => {
                self.world.remove_particle(reacting);
                self.world.remove_particle(other);
                self.stats.record_reaction();
                Ok(true)
            }
            1 => {
                let new_species = self
                    .world
                    .get_species(rule.products[0])
                    .ok_or(InvariantViolation::MissingSpecies { species: rule.products[0] })?;
                let pos = self.world.apply_boundary(new_com);
                if !self
                    .world
                    .check_overlap(pos, new_species.radius, &[reacting, other])
                    .is_empty()
                {
                    return Ok(false);
                }
                self.world.remove_particle(reacting);
                self.world.remove_particle(other);
                let new_id = self.world.new_particle(rule.products[0], pos);
                self.spawn_fresh_single(new_id)?;
                self.stats.record_reaction();
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    /// §4.11: reinstalls a pair unchanged (same shell, same particles) and
    /// increments the rejection counter.
    fn reject_pair(&mut self, mut pair: PairDomain) -> Result<(), SimulationError> {
        log::info!("pair reaction rejected: placing product failed");
        self.stats.record_rejection();
        pair.header.last_time = self.t;
        pair.reacting_particle = None;
        let (dt, kind) = self.propagator.determine_next_event_pair(&pair, pair.r0);
        pair.header.dt = dt;
        pair.event_kind = kind;
        let event_id = self.events.push(self.t + dt, pair.header.domain_id);
        pair.header.event_id = Some(event_id);
        self.registry.insert(Domain::Pair(pair));
        Ok(())
    }
}
