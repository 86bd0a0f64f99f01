//! The Constructor (§4.6-§4.8): decides what kind of domain a freshly fired
//! `NonInteractionSingle` should become, and sizes its shell.
//!
//! Grounded on `egfrd.py`'s `make_new_domain`, `calculate_simplepair_shell_size`,
//! `calculate_single_shell_size`, `update_single`, `try_pair`, `try_interaction`,
//! `calculate_max_cylinder`, `miedema_algorithm`, `form_multi`,
//! `add_to_multi_recursive`, `add_to_multi` and `merge_multis`.

use nalgebra::Vector3;

use crate::domain::single::StructureKind;
use crate::domain::{
    Domain, DomainHeader, InteractionSingle, MultiDomain,
    NonInteractionSingle, PairDomain, SingleDomain,
};
use crate::error::{InvariantViolation, SimulationError};
use crate::geometry::Shape;
use crate::numeric::{DomainId, ParticleId, Real, StructureId, SAFETY};
use crate::propagator::Propagator;
use crate::simulator::Simulator;
use crate::world::{Structure, World};

/// The outcome of [`Simulator::make_new_domain`].
pub enum NewDomain {
    Single(DomainId),
    Interaction(DomainId),
    Pair(DomainId),
    Multi(DomainId),
}

impl<W: World, M: crate::model::Model, P: Propagator, R: rand::RngCore> Simulator<W, M, P, R> {
    /// §4.6: runs only for fresh `NonInteractionSingle`s just bursted or
    /// propagated. Decides between Pair, Interaction, lone NonInteractionSingle
    /// or Multi.
    pub(crate) fn make_new_domain(&mut self, single: NonInteractionSingle) -> Result<NewDomain, SimulationError> {
        let particle = self
            .world
            .get_particle(single.particle)
            .ok_or(InvariantViolation::MissingParticle { particle: single.particle })?;
        let pos = particle.position;
        let radius = particle.radius;

        let reaction_horizon = radius * self.params.single_shell_factor;
        let multi_horizon = radius * self.params.multi_shell_factor;

        let intruder_ids: Vec<DomainId> = self
            .shells
            .neighbors_within(pos, reaction_horizon, &[single.header.domain_id])
            .into_iter()
            .map(|(_, _, owner)| owner)
            .collect();
        let mut intruders: Vec<DomainId> = Vec::new();
        for id in intruder_ids {
            if !intruders.contains(&id) {
                intruders.push(id);
            }
        }

        // Burst every intruder that is not a Multi and was not itself reset
        // this instant; surviving Multis are kept as potential partners
        // unchanged.
        let mut partners: Vec<NonInteractionSingle> = Vec::new();
        let mut multi_partners: Vec<DomainId> = Vec::new();
        for id in intruders {
            let is_multi = match self.registry.get(id) {
                Some(d) => d.is_multi(),
                None => continue,
            };
            if is_multi {
                multi_partners.push(id);
                continue;
            }
            let last_time = self
                .registry
                .get(id)
                .ok_or(InvariantViolation::MissingDomain { domain: id })?
                .header()
                .last_time;
            if last_time == self.t {
                continue;
            }
            for burst in self.burst_domain(id)? {
                partners.push(burst);
            }
        }

        // Sort partner NonInteractionSingles and Multis by distance to the firing single.
        let mut partner_dists: Vec<(Real, PartnerKind)> = Vec::new();
        for s in &partners {
            let p = self
                .world
                .get_particle(s.particle)
                .ok_or(InvariantViolation::MissingParticle { particle: s.particle })?;
            partner_dists.push((self.world.distance(pos, p.position), PartnerKind::Single(*s)));
        }
        for &id in &multi_partners {
            let d = self.distance_to_domain(pos, id)?;
            partner_dists.push((d, PartnerKind::Multi(id)));
        }
        partner_dists.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let (closest_surface, surface_distance) = self.closest_surface(pos, single.structure);

        let closest_partner = partner_dists.first().cloned();
        let domain_distance = closest_partner.as_ref().map(|(d, _)| *d).unwrap_or(Real::INFINITY);

        // Priority 1: Pair.
        if let Some((dist, PartnerKind::Single(other))) = &closest_partner {
            let other_particle = self
                .world
                .get_particle(other.particle)
                .ok_or(InvariantViolation::MissingParticle { particle: other.particle })?;
            let pair_horizon = (radius + other_particle.radius) * self.params.single_shell_factor;
            if *dist < pair_horizon {
                let rest: Vec<NonInteractionSingle> = partners
                    .iter()
                    .copied()
                    .filter(|s| s.header.domain_id != other.header.domain_id)
                    .collect();
                if let Some(id) = self.try_pair(single, *other, &rest)? {
                    return Ok(NewDomain::Pair(id));
                }
            }
        }

        // Priority 2: Interaction (only for bulk spherical singles).
        if single.structure_kind == StructureKind::Bulk
            && surface_distance < domain_distance
            && surface_distance < reaction_horizon
        {
            if let Some(surface_id) = closest_surface {
                if let Some(id) = self.try_interaction(single, surface_id)? {
                    return Ok(NewDomain::Interaction(id));
                }
            }
        }

        // Priority 3/4: lone NonInteractionSingle, or Multi.
        if domain_distance > multi_horizon && surface_distance > multi_horizon {
            let id = self.update_single(single)?;
            Ok(NewDomain::Single(id))
        } else {
            let id = self.form_multi(single, partner_dists)?;
            Ok(NewDomain::Multi(id))
        }
    }

    /// Distance from `point` to the closest shell owned by domain `id`.
    fn distance_to_domain(&self, point: Vector3<Real>, id: DomainId) -> Result<Real, SimulationError> {
        let domain = self
            .registry
            .get(id)
            .ok_or(InvariantViolation::MissingDomain { domain: id })?;
        Ok(domain
            .shell_ids()
            .iter()
            .filter_map(|&sid| self.shells.get(sid))
            .map(|stored| stored.shape.signed_distance_to_boundary(point, self.world.side()))
            .fold(Real::INFINITY, Real::min))
    }

    /// Closest surface (structure other than `ignore`) to `point`, and the
    /// absolute distance along its normal.
    fn closest_surface(&self, point: Vector3<Real>, ignore: StructureId) -> (Option<StructureId>, Real) {
        let mut best: Option<(StructureId, Real)> = None;
        for id in self.structure_ids.iter().copied() {
            if id == ignore {
                continue;
            }
            let structure = match self.world.get_structure(id) {
                Some(s) => s,
                None => continue,
            };
            if matches!(structure, Structure::CuboidalRegion { .. }) {
                continue;
            }
            let transposed = self.world.cyclic_transpose(point, structure_position(&structure));
            let (_, signed) = structure.projected_point(transposed);
            let dist = signed.abs();
            if best.map(|(_, d)| dist < d).unwrap_or(true) {
                best = Some((id, dist));
            }
        }
        match best {
            Some((id, d)) => (Some(id), d),
            None => (None, Real::INFINITY),
        }
    }

    /// §4.7: computes a maximally sized shared shell for `single1`/`single2`,
    /// creates a `Pair` and removes both singles on success.
    fn try_pair(
        &mut self,
        single1: NonInteractionSingle,
        single2: NonInteractionSingle,
        burst: &[NonInteractionSingle],
    ) -> Result<Option<DomainId>, SimulationError> {
        if single1.structure != single2.structure {
            return Ok(None);
        }
        let (com, r0, shell_size) = match self.calculate_simplepair_shell_size(single1, single2, burst)? {
            Some(v) => v,
            None => return Ok(None),
        };

        self.registry.remove(single1.header.domain_id);
        self.shells.remove(single1.shell);
        if let Some(eid) = single1.header.event_id {
            self.events.remove(eid);
        }
        self.registry.remove(single2.header.domain_id);
        self.shells.remove(single2.shell);
        if let Some(eid) = single2.header.event_id {
            self.events.remove(eid);
        }

        let domain_id = self.ids.new_domain_id();
        let shell_id = self.ids.new_shell_id();
        self.shells.insert_or_update(
            shell_id,
            Shape::Sphere {
                center: com,
                radius: shell_size,
            },
            domain_id,
        );

        let mut pair = PairDomain {
            header: DomainHeader::new(domain_id, self.t),
            particle1: single1.particle,
            particle2: single2.particle,
            shell: shell_id,
            structure: single1.structure,
            r0,
            com,
            reacting_particle: None,
            event_kind: crate::domain::EventKind::Burst,
        };
        let (dt, kind) = self.propagator.determine_next_event_pair(&pair, r0);
        pair.header.dt = dt;
        pair.event_kind = kind;

        let event_id = self.events.push(self.t + dt, domain_id);
        pair.header.event_id = Some(event_id);
        self.registry.insert(Domain::Pair(pair));
        log::debug!("formed Pair({}, {}) dt={}", single1.particle, single2.particle, dt);
        Ok(Some(domain_id))
    }

    /// §4.7.
    fn calculate_simplepair_shell_size(
        &self,
        single1: NonInteractionSingle,
        single2: NonInteractionSingle,
        burst: &[NonInteractionSingle],
    ) -> Result<Option<(Vector3<Real>, Real, Real)>, SimulationError> {
        let p1 = self
            .world
            .get_particle(single1.particle)
            .ok_or(InvariantViolation::MissingParticle { particle: single1.particle })?;
        let p2 = self
            .world
            .get_particle(single2.particle)
            .ok_or(InvariantViolation::MissingParticle { particle: single2.particle })?;
        let sigma = p1.radius + p2.radius;
        let d12 = p1.d + p2.d;

        let r0 = self.world.distance(p1.position, p2.position);
        let distance_from_sigma = r0 - sigma;
        if distance_from_sigma < 0.0 {
            return Ok(None);
        }

        let shell_size1 = r0 * p1.d / d12 + p1.radius;
        let shell_size2 = r0 * p2.d / d12 + p2.radius;
        let margin1 = p1.radius * 2.0;
        let margin2 = p2.radius * 2.0;
        let (min_shell_size, margin) = if shell_size1 + margin1 >= shell_size2 + margin2 {
            (shell_size1, margin1)
        } else {
            (shell_size2, margin2)
        };

        let min_shell_size_with_margin = min_shell_size + margin;
        let max_shell_size = self
            .params
            .max_shell_size
            .min(distance_from_sigma * 100.0 + sigma + margin);
        if min_shell_size_with_margin >= max_shell_size {
            return Ok(None);
        }

        let com = crate::topology::pair_center_of_mass(p1.position, p2.position, p1.d, p2.d, self.world.side());

        let mut closest_shell_distance = Real::INFINITY;
        for b in burst {
            let bp = self
                .world
                .get_particle(b.particle)
                .ok_or(InvariantViolation::MissingParticle { particle: b.particle })?;
            let d = self.world.distance(com, bp.position) - bp.radius * self.params.single_shell_factor;
            if d < closest_shell_distance {
                closest_shell_distance = d;
            }
        }
        if closest_shell_distance <= min_shell_size_with_margin {
            return Ok(None);
        }

        let (closest, closest_dist) = self.closest_object(
            com,
            &[single1.header.domain_id, single2.header.domain_id],
            single1.structure,
        );
        let closest_shell_distance = if closest_dist < closest_shell_distance {
            closest_dist
        } else {
            closest_shell_distance
        };

        let shell_size = match closest {
            Some(ClosestObject::NonInteractionSingle(s)) => {
                let cp = self
                    .world
                    .get_particle(s.particle)
                    .ok_or(InvariantViolation::MissingParticle { particle: s.particle })?;
                let d_tot = cp.d + d12;
                let closest_particle_distance = self.world.distance(com, cp.position);
                let closest_min_shell = cp.radius * self.params.single_shell_factor;
                let a = (d12 / d_tot) * (closest_particle_distance - min_shell_size - cp.radius) + min_shell_size;
                let b = closest_particle_distance - closest_min_shell;
                a.min(b).min(closest_shell_distance) / SAFETY
            }
            _ => closest_shell_distance / SAFETY,
        };

        if shell_size <= min_shell_size_with_margin {
            return Ok(None);
        }

        let d1 = self.world.distance(com, p1.position);
        let d2 = self.world.distance(com, p2.position);
        let natural = (d1 + p1.radius * self.params.single_shell_factor)
            .max(d2 + p2.radius * self.params.single_shell_factor);
        if shell_size < natural * 1.3 {
            return Ok(None);
        }

        let shell_size = shell_size.min(max_shell_size);
        Ok(Some((com, r0, shell_size)))
    }

    /// §4.6 `update_single`: sizes a lone single's shell.
    fn update_single(&mut self, single: NonInteractionSingle) -> Result<DomainId, SimulationError> {
        let p = self
            .world
            .get_particle(single.particle)
            .ok_or(InvariantViolation::MissingParticle { particle: single.particle })?;
        let (closest, shell_distance) =
            self.closest_object(p.position, &[single.header.domain_id], single.structure);

        let new_shell_size = match closest {
            Some(ClosestObject::NonInteractionSingle(c)) => {
                self.calculate_single_shell_size(single, c, shell_distance)?
            }
            _ => (shell_distance / SAFETY).max(p.radius),
        };
        let new_shell_size = new_shell_size.min(self.params.max_shell_size);

        self.shells.insert_or_update(
            single.shell,
            Shape::Sphere {
                center: p.position,
                radius: new_shell_size,
            },
            single.header.domain_id,
        );

        let mut fresh = single;
        let (dt, kind) = self.propagator.determine_next_event_single(&fresh);
        fresh.header.dt = dt;
        fresh.event_kind = kind;
        let event_id = self.events.push(self.t + dt, single.header.domain_id);
        fresh.header.event_id = Some(event_id);
        self.registry
            .insert(Domain::Single(SingleDomain::NonInteraction(fresh)));
        Ok(single.header.domain_id)
    }

    fn calculate_single_shell_size(
        &self,
        single: NonInteractionSingle,
        closest: NonInteractionSingle,
        shell_distance: Real,
    ) -> Result<Real, SimulationError> {
        let p = self
            .world
            .get_particle(single.particle)
            .ok_or(InvariantViolation::MissingParticle { particle: single.particle })?;
        if p.d == 0.0 {
            return Ok(p.radius);
        }
        let c = self
            .world
            .get_particle(closest.particle)
            .ok_or(InvariantViolation::MissingParticle { particle: closest.particle })?;
        let distance = self.world.distance(p.position, c.position);
        let min_radius12 = p.radius + c.radius;
        let sqrt_d1 = p.d.sqrt();
        let ideal = sqrt_d1 / (sqrt_d1 + c.d.sqrt()) * (distance - min_radius12) + p.radius;
        let shell_size = ideal.min(shell_distance / SAFETY);
        Ok(shell_size.max(p.radius))
    }

    /// Finds the object closest to `point` among domains (excluding
    /// `ignore_domains`) that also lie on structure `structure` or whose
    /// shell geometry does not care about structure membership.
    fn closest_object(
        &self,
        point: Vector3<Real>,
        ignore_domains: &[DomainId],
        _structure: StructureId,
    ) -> (Option<ClosestObject>, Real) {
        let hits = self.shells.neighbors_within(point, self.params.max_shell_size, ignore_domains);
        let mut best_distance = Real::INFINITY;
        let mut best: Option<ClosestObject> = None;
        for (_, distance, owner) in hits {
            if distance >= best_distance {
                continue;
            }
            let domain = match self.registry.get(owner) {
                Some(d) => d,
                None => continue,
            };
            let candidate = match domain {
                Domain::Single(SingleDomain::NonInteraction(s)) => ClosestObject::NonInteractionSingle(*s),
                Domain::Single(SingleDomain::Interaction(_)) => ClosestObject::Other,
                Domain::Pair(_) => ClosestObject::Other,
                Domain::Multi(_) => ClosestObject::Other,
            };
            best_distance = distance;
            best = Some(candidate);
        }
        (best, best_distance)
    }

    /// §4.8: Miedema's inflation algorithm sizing a cylinder straddling the
    /// particle and an approaching surface.
    fn try_interaction(
        &mut self,
        single: NonInteractionSingle,
        surface_id: StructureId,
    ) -> Result<Option<DomainId>, SimulationError> {
        let p = self
            .world
            .get_particle(single.particle)
            .ok_or(InvariantViolation::MissingParticle { particle: single.particle })?;
        let surface = match self.world.get_structure(surface_id) {
            Some(s) => s,
            None => return Ok(None),
        };
        let surface_pos = structure_position(&surface);
        let pos_transposed = self.world.cyclic_transpose(p.position, surface_pos);
        let (projected_point, projection_distance) = surface.projected_point(pos_transposed);
        let particle_distance = projection_distance.abs();
        let unit_z = surface.unit_z();
        let sign = if projection_distance < 0.0 { -1.0 } else { 1.0 };
        let orientation_vector = unit_z * sign;

        let max_cylinder_radius = self.params.max_shell_size / 2.0_f64.sqrt();
        let max_cylinder_half_length = max_cylinder_radius;

        let (mut dr, mut dz_left, mut dz_right, min_dr, min_dz_left, min_dz_right) =
            match surface {
                Structure::PlanarSurface { .. } => {
                    let dz_left = p.radius;
                    (
                        max_cylinder_radius,
                        dz_left,
                        max_cylinder_half_length * 2.0 - dz_left,
                        p.radius * self.params.single_shell_factor,
                        dz_left,
                        particle_distance + p.radius * self.params.single_shell_factor,
                    )
                }
                Structure::CylindricalSurface { .. } => (
                    max_cylinder_radius,
                    max_cylinder_half_length,
                    max_cylinder_half_length,
                    particle_distance + p.radius * self.params.single_shell_factor,
                    p.radius * self.params.single_shell_factor,
                    p.radius * self.params.single_shell_factor,
                ),
                Structure::CuboidalRegion { .. } => return Ok(None),
            };

        let search_point = projected_point + ((dz_right - dz_left) / 2.0) * orientation_vector;
        let neighbors = self.shells.neighbors_within(
            search_point,
            self.params.max_shell_size,
            &[single.header.domain_id],
        );
        for (shell_id, _, owner) in neighbors {
            let stored = self
                .shells
                .get(shell_id)
                .ok_or(InvariantViolation::MissingDomain { domain: owner })?;
            let mut shell_size = stored.shape.bounding_radius();
            if let Some(domain) = self.registry.get(owner) {
                if domain.header().dt == 0.0 {
                    let moving = domain
                        .particle_ids()
                        .iter()
                        .any(|&pid| self.world.get_particle(pid).map(|pp| pp.d > 0.0).unwrap_or(false));
                    if moving {
                        shell_size *= self.params.single_shell_factor;
                    }
                }
            }
            let shell_position = stored.shape.center();
            let (new_dr, new_dz_left, new_dz_right) = miedema_algorithm(
                self.world.cyclic_transpose(shell_position, projected_point),
                shell_size,
                projected_point,
                orientation_vector,
                dr,
                dz_left,
                dz_right,
                &surface,
                particle_distance,
            );
            dr = new_dr;
            dz_left = new_dz_left;
            dz_right = new_dz_right;
        }

        dr /= SAFETY;
        dz_right /= SAFETY;

        if dr < min_dr || dz_left < min_dz_left || dz_right < min_dz_right {
            return Ok(None);
        }

        let origin = projected_point + ((dz_right - dz_left) / 2.0) * orientation_vector;
        let half_length = (dz_left + dz_right) / 2.0;

        self.registry.remove(single.header.domain_id);
        self.shells.remove(single.shell);
        if let Some(eid) = single.header.event_id {
            self.events.remove(eid);
        }

        let domain_id = self.ids.new_domain_id();
        let shell_id = self.ids.new_shell_id();
        self.shells.insert_or_update(
            shell_id,
            Shape::Cylinder {
                center: origin,
                unit_z: orientation_vector,
                radius: dr,
                half_length,
            },
            domain_id,
        );
        let mut interaction = InteractionSingle {
            header: DomainHeader::new(domain_id, self.t),
            particle: single.particle,
            shell: shell_id,
            structure: single.structure,
            target_surface: surface_id,
            event_kind: crate::domain::EventKind::Burst,
        };
        let (dt, kind) = self.propagator.determine_next_event_interaction(&interaction);
        interaction.header.dt = dt;
        interaction.event_kind = kind;
        let event_id = self.events.push(self.t + dt, domain_id);
        interaction.header.event_id = Some(event_id);
        self.registry
            .insert(Domain::Single(SingleDomain::Interaction(interaction)));
        log::debug!("formed Interaction({}) dt={}", single.particle, dt);
        Ok(Some(domain_id))
    }

    /// §4.9/form_multi: attaches `single` to an existing neighbouring Multi
    /// within `multi_horizon`, or creates a fresh one, then sweeps further
    /// neighbours recursively.
    fn form_multi(
        &mut self,
        single: NonInteractionSingle,
        partners: Vec<(Real, PartnerKind)>,
    ) -> Result<DomainId, SimulationError> {
        let p = self
            .world
            .get_particle(single.particle)
            .ok_or(InvariantViolation::MissingParticle { particle: single.particle })?;
        let min_shell = p.radius * self.params.multi_shell_factor;
        let mut neighbors: Vec<PartnerKind> = partners
            .into_iter()
            .filter(|(d, _)| *d <= min_shell)
            .map(|(_, k)| k)
            .collect();

        let reuse_multi = match neighbors.first() {
            Some(PartnerKind::Multi(id)) => Some(*id),
            _ => None,
        };
        let domain_id = match reuse_multi {
            Some(id) => {
                neighbors.remove(0);
                id
            }
            None => {
                let id = self.ids.new_domain_id();
                let multi = MultiDomain::new(
                    id,
                    self.t,
                    self.params.step_size_factor,
                    self.params.dt_hardcore_min,
                );
                self.registry.insert(Domain::Multi(multi));
                id
            }
        };

        self.registry.remove(single.header.domain_id);
        self.shells.remove(single.shell);
        if let Some(eid) = single.header.event_id {
            self.events.remove(eid);
        }
        self.add_to_multi(single.particle, domain_id)?;

        for neighbor in neighbors {
            match neighbor {
                PartnerKind::Single(s) => self.add_to_multi_recursive_single(s, domain_id)?,
                PartnerKind::Multi(other) => {
                    if other != domain_id {
                        self.merge_multis(other, domain_id);
                    }
                }
            }
        }

        self.initialize_multi(domain_id, reuse_multi.is_some());
        Ok(domain_id)
    }

    fn add_to_multi_recursive_single(
        &mut self,
        single: NonInteractionSingle,
        multi_id: DomainId,
    ) -> Result<(), SimulationError> {
        let already = match self.registry.get(multi_id) {
            Some(Domain::Multi(m)) => m.has_particle(single.particle),
            _ => return Ok(()),
        };
        if already {
            return Ok(());
        }
        let p = self
            .world
            .get_particle(single.particle)
            .ok_or(InvariantViolation::MissingParticle { particle: single.particle })?;
        let pos = p.position;

        self.registry.remove(single.header.domain_id);
        self.shells.remove(single.shell);
        if let Some(eid) = single.header.event_id {
            self.events.remove(eid);
        }
        self.add_to_multi(single.particle, multi_id)?;

        let radius = p.radius * self.params.multi_shell_factor;
        let neighbor_ids: Vec<DomainId> = self
            .shells
            .neighbors_within(pos, radius, &[multi_id])
            .into_iter()
            .map(|(_, _, owner)| owner)
            .collect();
        let mut seen = Vec::new();
        for id in neighbor_ids {
            if seen.contains(&id) || id == multi_id {
                continue;
            }
            seen.push(id);
            let is_multi = match self.registry.get(id) {
                Some(d) => d.is_multi(),
                None => continue,
            };
            if is_multi {
                self.merge_multis(id, multi_id);
                continue;
            }
            let last_time = self
                .registry
                .get(id)
                .ok_or(InvariantViolation::MissingDomain { domain: id })?
                .header()
                .last_time;
            if last_time == self.t {
                continue;
            }
            for burst in self.burst_domain(id)? {
                let bp = self
                    .world
                    .get_particle(burst.particle)
                    .ok_or(InvariantViolation::MissingParticle { particle: burst.particle })?;
                if self.world.distance(pos, bp.position) <= radius {
                    self.add_to_multi_recursive_single(burst, multi_id)?;
                }
            }
        }
        Ok(())
    }

    /// §9 `add_to_multi`: registers `particle`'s own small shell in the Multi.
    fn add_to_multi(&mut self, particle: ParticleId, multi_id: DomainId) -> Result<(), SimulationError> {
        let p = self
            .world
            .get_particle(particle)
            .ok_or(InvariantViolation::MissingParticle { particle })?;
        let shell_id = self.ids.new_shell_id();
        self.shells.insert_or_update(
            shell_id,
            Shape::Sphere {
                center: p.position,
                radius: p.radius * self.params.multi_shell_factor,
            },
            multi_id,
        );
        if let Some(Domain::Multi(m)) = self.registry.get_mut(multi_id) {
            m.add_particle(particle);
            m.add_shell(shell_id);
        }
        Ok(())
    }

    fn merge_multis(&mut self, from: DomainId, into: DomainId) {
        if let Some(event_id) = self.registry.get(from).and_then(|d| d.header().event_id) {
            self.events.remove(event_id);
        }
        let removed = match self.registry.remove(from) {
            Some(Domain::Multi(m)) => m,
            Some(other) => {
                self.registry.insert(other);
                return;
            }
            None => return,
        };
        for &shell_id in &removed.shells {
            if let Some(stored) = self.shells.get(shell_id) {
                let shape = stored.shape;
                self.shells.insert_or_update(shell_id, shape, into);
            }
        }
        if let Some(Domain::Multi(m)) = self.registry.get_mut(into) {
            m.merge_from(&removed);
        }
    }

    pub(crate) fn initialize_multi(&mut self, multi_id: DomainId, reschedule_only: bool) {
        let (dt, reaction_length) = {
            let m = match self.registry.get(multi_id) {
                Some(Domain::Multi(m)) => m,
                _ => return,
            };
            self.calculate_bd_dt_and_reaction_length(m)
        };
        if let Some(Domain::Multi(m)) = self.registry.get_mut(multi_id) {
            m.header.last_time = self.t;
            m.header.dt = dt;
            m.reaction_length = reaction_length;
        }
        if reschedule_only {
            if let Some(event_id) = self.registry.get(multi_id).and_then(|d| d.header().event_id) {
                self.events.update(event_id, self.t + dt);
            }
        } else {
            let event_id = self.events.push(self.t + dt, multi_id);
            if let Some(domain) = self.registry.get_mut(multi_id) {
                domain.header_mut().event_id = Some(event_id);
            }
        }
    }

    /// `multi.py`'s `clear_volume` callback: bursts every domain (besides
    /// `ignore`) whose shell reaches into the sphere `(center, radius)`, so a
    /// particle about to be placed there does not end up inside another
    /// domain's protective shell. Reuses the same intruder-collection shape
    /// as [`Simulator::make_new_domain`], but bursts unconditionally
    /// (including Multis) since the goal here is just an empty region, not
    /// picking a partner.
    pub(crate) fn burst_volume(
        &mut self,
        center: Vector3<Real>,
        radius: Real,
        ignore: DomainId,
    ) -> Result<(), SimulationError> {
        let intruder_ids: Vec<DomainId> = self
            .shells
            .neighbors_within(center, radius, &[ignore])
            .into_iter()
            .map(|(_, _, owner)| owner)
            .collect();
        let mut intruders: Vec<DomainId> = Vec::new();
        for id in intruder_ids {
            if !intruders.contains(&id) {
                intruders.push(id);
            }
        }
        for id in intruders {
            let last_time = match self.registry.get(id) {
                Some(d) => d.header().last_time,
                None => continue,
            };
            if last_time == self.t {
                continue;
            }
            self.burst_domain(id)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum PartnerKind {
    Single(NonInteractionSingle),
    Multi(DomainId),
}

enum ClosestObject {
    NonInteractionSingle(NonInteractionSingle),
    Other,
}

fn structure_position(structure: &Structure) -> Vector3<Real> {
    match *structure {
        Structure::CuboidalRegion { origin, .. } => origin,
        Structure::PlanarSurface { origin, .. } => origin,
        Structure::CylindricalSurface { origin, .. } => origin,
    }
}

/// §4.8: shrinks exactly one of `{dr, dz_left, dz_right}` to exclude the
/// shell at `shell_position` (already cyclic-transposed relative to
/// `projected_point`) with size `shell_size`.
#[allow(clippy::too_many_arguments)]
fn miedema_algorithm(
    shell_position: Vector3<Real>,
    shell_size: Real,
    projected_point: Vector3<Real>,
    orientation_vector: Vector3<Real>,
    mut dr: Real,
    mut dz_left: Real,
    mut dz_right: Real,
    surface: &Structure,
    particle_distance: Real,
) -> (Real, Real, Real) {
    let shell_vector = shell_position - projected_point;
    let zi = shell_vector.dot(&orientation_vector);
    let z_vector = zi * orientation_vector;
    let r_vector = shell_vector - z_vector;
    let ri = r_vector.norm();

    let mut dr_i = ri - shell_size;

    let is_planar = matches!(surface, Structure::PlanarSurface { .. });
    if is_planar {
        dz_right -= particle_distance;
    } else {
        dr_i -= particle_distance;
        dr -= particle_distance;
    }

    if zi < 0.0 {
        let dz_left_i = -zi - shell_size;
        if dz_left_i < dz_left && dr_i < dr {
            if dz_left_i > dr_i {
                dz_left = dz_left_i;
            } else {
                dr = dr_i;
            }
        }
    } else {
        let mut dz_right_i = zi - shell_size;
        if is_planar {
            dz_right_i -= particle_distance;
        }
        if dz_right_i < dz_right && dr_i < dr {
            if dz_right_i > dr_i {
                dz_right = dz_right_i;
            } else {
                dr = dr_i;
            }
        }
    }

    if is_planar {
        dz_right += particle_distance;
    } else {
        dr += particle_distance;
    }

    (dr, dz_left, dz_right)
}
