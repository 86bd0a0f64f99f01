//! The Multi engine (§4.9): the internal Brownian-dynamics sub-stepper run
//! by a [`MultiDomain`] on every firing, grounded on `multi.py`'s
//! `calculate_bd_dt`/`Multi.step`/`Multi.check`.

use nalgebra::Vector3;
use rand::{Rng, RngCore};

use crate::domain::multi::MultiEvent;
use crate::domain::{Domain, EventKind, MultiDomain};
use crate::error::{InvariantViolation, SimulationError};
use crate::geometry::Shape;
use crate::model::Model;
use crate::numeric::{ParticleId, Real, Time};
use crate::propagator::Propagator;
use crate::rng;
use crate::simulator::Simulator;
use crate::world::World;

impl<W: World, M: Model, P: Propagator, R: RngCore> Simulator<W, M, P, R> {
    /// `multi.py`'s `calculate_bd_dt`: `(2*r_min)^2 / (2*D_max)`, scaled by
    /// `step_size_factor` and floored by `dt_hardcore_min`.
    pub(crate) fn calculate_bd_dt_and_reaction_length(&self, m: &MultiDomain) -> (Time, Real) {
        let mut r_min = Real::INFINITY;
        let mut d_max: Real = 0.0;
        for &pid in &m.particles {
            if let Some(p) = self.world.get_particle(pid) {
                r_min = r_min.min(p.radius);
                d_max = d_max.max(p.d);
            }
        }
        if !r_min.is_finite() || d_max <= 0.0 {
            return (Time::INFINITY, 0.0);
        }
        let raw = (2.0 * r_min).powi(2) / (2.0 * d_max);
        let dt = (raw * m.step_size_factor).max(m.dt_hardcore_min);
        (dt, r_min * 0.1)
    }

    /// §4.9: advances a Multi's internal BD sub-stepper by one `dt`. Reaction
    /// checks run before the diffusive step, matching `multi.py`'s ordering;
    /// a fired reaction or an escape both break the Multi up into fresh
    /// singles, otherwise it reschedules itself unchanged.
    pub(crate) fn fire_multi(&mut self, mut m: MultiDomain) -> Result<(), SimulationError> {
        let dt = m.header.dt;
        let reaction_length = m.reaction_length;
        let particles = m.particles.clone();

        for &pid in &particles {
            let p = match self.world.get_particle(pid) {
                Some(p) => p,
                None => continue,
            };
            let rate = self.model.total_monomolecular_rate(p.species);
            if rate <= 0.0 {
                continue;
            }
            if self.rng.gen::<Real>() < (rate * dt).min(1.0) {
                m.last_event = MultiEvent::UnimolecularReaction;
                self.stats.record_event(EventKind::MultiUnimolecularReaction);
                self.break_up_multi_except(m, &[pid])?;
                let _ = self.fire_single_reaction(pid, p.species)?;
                return Ok(());
            }
        }

        for i in 0..particles.len() {
            for j in (i + 1)..particles.len() {
                let (pid1, pid2) = (particles[i], particles[j]);
                let p1 = match self.world.get_particle(pid1) {
                    Some(p) => p,
                    None => continue,
                };
                let p2 = match self.world.get_particle(pid2) {
                    Some(p) => p,
                    None => continue,
                };
                let rules = self.model.bimolecular_rules(p1.species, p2.species);
                if rules.is_empty() {
                    continue;
                }
                let total_rate: Real = rules.iter().map(|r| r.rate).sum();
                let distance = self.world.distance(p1.position, p2.position);
                let contact = p1.radius + p2.radius;
                let overlap = (contact + reaction_length - distance).max(0.0);
                if overlap <= 0.0 {
                    continue;
                }
                let prob = (total_rate * dt * (overlap / reaction_length.max(1e-300))).min(1.0);
                if self.rng.gen::<Real>() < prob {
                    m.last_event = MultiEvent::BimolecularReaction;
                    self.stats.record_event(EventKind::MultiBimolecularReaction);
                    let com = crate::topology::pair_center_of_mass(
                        p1.position,
                        p2.position,
                        p1.d,
                        p2.d,
                        self.world.side(),
                    );
                    self.break_up_multi_except(m, &[pid1, pid2])?;
                    self.fire_bimolecular_in_place(pid1, pid2, com)?;
                    return Ok(());
                }
            }
        }

        // Diffusive sub-step: Gaussian displacement per particle, rejected on
        // overlap. §4.9: a candidate that would leave the Multi's own shell
        // envelope first bursts whatever else occupies that region
        // (`multi.py`'s `clear_volume` callback), then re-checks overlap
        // against the now-current world before committing.
        let mut escaped = false;
        for (idx, &pid) in particles.iter().enumerate() {
            let p = match self.world.get_particle(pid) {
                Some(p) => p,
                None => continue,
            };
            if p.d <= 0.0 {
                continue;
            }
            let displacement = rng::gaussian_displacement(&mut self.rng, 2.0 * p.d * dt);
            let candidate = self.world.apply_boundary(p.position + displacement);
            let still_inside = m.shells.iter().any(|&sid| {
                self.shells
                    .get(sid)
                    .map(|s| s.shape.strictly_contains(candidate, 0.0, self.world.side()))
                    .unwrap_or(false)
            });
            if !still_inside {
                self.burst_volume(candidate, p.radius, m.header.domain_id)?;
            }
            if !self.world.check_overlap(candidate, p.radius, &[pid]).is_empty() {
                continue;
            }
            if !still_inside {
                escaped = true;
            }
            self.relocate_particle(pid, candidate)?;
            if let Some(&shell_id) = m.shells.get(idx) {
                self.shells.insert_or_update(
                    shell_id,
                    Shape::Sphere {
                        center: candidate,
                        radius: p.radius * self.params.multi_shell_factor,
                    },
                    m.header.domain_id,
                );
            }
        }

        if escaped {
            m.last_event = MultiEvent::Escape;
            self.stats.record_event(EventKind::MultiEscape);
            self.break_up_multi_except(m, &[])?;
            return Ok(());
        }

        m.last_event = MultiEvent::Diffusion;
        self.stats.record_event(EventKind::MultiDiffusion);
        let domain_id = m.header.domain_id;
        self.registry.insert(Domain::Multi(m));
        self.initialize_multi(domain_id, true);
        Ok(())
    }

    /// Breaks a Multi into fresh zero-`dt` singles for every member particle
    /// except those in `skip` (already being handed to a reaction handler by
    /// the caller), clearing its shells first (§4.10: "bursting a Multi
    /// breaks it up").
    fn break_up_multi_except(&mut self, m: MultiDomain, skip: &[ParticleId]) -> Result<(), SimulationError> {
        for &shell in &m.shells {
            self.shells.remove(shell);
        }
        for &pid in &m.particles {
            if !skip.contains(&pid) {
                self.spawn_fresh_single(pid)?;
            }
        }
        Ok(())
    }

    /// Draws and applies a bimolecular reaction between two particles that
    /// were just released from a broken-up Multi (§4.9's in-sub-step
    /// reaction path, the Multi analogue of `Simulator::fire_pair_reaction`).
    /// Falls back to re-seeding both reactants as fresh singles if no rule
    /// applies or the product placement overlaps.
    fn fire_bimolecular_in_place(
        &mut self,
        a: ParticleId,
        b: ParticleId,
        com: Vector3<Real>,
    ) -> Result<(), SimulationError> {
        let pa = match self.world.get_particle(a) {
            Some(p) => p,
            None => return Ok(()),
        };
        let pb = match self.world.get_particle(b) {
            Some(p) => p,
            None => return Ok(()),
        };
        let rules = self.model.bimolecular_rules(pa.species, pb.species).to_vec();
        if rules.is_empty() {
            self.spawn_fresh_single(a)?;
            self.spawn_fresh_single(b)?;
            return Ok(());
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
                self.world.remove_particle(a);
                self.world.remove_particle(b);
                self.stats.record_reaction();
            }
            1 => {
                let species = self
                    .world
                    .get_species(rule.products[0])
                    .ok_or(InvariantViolation::MissingSpecies { species: rule.products[0] })?;
                let pos = self.world.apply_boundary(com);
                if !self.world.check_overlap(pos, species.radius, &[a, b]).is_empty() {
                    self.stats.record_rejection();
                    self.spawn_fresh_single(a)?;
                    self.spawn_fresh_single(b)?;
                    return Ok(());
                }
                self.world.remove_particle(a);
                self.world.remove_particle(b);
                let new_id = self.world.new_particle(rule.products[0], pos);
                self.spawn_fresh_single(new_id)?;
                self.stats.record_reaction();
            }
            _ => {
                self.spawn_fresh_single(a)?;
                self.spawn_fresh_single(b)?;
            }
        }
        Ok(())
    }
}
