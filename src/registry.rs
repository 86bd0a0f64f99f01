//! Domain registry (§4.3): `domain-id -> Domain` and `shell-id -> domain-id`,
//! kept consistent with the shell container by the simulator.

use fxhash::FxHashMap;

use crate::domain::Domain;
use crate::numeric::{DomainId, ShellId};

#[derive(Debug, Default)]
pub struct DomainRegistry {
    domains: FxHashMap<DomainId, Domain>,
    owner_of_shell: FxHashMap<ShellId, DomainId>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn get(&self, id: DomainId) -> Option<&Domain> {
        self.domains.get(&id)
    }

    pub fn get_mut(&mut self, id: DomainId) -> Option<&mut Domain> {
        self.domains.get_mut(&id)
    }

    pub fn owner_of_shell(&self, shell: ShellId) -> Option<DomainId> {
        self.owner_of_shell.get(&shell).copied()
    }

    /// Inserts or replaces a domain, registering all of its current shells.
    pub fn insert(&mut self, domain: Domain) {
        let id = domain.domain_id();
        for shell in domain.shell_ids() {
            self.owner_of_shell.insert(shell, id);
        }
        self.domains.insert(id, domain);
    }

    /// Removes a domain and de-registers all of its shells atomically, per
    /// the resource-ownership contract of §5 ("all shells of the domain are
    /// de-registered in one atomic sequence before the domain is dropped").
    pub fn remove(&mut self, id: DomainId) -> Option<Domain> {
        let domain = self.domains.remove(&id)?;
        for shell in domain.shell_ids() {
            self.owner_of_shell.remove(&shell);
        }
        Some(domain)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DomainId, &Domain)> {
        self.domains.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = DomainId> + '_ {
        self.domains.keys().copied()
    }

    pub fn total_shell_count(&self) -> usize {
        self.domains.values().map(|d| d.shell_ids().len()).sum()
    }

    pub fn total_particle_count(&self) -> usize {
        self.domains.values().map(|d| d.particle_ids().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{single::StructureKind, DomainHeader, EventKind, NonInteractionSingle, SingleDomain};
    use crate::numeric::{ParticleId, StructureId};

    fn single(domain: u64, shell: u64) -> Domain {
        Domain::Single(SingleDomain::NonInteraction(NonInteractionSingle {
            header: DomainHeader::new(DomainId::from_raw(domain), 0.0),
            particle: ParticleId::from_raw(domain),
            shell: ShellId::from_raw(shell),
            structure: StructureId::from_raw(0),
            structure_kind: StructureKind::Bulk,
            event_kind: EventKind::Burst,
        }))
    }

    #[test]
    fn insert_and_remove_keep_shell_map_consistent() {
        let mut reg = DomainRegistry::new();
        reg.insert(single(0, 10));
        assert_eq!(reg.owner_of_shell(ShellId::from_raw(10)), Some(DomainId::from_raw(0)));
        reg.remove(DomainId::from_raw(0));
        assert_eq!(reg.owner_of_shell(ShellId::from_raw(10)), None);
        assert!(reg.is_empty());
    }
}
