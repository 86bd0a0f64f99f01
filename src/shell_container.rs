//! Uniform periodic cell list indexing shells by [`ShellId`] (§4.2).
//!
//! The Rust analogue of `_gfrd.SphericalShellContainer` /
//! `CylindricalShellContainer` referenced throughout `egfrd.py`/`multi.py`
//! (e.g. `multi.py`'s `self.sphere_container = _gfrd.SphericalShellContainer(...)`),
//! generalized here to the single [`Shape`] enum so both sphere and cylinder
//! shells share one index.

use nalgebra::Vector3;
use std::collections::HashMap as StdHashMap;

use crate::geometry::Shape;
use crate::numeric::{DomainId, Real, ShellId};
use crate::topology;

type CellCoord = (i64, i64, i64);

/// A shell stored in the container: its geometry plus the id of the domain
/// that owns it (the back-reference required by invariant 1, §3).
#[derive(Clone, Copy, Debug)]
pub struct StoredShell {
    pub shape: Shape,
    pub owner: DomainId,
}

/// Spatial index of shells keyed by id, supporting insert/update/remove and
/// radius-bounded neighbour queries under 3D periodic distance.
#[derive(Debug)]
pub struct ShellContainer {
    side: Real,
    cell_size: Real,
    cells_per_side: i64,
    shells: StdHashMap<ShellId, StoredShell>,
    cell_of: StdHashMap<ShellId, CellCoord>,
    cells: StdHashMap<CellCoord, Vec<ShellId>>,
}

impl ShellContainer {
    /// Builds a container for a periodic box of side `side`, sized so that a
    /// cell's diagonal exceeds `max_shell_size_hint * 2` (the contract's
    /// "default chosen so that a cell diagonal exceeds the largest
    /// admissible shell").
    pub fn new(side: Real, max_shell_size_hint: Real) -> Self {
        let target_cell_size = (max_shell_size_hint * 2.0).max(side / 64.0);
        let cells_per_side = (side / target_cell_size).floor().max(1.0) as i64;
        let cell_size = side / cells_per_side as Real;
        Self {
            side,
            cell_size,
            cells_per_side,
            shells: StdHashMap::new(),
            cell_of: StdHashMap::new(),
            cells: StdHashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.shells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }

    pub fn get(&self, id: ShellId) -> Option<&StoredShell> {
        self.shells.get(&id)
    }

    pub fn contains(&self, id: ShellId) -> bool {
        self.shells.contains_key(&id)
    }

    fn cell_coord(&self, point: Vector3<Real>) -> CellCoord {
        let wrapped = topology::apply_boundary(point, self.side);
        let to_cell = |x: Real| ((x / self.cell_size).floor() as i64).rem_euclid(self.cells_per_side);
        (to_cell(wrapped.x), to_cell(wrapped.y), to_cell(wrapped.z))
    }

    /// Inserts a new shell, or moves it if `id` already exists with
    /// different geometry (the contract's "tolerate re-insertion with
    /// different geometry (move)").
    pub fn insert_or_update(&mut self, id: ShellId, shape: Shape, owner: DomainId) {
        self.remove(id);
        let cell = self.cell_coord(shape.center());
        self.shells.insert(id, StoredShell { shape, owner });
        self.cell_of.insert(id, cell);
        self.cells.entry(cell).or_default().push(id);
    }

    /// Removes a shell; no-op if it was not present.
    pub fn remove(&mut self, id: ShellId) {
        if self.shells.remove(&id).is_none() {
            return;
        }
        if let Some(cell) = self.cell_of.remove(&id) {
            if let Some(bucket) = self.cells.get_mut(&cell) {
                bucket.retain(|&sid| sid != id);
                if bucket.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    /// Returns `(shell-id, distance to boundary, owner)` for every shell
    /// whose boundary lies within `radius` of `point`, sorted by distance.
    ///
    /// A negative distance means `point` is inside that shell. `ignore`
    /// excludes shells owned by the listed domains (used to exclude the
    /// firing domain's own shell from its neighbour query).
    pub fn neighbors_within(
        &self,
        point: Vector3<Real>,
        radius: Real,
        ignore: &[DomainId],
    ) -> Vec<(ShellId, Real, DomainId)> {
        let reach = (radius / self.cell_size).ceil() as i64 + 1;
        let center_cell = self.cell_coord(point);
        let mut found = Vec::new();

        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    let cell = (
                        (center_cell.0 + dx).rem_euclid(self.cells_per_side),
                        (center_cell.1 + dy).rem_euclid(self.cells_per_side),
                        (center_cell.2 + dz).rem_euclid(self.cells_per_side),
                    );
                    if let Some(bucket) = self.cells.get(&cell) {
                        for &id in bucket {
                            let stored = &self.shells[&id];
                            if ignore.contains(&stored.owner) {
                                continue;
                            }
                            let distance = stored.shape.signed_distance_to_boundary(point, self.side);
                            if distance <= radius {
                                found.push((id, distance, stored.owner));
                            }
                        }
                    }
                }
            }
        }

        found.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        found.dedup_by_key(|(id, _, _)| *id);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(center: Vector3<Real>, radius: Real) -> Shape {
        Shape::Sphere { center, radius }
    }

    #[test]
    fn finds_nearby_shells_and_sorts_by_distance() {
        let mut c = ShellContainer::new(100.0, 2.0);
        c.insert_or_update(
            ShellId::from_raw(0),
            sphere(Vector3::new(1.0, 0.0, 0.0), 0.5),
            DomainId::from_raw(0),
        );
        c.insert_or_update(
            ShellId::from_raw(1),
            sphere(Vector3::new(3.0, 0.0, 0.0), 0.5),
            DomainId::from_raw(1),
        );
        c.insert_or_update(
            ShellId::from_raw(2),
            sphere(Vector3::new(50.0, 50.0, 50.0), 0.5),
            DomainId::from_raw(2),
        );

        let found = c.neighbors_within(Vector3::zeros(), 5.0, &[]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, ShellId::from_raw(0));
        assert_eq!(found[1].0, ShellId::from_raw(1));
    }

    #[test]
    fn ignore_excludes_owner() {
        let mut c = ShellContainer::new(100.0, 2.0);
        c.insert_or_update(
            ShellId::from_raw(0),
            sphere(Vector3::zeros(), 0.5),
            DomainId::from_raw(7),
        );
        let found = c.neighbors_within(Vector3::zeros(), 5.0, &[DomainId::from_raw(7)]);
        assert!(found.is_empty());
    }

    #[test]
    fn move_replaces_geometry() {
        let mut c = ShellContainer::new(100.0, 2.0);
        let id = ShellId::from_raw(0);
        c.insert_or_update(id, sphere(Vector3::zeros(), 0.5), DomainId::from_raw(0));
        c.insert_or_update(
            id,
            sphere(Vector3::new(40.0, 0.0, 0.0), 0.5),
            DomainId::from_raw(0),
        );
        assert_eq!(c.len(), 1);
        assert!(c.neighbors_within(Vector3::zeros(), 1.0, &[]).is_empty());
        assert_eq!(
            c.neighbors_within(Vector3::new(40.0, 0.0, 0.0), 1.0, &[]).len(),
            1
        );
    }

    #[test]
    fn periodic_wraparound_is_found() {
        let mut c = ShellContainer::new(10.0, 2.0);
        c.insert_or_update(
            ShellId::from_raw(0),
            sphere(Vector3::new(9.9, 0.0, 0.0), 0.1),
            DomainId::from_raw(0),
        );
        let found = c.neighbors_within(Vector3::new(0.1, 0.0, 0.0), 0.5, &[]);
        assert_eq!(found.len(), 1);
    }
}
