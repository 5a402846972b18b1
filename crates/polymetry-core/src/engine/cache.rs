use std::collections::HashMap;
use std::rc::Rc;

use nalgebra::Point3;

use super::error::AnalysisError;
use crate::core::models::ids::ResidueId;
use crate::core::models::topology::Topology;
use crate::core::models::trajectory::Trajectory;
use crate::core::utils::geometry;
use crate::core::utils::identifiers::MARKER_ATOM_NAME;

/// Second-level cache key: the full atom set of a residue, or one atom name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum AtomQuery {
    All,
    Named(String),
}

/// Memoized residue-level lookups, owned by one protein handle.
///
/// Entries are inserted on first use and never evicted; the lifetime of the
/// cache is the lifetime of the handle. `misses` counts how many lookups had
/// to be delegated to the topology, so repeated queries are observably free.
#[derive(Debug, Default)]
pub(crate) struct LookupCache {
    atoms: HashMap<ResidueId, HashMap<AtomQuery, Rc<Vec<usize>>>>,
    markers: HashMap<ResidueId, Option<usize>>,
    com_series: HashMap<ResidueId, Rc<Vec<Point3<f64>>>>,
    misses: u64,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn atom_indices(
        &mut self,
        topology: &Topology,
        residue: ResidueId,
        query: &AtomQuery,
    ) -> Rc<Vec<usize>> {
        if let Some(hit) = self.atoms.get(&residue).and_then(|per_residue| per_residue.get(query)) {
            return Rc::clone(hit);
        }

        self.misses += 1;
        let indices = match query {
            AtomQuery::All => topology
                .atom_indices_for_residue(residue)
                .map(<[usize]>::to_vec)
                .unwrap_or_default(),
            AtomQuery::Named(name) => topology
                .atom_indices_named(residue, name)
                .unwrap_or_default(),
        };
        let indices = Rc::new(indices);
        self.atoms
            .entry(residue)
            .or_default()
            .insert(query.clone(), Rc::clone(&indices));
        indices
    }

    /// Resolves the unique marker atom of a residue.
    ///
    /// `Ok(None)` means the residue has no marker atom (caps and ligands);
    /// more than one marker atom is a malformed topology and is an error.
    pub fn marker_atom(
        &mut self,
        topology: &Topology,
        residue: ResidueId,
    ) -> Result<Option<usize>, AnalysisError> {
        if let Some(&cached) = self.markers.get(&residue) {
            return Ok(cached);
        }

        let candidates =
            self.atom_indices(topology, residue, &AtomQuery::Named(MARKER_ATOM_NAME.to_string()));
        let resolved = match candidates.as_slice() {
            [] => None,
            [index] => Some(*index),
            _ => {
                return Err(AnalysisError::AmbiguousAtom {
                    residue,
                    name: MARKER_ATOM_NAME.to_string(),
                    count: candidates.len(),
                });
            }
        };
        self.markers.insert(residue, resolved);
        Ok(resolved)
    }

    /// Full-trajectory center-of-mass series of a residue, one point per frame.
    ///
    /// Atoms with unknown element masses count with mass 1.0. Returns `None`
    /// for a residue with no atoms.
    pub fn com_series(
        &mut self,
        trajectory: &Trajectory,
        residue: ResidueId,
    ) -> Option<Rc<Vec<Point3<f64>>>> {
        if let Some(hit) = self.com_series.get(&residue) {
            return Some(Rc::clone(hit));
        }

        let indices = self.atom_indices(trajectory.topology(), residue, &AtomQuery::All);
        if indices.is_empty() {
            return None;
        }
        let masses: Vec<f64> = indices
            .iter()
            .map(|&atom_index| {
                trajectory
                    .topology()
                    .atom(atom_index)
                    .and_then(|atom| atom.mass())
                    .unwrap_or(1.0)
            })
            .collect();

        let mut series = Vec::with_capacity(trajectory.n_frames());
        let mut coords = Vec::with_capacity(indices.len());
        for frame in 0..trajectory.n_frames() {
            coords.clear();
            coords.extend(
                indices
                    .iter()
                    .filter_map(|&atom_index| trajectory.coord(frame, atom_index)),
            );
            series.push(geometry::center_of_mass(&coords, &masses)?);
        }

        let series = Rc::new(series);
        self.com_series.insert(residue, Rc::clone(&series));
        Some(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::topology::TopologyBuilder;

    fn two_residue_trajectory() -> Trajectory {
        let mut builder = TopologyBuilder::new();
        builder
            .start_residue("ALA", 1, 'A')
            .add_atom(1, "N", "N")
            .add_atom(2, "CA", "C")
            .start_residue("NME", 2, 'A')
            .add_atom(3, "N", "N")
            .add_atom(4, "CH3", "C");
        let topology = builder.build();
        let frames = vec![vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
        ]];
        Trajectory::new(topology, frames).unwrap()
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let trajectory = two_residue_trajectory();
        let mut cache = LookupCache::new();

        let first = cache.atom_indices(trajectory.topology(), ResidueId(0), &AtomQuery::All);
        assert_eq!(first.as_slice(), &[0, 1]);
        assert_eq!(cache.misses(), 1);

        let second = cache.atom_indices(trajectory.topology(), ResidueId(0), &AtomQuery::All);
        assert_eq!(second.as_slice(), &[0, 1]);
        assert_eq!(cache.misses(), 1);

        cache.atom_indices(
            trajectory.topology(),
            ResidueId(0),
            &AtomQuery::Named("CA".to_string()),
        );
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn marker_atom_distinguishes_absent_from_present() {
        let trajectory = two_residue_trajectory();
        let mut cache = LookupCache::new();

        assert_eq!(
            cache.marker_atom(trajectory.topology(), ResidueId(0)).unwrap(),
            Some(1)
        );
        assert_eq!(
            cache.marker_atom(trajectory.topology(), ResidueId(1)).unwrap(),
            None
        );
    }

    #[test]
    fn marker_atom_rejects_duplicates() {
        let mut builder = TopologyBuilder::new();
        builder
            .start_residue("ALA", 1, 'A')
            .add_atom(1, "CA", "C")
            .add_atom(2, "CA", "C");
        let topology = builder.build();
        let mut cache = LookupCache::new();

        let result = cache.marker_atom(&topology, ResidueId(0));
        assert!(matches!(
            result,
            Err(AnalysisError::AmbiguousAtom { count: 2, .. })
        ));
    }

    #[test]
    fn com_series_is_mass_weighted_and_cached() {
        let trajectory = two_residue_trajectory();
        let mut cache = LookupCache::new();

        let series = cache.com_series(&trajectory, ResidueId(0)).unwrap();
        assert_eq!(series.len(), 1);
        // N at x=0 (14.007), C at x=2 (12.011).
        let expected = 2.0 * 12.011 / (14.007 + 12.011);
        assert!((series[0].x - expected).abs() < 1e-9);

        let misses_after_first = cache.misses();
        let again = cache.com_series(&trajectory, ResidueId(0)).unwrap();
        assert_eq!(cache.misses(), misses_after_first);
        assert!((again[0].x - expected).abs() < 1e-9);
    }
}
