use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::Point3;
use tracing::debug;

use super::cache::{AtomQuery, LookupCache};
use super::error::AnalysisError;
use crate::core::models::ids::{ResidueId, ResidueIndex};
use crate::core::models::residue::Residue;
use crate::core::models::selection::Selection;
use crate::core::models::trajectory::Trajectory;
use crate::core::utils::identifiers;

/// An immutable analysis view over one trajectory.
///
/// The handle owns the residue numbering (logical [`ResidueIndex`] to true
/// [`ResidueId`]), the marker-atom membership discovered at construction, and
/// every memoized lookup. Interior mutability keeps the public surface
/// `&self` while the caches fill lazily; the handle is deliberately not
/// `Sync`, so concurrent analyses should each wrap their own handle around
/// the shared trajectory.
pub struct Protein<'a> {
    trajectory: &'a Trajectory,
    residue_offset: usize,
    num_residues: usize,
    ncap: bool,
    ccap: bool,
    resid_with_marker: Vec<ResidueId>,
    idx_with_marker: Vec<ResidueIndex>,
    cache: RefCell<LookupCache>,
}

impl<'a> Protein<'a> {
    /// Creates a handle with no numbering offset.
    pub fn new(trajectory: &'a Trajectory) -> Result<Self, AnalysisError> {
        Self::with_offset(trajectory, 0)
    }

    /// Creates a handle whose logical residue numbering is shifted by
    /// `residue_offset`: true id = logical index + offset.
    ///
    /// Construction probes every residue for its marker atom to build the
    /// membership lists and cap flags. This is the dominant one-time cost for
    /// large topologies; it runs exactly once and every probe result stays
    /// cached for the handle's lifetime.
    ///
    /// # Errors
    ///
    /// Fails when the topology holds no residues, or when any residue carries
    /// more than one marker atom (malformed input structure).
    pub fn with_offset(
        trajectory: &'a Trajectory,
        residue_offset: usize,
    ) -> Result<Self, AnalysisError> {
        let topology = trajectory.topology();
        let num_residues = topology.num_residues();
        if num_residues == 0 {
            return Err(AnalysisError::EmptyRegion);
        }

        let mut cache = LookupCache::new();
        let mut resid_with_marker = Vec::new();
        let mut idx_with_marker = Vec::new();
        for position in 0..num_residues {
            let id = ResidueId(position);
            if cache.marker_atom(topology, id)?.is_some() {
                resid_with_marker.push(id);
                idx_with_marker.push(ResidueIndex(position));
            }
        }
        debug!(
            num_residues,
            with_marker = resid_with_marker.len(),
            "Built marker-atom membership for protein handle"
        );

        let ncap = resid_with_marker.first() != Some(&ResidueId(0));
        let ccap = idx_with_marker.last() != Some(&ResidueIndex(num_residues - 1));

        Ok(Self {
            trajectory,
            residue_offset,
            num_residues,
            ncap,
            ccap,
            resid_with_marker,
            idx_with_marker,
            cache: RefCell::new(cache),
        })
    }

    pub fn trajectory(&self) -> &'a Trajectory {
        self.trajectory
    }

    pub fn n_frames(&self) -> usize {
        self.trajectory.n_frames()
    }

    pub fn num_residues(&self) -> usize {
        self.num_residues
    }

    pub fn residue_offset(&self) -> usize {
        self.residue_offset
    }

    /// True when the first residue lacks a marker atom (an N-terminal cap).
    pub fn ncap(&self) -> bool {
        self.ncap
    }

    /// True when the last residue lacks a marker atom (a C-terminal cap).
    pub fn ccap(&self) -> bool {
        self.ccap
    }

    /// True ids of the marker-bearing residues, strictly increasing.
    pub fn marker_residues(&self) -> &[ResidueId] {
        &self.resid_with_marker
    }

    /// Zero-based positions of the marker-bearing residues, parallel to
    /// [`Protein::marker_residues`].
    pub fn marker_positions(&self) -> &[ResidueIndex] {
        &self.idx_with_marker
    }

    /// Number of lookups the caches have delegated to the topology so far.
    ///
    /// Repeating a query must not grow this count; it exists so cache
    /// idempotence is observable.
    pub fn cache_misses(&self) -> u64 {
        self.cache.borrow().misses()
    }

    /// Converts a logical residue index to the true structural id.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidResidueIndex`] when the logical index is out of
    /// range, and [`AnalysisError::DoubleOffset`] when the offset pushes it
    /// past the last residue, which usually means the caller passed an
    /// already-offset index.
    pub fn offset_residue(&self, index: ResidueIndex) -> Result<ResidueId, AnalysisError> {
        if index.value() >= self.num_residues {
            return Err(AnalysisError::InvalidResidueIndex {
                index,
                num_residues: self.num_residues,
            });
        }
        let true_id = index.value() + self.residue_offset;
        if true_id >= self.num_residues {
            return Err(AnalysisError::DoubleOffset {
                index,
                offset: self.residue_offset,
                num_residues: self.num_residues,
            });
        }
        Ok(ResidueId(true_id))
    }

    /// Membership test against the marker list built at construction.
    pub fn has_marker(&self, residue: ResidueId) -> bool {
        self.resid_with_marker.binary_search(&residue).is_ok()
    }

    /// Fails with a descriptive error when the residue lacks a marker atom.
    pub fn ensure_marker(&self, residue: ResidueId) -> Result<(), AnalysisError> {
        if self.has_marker(residue) {
            Ok(())
        } else {
            Err(AnalysisError::MissingMarkerAtom {
                residue,
                label: self.residue_label(residue),
            })
        }
    }

    /// Resolves an optionally open-ended residue region.
    ///
    /// `None` bounds default to the ends of the chain; when `with_marker` is
    /// set, a detected cap at either end is stepped over so the default
    /// region covers only marker-eligible residues. Defaults are already
    /// true ids, so only caller-supplied bounds go through offset
    /// correction. The pair is normalized so the first id is never greater
    /// than the last, and the returned selection covers every atom of the
    /// resolved range.
    pub fn first_and_last(
        &self,
        first: Option<ResidueIndex>,
        last: Option<ResidueIndex>,
        with_marker: bool,
    ) -> Result<(ResidueId, ResidueId, Selection), AnalysisError> {
        let mut lo = match first {
            Some(index) => self.offset_residue(index)?,
            None if with_marker && self.ncap => ResidueId(1),
            None => ResidueId(0),
        };
        let mut hi = match last {
            Some(index) => self.offset_residue(index)?,
            None if with_marker && self.ccap => ResidueId(self.num_residues.saturating_sub(2)),
            None => ResidueId(self.num_residues - 1),
        };
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        Ok((lo, hi, Selection::residues(lo, hi)))
    }

    /// Resolves the unique marker atom of a logical residue index.
    pub fn marker_index(&self, index: ResidueIndex) -> Result<usize, AnalysisError> {
        let id = self.offset_residue(index)?;
        self.marker_index_by_id(id)
    }

    /// Resolves the unique marker atom of a true residue id.
    pub fn marker_index_by_id(&self, residue: ResidueId) -> Result<usize, AnalysisError> {
        let marker = self
            .cache
            .borrow_mut()
            .marker_atom(self.trajectory.topology(), residue)?;
        match marker {
            Some(atom_index) => Ok(atom_index),
            None => Err(AnalysisError::MissingMarkerAtom {
                residue,
                label: self.residue_label(residue),
            }),
        }
    }

    /// Resolves marker atoms for many logical indices, skipping residues
    /// that fail to resolve. Sweeps expect absences, so a skip is logged
    /// rather than propagated.
    pub fn marker_indices(&self, indices: &[ResidueIndex]) -> Vec<usize> {
        let mut resolved = Vec::with_capacity(indices.len());
        for &index in indices {
            match self.marker_index(index) {
                Ok(atom_index) => resolved.push(atom_index),
                Err(error) => debug!(%index, %error, "Skipping residue in marker sweep"),
            }
        }
        resolved
    }

    /// All atom indices of a residue, memoized.
    pub fn atom_indices(&self, residue: ResidueId) -> Rc<Vec<usize>> {
        self.cache
            .borrow_mut()
            .atom_indices(self.trajectory.topology(), residue, &AtomQuery::All)
    }

    /// Atom indices of a residue matching a name, memoized.
    pub fn atom_indices_named(&self, residue: ResidueId, name: &str) -> Rc<Vec<usize>> {
        self.cache.borrow_mut().atom_indices(
            self.trajectory.topology(),
            residue,
            &AtomQuery::Named(name.to_string()),
        )
    }

    /// Per-frame center of mass of one residue, memoized for the handle's
    /// lifetime. The series always covers every frame; strided analyses index
    /// into it rather than re-deriving per-stride series.
    pub fn residue_com(&self, residue: ResidueId) -> Result<Rc<Vec<Point3<f64>>>, AnalysisError> {
        self.cache
            .borrow_mut()
            .com_series(self.trajectory, residue)
            .ok_or_else(|| AnalysisError::Internal(format!("residue {residue} has no atoms")))
    }

    pub fn residue(&self, residue: ResidueId) -> Option<&Residue> {
        self.trajectory.topology().residue(residue)
    }

    /// `NAME-number` label of a residue; unresolvable ids label themselves.
    pub fn residue_label(&self, residue: ResidueId) -> String {
        self.residue(residue)
            .map(|r| r.label())
            .unwrap_or_else(|| format!("residue {residue}"))
    }

    /// Labels for every residue of the handle, in true-id order.
    pub fn residue_labels(&self) -> Vec<String> {
        (0..self.num_residues)
            .map(|position| self.residue_label(ResidueId(position)))
            .collect()
    }

    pub fn residue_name(&self, index: ResidueIndex) -> Result<String, AnalysisError> {
        let id = self.offset_residue(index)?;
        Ok(self
            .residue(id)
            .map(|r| r.name.clone())
            .unwrap_or_default())
    }

    /// Total mass of a residue's atoms; atoms with unknown elements count
    /// with mass 1.0, matching center-of-mass behavior.
    pub fn residue_mass(&self, index: ResidueIndex) -> Result<f64, AnalysisError> {
        let id = self.offset_residue(index)?;
        let indices = self.atom_indices(id);
        Ok(indices
            .iter()
            .map(|&atom_index| {
                self.trajectory
                    .topology()
                    .atom(atom_index)
                    .and_then(|atom| atom.mass())
                    .unwrap_or(1.0)
            })
            .sum())
    }

    /// One-letter sequence over the marker-bearing residues; names without a
    /// code become `X`.
    pub fn sequence(&self) -> String {
        self.resid_with_marker
            .iter()
            .filter_map(|&id| self.residue(id))
            .map(|residue| identifiers::one_letter_code(&residue.name).unwrap_or('X'))
            .collect()
    }
}
