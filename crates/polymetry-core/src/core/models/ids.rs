use std::fmt;

/// A zero-based residue index local to one protein, before any numbering
/// offset is applied.
///
/// Logical indices are what callers pass to the public analysis API: index 0
/// always means the protein's first residue, regardless of how the residues
/// are numbered in the underlying topology. A logical index is converted to a
/// [`ResidueId`] exactly once, by the owning protein handle, which makes
/// double-offsetting unrepresentable in the type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueIndex(pub usize);

/// A true structural residue id: the residue's dense, zero-based position in
/// the topology.
///
/// For a protein with numbering offset `k`, `ResidueId == ResidueIndex + k`.
/// True ids are what the topology and all geometry routines consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueId(pub usize);

impl ResidueIndex {
    pub fn value(self) -> usize {
        self.0
    }
}

impl ResidueId {
    pub fn value(self) -> usize {
        self.0
    }
}

impl fmt::Display for ResidueIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ResidueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residue_index_and_id_are_distinct_types() {
        let index = ResidueIndex(3);
        let id = ResidueId(3);
        assert_eq!(index.value(), id.value());
        assert_eq!(format!("{}", index), "3");
        assert_eq!(format!("{}", id), "3");
    }

    #[test]
    fn ids_order_by_underlying_value() {
        assert!(ResidueId(2) < ResidueId(10));
        assert!(ResidueIndex(0) < ResidueIndex(1));
    }
}
