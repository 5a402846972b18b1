use super::ids::ResidueId;
use std::fmt;

/// Restricts which atoms of a residue range a selection resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomScope {
    /// Every atom in the range.
    All,
    /// Backbone atoms only, classified by atom name.
    Backbone,
    /// Heavy atoms only (element is neither hydrogen nor deuterium).
    Heavy,
    /// Atoms with this exact name.
    Named(String),
}

/// An atom-subset selection over an inclusive range of true residue ids.
///
/// Selections are the opaque expressions produced by region resolution and
/// consumed by [`Topology::select`](super::topology::Topology::select). They
/// keep analysis code independent of how atom subsets are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub first: ResidueId,
    pub last: ResidueId,
    pub scope: AtomScope,
}

impl Selection {
    /// Selects every atom of the inclusive residue range `[first, last]`.
    pub fn residues(first: ResidueId, last: ResidueId) -> Self {
        Self {
            first,
            last,
            scope: AtomScope::All,
        }
    }

    /// Returns the same residue range with a different atom scope.
    pub fn with_scope(self, scope: AtomScope) -> Self {
        Self { scope, ..self }
    }

    pub fn contains(&self, id: ResidueId) -> bool {
        self.first <= id && id <= self.last
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resid {} to {}", self.first, self.last)?;
        match &self.scope {
            AtomScope::All => Ok(()),
            AtomScope::Backbone => write!(f, " and backbone"),
            AtomScope::Heavy => write!(f, " and heavy"),
            AtomScope::Named(name) => write!(f, " and name {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residues_selection_covers_inclusive_range() {
        let selection = Selection::residues(ResidueId(2), ResidueId(5));
        assert!(selection.contains(ResidueId(2)));
        assert!(selection.contains(ResidueId(5)));
        assert!(!selection.contains(ResidueId(1)));
        assert!(!selection.contains(ResidueId(6)));
    }

    #[test]
    fn with_scope_replaces_only_the_scope() {
        let selection =
            Selection::residues(ResidueId(0), ResidueId(3)).with_scope(AtomScope::Backbone);
        assert_eq!(selection.first, ResidueId(0));
        assert_eq!(selection.last, ResidueId(3));
        assert_eq!(selection.scope, AtomScope::Backbone);
    }

    #[test]
    fn display_matches_selection_grammar() {
        let all = Selection::residues(ResidueId(0), ResidueId(9));
        assert_eq!(all.to_string(), "resid 0 to 9");

        let named = Selection::residues(ResidueId(1), ResidueId(4))
            .with_scope(AtomScope::Named("CA".to_string()));
        assert_eq!(named.to_string(), "resid 1 to 4 and name CA");
    }
}
