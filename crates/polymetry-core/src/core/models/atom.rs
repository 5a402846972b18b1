use super::ids::ResidueId;
use crate::core::utils::identifiers;

/// Represents an atom in a trajectory topology.
///
/// An atom carries only its identity: name, element, parent residue, and the
/// serial number it had in the source file. Coordinates are not stored here,
/// since an ensemble has one set of atoms but many frames of positions, which
/// live in the [`Trajectory`](super::trajectory::Trajectory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    /// The serial number from the source file.
    pub serial: usize,
    /// The name of the atom (e.g., "CA", "N", "OXT").
    pub name: String,
    /// The chemical element symbol (e.g., "C", "N", "Fe").
    pub element: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
}

impl Atom {
    /// Creates a new `Atom`.
    ///
    /// # Arguments
    ///
    /// * `serial` - The serial number from the source file.
    /// * `name` - The name of the atom.
    /// * `element` - The chemical element symbol.
    /// * `residue_id` - The ID of the residue this atom belongs to.
    pub fn new(serial: usize, name: &str, element: &str, residue_id: ResidueId) -> Self {
        Self {
            serial,
            name: name.to_string(),
            element: element.to_string(),
            residue_id,
        }
    }

    /// Returns the atomic mass in Daltons, or `None` for unknown element symbols.
    pub fn mass(&self) -> Option<f64> {
        identifiers::element_mass(&self.element)
    }

    /// Returns `true` unless the atom is hydrogen or deuterium.
    pub fn is_heavy(&self) -> bool {
        identifiers::is_heavy_element(&self.element)
    }

    /// Returns `true` if the atom name belongs to the peptide backbone set.
    pub fn is_backbone(&self) -> bool {
        identifiers::is_backbone_atom(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_stores_identity_fields() {
        let atom = Atom::new(7, "CA", "C", ResidueId(2));
        assert_eq!(atom.serial, 7);
        assert_eq!(atom.name, "CA");
        assert_eq!(atom.element, "C");
        assert_eq!(atom.residue_id, ResidueId(2));
    }

    #[test]
    fn mass_resolves_known_elements() {
        let carbon = Atom::new(1, "CA", "C", ResidueId(0));
        let sulfur = Atom::new(2, "SG", "S", ResidueId(0));
        assert!((carbon.mass().unwrap() - 12.011).abs() < 1e-9);
        assert!((sulfur.mass().unwrap() - 32.06).abs() < 1e-9);
    }

    #[test]
    fn mass_is_none_for_unknown_symbol() {
        let atom = Atom::new(1, "XX", "Xx", ResidueId(0));
        assert!(atom.mass().is_none());
    }

    #[test]
    fn heavy_classification_follows_element() {
        assert!(Atom::new(1, "CA", "C", ResidueId(0)).is_heavy());
        assert!(!Atom::new(2, "HA", "H", ResidueId(0)).is_heavy());
        assert!(!Atom::new(3, "D1", "D", ResidueId(0)).is_heavy());
    }

    #[test]
    fn backbone_classification_follows_name() {
        assert!(Atom::new(1, "N", "N", ResidueId(0)).is_backbone());
        assert!(Atom::new(2, "CA", "C", ResidueId(0)).is_backbone());
        assert!(!Atom::new(3, "CB", "C", ResidueId(0)).is_backbone());
    }
}
