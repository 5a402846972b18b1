use super::ids::ResidueId;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub id: ResidueId,                     // Dense zero-based position in the topology
    pub name: String,                      // Name of the residue (e.g., "ALA", "ACE")
    pub seq_number: isize,                 // Residue sequence number from source file
    pub chain_id: char,                    // Chain identifier from source file
    pub(crate) atoms: Vec<usize>,          // Topology-wide indices of atoms in this residue
    atom_name_map: HashMap<String, usize>, // Map from atom name to topology-wide index
}

impl Residue {
    pub(crate) fn new(id: ResidueId, name: &str, seq_number: isize, chain_id: char) -> Self {
        Self {
            id,
            name: name.to_string(),
            seq_number,
            chain_id,
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_name: &str, atom_index: usize) {
        self.atoms.push(atom_index);
        self.atom_name_map.insert(atom_name.to_string(), atom_index);
    }

    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }

    pub fn atom_index_by_name(&self, name: &str) -> Option<usize> {
        self.atom_name_map.get(name).copied()
    }

    /// Label used in diagnostics and residue tables, e.g. `"ALA-12"`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.name, self.seq_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_residue_initializes_fields_correctly() {
        let residue = Residue::new(ResidueId(4), "GLY", 10, 'A');
        assert_eq!(residue.id, ResidueId(4));
        assert_eq!(residue.name, "GLY");
        assert_eq!(residue.seq_number, 10);
        assert_eq!(residue.chain_id, 'A');
        assert!(residue.atoms().is_empty());
        assert!(residue.atom_index_by_name("CA").is_none());
    }

    #[test]
    fn add_atom_adds_atom_and_maps_name() {
        let mut residue = Residue::new(ResidueId(0), "ALA", 1, 'A');
        residue.add_atom("CA", 42);
        assert_eq!(residue.atoms(), &[42]);
        assert_eq!(residue.atom_index_by_name("CA"), Some(42));
    }

    #[test]
    fn add_atom_allows_multiple_atoms_with_different_names() {
        let mut residue = Residue::new(ResidueId(1), "SER", 2, 'A');
        residue.add_atom("CA", 1);
        residue.add_atom("CB", 2);
        assert_eq!(residue.atoms(), &[1, 2]);
        assert_eq!(residue.atom_index_by_name("CA"), Some(1));
        assert_eq!(residue.atom_index_by_name("CB"), Some(2));
    }

    #[test]
    fn atom_index_by_name_returns_none_for_unknown_name() {
        let mut residue = Residue::new(ResidueId(2), "LEU", 3, 'A');
        residue.add_atom("CD1", 300);
        assert!(residue.atom_index_by_name("CD2").is_none());
    }

    #[test]
    fn label_combines_name_and_sequence_number() {
        let residue = Residue::new(ResidueId(0), "TRP", 58, 'B');
        assert_eq!(residue.label(), "TRP-58");
    }
}
