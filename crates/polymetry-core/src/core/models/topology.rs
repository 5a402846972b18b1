use super::atom::Atom;
use super::ids::ResidueId;
use super::residue::Residue;
use super::selection::{AtomScope, Selection};

/// The static structure of an ensemble: every atom and residue, in file order.
///
/// Residues are stored densely, so a [`ResidueId`] is simply a position in the
/// residue list. The topology never changes after construction; all per-frame
/// data lives in the owning [`Trajectory`](super::trajectory::Trajectory).
///
/// Name-based atom resolution ([`Topology::atom_indices_named`]) scans the
/// residue's atoms rather than using a map, so duplicate atom names (a
/// malformed-input condition the analysis layer must detect) remain visible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    atoms: Vec<Atom>,
    residues: Vec<Residue>,
}

impl Topology {
    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_residues(&self) -> usize {
        self.residues.len()
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id.value())
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    /// Returns the topology-wide atom indices of a residue, in file order.
    pub fn atom_indices_for_residue(&self, id: ResidueId) -> Option<&[usize]> {
        self.residue(id).map(|residue| residue.atoms())
    }

    /// Returns every atom index in the residue whose name matches exactly.
    ///
    /// The result may hold more than one index if the source file repeated an
    /// atom name within the residue; callers that require uniqueness must
    /// check the length.
    pub fn atom_indices_named(&self, id: ResidueId, name: &str) -> Option<Vec<usize>> {
        self.residue(id).map(|residue| {
            residue
                .atoms()
                .iter()
                .copied()
                .filter(|&atom_index| self.atoms[atom_index].name == name)
                .collect()
        })
    }

    /// Resolves a selection to topology-wide atom indices, in file order.
    ///
    /// Residue ids outside the topology are ignored rather than an error, so
    /// a selection built from a sparser residue set resolves to whatever
    /// exists.
    pub fn select(&self, selection: &Selection) -> Vec<usize> {
        let first = selection.first.value();
        let last = selection.last.value().min(self.residues.len().saturating_sub(1));
        let mut indices = Vec::new();
        if self.residues.is_empty() || first > last {
            return indices;
        }
        for residue in &self.residues[first..=last] {
            for &atom_index in residue.atoms() {
                let atom = &self.atoms[atom_index];
                let keep = match &selection.scope {
                    AtomScope::All => true,
                    AtomScope::Backbone => atom.is_backbone(),
                    AtomScope::Heavy => atom.is_heavy(),
                    AtomScope::Named(name) => &atom.name == name,
                };
                if keep {
                    indices.push(atom_index);
                }
            }
        }
        indices
    }
}

/// Incremental constructor for [`Topology`], used by file parsers and tests.
///
/// The builder appends; deciding where one residue ends and the next begins
/// is the caller's job (file parsers track record boundaries themselves).
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    topology: Topology,
    current_residue: Option<usize>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new residue; subsequent [`TopologyBuilder::add_atom`] calls
    /// attach to it.
    pub fn start_residue(&mut self, name: &str, seq_number: isize, chain_id: char) -> &mut Self {
        let id = ResidueId(self.topology.residues.len());
        self.topology
            .residues
            .push(Residue::new(id, name, seq_number, chain_id));
        self.current_residue = Some(id.value());
        self
    }

    pub fn add_atom(&mut self, serial: usize, name: &str, element: &str) -> &mut Self {
        let residue_index = self
            .current_residue
            .expect("Must start a residue before adding an atom");
        let residue_id = ResidueId(residue_index);
        let atom_index = self.topology.atoms.len();
        self.topology
            .atoms
            .push(Atom::new(serial, name, element, residue_id));
        self.topology.residues[residue_index].add_atom(name, atom_index);
        self
    }

    pub fn build(self) -> Topology {
        self.topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_residue_topology() -> Topology {
        let mut builder = TopologyBuilder::new();
        builder
            .start_residue("ALA", 1, 'A')
            .add_atom(1, "N", "N")
            .add_atom(2, "CA", "C")
            .add_atom(3, "HA", "H")
            .add_atom(4, "C", "C")
            .start_residue("GLY", 2, 'A')
            .add_atom(5, "N", "N")
            .add_atom(6, "CA", "C")
            .add_atom(7, "C", "C")
            .add_atom(8, "O", "O");
        builder.build()
    }

    #[test]
    fn builder_assigns_dense_residue_ids_and_atom_indices() {
        let topology = two_residue_topology();
        assert_eq!(topology.num_residues(), 2);
        assert_eq!(topology.num_atoms(), 8);
        assert_eq!(topology.residue(ResidueId(0)).unwrap().name, "ALA");
        assert_eq!(topology.residue(ResidueId(1)).unwrap().name, "GLY");
        assert_eq!(
            topology.atom_indices_for_residue(ResidueId(1)).unwrap(),
            &[4, 5, 6, 7]
        );
        assert_eq!(topology.atom(4).unwrap().residue_id, ResidueId(1));
    }

    #[test]
    fn atom_indices_named_finds_exact_matches_only() {
        let topology = two_residue_topology();
        assert_eq!(
            topology.atom_indices_named(ResidueId(0), "CA").unwrap(),
            vec![1]
        );
        assert!(
            topology
                .atom_indices_named(ResidueId(0), "CB")
                .unwrap()
                .is_empty()
        );
        assert!(topology.atom_indices_named(ResidueId(9), "CA").is_none());
    }

    #[test]
    fn atom_indices_named_reports_duplicates() {
        let mut builder = TopologyBuilder::new();
        builder
            .start_residue("ALA", 1, 'A')
            .add_atom(1, "CA", "C")
            .add_atom(2, "CA", "C");
        let topology = builder.build();
        assert_eq!(
            topology.atom_indices_named(ResidueId(0), "CA").unwrap(),
            vec![0, 1]
        );
    }

    #[test]
    fn select_honors_range_and_scope() {
        let topology = two_residue_topology();

        let all = topology.select(&Selection::residues(ResidueId(0), ResidueId(1)));
        assert_eq!(all.len(), 8);

        let first_only = topology.select(&Selection::residues(ResidueId(0), ResidueId(0)));
        assert_eq!(first_only, vec![0, 1, 2, 3]);

        let heavy = topology.select(
            &Selection::residues(ResidueId(0), ResidueId(0)).with_scope(AtomScope::Heavy),
        );
        assert_eq!(heavy, vec![0, 1, 3]);

        let named = topology.select(
            &Selection::residues(ResidueId(0), ResidueId(1))
                .with_scope(AtomScope::Named("CA".to_string())),
        );
        assert_eq!(named, vec![1, 5]);
    }

    #[test]
    fn select_clamps_out_of_range_residues() {
        let topology = two_residue_topology();
        let clamped = topology.select(&Selection::residues(ResidueId(0), ResidueId(40)));
        assert_eq!(clamped.len(), 8);
        let empty = topology.select(&Selection::residues(ResidueId(5), ResidueId(9)));
        assert!(empty.is_empty());
    }
}
