use phf::{Map, Set, phf_map, phf_set};

/// The single reference atom used to represent a residue's backbone position.
pub const MARKER_ATOM_NAME: &str = "CA";

static BACKBONE_ATOM_NAMES: Set<&'static str> = phf_set! {
    "N", "H", "HN", "CA", "HA", "C", "O", "OXT", "H1", "H2", "H3", "NT",
    "HT1", "HT2", "HT3", "OT1", "OT2", "HC", "HOXT", "HA1", "HA2", "1HA", "2HA",
};

static THREE_TO_ONE: Map<&'static str, char> = phf_map! {
    "ALA" => 'A', "ARG" => 'R', "ASN" => 'N', "ASP" => 'D', "CYS" => 'C',
    "GLN" => 'Q', "GLU" => 'E', "GLY" => 'G', "HIS" => 'H', "ILE" => 'I',
    "LEU" => 'L', "LYS" => 'K', "MET" => 'M', "PHE" => 'F', "PRO" => 'P',
    "SER" => 'S', "THR" => 'T', "TRP" => 'W', "TYR" => 'Y', "VAL" => 'V',
    // Protonation-state variants map onto their parent letter.
    "HSD" => 'H', "HSE" => 'H', "HSP" => 'H', "HID" => 'H', "HIE" => 'H',
    "HIP" => 'H', "CYX" => 'C', "ASH" => 'D', "GLH" => 'E', "LYN" => 'K',
};

static ELEMENT_MASSES: Map<&'static str, f64> = phf_map! {
    "H" => 1.008, "D" => 2.014, "C" => 12.011, "N" => 14.007, "O" => 15.999,
    "F" => 18.998, "NA" => 22.990, "MG" => 24.305, "P" => 30.974, "S" => 32.06,
    "CL" => 35.45, "K" => 39.098, "CA" => 40.078, "MN" => 54.938,
    "FE" => 55.845, "CU" => 63.546, "ZN" => 65.38, "SE" => 78.971,
    "BR" => 79.904, "I" => 126.904,
};

pub fn is_backbone_atom(atom_name: &str) -> bool {
    BACKBONE_ATOM_NAMES.contains(atom_name.trim())
}

pub fn is_marker_atom(atom_name: &str) -> bool {
    atom_name.trim() == MARKER_ATOM_NAME
}

pub fn is_heavy_element(element: &str) -> bool {
    !matches!(element.trim().to_ascii_uppercase().as_str(), "H" | "D")
}

pub fn element_mass(element: &str) -> Option<f64> {
    ELEMENT_MASSES
        .get(element.trim().to_ascii_uppercase().as_str())
        .copied()
}

pub fn one_letter_code(residue_name: &str) -> Option<char> {
    THREE_TO_ONE
        .get(residue_name.trim().to_ascii_uppercase().as_str())
        .copied()
}
