use crate::core::io::traits::TrajectoryFile;
use crate::core::models::topology::{Topology, TopologyBuilder};
use crate::core::models::trajectory::{Trajectory, TrajectoryError};
use nalgebra::Point3;
use std::io::{self, BufRead};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    /// Concatenated `TITLE` record text, if any.
    pub title: Option<String>,
    /// The `MODEL` serial of every frame, in file order. A file without
    /// `MODEL` records yields a single synthetic serial of 1.
    pub model_numbers: Vec<isize>,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
    #[error("File contains no atoms")]
    NoAtoms,
    #[error("Trajectory assembly failed: {0}")]
    Trajectory(#[from] TrajectoryError),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short for an ATOM/HETATM record (coordinates end at column 54)")]
    LineTooShort,
    #[error("Model {model} has {actual} atoms but the first model has {expected}")]
    ModelSizeMismatch {
        model: isize,
        expected: usize,
        actual: usize,
    },
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

/// Derives an element symbol from an atom name when the element columns are
/// blank: the first alphabetic character, so `"CA"` reads as carbon and
/// `"1HB"` as hydrogen.
fn element_from_name(name: &str) -> String {
    name.chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}

/// Multi-model PDB reader.
///
/// The first model defines the topology; every subsequent model contributes
/// one coordinate frame and must present the same number of atoms. Files
/// without `MODEL`/`ENDMDL` records are read as a single frame. Alternate
/// locations other than `' '` and `'A'` are skipped, and `TER`, `ANISOU`,
/// and other non-coordinate records are ignored.
pub struct PdbFile;

struct ReadState {
    builder: Option<TopologyBuilder>,
    topology: Option<Topology>,
    frames: Vec<Vec<Point3<f64>>>,
    current: Vec<Point3<f64>>,
    current_model: Option<isize>,
    model_numbers: Vec<isize>,
    last_residue_key: Option<(char, isize, char)>,
}

impl ReadState {
    fn new() -> Self {
        Self {
            builder: Some(TopologyBuilder::new()),
            topology: None,
            frames: Vec::new(),
            current: Vec::new(),
            current_model: None,
            model_numbers: Vec::new(),
            last_residue_key: None,
        }
    }

    fn flush_frame(&mut self, line: usize) -> Result<(), PdbError> {
        if self.current.is_empty() {
            self.current_model = None;
            return Ok(());
        }
        if let Some(builder) = self.builder.take() {
            self.topology = Some(builder.build());
        }
        let expected = self
            .topology
            .as_ref()
            .map(Topology::num_atoms)
            .unwrap_or(0);
        if self.current.len() != expected {
            return Err(PdbError::Parse {
                line,
                kind: PdbParseErrorKind::ModelSizeMismatch {
                    model: self.current_model.unwrap_or(-1),
                    expected,
                    actual: self.current.len(),
                },
            });
        }
        let model = self
            .current_model
            .take()
            .unwrap_or(self.frames.len() as isize + 1);
        self.model_numbers.push(model);
        self.frames.push(std::mem::take(&mut self.current));
        Ok(())
    }
}

impl TrajectoryFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Trajectory, Self::Metadata), Self::Error> {
        let mut state = ReadState::new();
        let mut title_parts: Vec<String> = Vec::new();
        let mut line_num = 0;

        for line_res in reader.lines() {
            let line = line_res?;
            line_num += 1;

            let record_type = slice_and_trim(&line, 0, 6);
            match record_type {
                "ATOM" | "HETATM" => {
                    parse_atom_record(&line, line_num, &mut state)?;
                }
                "MODEL" => {
                    // Tolerates files that omit ENDMDL between models.
                    state.flush_frame(line_num)?;
                    let serial_str = slice_and_trim(&line, 6, 14);
                    let serial = if serial_str.is_empty() {
                        state.frames.len() as isize + 1
                    } else {
                        serial_str.parse().map_err(|_| PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::InvalidInt {
                                columns: "11-14".into(),
                                value: serial_str.into(),
                            },
                        })?
                    };
                    state.current_model = Some(serial);
                }
                "ENDMDL" => {
                    state.flush_frame(line_num)?;
                }
                "TITLE" => {
                    let text = slice_and_trim(&line, 10, line.len());
                    if !text.is_empty() {
                        title_parts.push(text.to_string());
                    }
                }
                _ => {}
            }
        }

        state.flush_frame(line_num)?;

        let topology = state.topology.ok_or(PdbError::NoAtoms)?;
        if topology.num_atoms() == 0 {
            return Err(PdbError::NoAtoms);
        }
        let trajectory = Trajectory::new(topology, state.frames)?;

        let metadata = PdbMetadata {
            title: if title_parts.is_empty() {
                None
            } else {
                Some(title_parts.join(" "))
            },
            model_numbers: state.model_numbers,
        };
        Ok((trajectory, metadata))
    }
}

fn parse_atom_record(line: &str, line_num: usize, state: &mut ReadState) -> Result<(), PdbError> {
    if line.len() < 54 {
        return Err(PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::LineTooShort,
        });
    }

    let alt_loc = line.get(16..17).unwrap_or(" ").chars().next().unwrap_or(' ');
    if alt_loc != ' ' && alt_loc != 'A' {
        return Ok(());
    }

    let x_str = slice_and_trim(line, 30, 38);
    let y_str = slice_and_trim(line, 38, 46);
    let z_str = slice_and_trim(line, 46, 54);
    let x: f64 = x_str.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: "31-38".into(),
            value: x_str.into(),
        },
    })?;
    let y: f64 = y_str.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: "39-46".into(),
            value: y_str.into(),
        },
    })?;
    let z: f64 = z_str.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: "47-54".into(),
            value: z_str.into(),
        },
    })?;

    if let Some(builder) = state.builder.as_mut() {
        let serial_str = slice_and_trim(line, 6, 11);
        let serial: usize = serial_str.parse().map_err(|_| PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::InvalidInt {
                columns: "7-11".into(),
                value: serial_str.into(),
            },
        })?;
        let name = slice_and_trim(line, 12, 16);
        let res_name = slice_and_trim(line, 17, 20);
        let chain_id = line.get(21..22).and_then(|s| s.chars().next()).unwrap_or('A');
        let res_seq_str = slice_and_trim(line, 22, 26);
        let res_seq: isize = res_seq_str.parse().map_err(|_| PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::InvalidInt {
                columns: "23-26".into(),
                value: res_seq_str.into(),
            },
        })?;
        let insertion_code = line.get(26..27).and_then(|s| s.chars().next()).unwrap_or(' ');
        let element_str = slice_and_trim(line, 76, 78);
        let element = if element_str.is_empty() {
            element_from_name(name)
        } else {
            element_str.to_string()
        };

        let residue_key = (chain_id, res_seq, insertion_code);
        if state.last_residue_key != Some(residue_key) {
            builder.start_residue(res_name, res_seq, chain_id);
            state.last_residue_key = Some(residue_key);
        }
        builder.add_atom(serial, name, &element);
    }

    state.current.push(Point3::new(x, y, z));
    Ok(())
}
