use super::topology::Topology;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("Frame {frame} has {actual} coordinates but the topology has {expected} atoms")]
    FrameSizeMismatch {
        frame: usize,
        expected: usize,
        actual: usize,
    },

    #[error("A trajectory requires at least one frame")]
    Empty,
}

/// A conformational ensemble: one topology plus a stack of coordinate frames.
///
/// Every frame holds one `Point3` per topology atom, in topology order, in
/// Angstrom. The trajectory is immutable after construction; analyses that
/// subsample frames do so through stride-aware index iteration rather than by
/// copying coordinate data.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    topology: Topology,
    frames: Vec<Vec<Point3<f64>>>,
}

impl Trajectory {
    /// Creates a trajectory, validating that every frame matches the topology.
    ///
    /// # Errors
    ///
    /// Returns [`TrajectoryError::Empty`] when no frames are given, and
    /// [`TrajectoryError::FrameSizeMismatch`] when any frame's coordinate
    /// count differs from the topology's atom count.
    pub fn new(topology: Topology, frames: Vec<Vec<Point3<f64>>>) -> Result<Self, TrajectoryError> {
        if frames.is_empty() {
            return Err(TrajectoryError::Empty);
        }
        let expected = topology.num_atoms();
        for (frame, coords) in frames.iter().enumerate() {
            if coords.len() != expected {
                return Err(TrajectoryError::FrameSizeMismatch {
                    frame,
                    expected,
                    actual: coords.len(),
                });
            }
        }
        Ok(Self { topology, frames })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&[Point3<f64>]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    pub fn coord(&self, frame: usize, atom: usize) -> Option<Point3<f64>> {
        self.frames.get(frame).and_then(|coords| coords.get(atom)).copied()
    }

    /// Positions of one atom across every frame, or `None` for an atom index
    /// outside the topology.
    pub fn atom_series(&self, atom: usize) -> Option<Vec<Point3<f64>>> {
        if atom >= self.topology.num_atoms() {
            return None;
        }
        Some(self.frames.iter().map(|coords| coords[atom]).collect())
    }

    /// Iterates frame indices `0, stride, 2*stride, ...`; a stride of 0 is
    /// treated as 1.
    pub fn frame_indices(&self, stride: usize) -> impl Iterator<Item = usize> + use<> {
        (0..self.frames.len()).step_by(stride.max(1))
    }

    /// Number of frames an analysis at this stride will visit.
    pub fn n_frames_with_stride(&self, stride: usize) -> usize {
        let stride = stride.max(1);
        self.frames.len().div_ceil(stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::topology::TopologyBuilder;

    fn one_atom_topology() -> Topology {
        let mut builder = TopologyBuilder::new();
        builder.start_residue("GLY", 1, 'A').add_atom(1, "CA", "C");
        builder.build()
    }

    #[test]
    fn new_rejects_empty_frame_stack() {
        let result = Trajectory::new(one_atom_topology(), Vec::new());
        assert!(matches!(result, Err(TrajectoryError::Empty)));
    }

    #[test]
    fn new_rejects_frame_with_wrong_atom_count() {
        let frames = vec![
            vec![Point3::new(0.0, 0.0, 0.0)],
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
        ];
        let result = Trajectory::new(one_atom_topology(), frames);
        assert!(matches!(
            result,
            Err(TrajectoryError::FrameSizeMismatch {
                frame: 1,
                expected: 1,
                actual: 2,
            })
        ));
    }

    #[test]
    fn coord_returns_per_frame_positions() {
        let frames = vec![
            vec![Point3::new(0.0, 0.0, 0.0)],
            vec![Point3::new(1.0, 2.0, 3.0)],
        ];
        let trajectory = Trajectory::new(one_atom_topology(), frames).unwrap();
        assert_eq!(trajectory.n_frames(), 2);
        assert_eq!(trajectory.coord(1, 0), Some(Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(trajectory.coord(2, 0), None);
        assert_eq!(trajectory.coord(0, 1), None);
    }

    #[test]
    fn atom_series_tracks_one_atom_across_frames() {
        let frames = vec![
            vec![Point3::new(0.0, 0.0, 0.0)],
            vec![Point3::new(1.0, 2.0, 3.0)],
        ];
        let trajectory = Trajectory::new(one_atom_topology(), frames).unwrap();
        let series = trajectory.atom_series(0).unwrap();
        assert_eq!(series[1], Point3::new(1.0, 2.0, 3.0));
        assert!(trajectory.atom_series(1).is_none());
    }

    #[test]
    fn frame_indices_respect_stride() {
        let frames = vec![vec![Point3::origin()]; 7];
        let trajectory = Trajectory::new(one_atom_topology(), frames).unwrap();
        let strided: Vec<usize> = trajectory.frame_indices(3).collect();
        assert_eq!(strided, vec![0, 3, 6]);
        assert_eq!(trajectory.n_frames_with_stride(3), 3);
        assert_eq!(trajectory.n_frames_with_stride(1), 7);
        assert_eq!(trajectory.n_frames_with_stride(0), 7);
    }
}
