use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};

pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - b).norm()
}

pub fn centroid(coords: &[Point3<f64>]) -> Option<Point3<f64>> {
    if coords.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = coords.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / coords.len() as f64))
}

pub fn center_of_mass(coords: &[Point3<f64>], masses: &[f64]) -> Option<Point3<f64>> {
    if coords.is_empty() || coords.len() != masses.len() {
        return None;
    }
    let total_mass: f64 = masses.iter().sum();
    if total_mass <= 0.0 {
        return None;
    }
    let weighted: Vector3<f64> = coords
        .iter()
        .zip(masses.iter())
        .map(|(p, &m)| p.coords * m)
        .sum();
    Some(Point3::from(weighted / total_mass))
}

pub fn radius_of_gyration(coords: &[Point3<f64>], masses: &[f64]) -> Option<f64> {
    let com = center_of_mass(coords, masses)?;
    let total_mass: f64 = masses.iter().sum();
    let weighted_sq: f64 = coords
        .iter()
        .zip(masses.iter())
        .map(|(p, &m)| m * (p - com).norm_squared())
        .sum();
    Some((weighted_sq / total_mass).sqrt())
}

/// Second-moment tensor of the coordinates about `center`, normalized by the
/// atom count. The center is supplied by the caller so a mass-weighted center
/// can be combined with the unweighted tensor.
pub fn gyration_tensor(coords: &[Point3<f64>], center: &Point3<f64>) -> Option<Matrix3<f64>> {
    if coords.is_empty() {
        return None;
    }
    let mut tensor = Matrix3::zeros();
    for p in coords {
        let d = p - center;
        tensor += d * d.transpose();
    }
    Some(tensor / coords.len() as f64)
}

/// Relative shape anisotropy in `[0, 1]`: 0 for a sphere, 1 for a rod.
pub fn asphericity(tensor: &Matrix3<f64>) -> f64 {
    let eigen = SymmetricEigen::new(*tensor);
    let l = eigen.eigenvalues;
    let trace = l[0] + l[1] + l[2];
    if trace == 0.0 {
        return 0.0;
    }
    1.0 - 3.0 * (l[0] * l[1] + l[1] * l[2] + l[2] * l[0]) / (trace * trace)
}

/// RMSD between two conformations of the same atoms after optimal rigid-body
/// superposition (Kabsch). Returns `None` for empty or mismatched inputs, or
/// when the cross-covariance SVD cannot be formed.
pub fn kabsch_rmsd(reference: &[Point3<f64>], target: &[Point3<f64>]) -> Option<f64> {
    if reference.len() != target.len() || reference.is_empty() {
        return None;
    }
    let ref_center = centroid(reference)?;
    let tgt_center = centroid(target)?;

    let mut covariance = Matrix3::zeros();
    for (q, p) in reference.iter().zip(target.iter()) {
        covariance += (q - ref_center) * (p - tgt_center).transpose();
    }

    let svd = covariance.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let sign = (u * v_t).determinant().signum();
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, sign));
    let rotation = u * correction * v_t;

    let n = reference.len() as f64;
    let squared_sum: f64 = reference
        .iter()
        .zip(target.iter())
        .map(|(q, p)| {
            let rotated = rotation * (p - tgt_center);
            (rotated - (q - ref_center)).norm_squared()
        })
        .sum();
    Some((squared_sum / n).sqrt())
}

/// Signed dihedral angle in degrees defined by four points, in `(-180, 180]`.
pub fn dihedral_angle(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    p3: &Point3<f64>,
) -> f64 {
    let b0 = p0 - p1;
    let b1 = (p2 - p1).normalize();
    let b2 = p3 - p2;

    let v = b0 - b1 * b0.dot(&b1);
    let w = b2 - b1 * b2.dot(&b1);

    let x = v.dot(&w);
    let y = b1.cross(&v).dot(&w);
    y.atan2(x).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn center_of_mass_weights_by_mass() {
        let coords = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0)];
        let com = center_of_mass(&coords, &[1.0, 3.0]).unwrap();
        assert!(close(com.x, 3.0));
        assert!(close(com.y, 0.0));
    }

    #[test]
    fn center_of_mass_rejects_degenerate_input() {
        assert!(center_of_mass(&[], &[]).is_none());
        assert!(center_of_mass(&[Point3::origin()], &[1.0, 2.0]).is_none());
        assert!(center_of_mass(&[Point3::origin()], &[0.0]).is_none());
    }

    #[test]
    fn radius_of_gyration_of_symmetric_pair() {
        let coords = vec![Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let rg = radius_of_gyration(&coords, &[1.0, 1.0]).unwrap();
        assert!(close(rg, 1.0));
    }

    #[test]
    fn asphericity_is_zero_for_sphere_and_one_for_rod() {
        let sphere = Matrix3::from_diagonal(&Vector3::new(2.0, 2.0, 2.0));
        assert!(close(asphericity(&sphere), 0.0));

        let rod = Matrix3::from_diagonal(&Vector3::new(5.0, 0.0, 0.0));
        assert!(close(asphericity(&rod), 1.0));

        assert!(close(asphericity(&Matrix3::zeros()), 0.0));
    }

    #[test]
    fn gyration_tensor_of_line_has_single_nonzero_eigenvalue() {
        let coords = vec![
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let center = centroid(&coords).unwrap();
        let tensor = gyration_tensor(&coords, &center).unwrap();
        assert!(close(tensor[(0, 0)], 2.0 / 3.0));
        assert!(close(tensor[(1, 1)], 0.0));
        assert!(close(tensor[(2, 2)], 0.0));
        assert!(close(asphericity(&tensor), 1.0));
    }

    #[test]
    fn kabsch_rmsd_is_zero_under_pure_rotation_and_translation() {
        let reference = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.5, 0.0, 0.0),
            Point3::new(1.5, 2.0, 0.0),
            Point3::new(0.0, 2.0, 1.0),
        ];
        let rotation = Rotation3::from_euler_angles(0.3, -1.1, 2.4);
        let shift = Vector3::new(5.0, -3.0, 7.5);
        let target: Vec<Point3<f64>> = reference
            .iter()
            .map(|p| rotation * p + shift)
            .collect();

        let rmsd = kabsch_rmsd(&reference, &target).unwrap();
        assert!(rmsd < 1e-9, "rmsd was {}", rmsd);
    }

    #[test]
    fn kabsch_rmsd_detects_real_deviation() {
        let reference = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut target = reference.clone();
        target[2] = Point3::new(0.0, 2.0, 0.0);
        let rmsd = kabsch_rmsd(&reference, &target).unwrap();
        assert!(rmsd > 0.1);
    }

    #[test]
    fn dihedral_angle_signs_follow_convention() {
        let p0 = Point3::new(1.0, 0.0, 0.0);
        let p1 = Point3::new(0.0, 0.0, 0.0);
        let p2 = Point3::new(0.0, 1.0, 0.0);

        let cis = dihedral_angle(&p0, &p1, &p2, &Point3::new(1.0, 1.0, 0.0));
        assert!(close(cis, 0.0));

        let trans = dihedral_angle(&p0, &p1, &p2, &Point3::new(-1.0, 1.0, 0.0));
        assert!(close(trans.abs(), 180.0));

        let perp = dihedral_angle(&p0, &p1, &p2, &Point3::new(0.0, 1.0, 1.0));
        assert!(close(perp, -90.0));
    }
}
