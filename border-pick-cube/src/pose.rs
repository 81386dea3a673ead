//! Batched poses.
//!
//! Quaternions are stored as `[w, x, y, z]`.
use anyhow::Result;
use border_core::error::BorderError;
use nalgebra::{UnitQuaternion, Vector3};
use ndarray::{concatenate, s, Array1, Array2, ArrayView2, Axis};

/// Identity rotation.
pub const IDENTITY_QUAT: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

/// Positions and orientations of a batch of bodies, one row per environment instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Pose {
    /// Positions, shape `[b, 3]`.
    pub p: Array2<f32>,

    /// Orientations, shape `[b, 4]`.
    pub q: Array2<f32>,
}

impl Pose {
    /// Creates a batched pose from positions and quaternions.
    ///
    /// Panics if the shapes are not `[b, 3]` and `[b, 4]`.
    pub fn from_pq(p: Array2<f32>, q: Array2<f32>) -> Self {
        assert_eq!(p.ncols(), 3);
        assert_eq!(q.ncols(), 4);
        assert_eq!(p.nrows(), q.nrows());
        Self { p, q }
    }

    /// Creates a batched pose with identity orientations.
    pub fn from_p(p: Array2<f32>) -> Self {
        let q = identity_quats(p.nrows());
        Self::from_pq(p, q)
    }

    /// A pose of a single body.
    pub fn single(p: [f32; 3], q: [f32; 4]) -> Self {
        Self::repeat(p, q, 1)
    }

    /// `b` copies of the same pose.
    pub fn repeat(p: [f32; 3], q: [f32; 4], b: usize) -> Self {
        Self {
            p: Array2::from_shape_fn((b, 3), |(_, j)| p[j]),
            q: Array2::from_shape_fn((b, 4), |(_, j)| q[j]),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.p.nrows()
    }

    /// Returns `true` if the pose has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows at the given positions, in that order.
    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            p: self.p.select(Axis(0), rows),
            q: self.q.select(Axis(0), rows),
        }
    }

    /// Concatenates poses along the batch dimension.
    pub fn stack(poses: &[Pose]) -> Result<Self> {
        let ps: Vec<_> = poses.iter().map(|pose| pose.p.view()).collect();
        let qs: Vec<_> = poses.iter().map(|pose| pose.q.view()).collect();
        Ok(Self {
            p: concatenate(Axis(0), &ps)?,
            q: concatenate(Axis(0), &qs)?,
        })
    }

    /// Overwrites `rows` of `self` with the rows of `src`, in order.
    pub fn assign_rows(&mut self, rows: &[usize], src: &Pose) -> Result<()> {
        if rows.len() != src.len() {
            return Err(BorderError::BatchSizeMismatch {
                name: "pose".to_string(),
                expected: rows.len(),
                actual: src.len(),
            }
            .into());
        }
        for (r, &i) in rows.iter().enumerate() {
            if i >= self.len() {
                return Err(BorderError::InvalidEnvIndex {
                    index: i,
                    num_envs: self.len(),
                }
                .into());
            }
            self.p.row_mut(i).assign(&src.p.row(r));
            self.q.row_mut(i).assign(&src.q.row(r));
        }
        Ok(())
    }
}

/// `b` identity quaternions.
pub fn identity_quats(b: usize) -> Array2<f32> {
    let mut q = Array2::zeros((b, 4));
    q.slice_mut(s![.., 0]).fill(1.0);
    q
}

/// `[w, x, y, z]` coefficients of a unit quaternion.
pub fn to_wxyz(q: &UnitQuaternion<f32>) -> [f32; 4] {
    [q.w, q.i, q.j, q.k]
}

/// Rotation by `yaw` radians about the vertical axis.
pub fn yaw_quat(yaw: f32) -> [f32; 4] {
    to_wxyz(&UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw))
}

/// Euclidean norm of every row.
pub fn row_norms(a: ArrayView2<f32>) -> Array1<f32> {
    a.map_axis(Axis(1), |row| row.dot(&row).sqrt())
}

/// Euclidean distance between matching rows of two position batches.
pub fn row_distances(a: ArrayView2<f32>, b: ArrayView2<f32>) -> Array1<f32> {
    row_norms((&a - &b).view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_row_distances() {
        let a = array![[0.0f32, 0.0, 0.0], [1.0, 2.0, 2.0]];
        let b = array![[3.0f32, 4.0, 0.0], [1.0, 2.0, 2.0]];
        assert_eq!(row_distances(a.view(), b.view()), array![5.0f32, 0.0]);
    }

    #[test]
    fn test_yaw_quat_is_unit_and_vertical() {
        for k in 0..16 {
            let q = yaw_quat(k as f32 * 0.4);
            let n = q.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((n - 1.0).abs() < 1e-6);
            assert_eq!(q[1], 0.0);
            assert_eq!(q[2], 0.0);
        }

        let q = yaw_quat(std::f32::consts::FRAC_PI_2);
        let rot =
            UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(q[0], q[1], q[2], q[3]));
        assert!((rot * Vector3::x() - Vector3::y()).norm() < 1e-6);
    }

    #[test]
    fn test_select_stack_assign() -> Result<()> {
        let pose = Pose::from_p(array![[0.0f32, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]);
        let sub = pose.select(&[2, 0]);
        assert_eq!(sub.p, array![[2.0f32, 2.0, 2.0], [0.0, 0.0, 0.0]]);

        let stacked = Pose::stack(&[pose.select(&[0]), pose.select(&[1]), pose.select(&[2])])?;
        assert_eq!(stacked, pose);

        let mut target = Pose::repeat([9.0, 9.0, 9.0], IDENTITY_QUAT, 3);
        target.assign_rows(&[1], &pose.select(&[2]))?;
        assert_eq!(target.p.row(1), array![2.0f32, 2.0, 2.0]);
        assert_eq!(target.p.row(0), array![9.0f32, 9.0, 9.0]);
        assert!(target.assign_rows(&[3], &pose.select(&[0])).is_err());
        Ok(())
    }
}
