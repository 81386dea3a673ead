//! Observation and action of [`PickCubeEnv`](crate::PickCubeEnv).
use anyhow::Result;
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Observation mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObsMode {
    /// Proprioception and the grasp flag only.
    None,
    /// All fields flattened into one array per environment.
    #[default]
    State,
    /// All fields kept as named arrays.
    StateDict,
}

impl ObsMode {
    /// Whether the observation includes the relative cube and goal positions.
    pub fn has_task_state(&self) -> bool {
        matches!(self, Self::State | Self::StateDict)
    }
}

/// Observation of the pick-and-place task.
#[derive(Clone, Debug, PartialEq)]
pub struct PickCubeObs {
    /// Joint positions, `[B, dof]`.
    pub qpos: Array2<f32>,

    /// Joint velocities, `[B, dof]`.
    pub qvel: Array2<f32>,

    /// 1 if the robot grasps the cube, `[B]`.
    pub is_grasped: Array1<f32>,

    /// Cube position relative to the tool center point, `[B, 3]`.
    pub tcp_to_obj_pos: Option<Array2<f32>>,

    /// Goal position relative to the cube, `[B, 3]`.
    pub obj_to_goal_pos: Option<Array2<f32>>,
}

impl border_core::Obs for PickCubeObs {
    fn len(&self) -> usize {
        self.qpos.nrows()
    }
}

impl PickCubeObs {
    /// Named fields, in flattening order.
    pub fn fields(&self) -> Vec<(&'static str, ArrayView2<f32>)> {
        let mut fields = vec![
            ("qpos", self.qpos.view()),
            ("qvel", self.qvel.view()),
            ("is_grasped", self.is_grasped.view().insert_axis(Axis(1))),
        ];
        if let Some(v) = &self.tcp_to_obj_pos {
            fields.push(("tcp_to_obj_pos", v.view()));
        }
        if let Some(v) = &self.obj_to_goal_pos {
            fields.push(("obj_to_goal_pos", v.view()));
        }
        fields
    }

    /// All fields concatenated along the feature axis, `[B, D]`.
    pub fn flatten(&self) -> Result<Array2<f32>> {
        let views: Vec<_> = self.fields().into_iter().map(|(_, v)| v).collect();
        Ok(concatenate(Axis(1), &views)?)
    }

    /// Observations of the given rows, in that order.
    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            qpos: self.qpos.select(Axis(0), rows),
            qvel: self.qvel.select(Axis(0), rows),
            is_grasped: self.is_grasped.select(Axis(0), rows),
            tcp_to_obj_pos: self
                .tcp_to_obj_pos
                .as_ref()
                .map(|v| v.select(Axis(0), rows)),
            obj_to_goal_pos: self
                .obj_to_goal_pos
                .as_ref()
                .map(|v| v.select(Axis(0), rows)),
        }
    }
}

/// Action of the pick-and-place task, `[B, action_dim]`.
#[derive(Clone, Debug, PartialEq)]
pub struct PickCubeAct {
    /// Raw controller targets.
    pub action: Array2<f32>,
}

impl border_core::Act for PickCubeAct {
    fn len(&self) -> usize {
        self.action.nrows()
    }
}

impl From<Array2<f32>> for PickCubeAct {
    fn from(action: Array2<f32>) -> Self {
        Self { action }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use border_core::Obs;
    use ndarray::array;

    fn obs(task_state: bool) -> PickCubeObs {
        PickCubeObs {
            qpos: array![[0.1f32, 0.2], [0.3, 0.4]],
            qvel: array![[1.0f32, 2.0], [3.0, 4.0]],
            is_grasped: array![1.0f32, 0.0],
            tcp_to_obj_pos: task_state.then(|| array![[0.0f32, 0.0, 1.0], [0.0, 1.0, 0.0]]),
            obj_to_goal_pos: task_state.then(|| array![[5.0f32, 5.0, 5.0], [6.0, 6.0, 6.0]]),
        }
    }

    #[test]
    fn test_flatten_order() -> Result<()> {
        let flat = obs(true).flatten()?;
        assert_eq!(flat.shape(), &[2, 2 + 2 + 1 + 3 + 3]);
        assert_eq!(
            flat.row(0),
            array![0.1f32, 0.2, 1.0, 2.0, 1.0, 0.0, 0.0, 1.0, 5.0, 5.0, 5.0]
        );

        let names: Vec<_> = obs(false).fields().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["qpos", "qvel", "is_grasped"]);
        assert_eq!(obs(false).flatten()?.ncols(), 5);
        Ok(())
    }

    #[test]
    fn test_select_rows() {
        let o = obs(true);
        let sub = o.select(&[1]);
        assert_eq!(sub.len(), 1);
        assert_eq!(sub.is_grasped, array![0.0f32]);
        assert_eq!(sub.obj_to_goal_pos, Some(array![[6.0f32, 6.0, 6.0]]));
    }

    #[test]
    fn test_obs_mode() {
        assert!(!ObsMode::None.has_task_state());
        assert!(ObsMode::State.has_task_state());
        assert!(ObsMode::StateDict.has_task_state());
        assert_eq!(ObsMode::default(), ObsMode::State);
    }
}
