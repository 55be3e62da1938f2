//! Multi-objective reward: share of each group's demand a new segment satisfies.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::line_env::LineEnvError;
use crate::models::city::city_model::{DemandModel, Segment};

/// Per-component bounds of the reward vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl RewardSpace {
    /// Every component lies in `[0, 1]`.
    #[must_use]
    pub fn unit(nr_groups: usize) -> Self {
        Self {
            low: vec![0.0; nr_groups],
            high: vec![1.0; nr_groups],
        }
    }

    #[must_use]
    pub fn contains(&self, reward: &[f32]) -> bool {
        reward.len() == self.low.len()
            && reward
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(r, (lo, hi))| (lo..=hi).contains(&r))
    }
}

/// Reward vector for building `segment`.
///
/// A segment already in `covered_segments` earns nothing. Otherwise each
/// group gets the fraction of its total demand the segment newly satisfies.
/// A group with no demand at all gets 0.
///
/// # Errors
///
/// [`LineEnvError::DemandSizeMismatch`] if the satisfied-OD mask of the
/// model does not cover the same OD space as a group matrix.
#[must_use = "the reward is the only output"]
pub fn group_rewards<M: DemandModel>(
    model: &M,
    segment: Segment,
    covered_segments: &HashSet<Segment>,
) -> Result<Vec<f32>, LineEnvError> {
    let groups = model.group_od_matrices();
    if covered_segments.contains(&segment) {
        return Ok(vec![0.0; groups.len()]);
    }

    let sat_od_mask = model.satisfied_od_mask(segment);
    groups
        .iter()
        .enumerate()
        .map(|(group, g_od)| {
            let satisfied = g_od.masked_sum(&sat_od_mask).ok_or(
                LineEnvError::DemandSizeMismatch {
                    group,
                    expected: g_od.size(),
                    got: sat_od_mask.size(),
                },
            )?;
            let total = g_od.total();
            Ok(if total > 0.0 {
                (satisfied / total).clamp(0.0, 1.0)
            } else {
                0.0
            })
        })
        .collect()
}
