// THEORY:
// A `PursuitCluster` is the summary of one dense group of leftover samples found
// by the smooth-pursuit pass. Like `Sample`, it is a "dumb" data container: the
// detector builds it once the group is fully grown and nothing mutates it
// afterwards. It exists for reporting and testing; the labels written into the
// series are the authoritative output.

use crate::core_modules::sample::{Degrees, Millis, Sample};
use serde::{Deserialize, Serialize};

/// One density-connected group of samples labelled as smooth pursuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PursuitCluster {
    /// Sequential identifier within one recording, in discovery order.
    pub id: u64,
    /// Series indices of every member, ascending.
    pub sample_indices: Vec<usize>,
    pub start_time: Millis,
    pub end_time: Millis,
    /// Mean gaze position of the members.
    pub centroid: (Degrees, Degrees),
}

impl PursuitCluster {
    /// Summarises the members of a cluster. `indices` must be non-empty.
    pub(crate) fn from_members(id: u64, mut indices: Vec<usize>, samples: &[Sample]) -> Self {
        indices.sort_unstable();

        let count = indices.len().max(1) as f64;
        let (sum_x, sum_y) = indices
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &i| (sx + samples[i].x, sy + samples[i].y));

        let start_time = indices.first().map_or(0.0, |&i| samples[i].time);
        let end_time = indices.last().map_or(0.0, |&i| samples[i].time);

        Self {
            id,
            sample_indices: indices,
            start_time,
            end_time,
            centroid: (sum_x / count, sum_y / count),
        }
    }

    pub fn len(&self) -> usize {
        self.sample_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_indices.is_empty()
    }

    pub fn duration(&self) -> Millis {
        self.end_time - self.start_time
    }
}
