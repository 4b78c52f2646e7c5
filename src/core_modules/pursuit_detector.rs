// THEORY:
// The `SmoothPursuitDetector` is the last pass. Every sample still UNKNOWN after
// saccades, blinks and fixations is either the eye following a moving target or
// noise. Pursuit produces many consecutive samples close together in space, so
// the pass runs a density clustering (DBSCAN) over the leftovers and keeps the
// dense groups.
//
// Algorithm steps:
// 1.  **Candidates**: collect the UNKNOWN samples in time order.
// 2.  **Time slicing**: candidates are bucketed by `time_slice` ms from the
//     recording start. Only candidates in the same or an adjacent bucket can be
//     neighbours, so two visits to the same screen spot far apart in time never
//     merge.
// 3.  **Core points**: a candidate whose `eps`-neighbourhood holds at least
//     `min_pts` candidates, itself included, is a core point.
// 4.  **Region growing**: core points are visited in time order; each one not
//     yet claimed seeds a cluster that grows breadth-first through the
//     neighbourhoods of core members. Border points join the first cluster that
//     reaches them.
// 5.  **Labelling**: cluster members become SMOOTH_PURSUIT and every other
//     candidate NOISE_CLUSTER.

use crate::core_modules::gaze_series::GazeSeries;
use crate::core_modules::kinematics::sample_distance;
use crate::core_modules::pursuit_cluster::PursuitCluster;
use crate::core_modules::sample::{Degrees, GazeLabel, Millis, Sample};
use crate::error::{ValidationError, ensure_positive};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PursuitConfig {
    /// Candidates needed in a core point's neighbourhood, counting the point itself.
    pub min_pts: usize,
    /// Neighbourhood radius in degrees.
    pub eps: Degrees,
    /// Bucket width in ms for the temporal neighbourhood.
    pub time_slice: Millis,
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            min_pts: 3,
            eps: 4.0,
            time_slice: 80.0,
        }
    }
}

impl PursuitConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_pts == 0 {
            return Err(ValidationError::parameter(
                "pursuit.min_pts",
                "must be at least 1",
            ));
        }
        ensure_positive("pursuit.eps", self.eps)?;
        ensure_positive("pursuit.time_slice", self.time_slice)
    }
}

#[derive(Debug, Clone)]
pub struct SmoothPursuitDetector {
    config: PursuitConfig,
}

impl SmoothPursuitDetector {
    pub fn new(config: PursuitConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PursuitConfig {
        &self.config
    }

    pub fn detect(&self, series: GazeSeries) -> GazeSeries {
        self.detect_with_clusters(series).0
    }

    /// Labels pursuit and leftover noise, and returns the clusters found.
    pub fn detect_with_clusters(&self, mut series: GazeSeries) -> (GazeSeries, Vec<PursuitCluster>) {
        let samples = series.samples_mut();

        // --- 1. Candidates ---
        let candidates: Vec<usize> = samples
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_unknown())
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return (series, Vec::new());
        }

        // --- 2 & 3. Neighbourhoods and core points ---
        let neighbours = self.neighbourhoods(samples, &candidates);
        let is_core: Vec<bool> = neighbours
            .iter()
            .map(|n| n.len() + 1 >= self.config.min_pts)
            .collect();

        // --- 4. Region growing ---
        let mut cluster_of: Vec<Option<u64>> = vec![None; candidates.len()];
        let mut members: Vec<Vec<usize>> = Vec::new();

        for seed in 0..candidates.len() {
            if !is_core[seed] || cluster_of[seed].is_some() {
                continue;
            }
            let id = members.len() as u64;
            members.push(grow_cluster(seed, id, &neighbours, &is_core, &mut cluster_of));
        }

        // --- 5. Labelling ---
        for (position, &index) in candidates.iter().enumerate() {
            samples[index].label = match cluster_of[position] {
                Some(_) => GazeLabel::SmoothPursuit,
                None => GazeLabel::NoiseCluster,
            };
        }

        let clusters: Vec<PursuitCluster> = members
            .into_iter()
            .enumerate()
            .map(|(id, positions)| {
                let indices = positions.into_iter().map(|p| candidates[p]).collect();
                PursuitCluster::from_members(id as u64, indices, samples)
            })
            .collect();

        for cluster in &clusters {
            debug!(
                id = cluster.id,
                size = cluster.len(),
                start = cluster.start_time,
                end = cluster.end_time,
                "pursuit cluster"
            );
        }
        let clustered: usize = clusters.iter().map(PursuitCluster::len).sum();
        info!(
            recording = series.name(),
            candidates = candidates.len(),
            clusters = clusters.len(),
            pursuit_samples = clustered,
            noise_samples = candidates.len() - clustered,
            "smooth pursuit detection complete"
        );
        (series, clusters)
    }

    /// Neighbour lists over candidate positions, time-sliced. A point is not
    /// listed as its own neighbour.
    fn neighbourhoods(&self, samples: &[Sample], candidates: &[usize]) -> Vec<Vec<usize>> {
        let origin = samples.first().map_or(0.0, |s| s.time);
        let bucket_of = |index: usize| -> i64 {
            ((samples[index].time - origin) / self.config.time_slice).floor() as i64
        };

        let mut buckets: HashMap<i64, Vec<usize>> = HashMap::new();
        for (position, &index) in candidates.iter().enumerate() {
            buckets.entry(bucket_of(index)).or_default().push(position);
        }

        candidates
            .iter()
            .enumerate()
            .map(|(position, &index)| {
                let bucket = bucket_of(index);
                (bucket - 1..=bucket + 1)
                    .filter_map(|b| buckets.get(&b))
                    .flatten()
                    .copied()
                    .filter(|&other| {
                        other != position
                            && sample_distance(&samples[index], &samples[candidates[other]])
                                <= self.config.eps
                    })
                    .collect()
            })
            .collect()
    }
}

/// Breadth-first expansion from a core point. Returns member positions.
fn grow_cluster(
    seed: usize,
    id: u64,
    neighbours: &[Vec<usize>],
    is_core: &[bool],
    cluster_of: &mut [Option<u64>],
) -> Vec<usize> {
    let mut members = vec![seed];
    let mut queue: VecDeque<usize> = VecDeque::from([seed]);
    cluster_of[seed] = Some(id);

    while let Some(current) = queue.pop_front() {
        for &next in &neighbours[current] {
            if cluster_of[next].is_some() {
                continue;
            }
            cluster_of[next] = Some(id);
            members.push(next);
            // Border points join but do not extend the cluster.
            if is_core[next] {
                queue.push_back(next);
            }
        }
    }
    members
}
