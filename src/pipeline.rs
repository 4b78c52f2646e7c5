// THEORY:
// The `pipeline` module is the top-level API of the classification engine. It
// owns one instance of each detector and runs them in their fixed order over a
// single recording:
//
//     saccades -> blinks -> fixations -> smooth pursuit
//
// The order is part of the algorithm, not a convenience. Blinks need the
// saccades, fixations need the intersaccadic intervals, and smooth pursuit is
// defined as "whatever is left". Each pass takes the series by value and hands
// it to the next, so there is never more than one owner of a recording.
//
// All configuration is validated once, when the pipeline is built. After that
// classification cannot fail.

use crate::core_modules::blink_detector::{BlinkConfig, BlinkDetector};
use crate::core_modules::fixation_detector::{FixationConfig, FixationDetector};
use crate::core_modules::gaze_event::{GazeEvent, extract_events};
use crate::core_modules::gaze_series::{GazeSeries, RawGazeRecord};
use crate::core_modules::pursuit_cluster::PursuitCluster;
use crate::core_modules::pursuit_detector::{PursuitConfig, SmoothPursuitDetector};
use crate::core_modules::saccade_detector::{SaccadeConfig, SaccadeDetector};
use crate::error::{PipelineResult, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Parameters for all four detectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub saccade: SaccadeConfig,
    pub blink: BlinkConfig,
    pub fixation: FixationConfig,
    pub pursuit: PursuitConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.saccade.validate()?;
        self.blink.validate()?;
        self.fixation.validate()?;
        self.pursuit.validate()
    }

    /// Parses and validates a JSON configuration. Missing sections and fields
    /// fall back to their defaults.
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// A fully classified recording together with the pursuit clusters found in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub series: GazeSeries,
    pub pursuit_clusters: Vec<PursuitCluster>,
}

impl Classification {
    pub fn events(&self) -> Vec<GazeEvent> {
        extract_events(&self.series)
    }
}

/// Runs the four detection passes over one recording.
#[derive(Debug, Clone)]
pub struct GazePipeline {
    saccades: SaccadeDetector,
    blinks: BlinkDetector,
    fixations: FixationDetector,
    pursuits: SmoothPursuitDetector,
}

impl GazePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ValidationError> {
        let PipelineConfig {
            saccade,
            blink,
            fixation,
            pursuit,
        } = config;

        Ok(Self {
            saccades: SaccadeDetector::new(saccade)?,
            blinks: BlinkDetector::new(blink)?,
            fixations: FixationDetector::new(fixation)?,
            pursuits: SmoothPursuitDetector::new(pursuit)?,
        })
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            saccade: self.saccades.config().clone(),
            blink: self.blinks.config().clone(),
            fixation: self.fixations.config().clone(),
            pursuit: self.pursuits.config().clone(),
        }
    }

    /// Labels every sample of `series`.
    pub fn classify(&self, series: GazeSeries) -> GazeSeries {
        self.classify_detailed(series).series
    }

    /// Like `classify`, also returning the pursuit clusters.
    pub fn classify_detailed(&self, series: GazeSeries) -> Classification {
        info!(recording = series.name(), samples = series.len(), "classifying recording");

        let series = self.saccades.detect(series);
        let series = self.blinks.detect(series);
        let series = self.fixations.detect(series);
        let (series, pursuit_clusters) = self.pursuits.detect_with_clusters(series);

        Classification {
            series,
            pursuit_clusters,
        }
    }

    /// Validates raw records into a series and classifies it.
    pub fn classify_records(
        &self,
        name: impl Into<String>,
        records: &[RawGazeRecord],
    ) -> Result<GazeSeries, ValidationError> {
        let series = GazeSeries::from_records(name, records)?;
        Ok(self.classify(series))
    }
}
