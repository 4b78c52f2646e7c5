// THEORY:
// The `Sample` is the most fundamental unit of the engine: one gaze observation
// as delivered by the sensor, plus the handful of fields the detectors derive
// for it. Like every leaf data type in this crate it is a "dumb" container. It
// knows nothing about its neighbours in time; anything that compares two
// samples lives in `kinematics`, and anything that scans a sequence lives in
// the detectors.
//
// Key principles:
// 1.  **Raw fields are immutable by convention**: `time`, `x`, `y` and `status`
//     are what the sensor reported. Detectors only ever write `velocity`,
//     `label` and the two interval indices.
// 2.  **Closed label set**: `GazeLabel` is an exhaustive enum, so the per-sample
//     state machine (UNKNOWN -> SACCADE/NOISE -> BLINK -> FIXATION ->
//     SMOOTH_PURSUIT/NOISE_CLUSTER) can be matched without string comparison.
// 3.  **Decoded status**: the sensor's integer validity code is decoded into
//     `TrackingStatus` once, at construction.

use crate::error::InvalidLabelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type Millis = f64;
pub type Degrees = f64;
pub type DegreesPerSecond = f64;
pub type IntervalIndex = i64;

/// Interval index value for "not inside any interval of that kind".
pub const UNASSIGNED_INTERVAL: IntervalIndex = -1;

/// The event class attached to a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GazeLabel {
    /// Not (yet) classified. Also the terminal state for unclassifiable samples.
    #[default]
    Unknown,
    Fixation,
    Saccade,
    SmoothPursuit,
    Noise,
    Blink,
    /// A pursuit candidate that did not belong to any dense cluster.
    NoiseCluster,
    /// Post-saccadic oscillation. Reserved; no detector assigns it.
    Pso,
}

impl GazeLabel {
    pub const ALL: [GazeLabel; 8] = [
        GazeLabel::Unknown,
        GazeLabel::Fixation,
        GazeLabel::Saccade,
        GazeLabel::SmoothPursuit,
        GazeLabel::Noise,
        GazeLabel::Blink,
        GazeLabel::NoiseCluster,
        GazeLabel::Pso,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Fixation => "FIXATION",
            Self::Saccade => "SACCADE",
            Self::SmoothPursuit => "SMOOTH_PURSUIT",
            Self::Noise => "NOISE",
            Self::Blink => "BLINK",
            Self::NoiseCluster => "NOISE_CLUSTER",
            Self::Pso => "PSO",
        }
    }
}

impl fmt::Display for GazeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GazeLabel {
    type Err = InvalidLabelError;

    /// Accepts the canonical names plus the short `FIX` and `SP` spellings used
    /// by older label columns.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNKNOWN" => Ok(Self::Unknown),
            "FIXATION" | "FIX" => Ok(Self::Fixation),
            "SACCADE" => Ok(Self::Saccade),
            "SMOOTH_PURSUIT" | "SP" => Ok(Self::SmoothPursuit),
            "NOISE" => Ok(Self::Noise),
            "BLINK" => Ok(Self::Blink),
            "NOISE_CLUSTER" => Ok(Self::NoiseCluster),
            "PSO" => Ok(Self::Pso),
            _ => Err(InvalidLabelError(s.to_string())),
        }
    }
}

/// Decoded sensor tracking-validity flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackingStatus {
    /// No usable gaze: eye closed, lost, or a synthetic gap patch.
    Invalid,
    /// The tracker is re-acquiring the eye.
    Adjusting,
    Valid,
}

impl TrackingStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Invalid),
            1 => Some(Self::Adjusting),
            2 => Some(Self::Valid),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Invalid => 0,
            Self::Adjusting => 1,
            Self::Valid => 2,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }
}

/// A single gaze observation together with its derived, detector-owned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Timestamp in milliseconds. Non-decreasing along a series.
    pub time: Millis,
    /// Horizontal gaze angle in degrees.
    pub x: Degrees,
    /// Vertical gaze angle in degrees.
    pub y: Degrees,
    /// Angular speed in degrees per second, written by the saccade detector.
    pub velocity: DegreesPerSecond,
    pub status: TrackingStatus,
    pub label: GazeLabel,
    pub saccade_interval_index: IntervalIndex,
    pub intersaccadic_interval_index: IntervalIndex,
}

impl Sample {
    pub fn new(time: Millis, x: Degrees, y: Degrees, status: TrackingStatus) -> Self {
        Self {
            time,
            x,
            y,
            velocity: 0.0,
            status,
            label: GazeLabel::Unknown,
            saccade_interval_index: UNASSIGNED_INTERVAL,
            intersaccadic_interval_index: UNASSIGNED_INTERVAL,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.label == GazeLabel::Unknown
    }
}
