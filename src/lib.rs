// THEORY:
// This file is the entry point of the `gaze_events` library crate. It exposes
// the `GazePipeline`, which turns a raw eye-tracking recording into a labelled
// one (fixations, saccades, smooth pursuit, blinks, noise), together with the
// data types it consumes and produces.
//
// The detectors live in `core_modules` and can be used one at a time, but the
// pipeline is the intended interface: the passes only make sense in their fixed
// order. `parallel_pipeline` adds a tokio worker pool for classifying many
// recordings at once.
//
// The library never installs a tracing subscriber; that is left to binaries.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use core_modules::gaze_event::{GazeEvent, events_with_label, extract_events};
pub use core_modules::gaze_series::{GazeSeries, RawGazeRecord};
pub use core_modules::pursuit_cluster::PursuitCluster;
pub use core_modules::sample::{GazeLabel, Sample, TrackingStatus};
pub use core_modules::utils::gap_filler::fill_tracking_gaps;
pub use error::{InvalidLabelError, PipelineError, PipelineResult, ValidationError};
pub use parallel_pipeline::BatchPipeline;
pub use pipeline::{Classification, GazePipeline, PipelineConfig};
