pub mod blink_detector;
pub mod fixation_detector;
pub mod gaze_event;
pub mod gaze_series;
pub mod kinematics;
pub mod pursuit_cluster;
pub mod pursuit_detector;
pub mod saccade_detector;
pub mod sample;
pub mod utils;
