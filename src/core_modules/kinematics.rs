// THEORY:
// `kinematics` holds the pairwise measurements every detector needs: how far
// apart two gaze points are, and how fast the eye travelled between them. It is
// the comparative counterpart to the single-sample `Sample` container; nothing
// in here scans a sequence or keeps state.
//
// Zero time deltas occur in real recordings (duplicated timestamps). They are
// clamped to `MIN_TIME_DELTA_MS` so that speeds stay finite; the displacement
// across a zero delta is normally zero anyway.

use crate::core_modules::sample::{Degrees, DegreesPerSecond, Millis, Sample};

/// Substitute for a zero (or negative) time delta.
pub const MIN_TIME_DELTA_MS: Millis = 1.0;

const MILLIS_PER_SECOND: f64 = 1e3;

/// Euclidean distance between two gaze angles.
#[inline]
pub fn angular_distance(x0: Degrees, y0: Degrees, x1: Degrees, y1: Degrees) -> Degrees {
    (x1 - x0).hypot(y1 - y0)
}

/// Distance between the gaze positions of two samples.
#[inline]
pub fn sample_distance(from: &Sample, to: &Sample) -> Degrees {
    angular_distance(from.x, from.y, to.x, to.y)
}

/// Time from `from` to `to`, never below `MIN_TIME_DELTA_MS`.
#[inline]
pub fn clamped_elapsed(from: Millis, to: Millis) -> Millis {
    let elapsed = to - from;
    if elapsed > 0.0 { elapsed } else { MIN_TIME_DELTA_MS }
}

/// Converts a displacement over a millisecond span into degrees per second.
#[inline]
pub fn speed(displacement: Degrees, elapsed: Millis) -> DegreesPerSecond {
    displacement / elapsed * MILLIS_PER_SECOND
}

/// Straight-line speed from one sample to another, in degrees per second.
#[inline]
pub fn angular_speed(from: &Sample, to: &Sample) -> DegreesPerSecond {
    speed(sample_distance(from, to), clamped_elapsed(from.time, to.time))
}
