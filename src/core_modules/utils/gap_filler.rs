// THEORY:
// Some trackers record nothing at all while the eye is closed, so a blink
// shows up as a jump in the timestamps rather than as a run of invalid
// samples. `fill_tracking_gaps` is the input-side repair for that: it patches
// every long time gap with zeroed, invalid-status records at the recording's
// mean sampling rate, which the blink detector can then see.
//
// A recording that already contains invalid samples encodes its own blinks and
// is passed through untouched.

use crate::core_modules::gaze_series::RawGazeRecord;
use crate::core_modules::sample::{Millis, TrackingStatus};
use tracing::debug;

/// Gap length above which a tracker is assumed to have lost the eye.
pub const DEFAULT_MAX_GAP_MS: Millis = 30.0;

/// Returns `records` with every gap longer than `max_gap_ms` filled.
pub fn fill_tracking_gaps(records: &[RawGazeRecord], max_gap_ms: Millis) -> Vec<RawGazeRecord> {
    let invalid = TrackingStatus::Invalid.code();
    if records.len() < 2 || records.iter().any(|r| r.status == invalid) {
        return records.to_vec();
    }

    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return records.to_vec();
    };
    let mean_interval = (last.time - first.time) / (records.len() - 1) as f64;
    if mean_interval <= 0.0 {
        return records.to_vec();
    }

    let mut filled = Vec::with_capacity(records.len());
    let mut patched_gaps = 0usize;

    for pair in records.windows(2) {
        let (before, after) = (pair[0], pair[1]);
        filled.push(before);

        let gap = after.time - before.time;
        if gap <= max_gap_ms {
            continue;
        }

        let count = (gap / mean_interval).floor() as usize;
        let step = gap / (count + 1) as f64;
        filled.extend(
            (1..=count).map(|k| RawGazeRecord::new(before.time + step * k as f64, 0.0, 0.0, invalid)),
        );
        debug!(at = before.time, gap, inserted = count, "filled tracking gap");
        patched_gaps += 1;
    }
    filled.push(*last);

    if patched_gaps > 0 {
        debug!(patched_gaps, total = filled.len(), "tracking gaps filled");
    }
    filled
}
