// THEORY:
// A labelled series answers "what was the eye doing at this sample". Downstream
// consumers (measure calculators, reports, plots) usually ask "which events
// happened, and for how long". A `GazeEvent` is that view: one maximal run of
// consecutive samples sharing a label. Events are derived on demand from the
// series and never stored alongside it, so they cannot drift out of sync.

use crate::core_modules::gaze_series::GazeSeries;
use crate::core_modules::sample::{GazeLabel, Millis};
use serde::{Deserialize, Serialize};

/// A contiguous run of same-label samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeEvent {
    pub label: GazeLabel,
    /// Index of the first sample of the run.
    pub start_index: usize,
    /// Index of the last sample of the run (inclusive).
    pub end_index: usize,
    pub start_time: Millis,
    pub end_time: Millis,
}

impl GazeEvent {
    pub fn duration(&self) -> Millis {
        self.end_time - self.start_time
    }

    pub fn sample_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

/// Every maximal same-label run of `series`, in time order.
pub fn extract_events(series: &GazeSeries) -> Vec<GazeEvent> {
    let mut events: Vec<GazeEvent> = Vec::new();

    for (index, sample) in series.iter().enumerate() {
        match events.last_mut() {
            Some(event) if event.label == sample.label => {
                event.end_index = index;
                event.end_time = sample.time;
            }
            _ => events.push(GazeEvent {
                label: sample.label,
                start_index: index,
                end_index: index,
                start_time: sample.time,
                end_time: sample.time,
            }),
        }
    }

    events
}

/// Events of a single label, in time order.
pub fn events_with_label(series: &GazeSeries, label: GazeLabel) -> Vec<GazeEvent> {
    extract_events(series)
        .into_iter()
        .filter(|event| event.label == label)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::gaze_series::RawGazeRecord;
    use GazeLabel::{Fixation as F, Saccade as S, Unknown as U};

    fn labelled(labels: &[GazeLabel]) -> GazeSeries {
        let records: Vec<RawGazeRecord> = (0..labels.len())
            .map(|i| RawGazeRecord::new(i as f64 * 4.0, 0.0, 0.0, 2))
            .collect();
        let mut series = GazeSeries::from_records("events", &records).unwrap();
        for (sample, &label) in series.samples_mut().iter_mut().zip(labels) {
            sample.label = label;
        }
        series
    }

    #[test]
    fn runs_become_events() {
        let series = labelled(&[F, F, F, S, S, U, F, F]);
        let events = extract_events(&series);

        let summary: Vec<(GazeLabel, usize, usize)> = events
            .iter()
            .map(|e| (e.label, e.start_index, e.end_index))
            .collect();
        assert_eq!(summary, vec![(F, 0, 2), (S, 3, 4), (U, 5, 5), (F, 6, 7)]);

        assert_eq!(events[0].duration(), 8.0);
        assert_eq!(events[0].sample_count(), 3);
        assert_eq!(events[2].duration(), 0.0);
    }

    #[test]
    fn events_can_be_filtered_by_label() {
        let series = labelled(&[F, F, S, F, S, S]);
        let saccades = events_with_label(&series, S);
        assert_eq!(saccades.len(), 2);
        assert_eq!((saccades[1].start_index, saccades[1].end_index), (4, 5));
    }
}
