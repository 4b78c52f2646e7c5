/// Centered moving average over an odd `window` of samples.
///
/// The first and last `window / 2` values have no full neighbourhood and are
/// returned unchanged, as is the whole input when it is shorter than `window`.
/// A window of 0 or 1 returns a plain copy.
pub fn centered_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let mut smoothed = values.to_vec();
    if window <= 1 || values.len() < window {
        return smoothed;
    }

    let half = window / 2;
    let width = window as f64;
    for (offset, neighbourhood) in values.windows(window).enumerate() {
        smoothed[offset + half] = neighbourhood.iter().sum::<f64>() / width;
    }
    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_is_averaged_and_edges_are_kept() {
        let values = [0.0, 3.0, 6.0, 0.0, 9.0];
        let smoothed = centered_moving_average(&values, 3);
        assert_eq!(smoothed, vec![0.0, 3.0, 3.0, 5.0, 9.0]);
    }

    #[test]
    fn short_input_is_left_alone() {
        let values = [1.0, 5.0, 2.0];
        assert_eq!(centered_moving_average(&values, 5), values.to_vec());
    }

    #[test]
    fn unit_window_is_identity() {
        let values = [1.0, -2.0, 4.0];
        assert_eq!(centered_moving_average(&values, 1), values.to_vec());
    }

    #[test]
    fn constant_signal_is_unchanged() {
        let values = vec![2.5; 12];
        assert_eq!(centered_moving_average(&values, 5), values);
    }
}
