//! Offset estimation from the initial lookahead window.

use crate::{Error, Result};

/// Multiple of the average timestamp delta beyond which a correction is
/// considered implausible.
pub const ANOMALY_FACTOR: i64 = 10;

/// Timestamp corrections applied by the writer.
///
/// Computed once by [`normalize`]; afterwards only the writer's repair rules
/// move `pts_offset` and `dts_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OffsetState {
    /// Earliest pts observed on any selected stream.
    pub global_floor: i64,
    pub dts_offset: i64,
    pub pts_offset: i64,
    /// Mean distance between successive sorted pts.
    pub average_delta: i64,
}

impl OffsetState {
    /// Largest pts/dts inversion that may be absorbed instead of dropped.
    pub fn anomaly_threshold(&self) -> i64 {
        self.average_delta.saturating_mul(ANOMALY_FACTOR)
    }
}

/// Derive offsets from the per-stream pts of the initial window.
///
/// `window[i]` holds the pts of output stream `i` in arrival order. A `None`
/// anywhere, or no sample at all, means the floor cannot be established.
///
/// Differences are taken in i128 and saturated back to i64, so windows
/// spanning the whole i64 range do not overflow.
pub fn normalize(window: &[Vec<Option<i64>>]) -> Result<OffsetState> {
    let mut skew = 0i128;
    let mut floor: Option<i64> = None;
    let mut delta_sum = 0i128;
    let mut delta_count = 0i128;

    for samples in window.iter().filter(|s| !s.is_empty()) {
        let arrival: Vec<i64> = samples
            .iter()
            .copied()
            .collect::<Option<_>>()
            .ok_or(Error::NoValidTimestamp)?;

        let mut sorted = arrival.clone();
        sorted.sort_unstable();

        // Worst decode-before-presentation skew in this stream.
        for (got, asc) in arrival.iter().zip(&sorted) {
            skew = skew.min(*got as i128 - *asc as i128);
        }

        floor = Some(floor.map_or(sorted[0], |f| f.min(sorted[0])));

        for pair in sorted.windows(2) {
            delta_sum += pair[1] as i128 - pair[0] as i128;
            delta_count += 1;
        }
    }

    let global_floor = floor.ok_or(Error::NoValidTimestamp)?;
    let average_delta = if delta_count > 0 {
        saturate(delta_sum / delta_count)
    } else {
        0
    };

    let limit = -(average_delta as i128 * ANOMALY_FACTOR as i128);
    let skew = skew.max(limit);

    let state = OffsetState {
        global_floor,
        dts_offset: saturate(skew - global_floor as i128),
        pts_offset: saturate(-(global_floor as i128)),
        average_delta,
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "Offsets: floor={} dts={} pts={} avg_delta={}",
        state.global_floor,
        state.dts_offset,
        state.pts_offset,
        state.average_delta
    );

    Ok(state)
}

fn saturate(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(values: &[i64]) -> Vec<Option<i64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_monotonic_zero_floor() {
        let state = normalize(&[timed(&[0, 40, 80, 120]), timed(&[5, 45, 85, 125])]).unwrap();
        assert_eq!(state.global_floor, 0);
        assert_eq!(state.dts_offset, 0);
        assert_eq!(state.pts_offset, 0);
        assert_eq!(state.average_delta, 40);
    }

    #[test]
    fn test_floor_is_rebased() {
        let state = normalize(&[timed(&[1000, 1040, 1080])]).unwrap();
        assert_eq!(state.global_floor, 1000);
        assert_eq!(state.pts_offset, -1000);
        assert_eq!(state.dts_offset, -1000);
    }

    #[test]
    fn test_negative_floor() {
        let state = normalize(&[timed(&[-80, -40, 0])]).unwrap();
        assert_eq!(state.global_floor, -80);
        assert_eq!(state.pts_offset, 80);
    }

    #[test]
    fn test_reordered_frames_lower_dts_offset() {
        // B-frame style presentation order: I P B B
        let state = normalize(&[timed(&[0, 120, 40, 80])]).unwrap();
        // sorted = [0, 40, 80, 120]; diffs = [0, 80, -40, -40]
        assert_eq!(state.average_delta, 40);
        assert_eq!(state.dts_offset, -40);
        assert_eq!(state.pts_offset, 0);
    }

    #[test]
    fn test_dts_offset_clamped_to_anomaly_limit() {
        // One wild early packet at the end of the window
        let state = normalize(&[timed(&[1000, 1010, 1020, 1030, 0])]).unwrap();
        // sorted = [0, 1000, 1010, 1020, 1030]; avg = 1030 / 4 = 257
        assert_eq!(state.average_delta, 257);
        // raw min diff = 0 - 1030 = -1030, limit = -2570, so no clamp
        assert_eq!(state.dts_offset, -1030);

        let state = normalize(&[timed(&[0, 1, 2, 3, 4, 5, 100, 6])]).unwrap();
        // sorted deltas sum to 100 over 7 pairs: avg = 14, limit = -140
        // raw min diff = 6 - 100 = -94, within limit
        assert_eq!(state.dts_offset, -94);

        let state = normalize(&[timed(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 500, 11])]).unwrap();
        // avg = 500 / 12 = 41, limit = -410; raw min diff = 11 - 500 = -489
        assert_eq!(state.average_delta, 41);
        assert_eq!(state.dts_offset, -410);
    }

    #[test]
    fn test_unset_pts_fails() {
        let result = normalize(&[vec![None, Some(40)]]);
        assert!(matches!(result, Err(Error::NoValidTimestamp)));
    }

    #[test]
    fn test_no_samples_fails() {
        assert!(matches!(normalize(&[]), Err(Error::NoValidTimestamp)));
        assert!(matches!(normalize(&[vec![], vec![]]), Err(Error::NoValidTimestamp)));
    }

    #[test]
    fn test_single_sample_streams_have_zero_delta() {
        let state = normalize(&[timed(&[300]), timed(&[200])]).unwrap();
        assert_eq!(state.global_floor, 200);
        assert_eq!(state.average_delta, 0);
        assert_eq!(state.dts_offset, -200);
        assert_eq!(state.anomaly_threshold(), 0);
    }

    #[test]
    fn test_extreme_pts_do_not_overflow() {
        let state = normalize(&[timed(&[0, 5_000_000_000_000_000_000, -5_000_000_000_000_000_000])])
            .unwrap();
        // sorted = [-5e18, 0, 5e18]; last arrival is 1e19 behind its slot
        assert_eq!(state.global_floor, -5_000_000_000_000_000_000);
        assert_eq!(state.average_delta, 5_000_000_000_000_000_000);
        assert_eq!(state.pts_offset, 5_000_000_000_000_000_000);
        assert_eq!(state.dts_offset, -5_000_000_000_000_000_000);
        assert_eq!(state.anomaly_threshold(), i64::MAX);

        let state = normalize(&[timed(&[i64::MIN, i64::MAX])]).unwrap();
        assert_eq!(state.average_delta, i64::MAX);
        assert_eq!(state.pts_offset, i64::MAX);
        assert_eq!(state.dts_offset, i64::MAX);
    }
}
