//! Score aggregation
//!
//! Each event count maps through a five-bucket step function to a sub-score in
//! {500, 375, 250, 125, 0}. The composite is a weighted sum whose weights add
//! up to 0.99, so the best achievable composite is 495.

use crate::types::{EyeCounts, ScoreBreakdown, SubScores};

/// Weight applied to each sub-score
pub const SIGNAL_WEIGHT: f64 = 0.33;

/// Sub-score bucket values, best first
pub const BUCKETS: [u32; 5] = [500, 375, 250, 125, 0];

/// Highest possible composite score
pub const MAX_COMPOSITE: f64 = 3.0 * SIGNAL_WEIGHT * 500.0;

pub fn disfluency_sub_score(count: u32) -> u32 {
    match count {
        0..=4 => 500,
        5..=9 => 375,
        10..=14 => 250,
        15..=19 => 125,
        _ => 0,
    }
}

pub fn blink_sub_score(count: u32) -> u32 {
    match count {
        0..=7 => 500,
        8 => 375,
        9 => 250,
        10 => 125,
        _ => 0,
    }
}

pub fn gaze_sub_score(count: u32) -> u32 {
    match count {
        0..=9 => 500,
        10..=19 => 375,
        20..=29 => 250,
        30..=39 => 125,
        _ => 0,
    }
}

impl SubScores {
    pub fn from_counts(disfluency_count: u32, blink_count: u32, gaze_count: u32) -> Self {
        Self {
            disfluency: disfluency_sub_score(disfluency_count),
            blink: blink_sub_score(blink_count),
            gaze: gaze_sub_score(gaze_count),
        }
    }

    pub fn composite(&self) -> f64 {
        SIGNAL_WEIGHT * self.disfluency as f64
            + SIGNAL_WEIGHT * self.blink as f64
            + SIGNAL_WEIGHT * self.gaze as f64
    }
}

/// Composite engagement score for three event counts
pub fn aggregate(disfluency_count: u32, blink_count: u32, gaze_count: u32) -> f64 {
    SubScores::from_counts(disfluency_count, blink_count, gaze_count).composite()
}

impl ScoreBreakdown {
    pub fn from_counts(disfluency_count: u32, eye: EyeCounts) -> Self {
        let sub_scores = SubScores::from_counts(disfluency_count, eye.blink_count, eye.gaze_count);
        Self {
            disfluency_count,
            gaze_count: eye.gaze_count,
            blink_count: eye.blink_count,
            composite_score: sub_scores.composite(),
            sub_scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_disfluency_buckets() {
        let cases = [
            (0, 500),
            (4, 500),
            (5, 375),
            (9, 375),
            (10, 250),
            (14, 250),
            (15, 125),
            (19, 125),
            (20, 0),
            (500, 0),
        ];
        for (count, expected) in cases {
            assert_eq!(disfluency_sub_score(count), expected, "count {count}");
        }
    }

    #[test]
    fn test_blink_buckets() {
        let cases = [(0, 500), (7, 500), (8, 375), (9, 250), (10, 125), (11, 0), (60, 0)];
        for (count, expected) in cases {
            assert_eq!(blink_sub_score(count), expected, "count {count}");
        }
    }

    #[test]
    fn test_gaze_buckets() {
        let cases = [
            (0, 500),
            (9, 500),
            (10, 375),
            (19, 375),
            (20, 250),
            (29, 250),
            (30, 125),
            (39, 125),
            (40, 0),
        ];
        for (count, expected) in cases {
            assert_eq!(gaze_sub_score(count), expected, "count {count}");
        }
    }

    #[test]
    fn test_weights_sum_below_one() {
        assert_close(3.0 * SIGNAL_WEIGHT, 0.99);
    }

    #[test]
    fn test_best_and_worst_composite() {
        assert_close(aggregate(0, 0, 0), 495.0);
        assert_close(aggregate(0, 0, 0), MAX_COMPOSITE);
        assert_close(aggregate(u32::MAX, u32::MAX, u32::MAX), 0.0);
    }

    #[test]
    fn test_composite_stays_in_range() {
        for d in (0..30).step_by(3) {
            for b in 0..13 {
                for g in (0..50).step_by(5) {
                    let score = aggregate(d, b, g);
                    assert!((0.0..=MAX_COMPOSITE + 1e-9).contains(&score));
                }
            }
        }
    }

    #[test]
    fn test_sub_scores_are_bucket_values() {
        let s = SubScores::from_counts(7, 9, 33);
        for value in [s.disfluency, s.blink, s.gaze] {
            assert!(BUCKETS.contains(&value));
        }
        assert_close(s.composite(), 0.33 * (375.0 + 250.0 + 125.0));
    }

    #[test]
    fn test_breakdown_from_counts() {
        let breakdown = ScoreBreakdown::from_counts(
            12,
            EyeCounts {
                gaze_count: 3,
                blink_count: 8,
            },
        );
        assert_eq!(
            breakdown.sub_scores,
            SubScores {
                disfluency: 250,
                blink: 375,
                gaze: 500,
            }
        );
        assert_eq!(breakdown.disfluency_count, 12);
        assert_close(breakdown.composite_score, 0.33 * 1125.0);
    }
}
