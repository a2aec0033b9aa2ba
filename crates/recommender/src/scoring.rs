//! Distance-to-score bucketing.

/// Inclusive upper bounds in meters and the score awarded within them.
const DISTANCE_BUCKETS: [(f64, u8); 5] = [(50.0, 10), (100.0, 8), (150.0, 6), (200.0, 4), (300.0, 2)];

/// Proximity score for a great-circle distance in meters.
///
/// Non-increasing step function; anything beyond the last bucket scores 0.
pub fn distance_score(distance_m: f64) -> u8 {
    DISTANCE_BUCKETS
        .iter()
        .find(|(max_m, _)| distance_m <= *max_m)
        .map(|(_, score)| *score)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(distance_score(0.0), 10);
        assert_eq!(distance_score(50.0), 10);
        assert_eq!(distance_score(50.01), 8);
        assert_eq!(distance_score(100.0), 8);
        assert_eq!(distance_score(100.01), 6);
        assert_eq!(distance_score(150.0), 6);
        assert_eq!(distance_score(150.01), 4);
        assert_eq!(distance_score(200.0), 4);
        assert_eq!(distance_score(200.01), 2);
        assert_eq!(distance_score(300.0), 2);
        assert_eq!(distance_score(300.01), 0);
        assert_eq!(distance_score(12_000.0), 0);
    }

    #[test]
    fn test_non_increasing() {
        let mut last = distance_score(0.0);
        for step in 0..4_000 {
            let score = distance_score(step as f64 * 0.1);
            assert!(score <= last, "score rose at {}m", step as f64 * 0.1);
            assert!(matches!(score, 0 | 2 | 4 | 6 | 8 | 10));
            last = score;
        }
    }
}
