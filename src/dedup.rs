//! Proximity deduplication of ranked search hits.
//!
//! Nearest-neighbor search over fine-grained chunks (one caption line, one
//! page) tends to return several hits clustered around the same moment of a
//! video. This pass keeps only the best-ranked hit of each neighborhood so a
//! result list names distinct locations.
//!
//! Hits are processed in rank order. A hit is kept iff every hit already kept
//! for the same source lies more than `threshold` position units away.

use std::collections::HashMap;

/// Anything that lives at a position within a source.
pub trait Located {
    /// Video ID or document filename.
    fn source_id(&self) -> &str;

    /// Seconds offset or page number.
    fn position(&self) -> i64;
}

impl<S: AsRef<str>> Located for (S, i64) {
    fn source_id(&self) -> &str {
        self.0.as_ref()
    }

    fn position(&self) -> i64 {
        self.1
    }
}

/// Drop hits that fall within `threshold` of a better-ranked hit from the
/// same source. Input order is preserved; nothing is re-sorted.
pub fn dedup_by_proximity<T: Located>(items: Vec<T>, threshold: u32) -> Vec<T> {
    let threshold = u64::from(threshold);
    let mut accepted: HashMap<String, Vec<i64>> = HashMap::new();
    let mut kept = Vec::with_capacity(items.len());

    for item in items {
        let position = item.position();
        let seen = accepted.entry(item.source_id().to_string()).or_default();

        if seen.iter().all(|&other| position.abs_diff(other) > threshold) {
            seen.push(position);
            kept.push(item);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(raw: &[(&'static str, i64)]) -> Vec<(&'static str, i64)> {
        raw.to_vec()
    }

    #[test]
    fn test_empty_input() {
        let out: Vec<(&str, i64)> = dedup_by_proximity(Vec::new(), 10);
        assert!(out.is_empty());
    }

    #[test]
    fn test_nearby_hit_from_same_source_is_suppressed() {
        let out = dedup_by_proximity(hits(&[("A", 10), ("A", 15), ("A", 50), ("B", 10)]), 10);
        assert_eq!(out, vec![("A", 10), ("A", 50), ("B", 10)]);
    }

    #[test]
    fn test_distant_hits_are_kept() {
        let input = hits(&[("A", 0), ("A", 100)]);
        assert_eq!(dedup_by_proximity(input.clone(), 10), input);
    }

    #[test]
    fn test_single_item_survives_any_threshold() {
        for threshold in [0, 1, 10, u32::MAX] {
            assert_eq!(dedup_by_proximity(hits(&[("A", 5)]), threshold), vec![("A", 5)]);
        }
    }

    #[test]
    fn test_distance_equal_to_threshold_is_suppressed() {
        let out = dedup_by_proximity(hits(&[("A", 10), ("A", 20), ("A", 21)]), 10);
        assert_eq!(out, vec![("A", 10), ("A", 21)]);
    }

    #[test]
    fn test_zero_threshold_collapses_only_exact_repeats() {
        let out = dedup_by_proximity(hits(&[("A", 3), ("A", 4), ("A", 3), ("B", 3)]), 0);
        assert_eq!(out, vec![("A", 3), ("A", 4), ("B", 3)]);
    }

    #[test]
    fn test_cluster_keeps_top_ranked_only() {
        let out = dedup_by_proximity(hits(&[("A", 42), ("A", 40), ("A", 45), ("A", 50)]), 10);
        assert_eq!(out, vec![("A", 42)]);
    }

    #[test]
    fn test_compares_against_all_accepted_positions() {
        // 31 is clear of 20 but not of 40; both were accepted earlier.
        let out = dedup_by_proximity(hits(&[("A", 40), ("A", 20), ("A", 31)]), 10);
        assert_eq!(out, vec![("A", 40), ("A", 20)]);
    }

    #[test]
    fn test_rank_order_wins_over_position_order() {
        let out = dedup_by_proximity(hits(&[("A", 55), ("A", 50), ("A", 60)]), 10);
        assert_eq!(out, vec![("A", 55)]);
    }

    #[test]
    fn test_rerun_is_stable() {
        let input = hits(&[
            ("A", 0),
            ("B", 7),
            ("A", 9),
            ("A", 11),
            ("B", 30),
            ("A", 12),
            ("B", 39),
            ("C", 1),
        ]);
        let once = dedup_by_proximity(input, 10);
        let twice = dedup_by_proximity(once.clone(), 10);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_output_is_ordered_subsequence_with_spacing() {
        let input: Vec<(String, i64)> = (0..60)
            .map(|i| (format!("S{}", i % 3), (i * 37 % 101) as i64))
            .collect();
        let out = dedup_by_proximity(input.clone(), 10);

        let mut cursor = input.iter();
        for kept in &out {
            assert!(cursor.any(|candidate| candidate == kept));
        }

        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                if a.0 == b.0 {
                    assert!((a.1 - b.1).abs() > 10);
                }
            }
        }
    }

    #[test]
    fn test_negative_positions() {
        let out = dedup_by_proximity(hits(&[("A", -5), ("A", 5), ("A", 6)]), 10);
        assert_eq!(out, vec![("A", -5), ("A", 6)]);
    }
}
