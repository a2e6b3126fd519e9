use crate::domain::model::{BirdCandidate, ObservationSignal, RankedResult};

/// Rank candidates by their share of the total observation count.
///
/// `signals` is paired with `candidates` by position; a missing entry counts as
/// zero observations. When nothing was observed at all every candidate gets the
/// same probability. Ties keep the language model's order.
pub fn rank_candidates(
    candidates: &[BirdCandidate],
    signals: &[Option<ObservationSignal>],
    llm_weight: f64,
) -> Vec<RankedResult> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let counts: Vec<u64> = (0..candidates.len())
        .map(|i| signals.get(i).and_then(Option::as_ref).map_or(0, |s| s.count))
        .collect();
    let total: u64 = counts.iter().sum();
    let uniform = 1.0 / candidates.len() as f64;

    let mut results: Vec<RankedResult> = candidates
        .iter()
        .zip(counts)
        .enumerate()
        .map(|(i, (candidate, count))| {
            let probability = if total > 0 {
                count as f64 / total as f64
            } else {
                uniform
            };
            RankedResult {
                candidate: candidate.clone(),
                probability,
                observation_count: count,
                species_code: signals
                    .get(i)
                    .and_then(Option::as_ref)
                    .map(|s| s.species_code.clone()),
                combined_score: combined_score(candidate.llm_rank, probability, llm_weight),
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.probability
            .total_cmp(&a.probability)
            .then(a.candidate.llm_rank.cmp(&b.candidate.llm_rank))
    });
    results
}

/// Weighted blend of the description match and the observation probability, in percent.
///
/// Rank 1 scores 1.0 and rank 5 scores 0.2 on the description side.
pub fn combined_score(llm_rank: u8, probability: f64, llm_weight: f64) -> f64 {
    let llm_score = (6.0 - f64::from(llm_rank.clamp(1, 5))) / 5.0;
    (llm_score * llm_weight + probability * (1.0 - llm_weight)) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{GeoPoint, Region};

    fn candidates(n: u8) -> Vec<BirdCandidate> {
        (1..=n)
            .map(|rank| BirdCandidate {
                common_name: format!("Bird {}", rank),
                scientific_name: None,
                llm_rank: rank,
            })
            .collect()
    }

    fn signals(counts: &[u64]) -> Vec<Option<ObservationSignal>> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                Some(ObservationSignal {
                    species_code: format!("bird{}", i + 1),
                    count,
                    window_days: 30,
                    region: Region::Point(GeoPoint {
                        latitude: 40.7987,
                        longitude: -73.9563,
                    }),
                })
            })
            .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_counts_are_normalized_in_descending_order() {
        let ranked = rank_candidates(&candidates(5), &signals(&[40, 30, 20, 10, 0]), 0.4);

        let probabilities: Vec<f64> = ranked.iter().map(|r| r.probability).collect();
        for (actual, expected) in probabilities.iter().zip([0.4, 0.3, 0.2, 0.1, 0.0]) {
            assert_close(*actual, expected);
        }
        let names: Vec<&str> = ranked.iter().map(|r| r.candidate.common_name.as_str()).collect();
        assert_eq!(names, vec!["Bird 1", "Bird 2", "Bird 3", "Bird 4", "Bird 5"]);
        assert_eq!(ranked[0].observation_count, 40);
        assert_eq!(ranked[0].species_code.as_deref(), Some("bird1"));
    }

    #[test]
    fn test_zero_total_falls_back_to_uniform() {
        let ranked = rank_candidates(&candidates(5), &signals(&[0, 0, 0, 0, 0]), 0.4);

        assert_eq!(ranked.len(), 5);
        for result in &ranked {
            assert_close(result.probability, 0.2);
        }
        let ranks: Vec<u8> = ranked.iter().map(|r| r.candidate.llm_rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_probabilities_sum_to_one_and_follow_counts() {
        let count_sets: [[u64; 5]; 4] = [
            [1, 2, 3, 4, 5],
            [0, 0, 7, 0, 0],
            [1000, 1, 1, 1, 1],
            [13, 0, 13, 2, 99],
        ];

        for counts in count_sets {
            let ranked = rank_candidates(&candidates(5), &signals(&counts), 0.4);
            let total: u64 = counts.iter().sum();
            let sum: f64 = ranked.iter().map(|r| r.probability).sum();
            assert_close(sum, 1.0);
            for result in &ranked {
                assert_close(
                    result.probability,
                    result.observation_count as f64 / total as f64,
                );
            }
            assert!(ranked
                .windows(2)
                .all(|pair| pair[0].probability >= pair[1].probability));
        }
    }

    #[test]
    fn test_ties_keep_llm_order() {
        let ranked = rank_candidates(&candidates(5), &signals(&[5, 10, 5, 10, 0]), 0.4);

        let ranks: Vec<u8> = ranked.iter().map(|r| r.candidate.llm_rank).collect();
        assert_eq!(ranks, vec![2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_missing_signal_counts_as_zero() {
        let mut with_gap = signals(&[10, 30, 20, 40, 0]);
        with_gap[3] = None;
        let explicit_zero = signals(&[10, 30, 20, 0, 0]);

        let a = rank_candidates(&candidates(5), &with_gap, 0.4);
        let b = rank_candidates(&candidates(5), &explicit_zero, 0.4);

        let probs_a: Vec<(u8, f64)> = a.iter().map(|r| (r.candidate.llm_rank, r.probability)).collect();
        let probs_b: Vec<(u8, f64)> = b.iter().map(|r| (r.candidate.llm_rank, r.probability)).collect();
        assert_eq!(probs_a, probs_b);
        let fourth = a.iter().find(|r| r.candidate.llm_rank == 4).unwrap();
        assert_eq!(fourth.observation_count, 0);
        assert!(fourth.species_code.is_none());
    }

    #[test]
    fn test_short_signal_list_and_fewer_candidates() {
        let ranked = rank_candidates(&candidates(3), &signals(&[0, 6]), 0.4);

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].candidate.llm_rank, 2);
        assert_close(ranked[0].probability, 1.0);

        let uniform = rank_candidates(&candidates(4), &[], 0.4);
        for result in &uniform {
            assert_close(result.probability, 0.25);
        }
    }

    #[test]
    fn test_empty_candidates() {
        assert!(rank_candidates(&[], &signals(&[1, 2]), 0.4).is_empty());
    }

    #[test]
    fn test_combined_score() {
        // (1.0 * 0.4 + 0.5 * 0.6) * 100
        assert_close(combined_score(1, 0.5, 0.4), 70.0);
        // (0.2 * 0.4 + 0.0 * 0.6) * 100
        assert_close(combined_score(5, 0.0, 0.4), 8.0);
        assert_close(combined_score(3, 0.25, 0.0), 25.0);
        assert_close(combined_score(3, 0.25, 1.0), 60.0);
    }
}
