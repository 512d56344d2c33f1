//! Greedy ambiguity resolution between track candidates.

use tracklab_types::TrackCandidate;

/// Keep candidates in order of quality, rejecting any that shares more
/// than `max_overlap` of its measurements with an already kept one.
///
/// Quality orders by measurement count, then χ²/ndf, then seed index.
/// Kept candidates are returned in their input order with `shared` set
/// to the number of their measurements used by another kept candidate.
pub fn resolve_ambiguities(
    candidates: Vec<TrackCandidate>,
    max_overlap: f64,
) -> Vec<TrackCandidate> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&candidates[a], &candidates[b]);
        b.n_measurements()
            .cmp(&a.n_measurements())
            .then(a.chi2_per_ndf().total_cmp(&b.chi2_per_ndf()))
            .then(a.seed.cmp(&b.seed))
    });

    let mut accepted: Vec<usize> = Vec::new();
    for i in order {
        let candidate = &candidates[i];
        let n = candidate.n_measurements().max(1) as f64;
        let ambiguous = accepted
            .iter()
            .any(|&j| candidate.overlap(&candidates[j]) as f64 / n > max_overlap);
        if !ambiguous {
            accepted.push(i);
        }
    }
    accepted.sort_unstable();

    let shared: Vec<u32> = accepted
        .iter()
        .map(|&i| {
            let candidate = &candidates[i];
            candidate
                .measurements
                .iter()
                .filter(|m| {
                    accepted
                        .iter()
                        .any(|&j| j != i && candidates[j].measurements.contains(m))
                })
                .count() as u32
        })
        .collect();

    let mut candidates: Vec<Option<TrackCandidate>> = candidates.into_iter().map(Some).collect();
    accepted
        .iter()
        .zip(shared)
        .filter_map(|(&i, shared)| {
            let mut track = candidates[i].take()?;
            track.shared = shared;
            Some(track)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklab_types::{MeasurementIndex, TrackParameters};

    fn candidate(seed: usize, measurements: &[u32], chi2: f64) -> TrackCandidate {
        TrackCandidate {
            seed,
            measurements: measurements.iter().copied().map(MeasurementIndex).collect(),
            parameters: TrackParameters {
                d0: 0.0,
                z0: 0.0,
                phi: 0.0,
                theta: 1.0,
                q_over_p: 0.5,
            },
            chi2,
            ndf: 5,
            holes: 0,
            shared: 0,
        }
    }

    #[test]
    fn test_longer_candidate_wins() {
        let tracks = resolve_ambiguities(
            vec![
                candidate(0, &[0, 1, 2, 3, 4], 1.0),
                candidate(1, &[0, 1, 2, 3, 4, 5], 9.0),
            ],
            0.5,
        );
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].seed, 1);
    }

    #[test]
    fn test_better_fit_wins_at_equal_length() {
        let tracks = resolve_ambiguities(
            vec![
                candidate(0, &[0, 1, 2, 3], 8.0),
                candidate(1, &[0, 1, 2, 7], 2.0),
            ],
            0.5,
        );
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].seed, 1);
    }

    #[test]
    fn test_small_overlap_is_kept_and_counted() {
        let tracks = resolve_ambiguities(
            vec![
                candidate(0, &[10, 11, 12, 13], 1.0),
                candidate(1, &[0, 1, 2, 3], 1.0),
                candidate(2, &[3, 20, 21, 22], 1.0),
            ],
            0.5,
        );
        let seeds: Vec<_> = tracks.iter().map(|t| t.seed).collect();
        assert_eq!(seeds, vec![0, 1, 2]);
        let shared: Vec<_> = tracks.iter().map(|t| t.shared).collect();
        assert_eq!(shared, vec![0, 1, 1]);
    }

    #[test]
    fn test_zero_overlap_allows_no_sharing() {
        let tracks = resolve_ambiguities(
            vec![
                candidate(0, &[0, 1, 2, 3], 1.0),
                candidate(1, &[3, 4, 5, 6], 2.0),
            ],
            0.0,
        );
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].seed, 0);
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve_ambiguities(Vec::new(), 0.5).is_empty());
    }
}
