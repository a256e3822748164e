//! Fusion strategies: weighted average and instant-runoff election.

use autozoom_core::{FusionStrategy, Metric, ZOOM_CANDIDATES};

/// Share of the votes a preset needs to win outright.
const MAJORITY: f64 = 0.5;

/// Slack for the majority test; vote shares are sums of fractions.
const VOTE_EPSILON: f64 = 1e-9;

/// Fuse metrics with the given strategy over the preset zoom factors.
pub fn fuse(strategy: FusionStrategy, metrics: &[Metric], default_zoom: f64) -> Option<f64> {
    match strategy {
        FusionStrategy::Weighted => weighted_fusion(metrics),
        FusionStrategy::Election => election_fusion(metrics, &ZOOM_CANDIDATES, default_zoom),
    }
}

/// Confidence-weighted mean of the metric values.
///
/// Returns `None` when no metric has positive `weight * confidence`.
pub fn weighted_fusion(metrics: &[Metric]) -> Option<f64> {
    let mut total_weight = 0.0;
    let mut weighted_sum = 0.0;
    for metric in metrics.iter().filter(|m| casts_vote(m)) {
        total_weight += metric.strength();
        weighted_sum += metric.value * metric.strength();
    }

    if total_weight <= 0.0 {
        return None;
    }
    let zoom = weighted_sum / total_weight;
    zoom.is_finite().then_some(zoom)
}

/// Instant-runoff vote over `candidates` (ascending).
///
/// The candidate nearest `default_zoom` is never eliminated, so the vote
/// always settles. Returns `None` when no metric has positive
/// `weight * confidence` or there are no candidates.
pub fn election_fusion(metrics: &[Metric], candidates: &[f64], default_zoom: f64) -> Option<f64> {
    if candidates.is_empty() {
        return None;
    }

    let total_weight: f64 = metrics
        .iter()
        .filter(|m| casts_vote(m))
        .map(Metric::strength)
        .sum();
    if total_weight <= 0.0 || !total_weight.is_finite() {
        return None;
    }

    let mut votes = vec![0.0; candidates.len()];
    for metric in metrics.iter().filter(|m| casts_vote(m)) {
        votes[nearest_candidate(candidates, metric.value)] += metric.strength() / total_weight;
    }

    let protected = nearest_candidate(candidates, default_zoom);

    loop {
        if let Some(winner) = votes.iter().position(|&v| v >= MAJORITY - VOTE_EPSILON) {
            return Some(candidates[winner]);
        }

        // Fewest votes loses; on a tie, the one farthest from the default.
        let loser = votes
            .iter()
            .enumerate()
            .filter(|&(i, &v)| i != protected && v > 0.0)
            .min_by(|&(a, va), &(b, vb)| {
                va.total_cmp(vb)
                    .then_with(|| b.abs_diff(protected).cmp(&a.abs_diff(protected)))
            })
            .map(|(i, _)| i);

        // Only the protected candidate is left standing.
        let Some(loser) = loser else {
            return Some(candidates[protected]);
        };

        let mut target = loser;
        loop {
            target = if target < protected { target + 1 } else { target - 1 };
            if target == protected || votes[target] > 0.0 {
                break;
            }
        }

        votes[target] += votes[loser];
        votes[loser] = 0.0;
    }
}

/// Index of the candidate nearest `value`. Ties go to the lower candidate.
pub fn nearest_candidate(candidates: &[f64], value: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, &candidate) in candidates.iter().enumerate() {
        let distance = (candidate - value).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

fn casts_vote(metric: &Metric) -> bool {
    metric.value.is_finite() && metric.strength() > 0.0
}
