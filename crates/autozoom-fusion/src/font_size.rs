//! Font size metric.
//!
//! Picks a representative font size for the page and proposes the zoom at
//! which that font appears at the ideal size. Pages dominated by images or
//! video get a proportionally lower confidence.

use std::collections::BTreeMap;

use autozoom_core::Metric;

/// Zoom that renders the page's representative font at `ideal_font_size`.
///
/// The returned metric has weight 0; the caller applies the configured
/// weight.
pub fn compute(
    distribution: &BTreeMap<u32, u64>,
    ideal_font_size: f64,
    text_area: f64,
    object_area: f64,
) -> Metric {
    let percent_textual = text_area / (text_area + object_area);
    let confidence = if percent_textual > 0.5 {
        1.0
    } else if percent_textual.is_finite() {
        percent_textual.max(0.0)
    } else {
        0.0
    };

    match first_quartile(distribution) {
        Some(size) if confidence > 0.0 => {
            Metric::new(ideal_font_size / f64::from(size), confidence, 0.0)
        }
        _ => Metric::abstain(),
    }
}

/// Smallest font size above the first quartile of the character counts.
///
/// The quartile position is `floor((total + 1) / 4)`; no interpolation.
/// Returns `None` for an empty distribution or a zero size.
pub fn first_quartile(distribution: &BTreeMap<u32, u64>) -> Option<u32> {
    let total = distribution.values().copied().fold(0u64, u64::saturating_add);
    let mut position = total.saturating_add(1) / 4;

    for (&size, &count) in distribution {
        if position < count {
            return (size > 0).then_some(size);
        }
        position -= count;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartile_of_single_size() {
        let dist = BTreeMap::from([(14, 500)]);
        assert_eq!(first_quartile(&dist), Some(14));
    }

    #[test]
    fn quartile_skips_small_print() {
        // 100 chars at 10px are below the quartile position of 250.
        let dist = BTreeMap::from([(10, 100), (16, 800), (24, 100)]);
        assert_eq!(first_quartile(&dist), Some(16));
    }

    #[test]
    fn quartile_lands_in_small_print_when_dominant() {
        let dist = BTreeMap::from([(10, 600), (16, 400)]);
        assert_eq!(first_quartile(&dist), Some(10));
    }

    #[test]
    fn quartile_of_empty_distribution() {
        assert_eq!(first_quartile(&BTreeMap::new()), None);
        assert_eq!(first_quartile(&BTreeMap::from([(12, 0)])), None);
    }

    #[test]
    fn quartile_of_huge_counts_saturates() {
        let dist = BTreeMap::from([(10, u64::MAX), (16, u64::MAX)]);
        // Total saturates at u64::MAX; the position lands in the 10px bucket.
        assert_eq!(first_quartile(&dist), Some(10));
    }

    #[test]
    fn textual_page_has_full_confidence() {
        let dist = BTreeMap::from([(12, 1000)]);
        let metric = compute(&dist, 16.0, 9000.0, 1000.0);
        assert!((metric.value - 16.0 / 12.0).abs() < 1e-12);
        assert_eq!(metric.confidence, 1.0);
        assert_eq!(metric.weight, 0.0);
    }

    #[test]
    fn media_heavy_page_scales_confidence() {
        let dist = BTreeMap::from([(16, 1000)]);
        let metric = compute(&dist, 16.0, 3000.0, 7000.0);
        assert_eq!(metric.value, 1.0);
        assert!((metric.confidence - 0.3).abs() < 1e-12);
    }

    #[test]
    fn no_area_abstains() {
        let dist = BTreeMap::from([(16, 1000)]);
        let metric = compute(&dist, 16.0, 0.0, 0.0);
        assert_eq!(metric, Metric::abstain());
    }

    #[test]
    fn no_text_abstains() {
        let metric = compute(&BTreeMap::new(), 16.0, 5000.0, 0.0);
        assert_eq!(metric.strength(), 0.0);
        assert_eq!(metric.confidence, 0.0);
    }
}
