//! autozoom-fusion: turn page measurements into one zoom factor.
//!
//! Each page yields three metrics, every one an opinion `(value,
//! confidence, weight)` about the ideal zoom:
//!
//! - **default**: the host's default zoom, confidence 1, weight 1 (prior
//!   belief that the page is fine as it is)
//! - **font size**: scale the page's representative font to the ideal size
//! - **margin**: scale the main centered container to fill the page width
//!
//! The metrics are then fused by one of two strategies:
//!
//! ```text
//! weighted:  zoom = Σ(value·weight·confidence) / Σ(weight·confidence)
//!
//! election:  every metric votes for its nearest preset zoom with
//!            weight·confidence / total; while no preset holds ≥ 0.5,
//!            the weakest preset (never the one nearest the default zoom)
//!            is eliminated and its votes move one live preset toward
//!            the default zoom
//! ```

pub mod font_size;
pub mod fusion;
pub mod margin;

pub use fusion::{election_fusion, fuse, nearest_candidate, weighted_fusion};

use autozoom_core::{Metric, Options, PageInfo};
use tracing::debug;

/// The metrics computed for one page and the zoom they fuse to.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub default: Metric,
    pub font_size: Metric,
    pub margin: Metric,
    /// `None` when no metric carried any weight.
    pub zoom: Option<f64>,
}

impl Recommendation {
    pub fn metrics(&self) -> [Metric; 3] {
        [self.default, self.font_size, self.margin]
    }
}

/// Compute all page metrics and fuse them with the configured strategy.
pub fn recommend(
    page: &PageInfo,
    options: &Options,
    default_zoom: f64,
    current_zoom: f64,
) -> Recommendation {
    let default = Metric::new(default_zoom, 1.0, 1.0);

    let font_size = font_size::compute(
        &page.font_size_distribution,
        options.ideal_font_size,
        page.text_area,
        page.object_area,
    )
    .with_weight(options.metric_weights.font_size);

    let margin = margin::compute(
        page.content_dimensions,
        &page.centered_containers,
        current_zoom,
        options.ideal_page_width,
    )
    .with_weight(options.metric_weights.margin);

    let zoom = fuse(
        options.fusion_strategy,
        &[default, font_size, margin],
        default_zoom,
    );

    debug!(
        strategy = ?options.fusion_strategy,
        font_size = font_size.value,
        font_size_confidence = font_size.confidence,
        margin = margin.value,
        margin_confidence = margin.confidence,
        ?zoom,
        "page metrics fused"
    );

    Recommendation {
        default,
        font_size,
        margin,
        zoom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autozoom_core::{
        CenteredContainer, ContentDimensions, FusionStrategy, ZOOM_CANDIDATES,
    };
    use std::collections::BTreeMap;

    fn small_text_page() -> PageInfo {
        PageInfo {
            font_size_distribution: BTreeMap::from([(12, 900), (20, 100)]),
            text_area: 10_000.0,
            object_area: 500.0,
            content_dimensions: ContentDimensions {
                height: 1000.0,
                width: 1200.0,
            },
            centered_containers: vec![CenteredContainer {
                width: 800.0,
                height: 1000.0,
                relative: false,
            }],
        }
    }

    #[test]
    fn empty_page_stays_at_default() {
        let rec = recommend(&PageInfo::default(), &Options::default(), 1.0, 1.0);
        assert_eq!(rec.font_size.confidence, 0.0);
        assert_eq!(rec.margin.confidence, 0.0);
        assert_eq!(rec.zoom, Some(1.0));
    }

    #[test]
    fn small_text_and_wide_margins_zoom_in() {
        let rec = recommend(&small_text_page(), &Options::default(), 1.0, 1.0);

        // 16 / 12 for the font, 1200 / 800 for the margins.
        assert!((rec.font_size.value - 16.0 / 12.0).abs() < 1e-9);
        assert!((rec.margin.value - 1.5).abs() < 1e-9);

        // (1·1 + 8·4/3 + 4·1.5) / 13
        let expected = (1.0 + 8.0 * (16.0 / 12.0) + 4.0 * 1.5) / 13.0;
        assert!((rec.zoom.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn election_strategy_picks_a_preset() {
        let options = Options {
            fusion_strategy: FusionStrategy::Election,
            ..Default::default()
        };
        let rec = recommend(&small_text_page(), &options, 1.0, 1.0);
        let zoom = rec.zoom.unwrap();
        assert!(ZOOM_CANDIDATES.contains(&zoom));
        // The font metric alone holds 8 of 13 votes, nearest preset 1.25.
        assert_eq!(zoom, 1.25);
    }

    #[test]
    fn zero_weights_leave_only_the_prior() {
        let options = Options {
            metric_weights: autozoom_core::MetricWeights {
                font_size: 0.0,
                margin: 0.0,
            },
            ..Default::default()
        };
        let rec = recommend(&small_text_page(), &options, 1.25, 1.25);
        assert_eq!(rec.zoom, Some(1.25));
    }
}
