//! Margin metric.
//!
//! Pages that center a fixed-width container leave empty margins on wide
//! screens. The metric proposes the zoom at which the widest such container
//! fills `ideal_page_width` of the content width, with confidence equal to
//! the share of the page height the containers cover.
//!
//! Containers whose width is relative to the viewport are ignored: zooming
//! does not change the margins around them.

use autozoom_core::{CenteredContainer, ContentDimensions, Metric};

/// Zoom that makes the widest non-relative container fill the page.
///
/// Container widths are measured at `current_zoom` and normalized back to
/// zoom 1. The returned metric has weight 0; the caller applies the
/// configured weight.
pub fn compute(
    content: ContentDimensions,
    containers: &[CenteredContainer],
    current_zoom: f64,
    ideal_page_width: f64,
) -> Metric {
    if current_zoom <= 0.0 || content.height <= 0.0 {
        return Metric::abstain();
    }

    let mut max_width: Option<f64> = None;
    let mut covered_height = 0.0;
    for container in containers.iter().filter(|c| !c.relative) {
        let width = container.width / current_zoom;
        if max_width.is_none_or(|max| width > max) {
            max_width = Some(width);
        }
        covered_height += container.height;
    }

    match max_width {
        Some(width) if width > 0.0 => Metric::new(
            ideal_page_width * content.width / width,
            (covered_height / content.height).clamp(0.0, 1.0),
            0.0,
        ),
        _ => Metric::abstain(),
    }
}
