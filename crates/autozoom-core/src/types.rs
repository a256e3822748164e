//! Shared types used across AutoZoom crates.
//!
//! These mirror the shapes the host browser reports: zoom settings, zoom
//! change notifications, and the page measurement payload produced by the
//! content analysis side. All of them serialize to camelCase JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Host-assigned tab identifier.
pub type TabId = u32;

/// Tolerance for comparing zoom factors. Host zoom APIs round the values
/// they report, so exact equality is never used.
pub const ZOOM_EPSILON: f64 = 0.01;

/// Zoom factors the host offers as presets, ascending.
pub const ZOOM_CANDIDATES: [f64; 17] = [
    0.25, 0.33, 0.5, 0.67, 0.75, 0.8, 0.9, 1.0, 1.1, 1.25, 1.5, 1.75, 2.0, 2.5, 3.0, 4.0, 5.0,
];

/// Smallest zoom factor the controller will apply.
pub const MIN_ZOOM: f64 = ZOOM_CANDIDATES[0];

/// Largest zoom factor the controller will apply.
pub const MAX_ZOOM: f64 = ZOOM_CANDIDATES[ZOOM_CANDIDATES.len() - 1];

/// Returns whether two zoom factors are equal within [`ZOOM_EPSILON`].
pub fn zoom_values_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= ZOOM_EPSILON
}

// ── Metrics ────────────────────────────────────────────────────────

/// One opinion about the ideal zoom factor for a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Proposed zoom factor.
    pub value: f64,
    /// How sure the metric is, in `[0, 1]`.
    pub confidence: f64,
    /// Relative importance of the metric, `>= 0`.
    pub weight: f64,
}

impl Metric {
    pub fn new(value: f64, confidence: f64, weight: f64) -> Self {
        Self {
            value,
            confidence,
            weight,
        }
    }

    /// A metric that has no opinion. Contributes nothing to fusion.
    pub fn abstain() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Effective voting strength: `weight * confidence`.
    pub fn strength(&self) -> f64 {
        self.weight * self.confidence
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

// ── Page measurements ──────────────────────────────────────────────

/// Measurements taken from a rendered document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageInfo {
    /// Font size in px → number of characters rendered at that size.
    pub font_size_distribution: BTreeMap<u32, u64>,
    /// Area covered by text content.
    pub text_area: f64,
    /// Area covered by non-text objects (images, video, canvas, ...).
    pub object_area: f64,
    /// Content box of the element the centered containers are centered in.
    pub content_dimensions: ContentDimensions,
    /// Outermost containers found to be horizontally centered in the page.
    pub centered_containers: Vec<CenteredContainer>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDimensions {
    pub height: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenteredContainer {
    pub width: f64,
    pub height: f64,
    /// Width is declared relative to the viewport, so zooming does not
    /// change the margins around it.
    pub relative: bool,
}

// ── Host zoom model ────────────────────────────────────────────────

/// How the host applies zoom changes to a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoomMode {
    /// The host handles zoom changes itself.
    Automatic,
    /// The host reports changes but scaling is left to the page.
    Manual,
    /// Zooming is disabled for the tab.
    Disabled,
}

/// Whether a zoom change applies to the whole origin or a single tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoomScope {
    PerOrigin,
    PerTab,
}

/// Mode and scope, as carried by zoom-change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomSettings {
    pub mode: ZoomMode,
    pub scope: ZoomScope,
}

impl ZoomSettings {
    pub fn new(mode: ZoomMode, scope: ZoomScope) -> Self {
        Self { mode, scope }
    }
}

/// Full zoom settings of a tab, as returned by the host on request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabZoomSettings {
    pub mode: ZoomMode,
    pub scope: ZoomScope,
    /// The zoom factor the tab shows when nothing overrides it.
    pub default_zoom_factor: f64,
}

impl TabZoomSettings {
    pub fn settings(&self) -> ZoomSettings {
        ZoomSettings::new(self.mode, self.scope)
    }
}

/// Asynchronous notification that a tab's zoom changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomChangeInfo {
    pub tab_id: TabId,
    pub old_zoom_factor: f64,
    pub new_zoom_factor: f64,
    pub zoom_settings: ZoomSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_equality_uses_epsilon() {
        assert!(zoom_values_equal(1.0, 1.0));
        assert!(zoom_values_equal(1.0, 1.009));
        assert!(zoom_values_equal(1.1, 1.1 - ZOOM_EPSILON / 2.0));
        assert!(!zoom_values_equal(1.0, 1.02));
        assert!(!zoom_values_equal(1.0, 1.5));
    }

    #[test]
    fn candidates_are_ascending() {
        assert!(ZOOM_CANDIDATES.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(MIN_ZOOM, 0.25);
        assert_eq!(MAX_ZOOM, 5.0);
    }

    #[test]
    fn page_info_parses_camel_case_payload() {
        let json = r#"{
            "fontSizeDistribution": {"12": 40, "16": 300},
            "textArea": 5000.0,
            "objectArea": 1000.0,
            "contentDimensions": {"height": 2000.0, "width": 1280.0},
            "centeredContainers": [{"width": 960.0, "height": 1800.0, "relative": false}]
        }"#;
        let info: PageInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.font_size_distribution.get(&16), Some(&300));
        assert_eq!(info.content_dimensions.width, 1280.0);
        assert_eq!(info.centered_containers.len(), 1);
        assert!(!info.centered_containers[0].relative);
    }

    #[test]
    fn page_info_missing_fields_default() {
        let info: PageInfo = serde_json::from_str("{}").unwrap();
        assert!(info.font_size_distribution.is_empty());
        assert!(info.centered_containers.is_empty());
    }

    #[test]
    fn zoom_change_uses_host_spelling() {
        let json = r#"{
            "tabId": 7,
            "oldZoomFactor": 1.0,
            "newZoomFactor": 1.5,
            "zoomSettings": {"mode": "automatic", "scope": "per-tab"}
        }"#;
        let info: ZoomChangeInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.tab_id, 7);
        assert_eq!(info.zoom_settings.mode, ZoomMode::Automatic);
        assert_eq!(info.zoom_settings.scope, ZoomScope::PerTab);
    }

    #[test]
    fn metric_strength() {
        assert_eq!(Metric::new(1.5, 0.5, 4.0).strength(), 2.0);
        assert_eq!(Metric::abstain().strength(), 0.0);
    }
}
