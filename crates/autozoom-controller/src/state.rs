//! Per-tab decision state and notification classification.

use autozoom_core::{Origin, ZoomChangeInfo, ZoomMode, ZoomScope, zoom_values_equal};
use serde::Serialize;

/// What the controller knows about a tab.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TabState {
    /// Not tracked. User zooms are not treated as overrides.
    #[default]
    Idle,
    /// The controller applied or confirmed `applied_zoom` on a document of
    /// `origin` and waits for the next zoom change.
    Tracking { origin: Origin, applied_zoom: f64 },
}

impl TabState {
    pub fn applied_zoom(&self) -> Option<f64> {
        match self {
            TabState::Idle => None,
            TabState::Tracking { applied_zoom, .. } => Some(*applied_zoom),
        }
    }

    pub fn origin(&self) -> Option<&Origin> {
        match self {
            TabState::Idle => None,
            TabState::Tracking { origin, .. } => Some(origin),
        }
    }
}

/// How a zoom-change notification is to be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationVerdict {
    /// The tab is not listening; nothing to decide.
    NotListening,
    /// The scope went back to per-origin; ours or the host's doing.
    ScopeReset,
    /// The tab left automatic per-tab zooming. Stop tracking it without
    /// blaming the origin.
    Released,
    /// Old and new zoom are the same.
    Spurious,
    /// The host reporting the zoom the controller itself applied.
    Echo,
    /// The user changed the zoom away from the applied one.
    Override,
}

/// Decide what a notification means. Rules are checked in order; the
/// first match wins.
pub fn classify_notification(
    listening: bool,
    applied_zoom: Option<f64>,
    change: &ZoomChangeInfo,
) -> NotificationVerdict {
    let settings = change.zoom_settings;
    let old = change.old_zoom_factor;
    let new = change.new_zoom_factor;

    if !listening {
        return NotificationVerdict::NotListening;
    }
    if settings.scope == ZoomScope::PerOrigin {
        return NotificationVerdict::ScopeReset;
    }
    if settings.scope != ZoomScope::PerTab || settings.mode != ZoomMode::Automatic {
        return NotificationVerdict::Released;
    }
    if zoom_values_equal(old, new) {
        return NotificationVerdict::Spurious;
    }
    if let Some(applied) = applied_zoom
        && zoom_values_equal(new, applied)
        && !zoom_values_equal(old, applied)
    {
        return NotificationVerdict::Echo;
    }
    NotificationVerdict::Override
}

#[cfg(test)]
mod tests {
    use super::*;
    use autozoom_core::ZoomSettings;

    fn change(old: f64, new: f64, mode: ZoomMode, scope: ZoomScope) -> ZoomChangeInfo {
        ZoomChangeInfo {
            tab_id: 1,
            old_zoom_factor: old,
            new_zoom_factor: new,
            zoom_settings: ZoomSettings::new(mode, scope),
        }
    }

    fn per_tab(old: f64, new: f64) -> ZoomChangeInfo {
        change(old, new, ZoomMode::Automatic, ZoomScope::PerTab)
    }

    #[test]
    fn not_listening_wins() {
        assert_eq!(
            classify_notification(false, Some(1.5), &per_tab(1.5, 2.0)),
            NotificationVerdict::NotListening
        );
    }

    #[test]
    fn per_origin_scope_is_a_reset() {
        let c = change(1.5, 1.0, ZoomMode::Automatic, ZoomScope::PerOrigin);
        assert_eq!(
            classify_notification(true, Some(1.5), &c),
            NotificationVerdict::ScopeReset
        );
    }

    #[test]
    fn leaving_automatic_mode_releases() {
        let c = change(1.5, 2.0, ZoomMode::Manual, ZoomScope::PerTab);
        assert_eq!(
            classify_notification(true, Some(1.5), &c),
            NotificationVerdict::Released
        );
        let c = change(1.5, 1.5, ZoomMode::Disabled, ZoomScope::PerTab);
        assert_eq!(
            classify_notification(true, Some(1.5), &c),
            NotificationVerdict::Released
        );
    }

    #[test]
    fn unchanged_zoom_is_spurious() {
        assert_eq!(
            classify_notification(true, Some(1.5), &per_tab(1.5, 1.505)),
            NotificationVerdict::Spurious
        );
        assert_eq!(
            classify_notification(true, None, &per_tab(2.0, 2.0)),
            NotificationVerdict::Spurious
        );
    }

    #[test]
    fn own_zoom_is_an_echo() {
        assert_eq!(
            classify_notification(true, Some(1.5), &per_tab(1.0, 1.5)),
            NotificationVerdict::Echo
        );
    }

    #[test]
    fn zoom_to_a_value_other_than_applied_is_an_override() {
        assert_eq!(
            classify_notification(true, Some(1.25), &per_tab(1.0, 1.5)),
            NotificationVerdict::Override
        );
    }

    #[test]
    fn zooming_away_from_applied_is_an_override() {
        // Zooming away from the applied value is an override.
        assert_eq!(
            classify_notification(true, Some(1.5), &per_tab(1.5, 1.0)),
            NotificationVerdict::Override
        );
        // Without a recorded zoom nothing can be an echo.
        assert_eq!(
            classify_notification(true, None, &per_tab(1.0, 1.5)),
            NotificationVerdict::Override
        );
    }
}
