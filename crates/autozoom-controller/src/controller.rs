//! Zoom decision controller. Drives the per-tab override state machine.
//!
//! ```text
//!           measurement, permitted
//!   Idle ──────────────────────────▶ Tracking { origin, applied_zoom }
//!    ▲                                   │
//!    │   override / released / closed    │
//!    └───────────────────────────────────┘
//! ```
//!
//! A tab is auto-zoomed only while the host zooms it automatically per
//! origin, its origin has not been overridden, and it still shows the
//! default zoom. Once zoomed, the tab is moved to a per-tab scope and
//! listened to: the next zoom change that the controller did not cause
//! is a user override, and the origin is left alone from then on.
//!
//! All transitions of one tab run under that tab's lock.

use std::collections::HashMap;
use std::sync::Arc;

use autozoom_core::origin::is_auto_zoomable_url;
use autozoom_core::{
    MAX_ZOOM, MIN_ZOOM, Options, Origin, PageInfo, TabId, ZoomChangeInfo, ZoomMode, ZoomScope,
    zoom_values_equal,
};
use autozoom_state::{KeyedLocks, OverrideTracker};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::error::ControllerResult;
use crate::host::HostZoomService;
use crate::state::{NotificationVerdict, TabState, classify_notification};

/// Why a tab may not be auto-zoomed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Not an http or https document.
    UnsupportedUrl,
    /// The host failed to answer the permission queries.
    HostUnavailable,
    NotAutomatic,
    NotPerOrigin,
    /// The user has overridden auto-zoom for the origin.
    Overridden,
    /// The tab no longer shows the default zoom.
    ZoomChanged,
}

/// Result of handling one page measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MeasurementOutcome {
    Denied { reason: DenyReason },
    /// The current zoom already matches; the tab is tracked at it.
    Unchanged { zoom: f64 },
    Zoomed { from: f64, to: f64 },
}

/// Result of handling one zoom-change notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Ignored { verdict: NotificationVerdict },
    Released,
    /// The user overrode the applied zoom. `recorded` is false when the
    /// origin is unknown.
    Overridden {
        origin: Option<Origin>,
        recorded: bool,
    },
}

enum Permission {
    Granted { origin: Origin, default_zoom: f64 },
    Denied(DenyReason),
}

pub struct ZoomDecisionController {
    host: Arc<dyn HostZoomService>,
    tracker: Arc<OverrideTracker>,
    options: RwLock<Options>,
    tabs: Mutex<HashMap<TabId, TabState>>,
    locks: KeyedLocks,
}

impl ZoomDecisionController {
    pub fn new(
        host: Arc<dyn HostZoomService>,
        tracker: Arc<OverrideTracker>,
        options: Options,
    ) -> Self {
        Self {
            host,
            tracker,
            options: RwLock::new(options),
            tabs: Mutex::new(HashMap::new()),
            locks: KeyedLocks::new(),
        }
    }

    pub async fn options(&self) -> Options {
        self.options.read().await.clone()
    }

    /// Replace the options. Applies from the next event on.
    pub async fn set_options(&self, options: Options) {
        *self.options.write().await = options;
    }

    pub async fn tab_state(&self, tab_id: TabId) -> TabState {
        let tabs = self.tabs.lock().await;
        tabs.get(&tab_id).cloned().unwrap_or_default()
    }

    async fn set_tab_state(&self, tab_id: TabId, state: TabState) {
        let mut tabs = self.tabs.lock().await;
        match state {
            TabState::Idle => tabs.remove(&tab_id),
            tracking => tabs.insert(tab_id, tracking),
        };
    }

    async fn lock_tab(&self, tab_id: TabId) -> OwnedMutexGuard<()> {
        self.locks.lock(&tab_id.to_string()).await
    }

    /// Reset after a host restart. Tab ids from before are meaningless;
    /// overrides are kept.
    pub async fn on_startup(&self) -> ControllerResult<()> {
        self.tracker.clear_all_listening().await?;
        self.tabs.lock().await.clear();
        info!("controller started, listening state reset");
        Ok(())
    }

    /// Whether the tab's current document may be auto-zoomed.
    pub async fn may_auto_zoom(&self, tab_id: TabId) -> ControllerResult<bool> {
        let _guard = self.lock_tab(tab_id).await;
        let options = self.options().await;
        let permission = self.check_permission(tab_id, &options).await?;
        Ok(matches!(permission, Permission::Granted { .. }))
    }

    /// Host failures deny; storage failures propagate. Never mutates host
    /// state.
    async fn check_permission(
        &self,
        tab_id: TabId,
        options: &Options,
    ) -> ControllerResult<Permission> {
        let url = match self.host.get_tab_url(tab_id).await {
            Ok(url) => url,
            Err(e) => {
                warn!(tab_id, error = %e, "cannot read tab url");
                return Ok(Permission::Denied(DenyReason::HostUnavailable));
            }
        };
        if !is_auto_zoomable_url(&url) {
            return Ok(Permission::Denied(DenyReason::UnsupportedUrl));
        }
        let Ok(origin) = Origin::from_url(&url) else {
            return Ok(Permission::Denied(DenyReason::UnsupportedUrl));
        };

        let settings = match self.host.get_zoom_settings(tab_id).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(tab_id, error = %e, "cannot read zoom settings");
                return Ok(Permission::Denied(DenyReason::HostUnavailable));
            }
        };
        if settings.mode != ZoomMode::Automatic {
            return Ok(Permission::Denied(DenyReason::NotAutomatic));
        }
        if settings.scope != ZoomScope::PerOrigin {
            return Ok(Permission::Denied(DenyReason::NotPerOrigin));
        }

        let granted = Permission::Granted {
            origin: origin.clone(),
            default_zoom: settings.default_zoom_factor,
        };
        if options.ignore_overrides {
            return Ok(granted);
        }

        if self.tracker.is_overridden(&origin).await? {
            return Ok(Permission::Denied(DenyReason::Overridden));
        }
        match self.host.get_zoom(tab_id).await {
            Ok(zoom) if zoom_values_equal(zoom, settings.default_zoom_factor) => Ok(granted),
            Ok(_) => Ok(Permission::Denied(DenyReason::ZoomChanged)),
            Err(e) => {
                warn!(tab_id, error = %e, "cannot read zoom");
                Ok(Permission::Denied(DenyReason::HostUnavailable))
            }
        }
    }

    /// Decide and apply a zoom for a freshly measured document.
    pub async fn handle_measurement(
        &self,
        tab_id: TabId,
        page: &PageInfo,
    ) -> ControllerResult<MeasurementOutcome> {
        let _guard = self.lock_tab(tab_id).await;
        let options = self.options().await;

        let (origin, default_zoom) = match self.check_permission(tab_id, &options).await? {
            Permission::Granted {
                origin,
                default_zoom,
            } => (origin, default_zoom),
            Permission::Denied(reason) => {
                debug!(tab_id, ?reason, "auto-zoom not permitted");
                return Ok(MeasurementOutcome::Denied { reason });
            }
        };

        self.tracker.stop_listening(tab_id).await?;
        self.set_tab_state(tab_id, TabState::Idle).await;

        // Keep later user zooms from leaking to the whole origin.
        self.host
            .set_zoom_settings(tab_id, ZoomScope::PerTab)
            .await?;
        let current = self.host.get_zoom(tab_id).await?;

        let recommendation = autozoom_fusion::recommend(page, &options, default_zoom, current);
        let (applied_zoom, outcome) = match recommendation.zoom {
            Some(zoom) => {
                let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
                if zoom_values_equal(zoom, current) {
                    (current, MeasurementOutcome::Unchanged { zoom: current })
                } else {
                    self.host.set_zoom(tab_id, zoom).await?;
                    (
                        zoom,
                        MeasurementOutcome::Zoomed {
                            from: current,
                            to: zoom,
                        },
                    )
                }
            }
            None => {
                debug!(tab_id, "no metric carried weight, keeping zoom");
                (current, MeasurementOutcome::Unchanged { zoom: current })
            }
        };

        self.tracker.start_listening(tab_id).await?;
        self.set_tab_state(
            tab_id,
            TabState::Tracking {
                origin: origin.clone(),
                applied_zoom,
            },
        )
        .await;

        info!(tab_id, %origin, ?outcome, "measurement handled");
        Ok(outcome)
    }

    /// React to a zoom-change notification from the host.
    pub async fn handle_zoom_change(
        &self,
        change: &ZoomChangeInfo,
    ) -> ControllerResult<NotificationOutcome> {
        let tab_id = change.tab_id;
        let _guard = self.lock_tab(tab_id).await;

        let listening = self.tracker.is_listening(tab_id).await?;
        let state = self.tab_state(tab_id).await;
        let verdict = classify_notification(listening, state.applied_zoom(), change);
        debug!(
            tab_id,
            old = change.old_zoom_factor,
            new = change.new_zoom_factor,
            ?verdict,
            "zoom change classified"
        );

        match verdict {
            NotificationVerdict::Released => {
                self.tracker.stop_listening(tab_id).await?;
                self.set_tab_state(tab_id, TabState::Idle).await;
                info!(tab_id, "tab left automatic per-tab zoom");
                Ok(NotificationOutcome::Released)
            }
            NotificationVerdict::Override => self.record_override(tab_id, state).await,
            verdict => Ok(NotificationOutcome::Ignored { verdict }),
        }
    }

    async fn record_override(
        &self,
        tab_id: TabId,
        previous: TabState,
    ) -> ControllerResult<NotificationOutcome> {
        self.tracker.stop_listening(tab_id).await?;
        self.set_tab_state(tab_id, TabState::Idle).await;

        // With overrides ignored the next auto-zoom switches to per-tab
        // again anyway, and a reset would jump to any origin zoom exception.
        if !self.options().await.ignore_overrides
            && let Err(e) = self
                .host
                .set_zoom_settings(tab_id, ZoomScope::PerOrigin)
                .await
        {
            warn!(tab_id, error = %e, "cannot reset zoom scope");
        }

        let current = match self.host.get_tab_url(tab_id).await {
            Ok(url) => Origin::from_url(&url).ok(),
            Err(e) => {
                warn!(tab_id, error = %e, "cannot read tab url, using tracked origin");
                None
            }
        };
        let Some(origin) = current.or_else(|| previous.origin().cloned()) else {
            warn!(tab_id, "override on a tab with no known origin");
            return Ok(NotificationOutcome::Overridden {
                origin: None,
                recorded: false,
            });
        };

        self.tracker.mark_overridden(&origin).await?;
        info!(tab_id, %origin, "auto-zoom overridden by user");
        Ok(NotificationOutcome::Overridden {
            origin: Some(origin),
            recorded: true,
        })
    }

    /// Forget a closed tab. Returns whether it was listening.
    pub async fn on_tab_removed(&self, tab_id: TabId) -> ControllerResult<bool> {
        let _guard = self.lock_tab(tab_id).await;
        let was_listening = self.tracker.stop_listening(tab_id).await?;
        self.set_tab_state(tab_id, TabState::Idle).await;
        debug!(tab_id, was_listening, "tab removed");
        Ok(was_listening)
    }

    /// The host swapped `removed` for `added` (prerender, instant pages).
    /// Returns whether `added` may be auto-zoomed, so the host can ask for
    /// a measurement.
    pub async fn on_tab_replaced(
        &self,
        added: TabId,
        removed: TabId,
    ) -> ControllerResult<bool> {
        self.on_tab_removed(removed).await?;
        self.may_auto_zoom(added).await
    }
}
