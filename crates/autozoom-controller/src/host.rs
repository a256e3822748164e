//! Host zoom service.
//!
//! [`HostZoomService`] is everything the controller needs from the browser
//! that owns the tabs. [`InMemoryHost`] is a faithful in-process model of
//! it: per-tab and per-origin zoom scopes, zoom-change notifications, a log
//! of every call, and switchable failures. Tests and trace replay run the
//! controller against it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;

use autozoom_core::{
    Origin, TabId, TabZoomSettings, ZoomChangeInfo, ZoomMode, ZoomScope, ZoomSettings,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

pub type HostFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, HostError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("no such tab: {0}")]
    NoSuchTab(TabId),

    #[error("host unavailable: {0}")]
    Unavailable(String),
}

/// Zoom control over the host's tabs.
pub trait HostZoomService: Send + Sync {
    fn get_zoom(&self, tab_id: TabId) -> HostFuture<'_, f64>;

    fn get_zoom_settings(&self, tab_id: TabId) -> HostFuture<'_, TabZoomSettings>;

    fn set_zoom(&self, tab_id: TabId, zoom: f64) -> HostFuture<'_, ()>;

    /// Change the zoom scope of a tab. The mode is left as it is.
    fn set_zoom_settings(&self, tab_id: TabId, scope: ZoomScope) -> HostFuture<'_, ()>;

    /// URL of the document currently shown in the tab.
    fn get_tab_url(&self, tab_id: TabId) -> HostFuture<'_, String>;
}

// ── In-memory host ─────────────────────────────────────────────────

/// Operations of [`HostZoomService`], for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostOp {
    GetZoom,
    GetZoomSettings,
    SetZoom,
    SetZoomSettings,
    GetTabUrl,
}

/// One recorded call into the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum HostCall {
    GetZoom(TabId),
    GetZoomSettings(TabId),
    SetZoom(TabId, f64),
    SetZoomSettings(TabId, ZoomScope),
    GetTabUrl(TabId),
}

impl HostCall {
    pub fn op(&self) -> HostOp {
        match self {
            HostCall::GetZoom(_) => HostOp::GetZoom,
            HostCall::GetZoomSettings(_) => HostOp::GetZoomSettings,
            HostCall::SetZoom(..) => HostOp::SetZoom,
            HostCall::SetZoomSettings(..) => HostOp::SetZoomSettings,
            HostCall::GetTabUrl(_) => HostOp::GetTabUrl,
        }
    }

    /// Whether the call changes host state.
    pub fn is_mutation(&self) -> bool {
        matches!(self, HostCall::SetZoom(..) | HostCall::SetZoomSettings(..))
    }
}

/// Initial state of a tab opened in an [`InMemoryHost`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostTab {
    pub url: String,
    #[serde(default = "default_mode")]
    pub mode: ZoomMode,
    #[serde(default = "default_scope")]
    pub scope: ZoomScope,
    #[serde(default = "default_zoom_factor")]
    pub default_zoom_factor: f64,
}

fn default_mode() -> ZoomMode {
    ZoomMode::Automatic
}

fn default_scope() -> ZoomScope {
    ZoomScope::PerOrigin
}

fn default_zoom_factor() -> f64 {
    1.0
}

impl HostTab {
    /// An automatic, per-origin tab at zoom 1.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            mode: default_mode(),
            scope: default_scope(),
            default_zoom_factor: default_zoom_factor(),
        }
    }

    pub fn with_mode(mut self, mode: ZoomMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_scope(mut self, scope: ZoomScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_default_zoom(mut self, zoom: f64) -> Self {
        self.default_zoom_factor = zoom;
        self
    }
}

struct TabEntry {
    tab: HostTab,
    /// Zoom used while the scope is per-tab.
    tab_zoom: f64,
}

impl TabEntry {
    fn settings(&self) -> ZoomSettings {
        ZoomSettings::new(self.tab.mode, self.tab.scope)
    }

    fn origin_key(&self) -> String {
        Origin::from_url(&self.tab.url)
            .map(|origin| origin.to_string())
            .unwrap_or_else(|_| self.tab.url.clone())
    }
}

#[derive(Default)]
struct HostInner {
    tabs: HashMap<TabId, TabEntry>,
    /// Zoom shared by all per-origin tabs of an origin.
    origin_zooms: HashMap<String, f64>,
    notifications: VecDeque<ZoomChangeInfo>,
    calls: Vec<HostCall>,
    failing: HashSet<HostOp>,
}

impl HostInner {
    fn record(&mut self, call: HostCall) -> Result<(), HostError> {
        let op = call.op();
        self.calls.push(call);
        if self.failing.contains(&op) {
            return Err(HostError::Unavailable(format!("{op:?} failed")));
        }
        Ok(())
    }

    fn entry(&self, tab_id: TabId) -> Result<&TabEntry, HostError> {
        self.tabs.get(&tab_id).ok_or(HostError::NoSuchTab(tab_id))
    }

    fn effective_zoom(&self, tab_id: TabId) -> Result<f64, HostError> {
        let entry = self.entry(tab_id)?;
        Ok(match entry.tab.scope {
            ZoomScope::PerTab => entry.tab_zoom,
            ZoomScope::PerOrigin => self
                .origin_zooms
                .get(&entry.origin_key())
                .copied()
                .unwrap_or(entry.tab.default_zoom_factor),
        })
    }

    fn notify(&mut self, tab_id: TabId, old: f64, new: f64, settings: ZoomSettings) {
        debug!(tab_id, old, new, ?settings, "zoom change notification");
        self.notifications.push_back(ZoomChangeInfo {
            tab_id,
            old_zoom_factor: old,
            new_zoom_factor: new,
            zoom_settings: settings,
        });
    }

    /// Set the zoom the way the tab's scope dictates. A per-origin change
    /// reaches every per-origin tab showing the same origin.
    fn apply_zoom(&mut self, tab_id: TabId, zoom: f64) -> Result<(), HostError> {
        let entry = self.entry(tab_id)?;
        match entry.tab.scope {
            ZoomScope::PerTab => {
                let old = entry.tab_zoom;
                let settings = entry.settings();
                if let Some(entry) = self.tabs.get_mut(&tab_id) {
                    entry.tab_zoom = zoom;
                }
                if old != zoom {
                    self.notify(tab_id, old, zoom, settings);
                }
            }
            ZoomScope::PerOrigin => {
                let origin = entry.origin_key();
                let mut affected = Vec::new();
                for (&id, other) in &self.tabs {
                    if other.tab.scope == ZoomScope::PerOrigin && other.origin_key() == origin {
                        affected.push((id, self.effective_zoom(id)?, other.settings()));
                    }
                }
                self.origin_zooms.insert(origin, zoom);
                for (id, old, settings) in affected {
                    if old != zoom {
                        self.notify(id, old, zoom, settings);
                    }
                }
            }
        }
        Ok(())
    }

    fn change_scope(&mut self, tab_id: TabId, scope: ZoomScope) -> Result<(), HostError> {
        let old = self.effective_zoom(tab_id)?;
        let Some(entry) = self.tabs.get_mut(&tab_id) else {
            return Err(HostError::NoSuchTab(tab_id));
        };
        if entry.tab.scope == scope {
            return Ok(());
        }
        if scope == ZoomScope::PerTab {
            entry.tab_zoom = old;
        }
        entry.tab.scope = scope;
        let settings = entry.settings();
        let new = self.effective_zoom(tab_id)?;
        self.notify(tab_id, old, new, settings);
        Ok(())
    }
}

/// In-process [`HostZoomService`].
#[derive(Default)]
pub struct InMemoryHost {
    inner: Mutex<HostInner>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open_tab(&self, tab_id: TabId, tab: HostTab) {
        let mut inner = self.inner.lock().await;
        let tab_zoom = tab.default_zoom_factor;
        debug!(tab_id, url = %tab.url, "tab opened");
        inner.tabs.insert(tab_id, TabEntry { tab, tab_zoom });
    }

    /// Returns whether the tab existed.
    pub async fn close_tab(&self, tab_id: TabId) -> bool {
        let mut inner = self.inner.lock().await;
        inner.tabs.remove(&tab_id).is_some()
    }

    /// Show another document in the tab. Zoom settings stay as they are.
    pub async fn navigate(&self, tab_id: TabId, url: &str) -> Result<(), HostError> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .tabs
            .get_mut(&tab_id)
            .ok_or(HostError::NoSuchTab(tab_id))?;
        entry.tab.url = url.to_string();
        Ok(())
    }

    /// Zoom the tab as the user would. Not recorded as a call.
    pub async fn user_zoom(&self, tab_id: TabId, zoom: f64) -> Result<(), HostError> {
        let mut inner = self.inner.lock().await;
        inner.apply_zoom(tab_id, zoom)
    }

    /// Make every later call of `op` fail.
    pub async fn fail(&self, op: HostOp) {
        self.inner.lock().await.failing.insert(op);
    }

    pub async fn recover(&self, op: HostOp) {
        self.inner.lock().await.failing.remove(&op);
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<HostCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Calls that change host state.
    pub async fn mutations(&self) -> Vec<HostCall> {
        let inner = self.inner.lock().await;
        inner
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    /// Drain pending zoom-change notifications.
    pub async fn take_notifications(&self) -> Vec<ZoomChangeInfo> {
        self.inner.lock().await.notifications.drain(..).collect()
    }

    pub async fn zoom_of(&self, tab_id: TabId) -> Option<f64> {
        self.inner.lock().await.effective_zoom(tab_id).ok()
    }

    pub async fn scope_of(&self, tab_id: TabId) -> Option<ZoomScope> {
        let inner = self.inner.lock().await;
        inner.tabs.get(&tab_id).map(|entry| entry.tab.scope)
    }
}

impl HostZoomService for InMemoryHost {
    fn get_zoom(&self, tab_id: TabId) -> HostFuture<'_, f64> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.record(HostCall::GetZoom(tab_id))?;
            inner.effective_zoom(tab_id)
        })
    }

    fn get_zoom_settings(&self, tab_id: TabId) -> HostFuture<'_, TabZoomSettings> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.record(HostCall::GetZoomSettings(tab_id))?;
            let entry = inner.entry(tab_id)?;
            Ok(TabZoomSettings {
                mode: entry.tab.mode,
                scope: entry.tab.scope,
                default_zoom_factor: entry.tab.default_zoom_factor,
            })
        })
    }

    fn set_zoom(&self, tab_id: TabId, zoom: f64) -> HostFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.record(HostCall::SetZoom(tab_id, zoom))?;
            inner.apply_zoom(tab_id, zoom)
        })
    }

    fn set_zoom_settings(&self, tab_id: TabId, scope: ZoomScope) -> HostFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.record(HostCall::SetZoomSettings(tab_id, scope))?;
            inner.change_scope(tab_id, scope)
        })
    }

    fn get_tab_url(&self, tab_id: TabId) -> HostFuture<'_, String> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.record(HostCall::GetTabUrl(tab_id))?;
            Ok(inner.entry(tab_id)?.tab.url.clone())
        })
    }
}
