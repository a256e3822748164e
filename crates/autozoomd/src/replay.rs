//! Trace replay.
//!
//! Feeds a recorded event trace through a [`ZoomDecisionController`] backed
//! by an [`InMemoryHost`] and the persistent override store. Every zoom
//! change notification the host emits is fed back to the controller right
//! after the event that caused it.

use std::sync::Arc;

use autozoom_controller::{
    InMemoryHost, MeasurementOutcome, NotificationOutcome, ZoomDecisionController,
};
use autozoom_core::{Options, TabId};
use autozoom_state::OverrideTracker;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::trace::TraceEvent;

/// What happened while replaying one event or notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Measurement {
        tab_id: TabId,
        #[serde(flatten)]
        outcome: MeasurementOutcome,
    },
    Notification {
        tab_id: TabId,
        old_zoom: f64,
        new_zoom: f64,
        #[serde(flatten)]
        outcome: NotificationOutcome,
    },
    TabRemoved {
        tab_id: TabId,
        was_listening: bool,
    },
    TabReplaced {
        added_tab_id: TabId,
        may_auto_zoom: bool,
    },
    Restarted,
    Failed {
        event: usize,
        error: String,
    },
}

#[derive(Debug, Default, Serialize)]
pub struct ReplayReport {
    pub events: usize,
    pub zoomed: u32,
    pub overrides: u32,
    pub failures: u32,
    pub steps: Vec<Step>,
}

impl ReplayReport {
    fn push(&mut self, step: Step) {
        match &step {
            Step::Measurement {
                outcome: MeasurementOutcome::Zoomed { .. },
                ..
            } => self.zoomed += 1,
            Step::Notification {
                outcome: NotificationOutcome::Overridden { recorded: true, .. },
                ..
            } => self.overrides += 1,
            Step::Failed { .. } => self.failures += 1,
            _ => {}
        }
        self.steps.push(step);
    }
}

pub struct Replayer {
    host: Arc<InMemoryHost>,
    controller: ZoomDecisionController,
}

impl Replayer {
    pub fn new(tracker: Arc<OverrideTracker>, options: Options) -> Self {
        let host = Arc::new(InMemoryHost::new());
        let controller = ZoomDecisionController::new(host.clone(), tracker, options);
        Self { host, controller }
    }

    /// Replay all events. Failed events are reported and skipped.
    pub async fn run(&self, events: &[TraceEvent]) -> ReplayReport {
        let mut report = ReplayReport {
            events: events.len(),
            ..Default::default()
        };

        if let Err(e) = self.controller.on_startup().await {
            warn!(error = %e, "startup reset failed");
            report.push(Step::Failed {
                event: 0,
                error: e.to_string(),
            });
        }

        for (index, event) in events.iter().enumerate() {
            debug!(index, ?event, "replaying event");
            match self.apply(event).await {
                Ok(Some(step)) => report.push(step),
                Ok(None) => {}
                Err(error) => {
                    warn!(index, %error, "event failed");
                    report.push(Step::Failed {
                        event: index,
                        error,
                    });
                }
            }
            self.drain_notifications(index, &mut report).await;
        }

        info!(
            events = report.events,
            zoomed = report.zoomed,
            overrides = report.overrides,
            failures = report.failures,
            "replay finished"
        );
        report
    }

    async fn apply(&self, event: &TraceEvent) -> Result<Option<Step>, String> {
        let step = match event {
            TraceEvent::TabOpened { tab_id, tab } => {
                self.host.open_tab(*tab_id, tab.clone()).await;
                return Ok(None);
            }
            TraceEvent::Navigate { tab_id, url } => {
                self.host
                    .navigate(*tab_id, url)
                    .await
                    .map_err(|e| e.to_string())?;
                return Ok(None);
            }
            TraceEvent::UserZoom { tab_id, zoom } => {
                self.host
                    .user_zoom(*tab_id, *zoom)
                    .await
                    .map_err(|e| e.to_string())?;
                return Ok(None);
            }
            TraceEvent::Measurement { tab_id, page } => Step::Measurement {
                tab_id: *tab_id,
                outcome: self
                    .controller
                    .handle_measurement(*tab_id, page)
                    .await
                    .map_err(|e| e.to_string())?,
            },
            TraceEvent::TabRemoved { tab_id } => {
                self.host.close_tab(*tab_id).await;
                Step::TabRemoved {
                    tab_id: *tab_id,
                    was_listening: self
                        .controller
                        .on_tab_removed(*tab_id)
                        .await
                        .map_err(|e| e.to_string())?,
                }
            }
            TraceEvent::TabReplaced {
                added_tab_id,
                removed_tab_id,
            } => {
                self.host.close_tab(*removed_tab_id).await;
                Step::TabReplaced {
                    added_tab_id: *added_tab_id,
                    may_auto_zoom: self
                        .controller
                        .on_tab_replaced(*added_tab_id, *removed_tab_id)
                        .await
                        .map_err(|e| e.to_string())?,
                }
            }
            TraceEvent::Restart => {
                self.controller
                    .on_startup()
                    .await
                    .map_err(|e| e.to_string())?;
                Step::Restarted
            }
        };
        Ok(Some(step))
    }

    async fn drain_notifications(&self, index: usize, report: &mut ReplayReport) {
        loop {
            let pending = self.host.take_notifications().await;
            if pending.is_empty() {
                return;
            }
            for change in pending {
                match self.controller.handle_zoom_change(&change).await {
                    Ok(outcome) => report.push(Step::Notification {
                        tab_id: change.tab_id,
                        old_zoom: change.old_zoom_factor,
                        new_zoom: change.new_zoom_factor,
                        outcome,
                    }),
                    Err(e) => {
                        warn!(index, tab_id = change.tab_id, error = %e, "notification failed");
                        report.push(Step::Failed {
                            event: index,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
    }
}
