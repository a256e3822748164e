//! autozoom-controller: decides when a page is zoomed automatically.
//!
//! The [`ZoomDecisionController`] consumes two event streams from the host:
//! page measurements (zoom proposals) and zoom-change notifications
//! (possible user overrides). Host access goes through
//! [`HostZoomService`]; persistent state lives in an
//! [`autozoom_state::OverrideTracker`].

pub mod controller;
pub mod error;
pub mod host;
pub mod state;

pub use controller::{DenyReason, MeasurementOutcome, NotificationOutcome, ZoomDecisionController};
pub use error::{ControllerError, ControllerResult};
pub use host::{HostCall, HostError, HostFuture, HostOp, HostTab, HostZoomService, InMemoryHost};
pub use state::{NotificationVerdict, TabState, classify_notification};
