//! Error types for the decision controller.

use autozoom_state::StateError;
use thiserror::Error;

use crate::host::HostError;

pub type ControllerResult<T> = Result<T, ControllerError>;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("storage: {0}")]
    Storage(#[from] StateError),

    #[error("host: {0}")]
    Host(#[from] HostError),
}
