pub mod config;
pub mod origin;
pub mod types;

pub use config::{DaemonConfig, FusionStrategy, MetricWeights, Options};
pub use origin::{Origin, OriginError};
pub use types::*;
