//! User options kept alongside the tracker sets.

use std::sync::Arc;

use autozoom_core::Options;
use tracing::debug;

use crate::error::StateResult;
use crate::store::KeyValueStore;

pub const OPTIONS_KEY: &str = "options";

/// Reads and writes the [`Options`] document as JSON.
pub struct OptionsStore {
    store: Arc<dyn KeyValueStore>,
}

impl OptionsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored options, or the defaults if none were saved. Fields missing
    /// from the stored document take their default values.
    pub async fn load(&self) -> StateResult<Options> {
        match self.store.get(OPTIONS_KEY).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(map_err!(Deserialize)),
            None => Ok(Options::default()),
        }
    }

    pub async fn save(&self, options: &Options) -> StateResult<()> {
        let bytes = serde_json::to_vec(options).map_err(map_err!(Serialize))?;
        self.store.set(OPTIONS_KEY, &bytes).await?;
        debug!(?options, "options saved");
        Ok(())
    }
}
