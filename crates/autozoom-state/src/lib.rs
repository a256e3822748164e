//! autozoom-state: persistent state for AutoZoom.
//!
//! Everything AutoZoom remembers lives in one key/value table:
//!
//! - `listening/{tab_id}`: tabs whose next user zoom counts as an override
//! - `overridden/{origin}`: origins the user has taken control of
//! - `options`: the user options document (JSON)
//!
//! The [`KeyValueStore`] trait is the seam; [`StateStore`] implements it on
//! redb.

#[macro_use]
pub mod error;
pub mod locks;
pub mod options;
pub mod set;
pub mod store;
pub mod tables;
pub mod tracker;

pub use error::{StateError, StateResult};
pub use locks::KeyedLocks;
pub use options::OptionsStore;
pub use set::PersistentSet;
pub use store::{KeyValueStore, StateStore, StoreFuture};
pub use tracker::OverrideTracker;
