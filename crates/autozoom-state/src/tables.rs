//! redb table definitions for the AutoZoom state store.
//!
//! A single table holds every entry. Keys are namespaced by prefix:
//! `listening/{tab_id}`, `overridden/{origin}` and `options`.

use redb::TableDefinition;

/// All key/value entries.
pub const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");
