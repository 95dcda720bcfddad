//! Caller-facing connection assembly.

use crate::conn::Connection;
use crate::connect_point::{self, EntryType, SearchPathEntry};
use crate::error::Error;
use std::sync::Mutex;

/// Assembles the connect-point search path and produces a [`Connection`].
///
/// Thread-safe: `prepend_entry` may be called concurrently with itself, and
/// `connect` takes a snapshot of the builder's state so a concurrent
/// reconfiguration never races with an in-flight connect.
#[derive(Default)]
pub struct ConnBuilder {
    entries: Mutex<Vec<SearchPathEntry>>,
}

impl ConnBuilder {
    pub fn new() -> Self {
        ConnBuilder::default()
    }

    /// Prepends a single entry to the connect-point search path. It will be
    /// considered after any `ARTI_RPC_CONNECT_PATH_OVERRIDE` entry but before
    /// anything from `ARTI_RPC_CONNECT_PATH` or the built-in defaults.
    pub fn prepend_entry(&self, entry_type: EntryType, text: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap();
        entries.push(SearchPathEntry::new(entry_type, text.into()));
    }

    /// Resolves the search path and returns the first usable, authenticated
    /// connection.
    pub fn connect(&self) -> Result<Connection, Error> {
        let snapshot = self.entries.lock().unwrap().clone();
        let path = connect_point::path::build(snapshot);
        connect_point::evaluate(&path)
    }
}
