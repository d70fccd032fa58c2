//! Maps periodic-advertising sync handles to their negotiated antenna-pattern length.
//!
//! Connectionless IQ reports carry a sync handle and sample data, but not the length of the
//! antenna switching pattern that was requested when sampling was enabled. The registry
//! remembers that value from enable time so reports can be translated without it being
//! repeated on the wire.

use crate::Error;
use heapless::{consts::U8, FnvIndexMap};

/// Tag bit set on sync handles used as registry keys.
///
/// The controller's handle namespace overlaps connection handles; tagging sync handles keeps a
/// registry key from ever aliasing a connection handle.
pub const SYNC_HANDLE_TAG: u16 = 0x1000;

fn key(sync_handle: u16) -> u16 {
    sync_handle | SYNC_HANDLE_TAG
}

/// Antenna-pattern registry, at most one entry per sync handle.
pub struct AntennaRegistry {
    entries: FnvIndexMap<u16, u8, U8>,
}

impl AntennaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: FnvIndexMap::new(),
        }
    }

    /// Records `num_ant` for `sync_handle`, replacing any previous value.
    ///
    /// Updating an existing entry never fails; inserting a new entry fails with
    /// `Error::Memory` when the table is full.
    pub fn upsert(&mut self, sync_handle: u16, num_ant: u8) -> Result<(), Error> {
        let key = key(sync_handle);
        // update in place first: a full map must not fail an update of a key it already holds
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = num_ant;
            return Ok(());
        }
        self.entries
            .insert(key, num_ant)
            .map(|_| ())
            .map_err(|_| Error::Memory)
    }

    /// Returns the antenna-pattern length recorded for `sync_handle`, if any.
    pub fn lookup(&self, sync_handle: u16) -> Option<u8> {
        self.entries.get(&key(sync_handle)).copied()
    }

    /// Drops the entry for `sync_handle`. No-op if there is none.
    pub fn remove(&mut self, sync_handle: u16) {
        self.entries.remove(&key(sync_handle));
    }
}

impl Default for AntennaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_replaces_in_place() {
        let mut reg = AntennaRegistry::new();
        reg.upsert(0x0005, 5).unwrap();
        reg.upsert(0x0005, 9).unwrap();
        assert_eq!(reg.lookup(0x0005), Some(9));
        assert_eq!(reg.entries.len(), 1);
    }

    #[test]
    fn remove_then_lookup_misses() {
        let mut reg = AntennaRegistry::new();
        reg.upsert(0x0005, 4).unwrap();
        reg.remove(0x0005);
        assert_eq!(reg.lookup(0x0005), None);
        // removing again is a no-op
        reg.remove(0x0005);
    }

    #[test]
    fn full_table_rejects_new_entries_but_not_updates() {
        let mut reg = AntennaRegistry::new();
        for handle in 0..8 {
            reg.upsert(handle, 1).unwrap();
        }
        assert_eq!(reg.upsert(8, 1), Err(Error::Memory));
        // updates still succeed
        reg.upsert(3, 7).unwrap();
        assert_eq!(reg.lookup(3), Some(7));
    }

    #[test]
    fn keys_are_tagged() {
        let mut reg = AntennaRegistry::new();
        reg.upsert(0x0005, 4).unwrap();
        assert!(reg.entries.contains_key(&0x1005));
    }
}
