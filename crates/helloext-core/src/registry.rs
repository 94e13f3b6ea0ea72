//! Process-wide catalog of built-in hello extensions.
//!
//! The registry is populated during startup, before any session exists, and
//! then handed to sessions behind an [`Arc`]. The `&mut self` registration
//! API together with the `Arc` handoff is what freezes the catalog: once
//! shared it can only be read, from any thread, without synchronization.

use std::sync::Arc;

use helloext_types::HelloExtError;

use crate::builtin;
use crate::descriptor::{
    CustomExtension, ExtensionType, HelloExtEntry, InternalId, MAX_INTERNAL_IDS,
};

/// Capacity of the built-in table.
pub const MAX_BUILTIN_EXTS: usize = 32;

/// The ordered built-in tier of the extension catalog.
#[derive(Debug)]
pub struct HelloExtRegistry {
    entries: Vec<Arc<HelloExtEntry>>,
}

impl HelloExtRegistry {
    /// A registry preloaded with the default extension table.
    pub fn with_builtins() -> Self {
        Self {
            entries: builtin::builtin_entries(),
        }
    }

    /// A registry with no entries at all.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a process-wide extension.
    ///
    /// Fails with `AlreadyRegistered` when the wire id collides with an
    /// existing entry, and with `OutOfSpace` when the table or the internal
    /// id space is exhausted.
    pub fn register(&mut self, def: CustomExtension) -> Result<InternalId, HelloExtError> {
        for entry in &self.entries {
            if entry.wire_id == def.wire_id {
                return Err(HelloExtError::AlreadyRegistered {
                    wire_id: def.wire_id.0,
                });
            }
        }
        if self.entries.len() >= MAX_BUILTIN_EXTS {
            return Err(HelloExtError::OutOfSpace);
        }
        let id = self.next_id()?;
        self.entries.push(Arc::new(def.into_entry(id)));
        Ok(id)
    }

    /// Convert an extension wire id to its printable name. Only built-in
    /// entries carry public names.
    pub fn ext_name(&self, wire_id: ExtensionType) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.wire_id == wire_id)
            .map(|entry| entry.name.as_ref())
    }

    /// The first free internal id, strictly above every taken id.
    pub(crate) fn next_id(&self) -> Result<InternalId, HelloExtError> {
        let next = self
            .entries
            .iter()
            .map(|entry| entry.id.0 as usize + 1)
            .max()
            .unwrap_or(0);
        if next >= MAX_INTERNAL_IDS {
            return Err(HelloExtError::OutOfSpace);
        }
        Ok(InternalId(next as u8))
    }

    pub(crate) fn entries(&self) -> &[Arc<HelloExtEntry>] {
        &self.entries
    }

    pub(crate) fn by_wire(&self, wire_id: ExtensionType) -> Option<&Arc<HelloExtEntry>> {
        self.entries.iter().find(|entry| entry.wire_id == wire_id)
    }

    pub(crate) fn by_id(&self, id: InternalId) -> Option<&Arc<HelloExtEntry>> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}
