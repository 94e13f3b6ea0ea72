//! Per-session extension state: the overlay catalog tier, the private-data
//! slot table, and the advertisement set.

use std::any::Any;
use std::sync::Arc;

use helloext_types::HelloExtError;

use crate::descriptor::{
    CustomExtension, ExtPrivData, ExtensionType, HelloExtEntry, InternalId, ParseClass,
    MAX_INTERNAL_IDS,
};
use crate::registry::HelloExtRegistry;
use crate::TlsRole;

/// Capacity of the per-session private-data slot table.
pub const MAX_EXT_DATA_SLOTS: usize = 32;

/// One bit per internal id: which extensions this session has sent (client)
/// or received (server).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AdvertisedSet(u64);

impl AdvertisedSet {
    pub(crate) fn contains(self, id: InternalId) -> bool {
        self.0 & (1u64 << id.0) != 0
    }

    /// Returns false when the bit was already set.
    pub(crate) fn insert(&mut self, id: InternalId) -> bool {
        let bit = 1u64 << id.0;
        let fresh = self.0 & bit == 0;
        self.0 |= bit;
        fresh
    }
}

/// One slot of the state table. The live and resumed sides are owned and
/// dropped independently; a slot may carry both at once so an extension can
/// compare resumed state against freshly negotiated state.
struct ExtDataSlot {
    id: InternalId,
    live: Option<ExtPrivData>,
    resumed: Option<ExtPrivData>,
}

/// Per-session view of the extension engine.
///
/// Owns the session overlay (searched before the registry built-ins), the
/// private-data table, and the advertisement set. All extension private data
/// is deinitialized when the session drops.
pub struct HelloExtSession {
    registry: Arc<HelloExtRegistry>,
    role: TlsRole,
    overlay: Vec<Arc<HelloExtEntry>>,
    slots: Vec<ExtDataSlot>,
    pub(crate) advertised: AdvertisedSet,
}

impl std::fmt::Debug for HelloExtSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelloExtSession")
            .field("role", &self.role)
            .field("overlay", &self.overlay)
            .field("slots", &self.slots.len())
            .field("advertised", &self.advertised)
            .finish_non_exhaustive()
    }
}

impl HelloExtSession {
    pub fn new(registry: Arc<HelloExtRegistry>, role: TlsRole) -> Self {
        Self {
            registry,
            role,
            overlay: Vec::new(),
            slots: Vec::new(),
            advertised: AdvertisedSet::default(),
        }
    }

    pub fn role(&self) -> TlsRole {
        self.role
    }

    pub(crate) fn registry(&self) -> &Arc<HelloExtRegistry> {
        &self.registry
    }

    pub(crate) fn overlay_len(&self) -> usize {
        self.overlay.len()
    }

    pub(crate) fn overlay_entry(&self, idx: usize) -> Option<Arc<HelloExtEntry>> {
        self.overlay.get(idx).cloned()
    }

    // -----------------------------------------------------------------------
    // Catalog view: overlay over built-ins
    // -----------------------------------------------------------------------

    /// Find the effective descriptor for an internal id, overlay first. A
    /// non-`Any` parse class that differs from the entry's class hides it.
    pub(crate) fn lookup(&self, id: InternalId, parse_class: ParseClass) -> Option<Arc<HelloExtEntry>> {
        let entry = self
            .overlay
            .iter()
            .find(|entry| entry.id == id)
            .or_else(|| self.registry.by_id(id))?;
        if parse_class != ParseClass::Any && entry.parse_class != parse_class {
            return None;
        }
        Some(Arc::clone(entry))
    }

    /// Resolve a wire id to the effective internal id, overlay first.
    pub(crate) fn wire_to_id(&self, wire_id: ExtensionType) -> Option<InternalId> {
        self.overlay
            .iter()
            .find(|entry| entry.wire_id == wire_id)
            .or_else(|| self.registry.by_wire(wire_id))
            .map(|entry| entry.id)
    }

    /// Register a session-scoped extension, eclipsing a built-in at the same
    /// wire id when `allow_override` is set and the built-in permits it.
    pub fn register(
        &mut self,
        def: CustomExtension,
        allow_override: bool,
    ) -> Result<InternalId, HelloExtError> {
        if let Some(builtin) = self.registry.by_wire(def.wire_id) {
            if !allow_override || !builtin.overridable {
                return Err(HelloExtError::AlreadyRegistered {
                    wire_id: def.wire_id.0,
                });
            }
        }
        for entry in &self.overlay {
            if entry.wire_id == def.wire_id {
                return Err(HelloExtError::AlreadyRegistered {
                    wire_id: def.wire_id.0,
                });
            }
        }

        // New ids go strictly above anything taken in either tier.
        let mut next = self.registry.next_id()?.0 as usize;
        for entry in &self.overlay {
            next = next.max(entry.id.0 as usize + 1);
        }
        if next >= MAX_INTERNAL_IDS {
            return Err(HelloExtError::OutOfSpace);
        }
        let id = InternalId(next as u8);
        self.overlay.push(Arc::new(def.into_entry(id)));
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Private-data table, keyed by internal id
    // -----------------------------------------------------------------------

    /// Slot for `id`, or a fully vacant slot to recycle, or a fresh one.
    fn slot_for(&mut self, id: InternalId) -> Result<&mut ExtDataSlot, HelloExtError> {
        let idx = match self.slots.iter().position(|slot| slot.id == id) {
            Some(idx) => idx,
            None => match self
                .slots
                .iter()
                .position(|slot| slot.live.is_none() && slot.resumed.is_none())
            {
                Some(idx) => {
                    self.slots[idx].id = id;
                    idx
                }
                None => {
                    if self.slots.len() >= MAX_EXT_DATA_SLOTS {
                        return Err(HelloExtError::Internal(
                            "extension data table full".into(),
                        ));
                    }
                    self.slots.push(ExtDataSlot {
                        id,
                        live: None,
                        resumed: None,
                    });
                    self.slots.len() - 1
                }
            },
        };
        Ok(&mut self.slots[idx])
    }

    /// Store live private data, dropping any previous value for the id.
    pub fn set_live(&mut self, id: InternalId, data: ExtPrivData) -> Result<(), HelloExtError> {
        self.slot_for(id)?.live = Some(data);
        Ok(())
    }

    pub fn get_live(&self, id: InternalId) -> Option<&(dyn Any + Send)> {
        self.slots
            .iter()
            .find(|slot| slot.id == id)
            .and_then(|slot| slot.live.as_deref())
    }

    pub fn get_live_mut(&mut self, id: InternalId) -> Option<&mut (dyn Any + Send)> {
        self.slots
            .iter_mut()
            .find(|slot| slot.id == id)
            .and_then(|slot| slot.live.as_deref_mut())
    }

    /// Store resumed private data, dropping any previous value for the id.
    pub fn set_resumed(&mut self, id: InternalId, data: ExtPrivData) -> Result<(), HelloExtError> {
        self.slot_for(id)?.resumed = Some(data);
        Ok(())
    }

    pub fn get_resumed(&self, id: InternalId) -> Option<&(dyn Any + Send)> {
        self.slots
            .iter()
            .find(|slot| slot.id == id)
            .and_then(|slot| slot.resumed.as_deref())
    }

    pub fn unset_live(&mut self, id: InternalId) {
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.id == id) {
            slot.live = None;
        }
    }

    pub fn unset_resumed(&mut self, id: InternalId) {
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.id == id) {
            slot.resumed = None;
        }
    }

    // -----------------------------------------------------------------------
    // Wire-id keyed accessors for extension modules
    // -----------------------------------------------------------------------

    /// Store private data for the extension registered at `wire_id`.
    pub fn set_ext_data(
        &mut self,
        wire_id: ExtensionType,
        data: ExtPrivData,
    ) -> Result<(), HelloExtError> {
        let id = self
            .wire_to_id(wire_id)
            .ok_or(HelloExtError::DataNotAvailable)?;
        self.set_live(id, data)
    }

    /// Retrieve private data previously stored with [`set_ext_data`] or set
    /// by the extension's receive callback.
    ///
    /// [`set_ext_data`]: Self::set_ext_data
    pub fn get_ext_data(&self, wire_id: ExtensionType) -> Result<&(dyn Any + Send), HelloExtError> {
        let id = self
            .wire_to_id(wire_id)
            .ok_or(HelloExtError::DataNotAvailable)?;
        self.get_live(id).ok_or(HelloExtError::DataNotAvailable)
    }

    /// Retrieve private data materialized by a resumption unpack.
    pub fn get_resumed_ext_data(
        &self,
        wire_id: ExtensionType,
    ) -> Result<&(dyn Any + Send), HelloExtError> {
        let id = self
            .wire_to_id(wire_id)
            .ok_or(HelloExtError::DataNotAvailable)?;
        self.get_resumed(id).ok_or(HelloExtError::DataNotAvailable)
    }
}
