//! Packing and unpacking of extension private data for session resumption.
//!
//! Blob layout, all integers big-endian:
//! `n_exts: u32 | repeat n_exts of { internal_id: u32 | size: u32 | body }`.
//! Within a body the format belongs to the individual extension's pack and
//! unpack callbacks.

use helloext_types::HelloExtError;

use crate::descriptor::{InternalId, ParseClass, MAX_INTERNAL_IDS};
use crate::session::HelloExtSession;

impl HelloExtSession {
    /// Serialize the live private data of every advertised extension that
    /// defines a pack callback. An extension that packs zero bytes is still
    /// counted.
    pub fn pack(&self, packed: &mut Vec<u8>) -> Result<(), HelloExtError> {
        let count_pos = packed.len();
        packed.extend_from_slice(&0u32.to_be_bytes());
        let mut n_exts = 0u32;

        for raw in 0..MAX_INTERNAL_IDS as u8 {
            let id = InternalId(raw);
            if !self.advertised.contains(id) {
                continue;
            }
            let Some(entry) = self.lookup(id, ParseClass::Any) else {
                continue;
            };
            let (Some(pack), Some(data)) = (&entry.pack, self.get_live(id)) else {
                continue;
            };

            packed.extend_from_slice(&(id.0 as u32).to_be_bytes());
            let size_pos = packed.len();
            packed.extend_from_slice(&0u32.to_be_bytes());
            let body_pos = packed.len();

            pack(data, packed)?;

            let size = (packed.len() - body_pos) as u32;
            packed[size_pos..size_pos + 4].copy_from_slice(&size.to_be_bytes());
            n_exts += 1;
        }

        packed[count_pos..count_pos + 4].copy_from_slice(&n_exts.to_be_bytes());
        Ok(())
    }

    /// Rebuild resumed private data from a blob produced by [`pack`] on the
    /// same build. Every record must name a known extension with an unpack
    /// callback, and each callback receives exactly the declared slice.
    ///
    /// [`pack`]: Self::pack
    pub fn unpack(&mut self, packed: &[u8]) -> Result<(), HelloExtError> {
        let mut pos = 0;
        let n_exts = read_u32(packed, &mut pos)?;

        for _ in 0..n_exts {
            let raw_id = read_u32(packed, &mut pos)?;
            let size = read_u32(packed, &mut pos)? as usize;
            if raw_id as usize >= MAX_INTERNAL_IDS || packed.len() - pos < size {
                return Err(HelloExtError::ParsingError);
            }
            let body = &packed[pos..pos + size];
            pos += size;

            let id = InternalId(raw_id as u8);
            let entry = self
                .lookup(id, ParseClass::Any)
                .ok_or(HelloExtError::ParsingError)?;
            let unpack = entry.unpack.clone().ok_or(HelloExtError::ParsingError)?;

            let data = unpack(body)?;
            self.set_resumed(id, data)?;
        }
        Ok(())
    }
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32, HelloExtError> {
    if data.len() - *pos < 4 {
        return Err(HelloExtError::ParsingError);
    }
    let value = u32::from_be_bytes([data[*pos], data[*pos + 1], data[*pos + 2], data[*pos + 3]]);
    *pos += 4;
    Ok(value)
}
