//! Inbound and outbound dispatch of the hello extension block.
//!
//! The inbound block is the TLV concatenation with the outer 16-bit length
//! already stripped by the handshake framer. The outbound block is written
//! with a reserved outer length that is back-patched after the walk.

use std::sync::Arc;

use helloext_types::HelloExtError;
use log::{debug, trace};

use crate::descriptor::{ExtensionType, HelloExtEntry, HelloMsg, ParseClass, SendStatus};
use crate::session::HelloExtSession;
use crate::TlsRole;

impl HelloExtSession {
    /// Parse an inbound extension block, dispatching each TLV to the
    /// matching descriptor's receive callback.
    ///
    /// Unknown extensions and extensions without a receive callback are
    /// skipped. Framing violations, unsolicited or duplicated extensions,
    /// and validity-mask violations abort the handshake.
    pub fn parse(
        &mut self,
        msg: HelloMsg,
        parse_class: ParseClass,
        data: &[u8],
    ) -> Result<(), HelloExtError> {
        let mut pos = 0;
        while pos < data.len() {
            if data.len() - pos < 4 {
                return Err(HelloExtError::MalformedBlock);
            }
            let wire_id = ExtensionType(u16::from_be_bytes([data[pos], data[pos + 1]]));
            let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            pos += 4;
            if data.len() - pos < len {
                return Err(HelloExtError::MalformedBlock);
            }
            let body = &data[pos..pos + len];
            pos += len;
            self.parse_one(msg, parse_class, wire_id, body)?;
        }
        Ok(())
    }

    fn parse_one(
        &mut self,
        msg: HelloMsg,
        parse_class: ParseClass,
        wire_id: ExtensionType,
        body: &[u8],
    ) -> Result<(), HelloExtError> {
        let Some(id) = self.wire_to_id(wire_id) else {
            trace!("ignoring unknown extension {wire_id}");
            return Ok(());
        };

        // A server must not send an extension the client did not offer.
        if self.role() == TlsRole::Client && !self.advertised.contains(id) {
            debug!("received unexpected extension {wire_id}");
            return Err(HelloExtError::Unsolicited { wire_id: wire_id.0 });
        }

        let entry = match self.lookup(id, parse_class) {
            Some(entry) => entry,
            None => return Ok(()),
        };
        let Some(recv) = entry.recv.clone() else {
            trace!("ignoring extension '{}/{wire_id}'", entry.name);
            return Ok(());
        };

        if !entry.validity.contains(msg) {
            debug!(
                "received unexpected extension '{}/{wire_id}' for '{msg}'",
                entry.name
            );
            return Err(HelloExtError::IllegalForMessage { wire_id: wire_id.0 });
        }

        if self.role() == TlsRole::Server && !self.advertised.insert(id) {
            return Err(HelloExtError::Duplicate { wire_id: wire_id.0 });
        }

        trace!(
            "parsing extension '{}/{wire_id}' ({} bytes)",
            entry.name,
            body.len()
        );
        recv(self, body)
    }

    /// Emit the outbound extension block: overlay entries first, then the
    /// built-ins, each tier in registration order.
    pub fn emit(
        &mut self,
        msg: HelloMsg,
        parse_class: ParseClass,
        buf: &mut Vec<u8>,
    ) -> Result<(), HelloExtError> {
        let outer_pos = buf.len();
        buf.extend_from_slice(&[0, 0]);

        for idx in 0..self.overlay_len() {
            if let Some(entry) = self.overlay_entry(idx) {
                self.emit_one(&entry, msg, parse_class, buf)?;
            }
        }
        // emit_one keeps overridden built-ins from going out twice.
        let registry = Arc::clone(self.registry());
        for entry in registry.entries() {
            self.emit_one(entry, msg, parse_class, buf)?;
        }

        let total = buf.len() - outer_pos - 2;
        if total > u16::MAX as usize {
            return Err(HelloExtError::Internal("extension block too large".into()));
        }
        buf[outer_pos..outer_pos + 2].copy_from_slice(&(total as u16).to_be_bytes());
        Ok(())
    }

    fn emit_one(
        &mut self,
        entry: &Arc<HelloExtEntry>,
        msg: HelloMsg,
        parse_class: ParseClass,
        buf: &mut Vec<u8>,
    ) -> Result<(), HelloExtError> {
        let Some(send) = entry.send.clone() else {
            return Ok(());
        };
        if parse_class != ParseClass::Any && entry.parse_class != parse_class {
            return Ok(());
        }
        if !entry.validity.contains(msg) {
            trace!(
                "not sending extension '{}/{}' for '{msg}'",
                entry.name,
                entry.wire_id
            );
            return Ok(());
        }

        match self.role() {
            // The server answers only extensions whose id was marked while
            // parsing the client hello; an eclipsed built-in was never
            // marked, so it stays silent.
            TlsRole::Server => {
                if !self.advertised.contains(entry.id) {
                    return Ok(());
                }
            }
            // The client never emits a wire id twice. The check resolves the
            // entry's wire id to its effective id, so an overridden built-in
            // sees the bit its overlay already set.
            TlsRole::Client => {
                let effective = self.wire_to_id(entry.wire_id).unwrap_or(entry.id);
                if self.advertised.contains(effective) {
                    return Ok(());
                }
            }
        }

        let header_pos = buf.len();
        buf.extend_from_slice(&entry.wire_id.0.to_be_bytes());
        buf.extend_from_slice(&[0, 0]);
        let body_pos = buf.len();

        let status = send(self, buf)?;
        let appended = buf.len() - body_pos;

        if appended == 0 && status == SendStatus::Normal {
            // Nothing to send; roll the header back.
            buf.truncate(header_pos);
            return Ok(());
        }
        if appended > u16::MAX as usize {
            return Err(HelloExtError::Internal(
                "extension payload too large".into(),
            ));
        }
        buf[body_pos - 2..body_pos].copy_from_slice(&(appended as u16).to_be_bytes());

        if self.role() == TlsRole::Client {
            self.advertised.insert(entry.id);
        }
        debug!(
            "sending extension '{}/{}' ({appended} bytes)",
            entry.name, entry.wire_id
        );
        Ok(())
    }
}
