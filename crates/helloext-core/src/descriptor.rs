//! Hello extension descriptors: wire identity, validity rules, and the
//! capability callbacks an extension module plugs into the engine.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use helloext_types::HelloExtError;

use crate::session::HelloExtSession;

/// TLS extension type codes (IANA "TLS ExtensionType Values").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionType(pub u16);

impl ExtensionType {
    pub const SERVER_NAME: Self = Self(0);
    pub const MAX_FRAGMENT_LENGTH: Self = Self(1);
    pub const STATUS_REQUEST: Self = Self(5);
    pub const SUPPORTED_GROUPS: Self = Self(10);
    pub const EC_POINT_FORMATS: Self = Self(11);
    pub const SIGNATURE_ALGORITHMS: Self = Self(13);
    pub const USE_SRTP: Self = Self(14);
    pub const HEARTBEAT: Self = Self(15);
    pub const APPLICATION_LAYER_PROTOCOL_NEGOTIATION: Self = Self(16);
    pub const SIGNED_CERTIFICATE_TIMESTAMP: Self = Self(18);
    pub const PADDING: Self = Self(21);
    pub const ENCRYPT_THEN_MAC: Self = Self(22);
    pub const EXTENDED_MASTER_SECRET: Self = Self(23);
    pub const COMPRESS_CERTIFICATE: Self = Self(27);
    pub const SESSION_TICKET: Self = Self(35);
    pub const PRE_SHARED_KEY: Self = Self(41);
    pub const EARLY_DATA: Self = Self(42);
    pub const SUPPORTED_VERSIONS: Self = Self(43);
    pub const COOKIE: Self = Self(44);
    pub const PSK_KEY_EXCHANGE_MODES: Self = Self(45);
    pub const POST_HANDSHAKE_AUTH: Self = Self(49);
    pub const KEY_SHARE: Self = Self(51);
    pub const RENEGOTIATION_INFO: Self = Self(0xFF01);
}

impl fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upper bound of the internal id space; ids are bit positions in the
/// per-session advertisement set.
pub const MAX_INTERNAL_IDS: usize = 64;

/// Dense engine-assigned extension id. Built-ins own fixed ids from 0
/// upward; runtime registrations take ids above any taken id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalId(pub u8);

/// The handshake message currently carrying the extension block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelloMsg {
    ClientHello,
    Tls12ServerHello,
    Tls13ServerHello,
    EncryptedExtensions,
    Certificate,
    CertificateRequest,
    NewSessionTicket,
    HelloRetryRequest,
}

impl HelloMsg {
    /// The validity bit corresponding to this message.
    pub const fn flag(self) -> ValidityMask {
        match self {
            HelloMsg::ClientHello => ValidityMask::CLIENT_HELLO,
            HelloMsg::Tls12ServerHello => ValidityMask::TLS12_SERVER_HELLO,
            HelloMsg::Tls13ServerHello => ValidityMask::TLS13_SERVER_HELLO,
            HelloMsg::EncryptedExtensions => ValidityMask::ENCRYPTED_EXTENSIONS,
            HelloMsg::Certificate => ValidityMask::CERTIFICATE,
            HelloMsg::CertificateRequest => ValidityMask::CERTIFICATE_REQUEST,
            HelloMsg::NewSessionTicket => ValidityMask::NEW_SESSION_TICKET,
            HelloMsg::HelloRetryRequest => ValidityMask::HELLO_RETRY_REQUEST,
        }
    }
}

impl fmt::Display for HelloMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HelloMsg::ClientHello => "client hello",
            HelloMsg::Tls12ServerHello => "TLS 1.2 server hello",
            HelloMsg::Tls13ServerHello => "TLS 1.3 server hello",
            HelloMsg::EncryptedExtensions => "encrypted extensions",
            HelloMsg::Certificate => "certificate",
            HelloMsg::CertificateRequest => "certificate request",
            HelloMsg::NewSessionTicket => "new session ticket",
            HelloMsg::HelloRetryRequest => "hello retry request",
        };
        f.write_str(name)
    }
}

/// Bitmask of handshake messages in which an extension may legally appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityMask(pub u16);

impl ValidityMask {
    pub const CLIENT_HELLO: Self = Self(1 << 0);
    pub const TLS12_SERVER_HELLO: Self = Self(1 << 1);
    pub const TLS13_SERVER_HELLO: Self = Self(1 << 2);
    pub const ENCRYPTED_EXTENSIONS: Self = Self(1 << 3);
    pub const CERTIFICATE: Self = Self(1 << 4);
    pub const CERTIFICATE_REQUEST: Self = Self(1 << 5);
    pub const NEW_SESSION_TICKET: Self = Self(1 << 6);
    pub const HELLO_RETRY_REQUEST: Self = Self(1 << 7);

    /// Mask applied when a registration supplies no validity bits: client
    /// hello and TLS 1.2 server hello (or encrypted extensions for TLS 1.3).
    pub const DEFAULT: Self = Self(
        Self::CLIENT_HELLO.0 | Self::TLS12_SERVER_HELLO.0 | Self::ENCRYPTED_EXTENSIONS.0,
    );

    pub const fn contains(self, msg: HelloMsg) -> bool {
        self.0 & msg.flag().0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ValidityMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Filter letting a caller process only a subset of extensions in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseClass {
    /// No filtering; matches every registered extension.
    Any,
    /// Extensions surfaced to the application layer.
    Application,
    /// Extensions that steer the handshake before negotiation settles
    /// (version negotiation, renegotiation info).
    TlsEarly,
    /// Remaining protocol extensions.
    TlsLate,
}

/// Result of an extension's send callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The callback appended whatever payload it had; zero bytes appended
    /// means the extension is not present in this message.
    Normal,
    /// Emit the extension with an empty body and count it as advertised.
    ZeroLength,
}

/// Private per-session state owned by one extension. Dropping the box is the
/// extension's deinit.
pub type ExtPrivData = Box<dyn Any + Send>;

/// Receive callback: parses one TLV body. A returned error aborts the
/// handshake.
pub type ExtRecvFn =
    Arc<dyn Fn(&mut HelloExtSession, &[u8]) -> Result<(), HelloExtError> + Send + Sync>;

/// Send callback: appends the extension payload to the output buffer.
pub type ExtSendFn =
    Arc<dyn Fn(&mut HelloExtSession, &mut Vec<u8>) -> Result<SendStatus, HelloExtError> + Send + Sync>;

/// Pack callback: serializes live private data into a resumption blob.
pub type ExtPackFn =
    Arc<dyn Fn(&(dyn Any + Send), &mut Vec<u8>) -> Result<(), HelloExtError> + Send + Sync>;

/// Unpack callback: rebuilds private data from exactly the declared slice of
/// a resumption blob.
pub type ExtUnpackFn = Arc<dyn Fn(&[u8]) -> Result<ExtPrivData, HelloExtError> + Send + Sync>;

/// A registered hello extension: wire identity, dispatch policy, and handler
/// callbacks. Immutable once it enters a catalog tier.
pub struct HelloExtEntry {
    pub wire_id: ExtensionType,
    pub id: InternalId,
    pub name: Cow<'static, str>,
    pub parse_class: ParseClass,
    pub validity: ValidityMask,
    pub recv: Option<ExtRecvFn>,
    pub send: Option<ExtSendFn>,
    pub pack: Option<ExtPackFn>,
    pub unpack: Option<ExtUnpackFn>,
    /// Whether a session-level registration may eclipse this entry.
    pub overridable: bool,
}

impl fmt::Debug for HelloExtEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelloExtEntry")
            .field("wire_id", &self.wire_id)
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parse_class", &self.parse_class)
            .field("validity", &self.validity)
            .field("recv", &self.recv.as_ref().map(|_| "<callback>"))
            .field("send", &self.send.as_ref().map(|_| "<callback>"))
            .field("pack", &self.pack.as_ref().map(|_| "<callback>"))
            .field("unpack", &self.unpack.as_ref().map(|_| "<callback>"))
            .field("overridable", &self.overridable)
            .finish()
    }
}

/// Definition of an application-supplied hello extension, passed to the
/// registration APIs.
///
/// Callbacks are optional; an extension without `recv` is skipped on parse
/// and one without `send` is skipped on emit. When no validity is given,
/// [`ValidityMask::DEFAULT`] applies.
pub struct CustomExtension {
    pub(crate) name: String,
    pub(crate) wire_id: ExtensionType,
    pub(crate) parse_class: ParseClass,
    pub(crate) validity: Option<ValidityMask>,
    pub(crate) recv: Option<ExtRecvFn>,
    pub(crate) send: Option<ExtSendFn>,
    pub(crate) pack: Option<ExtPackFn>,
    pub(crate) unpack: Option<ExtUnpackFn>,
}

impl CustomExtension {
    pub fn new(wire_id: ExtensionType, name: &str) -> Self {
        Self {
            name: name.to_string(),
            wire_id,
            parse_class: ParseClass::Application,
            validity: None,
            recv: None,
            send: None,
            pack: None,
            unpack: None,
        }
    }

    pub fn parse_class(mut self, parse_class: ParseClass) -> Self {
        self.parse_class = parse_class;
        self
    }

    pub fn validity(mut self, validity: ValidityMask) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn on_recv(
        mut self,
        f: impl Fn(&mut HelloExtSession, &[u8]) -> Result<(), HelloExtError> + Send + Sync + 'static,
    ) -> Self {
        self.recv = Some(Arc::new(f));
        self
    }

    pub fn on_send(
        mut self,
        f: impl Fn(&mut HelloExtSession, &mut Vec<u8>) -> Result<SendStatus, HelloExtError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.send = Some(Arc::new(f));
        self
    }

    pub fn on_pack(
        mut self,
        f: impl Fn(&(dyn Any + Send), &mut Vec<u8>) -> Result<(), HelloExtError> + Send + Sync + 'static,
    ) -> Self {
        self.pack = Some(Arc::new(f));
        self
    }

    pub fn on_unpack(
        mut self,
        f: impl Fn(&[u8]) -> Result<ExtPrivData, HelloExtError> + Send + Sync + 'static,
    ) -> Self {
        self.unpack = Some(Arc::new(f));
        self
    }

    /// Freeze the definition into a catalog entry under the given id.
    pub(crate) fn into_entry(self, id: InternalId) -> HelloExtEntry {
        let validity = match self.validity {
            Some(mask) if !mask.is_empty() => mask,
            _ => ValidityMask::DEFAULT,
        };
        HelloExtEntry {
            wire_id: self.wire_id,
            id,
            name: Cow::Owned(self.name),
            parse_class: self.parse_class,
            validity,
            recv: self.recv,
            send: self.send,
            pack: self.pack,
            unpack: self.unpack,
            overridable: true,
        }
    }
}

impl fmt::Debug for CustomExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomExtension")
            .field("name", &self.name)
            .field("wire_id", &self.wire_id)
            .field("parse_class", &self.parse_class)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_mask_contains() {
        let mask = ValidityMask::CLIENT_HELLO | ValidityMask::ENCRYPTED_EXTENSIONS;
        assert!(mask.contains(HelloMsg::ClientHello));
        assert!(mask.contains(HelloMsg::EncryptedExtensions));
        assert!(!mask.contains(HelloMsg::Tls13ServerHello));
        assert!(!mask.contains(HelloMsg::Certificate));
    }

    #[test]
    fn test_validity_mask_default() {
        assert!(ValidityMask::DEFAULT.contains(HelloMsg::ClientHello));
        assert!(ValidityMask::DEFAULT.contains(HelloMsg::Tls12ServerHello));
        assert!(ValidityMask::DEFAULT.contains(HelloMsg::EncryptedExtensions));
        assert!(!ValidityMask::DEFAULT.contains(HelloMsg::Tls13ServerHello));
        assert!(!ValidityMask::DEFAULT.contains(HelloMsg::HelloRetryRequest));
    }

    #[test]
    fn test_validity_mask_empty() {
        assert!(ValidityMask(0).is_empty());
        assert!(!ValidityMask::CLIENT_HELLO.is_empty());
    }

    #[test]
    fn test_hello_msg_flags_distinct() {
        let msgs = [
            HelloMsg::ClientHello,
            HelloMsg::Tls12ServerHello,
            HelloMsg::Tls13ServerHello,
            HelloMsg::EncryptedExtensions,
            HelloMsg::Certificate,
            HelloMsg::CertificateRequest,
            HelloMsg::NewSessionTicket,
            HelloMsg::HelloRetryRequest,
        ];
        let mut seen = 0u16;
        for msg in msgs {
            let bit = msg.flag().0;
            assert_eq!(bit.count_ones(), 1);
            assert_eq!(seen & bit, 0, "flag for {msg} overlaps another message");
            seen |= bit;
        }
    }

    #[test]
    fn test_custom_extension_defaults() {
        let def = CustomExtension::new(ExtensionType(0x5599), "demo");
        assert_eq!(def.wire_id, ExtensionType(0x5599));
        assert_eq!(def.parse_class, ParseClass::Application);
        assert!(def.validity.is_none());
        assert!(def.recv.is_none() && def.send.is_none());
    }

    #[test]
    fn test_custom_extension_into_entry_applies_default_validity() {
        let entry = CustomExtension::new(ExtensionType(0x5599), "demo").into_entry(InternalId(20));
        assert_eq!(entry.id, InternalId(20));
        assert_eq!(entry.validity, ValidityMask::DEFAULT);
        assert!(entry.overridable);

        let entry = CustomExtension::new(ExtensionType(0x559A), "demo2")
            .validity(ValidityMask::CLIENT_HELLO)
            .into_entry(InternalId(21));
        assert_eq!(entry.validity, ValidityMask::CLIENT_HELLO);
    }

    #[test]
    fn test_entry_debug_hides_callbacks() {
        let entry = CustomExtension::new(ExtensionType(7), "opaque")
            .on_recv(|_, _| Ok(()))
            .into_entry(InternalId(1));
        let dbg = format!("{entry:?}");
        assert!(dbg.contains("opaque"));
        assert!(dbg.contains("<callback>"));
    }
}
