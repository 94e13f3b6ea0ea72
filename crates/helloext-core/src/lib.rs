#![forbid(unsafe_code)]
#![doc = "TLS hello extension registry and dispatch engine."]

pub mod builtin;
pub mod descriptor;
pub mod dispatch;
pub mod registry;
pub mod resume;
pub mod session;

pub use descriptor::{
    CustomExtension, ExtPackFn, ExtPrivData, ExtRecvFn, ExtSendFn, ExtUnpackFn, ExtensionType,
    HelloExtEntry, HelloMsg, InternalId, ParseClass, SendStatus, ValidityMask, MAX_INTERNAL_IDS,
};
pub use registry::{HelloExtRegistry, MAX_BUILTIN_EXTS};
pub use session::{HelloExtSession, MAX_EXT_DATA_SLOTS};

/// The role of a TLS endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsRole {
    Client,
    Server,
}
