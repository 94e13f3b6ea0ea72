//! The default extension table loaded into a fresh registry.
//!
//! Entries carry the catalog data the engine needs for dispatch: wire id,
//! name, validity, parse class, and override permission. Their callbacks are
//! attached by the protocol modules that implement each extension.

use std::borrow::Cow;
use std::sync::Arc;

use crate::descriptor::{
    ExtensionType, HelloExtEntry, InternalId, ParseClass, ValidityMask,
};

fn entry(
    wire_id: ExtensionType,
    id: u8,
    name: &'static str,
    parse_class: ParseClass,
    validity: ValidityMask,
    overridable: bool,
) -> Arc<HelloExtEntry> {
    Arc::new(HelloExtEntry {
        wire_id,
        id: InternalId(id),
        name: Cow::Borrowed(name),
        parse_class,
        validity,
        recv: None,
        send: None,
        pack: None,
        unpack: None,
        overridable,
    })
}

pub(crate) fn builtin_entries() -> Vec<Arc<HelloExtEntry>> {
    const CH: ValidityMask = ValidityMask::CLIENT_HELLO;
    const SH12: ValidityMask = ValidityMask::TLS12_SERVER_HELLO;
    const SH13: ValidityMask = ValidityMask::TLS13_SERVER_HELLO;
    const EE: ValidityMask = ValidityMask::ENCRYPTED_EXTENSIONS;
    const CT: ValidityMask = ValidityMask::CERTIFICATE;
    const CR: ValidityMask = ValidityMask::CERTIFICATE_REQUEST;
    const HRR: ValidityMask = ValidityMask::HELLO_RETRY_REQUEST;

    vec![
        entry(
            ExtensionType::MAX_FRAGMENT_LENGTH,
            0,
            "max_fragment_length",
            ParseClass::Application,
            CH | SH12 | EE,
            true,
        ),
        entry(
            ExtensionType::EXTENDED_MASTER_SECRET,
            1,
            "extended_master_secret",
            ParseClass::TlsLate,
            CH | SH12,
            false,
        ),
        entry(
            ExtensionType::SUPPORTED_VERSIONS,
            2,
            "supported_versions",
            ParseClass::TlsEarly,
            CH | SH13 | HRR,
            false,
        ),
        entry(
            ExtensionType::POST_HANDSHAKE_AUTH,
            3,
            "post_handshake_auth",
            ParseClass::TlsLate,
            CH,
            false,
        ),
        entry(
            ExtensionType::ENCRYPT_THEN_MAC,
            4,
            "encrypt_then_mac",
            ParseClass::TlsLate,
            CH | SH12,
            false,
        ),
        entry(
            ExtensionType::STATUS_REQUEST,
            5,
            "status_request",
            ParseClass::Application,
            CH | SH12 | CT,
            true,
        ),
        entry(
            ExtensionType::SERVER_NAME,
            6,
            "server_name",
            ParseClass::Application,
            CH | SH12 | EE,
            true,
        ),
        entry(
            ExtensionType::RENEGOTIATION_INFO,
            7,
            "renegotiation_info",
            ParseClass::TlsEarly,
            CH | SH12,
            false,
        ),
        entry(
            ExtensionType::SESSION_TICKET,
            8,
            "session_ticket",
            ParseClass::Application,
            CH | SH12,
            true,
        ),
        entry(
            ExtensionType::SUPPORTED_GROUPS,
            9,
            "supported_groups",
            ParseClass::TlsLate,
            CH | EE,
            true,
        ),
        entry(
            ExtensionType::EC_POINT_FORMATS,
            10,
            "ec_point_formats",
            ParseClass::TlsLate,
            CH | SH12,
            true,
        ),
        entry(
            ExtensionType::SIGNATURE_ALGORITHMS,
            11,
            "signature_algorithms",
            ParseClass::TlsLate,
            CH | CR,
            false,
        ),
        entry(
            ExtensionType::KEY_SHARE,
            12,
            "key_share",
            ParseClass::TlsLate,
            CH | SH13 | HRR,
            false,
        ),
        entry(
            ExtensionType::USE_SRTP,
            13,
            "use_srtp",
            ParseClass::Application,
            CH | SH12 | EE,
            true,
        ),
        entry(
            ExtensionType::HEARTBEAT,
            14,
            "heartbeat",
            ParseClass::Application,
            CH | SH12 | EE,
            true,
        ),
        entry(
            ExtensionType::APPLICATION_LAYER_PROTOCOL_NEGOTIATION,
            15,
            "alpn",
            ParseClass::Application,
            CH | SH12 | EE,
            true,
        ),
        // Padding sizes itself from the rest of the hello; it must stay last.
        entry(
            ExtensionType::PADDING,
            16,
            "padding",
            ParseClass::TlsLate,
            CH,
            false,
        ),
    ]
}
