/// Hello extension engine errors.
#[derive(Debug, thiserror::Error)]
pub enum HelloExtError {
    // Dispatch errors: fatal for the handshake carrying the block.
    #[error("malformed extension block")]
    MalformedBlock,
    #[error("unsolicited extension {wire_id}")]
    Unsolicited { wire_id: u16 },
    #[error("duplicate extension {wire_id}")]
    Duplicate { wire_id: u16 },
    #[error("extension {wire_id} not permitted in this message")]
    IllegalForMessage { wire_id: u16 },

    // Registration errors: returned to the caller.
    #[error("extension {wire_id} already registered")]
    AlreadyRegistered { wire_id: u16 },
    #[error("extension id space exhausted")]
    OutOfSpace,

    // State and resumption errors.
    #[error("resumption data parsing failed")]
    ParsingError,
    #[error("requested extension data not available")]
    DataNotAvailable,
    #[error("internal error: {0}")]
    Internal(String),

    // General failure carrier for extension callbacks.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),
}
