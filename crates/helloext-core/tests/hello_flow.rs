//! End-to-end walk of the extension engine: a client and a server exchange
//! hello extension blocks, then the server's extension state is packed and
//! resumed into a fresh session.

use std::sync::Arc;

use helloext_core::{
    CustomExtension, ExtensionType, HelloExtRegistry, HelloExtSession, HelloMsg, ParseClass,
    SendStatus, TlsRole,
};
use helloext_types::HelloExtError;

const TOKEN_EXT: ExtensionType = ExtensionType(0x5599);

/// A small application extension: the client offers a token, the server
/// stores and echoes it, and the stored token survives resumption.
fn token_extension(token: &'static [u8]) -> CustomExtension {
    CustomExtension::new(TOKEN_EXT, "token")
        .on_recv(|sess, body| {
            if body.is_empty() {
                return Err(HelloExtError::HandshakeFailed("empty token".into()));
            }
            sess.set_ext_data(TOKEN_EXT, Box::new(body.to_vec()))
        })
        .on_send(move |sess, buf| {
            match sess.role() {
                TlsRole::Client => buf.extend_from_slice(token),
                TlsRole::Server => {
                    // Echo what the client sent.
                    let stored = sess.get_ext_data(TOKEN_EXT)?;
                    let stored = stored
                        .downcast_ref::<Vec<u8>>()
                        .ok_or_else(|| HelloExtError::Internal("wrong private type".into()))?
                        .clone();
                    buf.extend_from_slice(&stored);
                    return Ok(SendStatus::Normal);
                }
            }
            sess.set_ext_data(TOKEN_EXT, Box::new(token.to_vec()))?;
            Ok(SendStatus::Normal)
        })
        .on_pack(|data, buf| {
            let bytes = data
                .downcast_ref::<Vec<u8>>()
                .ok_or_else(|| HelloExtError::Internal("wrong private type".into()))?;
            buf.extend_from_slice(bytes);
            Ok(())
        })
        .on_unpack(|body| Ok(Box::new(body.to_vec())))
}

fn shared_registry() -> Arc<HelloExtRegistry> {
    let mut registry = HelloExtRegistry::with_builtins();
    registry.register(token_extension(b"ticket-42")).unwrap();
    Arc::new(registry)
}

/// Strip the outer 16-bit length the emitter wrote, as the handshake framer
/// would before handing the block to the peer's parser.
fn strip_outer_length(block: &[u8]) -> &[u8] {
    let len = u16::from_be_bytes([block[0], block[1]]) as usize;
    assert_eq!(block.len(), 2 + len);
    &block[2..]
}

#[test]
fn test_full_handshake_and_resumption() {
    let registry = shared_registry();
    let mut client = HelloExtSession::new(registry.clone(), TlsRole::Client);
    let mut server = HelloExtSession::new(registry.clone(), TlsRole::Server);

    // Client hello.
    let mut client_hello = Vec::new();
    client
        .emit(HelloMsg::ClientHello, ParseClass::Any, &mut client_hello)
        .unwrap();
    server
        .parse(
            HelloMsg::ClientHello,
            ParseClass::Any,
            strip_outer_length(&client_hello),
        )
        .unwrap();

    let stored = server.get_ext_data(TOKEN_EXT).unwrap();
    assert_eq!(stored.downcast_ref::<Vec<u8>>().unwrap(), b"ticket-42");

    // Server answers only what was offered, and the client accepts it.
    let mut server_exts = Vec::new();
    server
        .emit(HelloMsg::Tls12ServerHello, ParseClass::Any, &mut server_exts)
        .unwrap();
    client
        .parse(
            HelloMsg::Tls12ServerHello,
            ParseClass::Any,
            strip_outer_length(&server_exts),
        )
        .unwrap();
    let echoed = client.get_ext_data(TOKEN_EXT).unwrap();
    assert_eq!(echoed.downcast_ref::<Vec<u8>>().unwrap(), b"ticket-42");

    // Pack the server's extension state and resume it elsewhere.
    let mut blob = Vec::new();
    server.pack(&mut blob).unwrap();

    let mut resumed = HelloExtSession::new(registry, TlsRole::Server);
    resumed.unpack(&blob).unwrap();
    let token = resumed.get_resumed_ext_data(TOKEN_EXT).unwrap();
    assert_eq!(token.downcast_ref::<Vec<u8>>().unwrap(), b"ticket-42");
    // Live state is untouched by resumption.
    assert!(resumed.get_ext_data(TOKEN_EXT).is_err());
}

#[test]
fn test_unknown_extensions_pass_through_handshake() {
    let registry = shared_registry();
    let mut server = HelloExtSession::new(registry, TlsRole::Server);

    // A hello carrying only extensions this stack has never heard of.
    let mut block = Vec::new();
    for wire_id in [0x7A7Au16, 0x2020, 0x0063] {
        block.extend_from_slice(&wire_id.to_be_bytes());
        block.extend_from_slice(&[0x00, 0x02, 0xDE, 0xAD]);
    }
    server
        .parse(HelloMsg::ClientHello, ParseClass::Any, &block)
        .unwrap();

    // Nothing was recorded: the reply block stays empty.
    let mut reply = Vec::new();
    server
        .emit(HelloMsg::Tls12ServerHello, ParseClass::Any, &mut reply)
        .unwrap();
    assert_eq!(reply, vec![0, 0]);
}

#[test]
fn test_client_rejects_extension_it_never_offered() {
    let registry = shared_registry();
    let mut client = HelloExtSession::new(registry, TlsRole::Client);

    let mut rogue = Vec::new();
    rogue.extend_from_slice(&TOKEN_EXT.0.to_be_bytes());
    rogue.extend_from_slice(&[0x00, 0x01, 0x42]);
    let err = client
        .parse(HelloMsg::Tls12ServerHello, ParseClass::Any, &rogue)
        .unwrap_err();
    assert!(matches!(err, HelloExtError::Unsolicited { wire_id: 0x5599 }));
}

#[test]
fn test_session_override_changes_dispatch() {
    let registry = shared_registry();
    let mut server = HelloExtSession::new(registry, TlsRole::Server);
    server
        .register(
            CustomExtension::new(TOKEN_EXT, "token_v2").on_recv(|sess, body| {
                let mut upper = body.to_vec();
                upper.make_ascii_uppercase();
                sess.set_ext_data(TOKEN_EXT, Box::new(upper))
            }),
            true,
        )
        .unwrap();

    let mut block = Vec::new();
    block.extend_from_slice(&TOKEN_EXT.0.to_be_bytes());
    block.extend_from_slice(&[0x00, 0x05]);
    block.extend_from_slice(b"token");
    server
        .parse(HelloMsg::ClientHello, ParseClass::Any, &block)
        .unwrap();

    let stored = server.get_ext_data(TOKEN_EXT).unwrap();
    assert_eq!(stored.downcast_ref::<Vec<u8>>().unwrap(), b"TOKEN");
}
