#![no_main]
use std::sync::Arc;

use helloext_core::{
    CustomExtension, ExtensionType, HelloExtRegistry, HelloExtSession, HelloMsg, ParseClass,
    TlsRole,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut registry = HelloExtRegistry::with_builtins();
    let _ = registry.register(
        CustomExtension::new(ExtensionType(0x5599), "fuzz")
            .on_recv(|sess, body| sess.set_ext_data(ExtensionType(0x5599), Box::new(body.to_vec())))
            .on_unpack(|body| Ok(Box::new(body.to_vec()))),
    );
    let registry = Arc::new(registry);

    let mut server = HelloExtSession::new(registry.clone(), TlsRole::Server);
    let _ = server.parse(HelloMsg::ClientHello, ParseClass::Any, data);

    // The same bytes as a resumption blob.
    let mut fresh = HelloExtSession::new(registry, TlsRole::Client);
    let _ = fresh.unpack(data);
});
