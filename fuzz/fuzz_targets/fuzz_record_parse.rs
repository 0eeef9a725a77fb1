#![no_main]

//! Fuzz target for the record layer and ClientHello parsing of a server.
//!
//! TLS record format:
//! - ContentType: 1 byte (20-23 valid values)
//! - ProtocolVersion: 2 bytes (major 3)
//! - Length: 2 bytes
//! - Fragment: variable (up to 2^14 bytes of plaintext)

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use timpl::{Config, TlsEngine};

/// TLS record header length
const HEADER_LEN: usize = 5;
/// Maximum plaintext fragment
const MAX_FRAGMENT_SIZE: usize = 16384;

fn server() -> TlsEngine {
    let mut engine = TlsEngine::new(Arc::new(Config::default()));
    let _ = engine.set_use_client_mode(false);
    engine
}

fuzz_target!(|data: &[u8]| {
    let mut dst = vec![0u8; MAX_FRAGMENT_SIZE];

    // The input as-is, one record at a time.
    let mut engine = server();
    let mut rest = data;
    while let Ok(r) = engine.unwrap(rest, &mut [&mut dst[..]]) {
        if r.bytes_consumed == 0 {
            break;
        }
        rest = &rest[r.bytes_consumed..];
    }

    // The input as the payload of a handshake record.
    if !data.is_empty() {
        let frag_len = data.len().min(MAX_FRAGMENT_SIZE);

        let mut record = Vec::with_capacity(HEADER_LEN + frag_len);
        record.push(22u8); // ContentType::Handshake
        record.extend_from_slice(&[0x03, 0x01]); // TLS 1.0 framing
        record.extend_from_slice(&(frag_len as u16).to_be_bytes());
        record.extend_from_slice(&data[..frag_len]);

        let mut engine = server();
        let _ = engine.unwrap(&record, &mut [&mut dst[..]]);
        while let Some(task) = engine.delegated_task() {
            task.run();
        }
        let mut out = vec![0u8; HEADER_LEN + MAX_FRAGMENT_SIZE + 2048];
        let _ = engine.wrap(&[], &mut out);
    }
});
