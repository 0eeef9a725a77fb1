#![no_main]

//! Fuzz target for a client reading a server flight.
//!
//! The client sends its ClientHello first, so the input meets the states
//! that parse ServerHello and the messages after it.

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

use timpl::{Config, TlsEngine};

fuzz_target!(|data: &[u8]| {
    let mut client = TlsEngine::with_peer(Arc::new(Config::default()), "localhost", 443);
    if client.set_use_client_mode(true).is_err() {
        return;
    }

    let mut out = vec![0u8; 20 * 1024];
    if client.wrap(&[], &mut out).is_err() {
        return;
    }

    let mut dst = vec![0u8; 16384];
    let mut rest = data;
    for _ in 0..64 {
        let Ok(r) = client.unwrap(rest, &mut [&mut dst[..]]) else {
            break;
        };
        while let Some(task) = client.delegated_task() {
            task.run();
        }
        if r.bytes_consumed == 0 {
            break;
        }
        rest = &rest[r.bytes_consumed..];
    }
});
