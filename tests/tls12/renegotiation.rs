//! Renegotiation on an established connection.

use timpl::{
    AlertDescription, Error, HandshakePhase, HandshakeStatus, DEFAULT_AEAD_ENCRYPTION_LIMIT,
};

use crate::common::*;

fn established(client_renegotiates: bool, server_renegotiates: bool) -> (Peer, Peer) {
    let certs = certs();
    let mut client = client(
        client_builder(&certs)
            .allow_renegotiation(client_renegotiates)
            .build()
            .unwrap(),
    );
    let mut server = server(
        server_builder(&certs)
            .allow_renegotiation(server_renegotiates)
            .build()
            .unwrap(),
    );
    handshake(&mut client, &mut server).expect("handshake");
    (client, server)
}

#[test]
fn client_initiated() {
    let _ = env_logger::try_init();
    let (mut client, mut server) = established(true, true);

    client.engine.begin_handshake().unwrap();
    assert_eq!(client.engine.handshake_status(), HandshakeStatus::NeedWrap);
    assert_eq!(client.engine.handshake_phase(), HandshakePhase::HelloSent);

    handshake_n(&mut client, &mut server, 2).unwrap();
    assert_eq!(client.engine.handshake_phase(), HandshakePhase::Established);

    transfer(&mut client, &mut server, b"after").unwrap();
    assert_eq!(server.received, b"after");
}

#[test]
fn server_initiated() {
    let _ = env_logger::try_init();
    let (mut client, mut server) = established(true, true);

    server.engine.begin_handshake().unwrap();
    let hello_request = server.flush().unwrap();
    assert_eq!(record_types(&hello_request), vec![HANDSHAKE]);

    client.inbox.extend_from_slice(&hello_request);
    client.deliver().unwrap();
    assert_eq!(client.engine.handshake_status(), HandshakeStatus::NeedWrap);

    handshake_n(&mut client, &mut server, 2).unwrap();
    transfer(&mut server, &mut client, b"renegotiated").unwrap();
    assert_eq!(client.received, b"renegotiated");
}

#[test]
fn disabled_locally() {
    let (mut client, _server) = established(false, true);
    assert_eq!(
        client.engine.begin_handshake(),
        Err(Error::RenegotiationDisabled)
    );
    // Not fatal.
    assert!(!client.engine.is_outbound_done());
    assert_eq!(
        client.engine.handshake_status(),
        HandshakeStatus::NotHandshaking
    );
}

#[test]
fn server_refuses() {
    let _ = env_logger::try_init();
    let (mut client, mut server) = established(true, false);

    client.engine.begin_handshake().unwrap();
    pump(&mut client, &mut server).unwrap();

    // Warning no_renegotiation, the connection stays up.
    let out = server.flush().unwrap();
    assert_eq!(record_types(&out), vec![ALERT]);
    client.inbox.extend_from_slice(&out);
    client.deliver().unwrap();

    assert_eq!(client.engine.handshake_phase(), HandshakePhase::Established);
    assert_eq!(
        client.engine.handshake_status(),
        HandshakeStatus::NotHandshaking
    );
    transfer(&mut client, &mut server, b"still here").unwrap();
    assert_eq!(server.received, b"still here");
    assert_eq!(client.finished, 1);
}

#[test]
fn client_refuses() {
    let (mut client, mut server) = established(false, true);

    server.engine.begin_handshake().unwrap();
    pump(&mut server, &mut client).unwrap();
    assert_eq!(
        client.engine.handshake_status(),
        HandshakeStatus::NeedWrap
    );

    let out = client.flush().unwrap();
    assert_eq!(record_types(&out), vec![ALERT]);
    server.inbox.extend_from_slice(&out);
    server.deliver().unwrap();

    transfer(&mut server, &mut client, b"ok").unwrap();
    assert_eq!(client.received, b"ok");
}

const UNLIMITED: u64 = DEFAULT_AEAD_ENCRYPTION_LIMIT;

fn limited(client_limit: u64, server_limit: u64, client_renegotiates: bool) -> (Peer, Peer) {
    let certs = certs();
    let mut client = client(
        client_builder(&certs)
            .aead_encryption_limit(client_limit)
            .allow_renegotiation(client_renegotiates)
            .build()
            .unwrap(),
    );
    let mut server = server(
        server_builder(&certs)
            .aead_encryption_limit(server_limit)
            .build()
            .unwrap(),
    );
    handshake(&mut client, &mut server).expect("handshake");
    (client, server)
}

#[test]
fn client_renews_keys_at_limit() {
    let _ = env_logger::try_init();
    // Finished is the first record under the new key.
    let (mut client, mut server) = limited(3, UNLIMITED, true);

    transfer(&mut client, &mut server, b"a").unwrap();
    transfer(&mut client, &mut server, b"b").unwrap();

    let (consumed, hello) = client.send(b"c").unwrap();
    assert_eq!(consumed, 0);
    assert_eq!(record_types(&hello), vec![HANDSHAKE]);
    assert_eq!(client.engine.handshake_phase(), HandshakePhase::HelloSent);

    server.inbox.extend_from_slice(&hello);
    server.deliver().unwrap();
    handshake_n(&mut client, &mut server, 2).unwrap();

    transfer(&mut client, &mut server, b"c").unwrap();
    assert_eq!(server.received, b"abc");
}

#[test]
fn server_requests_renewal_at_limit() {
    let _ = env_logger::try_init();
    let (mut client, mut server) = limited(UNLIMITED, 2, true);

    transfer(&mut server, &mut client, b"a").unwrap();

    let (consumed, request) = server.send(b"b").unwrap();
    assert_eq!(consumed, 0);
    assert_eq!(record_types(&request), vec![HANDSHAKE]);

    client.inbox.extend_from_slice(&request);
    client.deliver().unwrap();
    assert_eq!(client.engine.handshake_status(), HandshakeStatus::NeedWrap);

    // Data still flows under the old key until the new handshake is done.
    transfer(&mut server, &mut client, b"b").unwrap();
    handshake_n(&mut client, &mut server, 2).unwrap();

    transfer(&mut server, &mut client, b"c").unwrap();
    assert_eq!(client.received, b"abc");
}

#[test]
fn aead_encryption_limit_without_renegotiation_is_fatal() {
    let (mut client, mut server) = limited(2, UNLIMITED, false);

    transfer(&mut client, &mut server, b"a").unwrap();
    assert_eq!(client.send(b"b"), Err(Error::AeadLimitReached));

    let out = client.flush().unwrap();
    assert_eq!(record_types(&out), vec![ALERT]);
    assert!(client.engine.is_outbound_done());

    server.inbox.extend_from_slice(&out);
    assert_eq!(
        server.deliver(),
        Err(Error::AlertReceived(AlertDescription::InternalError))
    );
}

#[test]
fn refused_key_renewal_is_fatal() {
    let (mut client, mut server) = limited(UNLIMITED, 2, false);

    transfer(&mut server, &mut client, b"a").unwrap();
    let (_, request) = server.send(b"b").unwrap();
    client.inbox.extend_from_slice(&request);
    client.deliver().unwrap();

    let refusal = client.flush().unwrap();
    assert_eq!(record_types(&refusal), vec![ALERT]);
    server.inbox.extend_from_slice(&refusal);
    assert_eq!(server.deliver(), Err(Error::AeadLimitReached));
    assert!(server.engine.is_inbound_done());
}
