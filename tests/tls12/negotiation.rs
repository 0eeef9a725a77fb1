//! Cipher suite, version, ALPN and SNI negotiation.

use timpl::{
    AlertDescription, AlpnDecision, CipherSuite, Error, ErrorKind, ProtocolVersion,
};

use crate::common::*;

const AES128: CipherSuite = CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256;
const AES256: CipherSuite = CipherSuite::ECDHE_ECDSA_AES256_GCM_SHA384;
const CHACHA: CipherSuite = CipherSuite::ECDHE_ECDSA_CHACHA20_POLY1305_SHA256;

fn negotiated_suite(prefer_local: bool) -> CipherSuite {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(
        server_builder(&certs)
            .prefer_local_cipher_order(prefer_local)
            .build()
            .unwrap(),
    );
    client
        .engine
        .set_enabled_cipher_suites(&[AES128, AES256])
        .unwrap();
    server
        .engine
        .set_enabled_cipher_suites(&[AES256, AES128])
        .unwrap();

    handshake(&mut client, &mut server).unwrap();
    let suite = client.engine.session().unwrap().cipher_suite();
    assert_eq!(suite, server.engine.session().unwrap().cipher_suite());
    suite
}

#[test]
fn client_suite_order_by_default() {
    assert_eq!(negotiated_suite(false), AES128);
}

#[test]
fn server_suite_order_when_preferred() {
    assert_eq!(negotiated_suite(true), AES256);
}

#[test]
fn chacha20_poly1305_connection() {
    let _ = env_logger::try_init();
    let certs = certs();
    let mut client = client(
        client_builder(&certs)
            .cipher_suites(&[CHACHA, AES128])
            .build()
            .unwrap(),
    );
    let mut server = server(server_builder(&certs).build().unwrap());
    handshake(&mut client, &mut server).unwrap();

    let session = server.engine.session().unwrap();
    assert_eq!(session.cipher_suite(), CHACHA);
    assert_eq!(client.engine.session().unwrap().cipher_suite(), CHACHA);

    // No explicit nonce: header, ciphertext and tag only.
    let (_, record) = client.send(b"hello").unwrap();
    assert_eq!(record.len(), 5 + 5 + 16);
    server.inbox.extend_from_slice(&record);
    server.deliver().unwrap();

    transfer(&mut server, &mut client, b"world").unwrap();
    assert_eq!(server.received, b"hello");
    assert_eq!(client.received, b"world");
}

#[test]
fn no_common_suite() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());
    client.engine.set_enabled_cipher_suites(&[AES128]).unwrap();
    server.engine.set_enabled_cipher_suites(&[AES256]).unwrap();

    let err = handshake(&mut client, &mut server).unwrap_err();
    assert_eq!(err, Error::NoCipherSuite);

    let err = pump(&mut server, &mut client).unwrap_err();
    assert_eq!(err, Error::AlertReceived(AlertDescription::HandshakeFailure));
}

#[test]
fn no_common_version() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(
        server_builder(&certs)
            .protocol_versions(ProtocolVersion::TLS1_0, ProtocolVersion::TLS1_1)
            .build()
            .unwrap(),
    );
    client
        .engine
        .set_enabled_protocols(&[ProtocolVersion::TLS1_2])
        .unwrap();

    let err = handshake(&mut client, &mut server).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Negotiation);
    assert!(err.is_fatal());
}

#[test]
fn alpn_server_preference() {
    let certs = certs();
    let mut client = client(
        client_builder(&certs)
            .alpn_protocols(&["h2", "http/1.1"])
            .build()
            .unwrap(),
    );
    let mut server = server(
        server_builder(&certs)
            .alpn_protocols(&["http/1.1", "h2"])
            .build()
            .unwrap(),
    );

    handshake(&mut client, &mut server).unwrap();
    assert_eq!(client.engine.application_protocol(), Some("http/1.1"));
    assert_eq!(server.engine.application_protocol(), Some("http/1.1"));
    assert_eq!(
        server.engine.session().unwrap().application_protocol(),
        Some("http/1.1")
    );
}

#[test]
fn alpn_without_overlap() {
    let certs = certs();
    let mut client = client(client_builder(&certs).alpn_protocols(&["h2"]).build().unwrap());
    let mut server = server(
        server_builder(&certs)
            .alpn_protocols(&["spdy/3"])
            .build()
            .unwrap(),
    );

    handshake(&mut client, &mut server).unwrap();
    assert_eq!(client.engine.application_protocol(), None);
    assert_eq!(server.engine.application_protocol(), None);
}

#[test]
fn alpn_selector_replaces_default() {
    let certs = certs();
    let mut client = client(
        client_builder(&certs)
            .alpn_protocols(&["h2", "http/1.1"])
            .build()
            .unwrap(),
    );
    let mut server = server(
        server_builder(&certs)
            .alpn_protocols(&["h2"])
            .alpn_selector(|offered: &[String]| match offered.last() {
                Some(p) => AlpnDecision::Select(p.clone()),
                None => AlpnDecision::Decline,
            })
            .build()
            .unwrap(),
    );

    handshake(&mut client, &mut server).unwrap();
    assert_eq!(client.engine.application_protocol(), Some("http/1.1"));
}

#[test]
fn alpn_selector_veto() {
    let certs = certs();
    let mut client = client(client_builder(&certs).alpn_protocols(&["h2"]).build().unwrap());
    let mut server = server(
        server_builder(&certs)
            .alpn_selector(|_: &[String]| AlpnDecision::Veto)
            .build()
            .unwrap(),
    );

    let err = handshake(&mut client, &mut server).unwrap_err();
    assert_eq!(err, Error::NoApplicationProtocol);

    let err = pump(&mut server, &mut client).unwrap_err();
    assert_eq!(
        err,
        Error::AlertReceived(AlertDescription::NoApplicationProtocol)
    );
}

#[test]
fn sni_accepted() {
    let certs = certs();
    let mut client = client(
        client_builder(&certs)
            .server_name("www.example.com")
            .build()
            .unwrap(),
    );
    let mut server = server(
        server_builder(&certs)
            .sni_matcher("*.example.com")
            .build()
            .unwrap(),
    );

    handshake(&mut client, &mut server).unwrap();
    assert_eq!(
        server.engine.session().unwrap().server_name(),
        Some("www.example.com")
    );
}

#[test]
fn sni_rejected() {
    let _ = env_logger::try_init();
    let certs = certs();
    let mut client = client(
        client_builder(&certs)
            .server_name("www.example.org")
            .build()
            .unwrap(),
    );
    let mut server = server(
        server_builder(&certs)
            .sni_matcher("*.example.com")
            .build()
            .unwrap(),
    );

    let err = handshake(&mut client, &mut server).unwrap_err();
    assert_eq!(err, Error::UnrecognizedName("www.example.org".into()));

    let err = pump(&mut server, &mut client).unwrap_err();
    assert_eq!(err, Error::AlertReceived(AlertDescription::UnrecognizedName));
}

#[test]
fn handshake_session_during_handshake() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());

    assert!(client.engine.handshake_session().is_none());
    pump(&mut client, &mut server).unwrap();
    pump(&mut server, &mut client).unwrap();

    let hs = client.engine.handshake_session().expect("in progress");
    assert_eq!(hs.version, Some(ProtocolVersion::TLS1_2));
    assert!(hs.cipher_suite.is_some());
    assert_eq!(hs.peer_host.as_deref(), Some("localhost"));
    assert!(!hs.resumed);
}
