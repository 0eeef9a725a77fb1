//! close_notify exchange and the closed state.

use timpl::{HandshakeStatus, Status};

use crate::common::*;

#[test]
fn orderly_close() {
    let _ = env_logger::try_init();
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());
    handshake(&mut client, &mut server).unwrap();

    client.engine.close_outbound();
    assert!(!client.engine.is_outbound_done());

    let mut buf = vec![0; RECORD_BUF];
    let r = client.engine.wrap(&[b"ignored"], &mut buf).unwrap();
    assert_eq!(r.status, Status::Closed);
    assert_eq!(r.bytes_consumed, 0);
    assert_eq!(record_types(&buf[..r.bytes_produced]), vec![ALERT]);
    assert!(client.engine.is_outbound_done());

    let mut app = vec![0; RECORD_BUF];
    let r = server
        .engine
        .unwrap(&buf[..r.bytes_produced], &mut [&mut app[..]])
        .unwrap();
    assert_eq!(r.status, Status::Closed);
    assert!(server.engine.is_inbound_done());
    assert_eq!(r.handshake_status, HandshakeStatus::NeedWrap);

    // The server answers with its own close_notify.
    let reply = server.flush().unwrap();
    assert_eq!(record_types(&reply), vec![ALERT]);
    assert!(server.engine.is_outbound_done());

    client.inbox.extend_from_slice(&reply);
    client.deliver().unwrap();
    assert!(client.engine.is_inbound_done());

    for peer in [&mut client, &mut server] {
        let r = peer.engine.wrap(&[b"late"], &mut buf).unwrap();
        assert_eq!((r.status, r.bytes_produced), (Status::Closed, 0));
        let r = peer.engine.unwrap(&reply, &mut [&mut app[..]]).unwrap();
        assert_eq!((r.status, r.bytes_consumed), (Status::Closed, 0));
        peer.engine.close_outbound();
        peer.engine.close_inbound();
    }
}

#[test]
fn close_inbound_closes_outbound() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());
    handshake(&mut client, &mut server).unwrap();

    // No close_notify seen: truncation is logged, close_notify still sent.
    server.engine.close_inbound();
    assert!(server.engine.is_inbound_done());
    let out = server.flush().unwrap();
    assert_eq!(record_types(&out), vec![ALERT]);
    assert!(server.engine.is_outbound_done());
}

#[test]
fn close_during_handshake_abandons_it() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());

    pump(&mut client, &mut server).unwrap();
    client.engine.close_outbound();

    let out = client.flush().unwrap();
    assert_eq!(record_types(&out), vec![ALERT]);
    assert!(client.engine.is_outbound_done());
    assert_eq!(client.finished, 0);
}

#[test]
fn close_drops_unsent_client_hello() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());

    client.engine.begin_handshake().unwrap();
    client.engine.close_outbound();

    let out = client.flush().unwrap();
    assert_eq!(record_types(&out), vec![ALERT]);
    assert!(client.engine.is_outbound_done());
}
