//! Application data after the handshake.

use timpl::{Error, HandshakeStatus, MaxFragmentLength, Status};

use crate::common::*;

fn established() -> (Peer, Peer) {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());
    handshake(&mut client, &mut server).expect("handshake");
    (client, server)
}

#[test]
fn exchange_both_ways() {
    let _ = env_logger::try_init();
    let (mut client, mut server) = established();

    transfer(&mut client, &mut server, b"hello").unwrap();
    transfer(&mut server, &mut client, b"world").unwrap();

    assert_eq!(server.received, b"hello");
    assert_eq!(client.received, b"world");
}

#[test]
fn large_write_is_split_into_records() {
    let (mut client, mut server) = established();
    let data: Vec<u8> = (0..40_000u32).map(|i| i as u8).collect();

    let (consumed, record) = client.send(&data).unwrap();
    assert_eq!(consumed, 16_384);
    assert_eq!(record[0], APPLICATION_DATA);

    // Records must arrive in sequence order.
    server.inbox.extend_from_slice(&record);
    server.deliver().unwrap();
    assert_eq!(server.received.len(), consumed);

    transfer(&mut client, &mut server, &data[consumed..]).unwrap();

    assert_eq!(server.received, data);
}

#[test]
fn gathers_from_several_sources() {
    let (mut client, mut server) = established();

    let mut buf = vec![0; RECORD_BUF];
    let r = client
        .engine
        .wrap(&[b"abc", b"", b"def"], &mut buf)
        .unwrap();
    assert_eq!(r.bytes_consumed, 6);

    server.inbox.extend_from_slice(&buf[..r.bytes_produced]);
    server.deliver().unwrap();
    assert_eq!(server.received, b"abcdef");
}

#[test]
fn scatters_into_several_destinations() {
    let (mut client, mut server) = established();
    let (_, record) = client.send(b"0123456789").unwrap();

    let size = server.engine.session().unwrap().application_buffer_size();
    let mut a = vec![0; 4];
    let mut b = vec![0; size];
    let r = server
        .engine
        .unwrap(&record, &mut [&mut a[..], &mut b[..]])
        .unwrap();
    assert_eq!(r.bytes_produced, 10);
    assert_eq!(&a, b"0123");
    assert_eq!(&b[..6], b"456789");
}

#[test]
fn wrap_overflow() {
    let (mut client, _server) = established();

    let mut small = [0u8; 20];
    let r = client.engine.wrap(&[b"more than fits"], &mut small).unwrap();
    assert_eq!(r.status, Status::BufferOverflow);
    assert_eq!(r.bytes_consumed, 0);
    assert_eq!(r.bytes_produced, 0);
}

#[test]
fn unwrap_overflow_then_retry() {
    let (mut client, mut server) = established();
    let (_, record) = client.send(b"payload").unwrap();

    let mut tiny = [0u8; 2];
    let r = server.engine.unwrap(&record, &mut [&mut tiny[..]]).unwrap();
    assert_eq!(r.status, Status::BufferOverflow);
    assert_eq!(r.bytes_consumed, 0);

    let size = server.engine.session().unwrap().application_buffer_size();
    let mut dst = vec![0; size];
    let r = server.engine.unwrap(&record, &mut [&mut dst[..]]).unwrap();
    assert_eq!(r.status, Status::Ok);
    assert_eq!(r.bytes_consumed, record.len());
    assert_eq!(&dst[..r.bytes_produced], b"payload");
}

#[test]
fn unwrap_underflow() {
    let (mut client, mut server) = established();
    let (_, record) = client.send(b"payload").unwrap();

    let mut dst = vec![0; RECORD_BUF];
    for cut in [0, 3, 5, record.len() - 1] {
        let r = server
            .engine
            .unwrap(&record[..cut], &mut [&mut dst[..]])
            .unwrap();
        assert_eq!(r.status, Status::BufferUnderflow);
        assert_eq!(r.bytes_consumed, 0);
    }
    let r = server.engine.unwrap(&record, &mut [&mut dst[..]]).unwrap();
    assert_eq!(r.bytes_produced, 7);
}

#[test]
fn tampered_record_is_fatal() {
    let _ = env_logger::try_init();
    let (mut client, mut server) = established();
    let session = server.engine.session().unwrap();

    let (_, mut record) = client.send(b"secret").unwrap();
    let last = record.len() - 1;
    record[last] ^= 1;

    server.inbox.extend_from_slice(&record);
    assert_eq!(server.deliver(), Err(Error::BadRecordMac));
    assert!(server.engine.is_inbound_done());
    assert!(!session.is_valid());

    // The alert is the last thing the server sends.
    let out = server.flush().unwrap();
    assert_eq!(record_types(&out), vec![ALERT]);
    assert!(server.engine.is_outbound_done());

    client.inbox.extend_from_slice(&out);
    assert_eq!(
        client.deliver(),
        Err(Error::AlertReceived(timpl::AlertDescription::BadRecordMac))
    );
}

#[test]
fn replayed_record_is_fatal() {
    let (mut client, mut server) = established();
    let (_, record) = client.send(b"once").unwrap();

    server.inbox.extend_from_slice(&record);
    server.deliver().unwrap();
    server.inbox.extend_from_slice(&record);
    assert_eq!(server.deliver(), Err(Error::BadRecordMac));
}

#[test]
fn max_fragment_length_limits_records() {
    let _ = env_logger::try_init();
    let certs = certs();
    let mut client = client(
        client_builder(&certs)
            .max_fragment_length(MaxFragmentLength::Bytes512)
            .build()
            .unwrap(),
    );
    let mut server = server(server_builder(&certs).build().unwrap());
    handshake(&mut client, &mut server).unwrap();

    let session = server.engine.session().unwrap();
    assert_eq!(session.max_fragment_len(), 512);
    assert_eq!(session.application_buffer_size(), 512);

    let data = vec![7u8; 2000];
    let (consumed, _) = server.send(&data).unwrap();
    assert_eq!(consumed, 512);

    transfer(&mut client, &mut server, &data).unwrap();
    assert_eq!(server.received, data);
    assert_eq!(
        server.engine.handshake_status(),
        HandshakeStatus::NotHandshaking
    );
}
