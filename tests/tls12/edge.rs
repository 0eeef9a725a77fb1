//! Misuse, malformed input and abandoned tasks.

use timpl::{AlertDescription, Error, HandshakeStatus, Status, TlsEngine};

use crate::common::*;

#[test]
fn abandoned_task_fails_handshake() {
    let _ = env_logger::try_init();
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());

    let hello = client.flush().unwrap();
    let mut app = vec![0; RECORD_BUF];
    let r = server.engine.unwrap(&hello, &mut [&mut app[..]]).unwrap();
    assert_eq!(r.handshake_status, HandshakeStatus::NeedTask);

    drop(server.engine.delegated_task().unwrap());

    let mut out = vec![0; RECORD_BUF];
    assert_eq!(server.engine.wrap(&[], &mut out), Err(Error::TaskAbandoned));

    let r = server.engine.wrap(&[], &mut out).unwrap();
    assert_eq!(r.status, Status::Closed);
    assert_eq!(&out[5..7], &[2, AlertDescription::InternalError.as_u8()]);
}

#[test]
fn task_outcome_after_close_is_ignored() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());

    let hello = client.flush().unwrap();
    let mut app = vec![0; RECORD_BUF];
    server.engine.unwrap(&hello, &mut [&mut app[..]]).unwrap();

    let task = server.engine.delegated_task().unwrap();
    server.engine.close_outbound();

    // Running a task of an abandoned handshake does nothing.
    task.run();
    let out = server.flush().unwrap();
    assert_eq!(record_types(&out), vec![ALERT]);
}

#[test]
fn handshake_byte_by_byte() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());

    let hello = client.flush().unwrap();
    let mut app = vec![0; RECORD_BUF];
    for end in 0..hello.len() {
        let r = server
            .engine
            .unwrap(&hello[..end], &mut [&mut app[..]])
            .unwrap();
        assert_eq!(r.status, Status::BufferUnderflow);
        assert_eq!(r.bytes_consumed, 0);
    }

    server.inbox.extend_from_slice(&hello);
    server.deliver().unwrap();
    handshake(&mut client, &mut server).unwrap();
}

#[test]
fn change_cipher_spec_out_of_order() {
    let certs = certs();
    let mut server = server(server_builder(&certs).build().unwrap());

    server.inbox.extend_from_slice(&[CHANGE_CIPHER_SPEC, 3, 3, 0, 1, 1]);
    let err = server.deliver().unwrap_err();
    assert!(matches!(err, Error::UnexpectedMessage(_)));

    let out = server.flush().unwrap();
    assert_eq!(
        &out[5..7],
        &[2, AlertDescription::UnexpectedMessage.as_u8()]
    );
}

#[test]
fn unexpected_handshake_message() {
    let mut server = server(timpl::Config::default());

    // ServerHelloDone sent to a server.
    server.inbox.extend_from_slice(&[HANDSHAKE, 3, 3, 0, 4, 14, 0, 0, 0]);
    let err = server.deliver().unwrap_err();
    assert!(matches!(err, Error::UnexpectedMessage(_)));
}

#[test]
fn malformed_record_header() {
    let mut server = server(timpl::Config::default());

    server.inbox.extend_from_slice(&[99, 3, 3, 0, 1, 0]);
    assert!(matches!(
        server.deliver(),
        Err(Error::UnexpectedMessage(_))
    ));

    let mut server = server_fresh();
    server.inbox.extend_from_slice(&[HANDSHAKE, 2, 0, 0, 1, 0]);
    assert!(matches!(server.deliver(), Err(Error::BadRecordVersion(_))));

    let mut server = server_fresh();
    server.inbox.extend_from_slice(&[HANDSHAKE, 3, 3, 0x48, 0x01]);
    assert!(matches!(server.deliver(), Err(Error::RecordOverflow(_))));
}

#[test]
fn garbage_client_hello() {
    let mut server = server_fresh();
    server
        .inbox
        .extend_from_slice(&[HANDSHAKE, 3, 1, 0, 6, 1, 0, 0, 2, 3, 3]);
    assert!(matches!(server.deliver(), Err(Error::DecodeError(_))));
}

#[test]
fn application_data_before_finished() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());
    pump(&mut client, &mut server).unwrap();

    let mut buf = vec![0; RECORD_BUF];
    let r = client.engine.wrap(&[b"early"], &mut buf).unwrap();
    // Only the handshake can move before it completed.
    assert_eq!(r.bytes_consumed, 0);
}

#[test]
fn role_must_be_set() {
    let mut engine = TlsEngine::new(std::sync::Arc::new(timpl::Config::default()));
    let mut out = [0u8; 16];
    assert_eq!(engine.wrap(&[], &mut out), Err(Error::RoleNotSet));
    assert_eq!(engine.begin_handshake(), Err(Error::RoleNotSet));

    engine.set_use_client_mode(false).unwrap();
    engine.begin_handshake().unwrap();
    assert_eq!(engine.set_use_client_mode(true), Err(Error::RoleChange));
    assert_eq!(engine.use_client_mode(), Ok(false));
}

fn server_fresh() -> Peer {
    server(timpl::Config::default())
}

#[test]
fn fatal_error_drops_unsent_flight() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());

    pump(&mut client, &mut server).unwrap();

    // Let the server build its flight without room to write it out.
    let mut tiny = [0u8; 8];
    loop {
        server.run_tasks();
        let r = server.engine.wrap(&[], &mut tiny).unwrap();
        if r.status == Status::BufferOverflow {
            break;
        }
        assert_eq!(r.handshake_status, HandshakeStatus::NeedTask);
    }

    let stray = [APPLICATION_DATA, 3, 3, 0, 1, 0];
    let mut app = vec![0; RECORD_BUF];
    assert!(server.engine.unwrap(&stray, &mut [&mut app[..]]).is_err());

    let out = server.flush().unwrap();
    assert_eq!(record_types(&out), vec![ALERT]);
}
