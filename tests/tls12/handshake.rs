//! Full handshakes, with and without client authentication.

use std::sync::Arc;

use timpl::{
    AlertDescription, ClientAuth, Error, FingerprintTrustManager, HandshakePhase,
    HandshakeStatus, ProtocolVersion, TaskKind,
};

use crate::common::*;

#[test]
fn full_handshake() {
    let _ = env_logger::try_init();
    let certs = certs();

    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());

    assert_eq!(client.engine.handshake_status(), HandshakeStatus::NotStarted);
    handshake(&mut client, &mut server).expect("handshake");

    assert_eq!(client.finished, 1);
    assert_eq!(server.finished, 1);
    assert_eq!(client.engine.handshake_phase(), HandshakePhase::Established);
    assert_eq!(server.engine.handshake_phase(), HandshakePhase::Established);

    let cs = client.engine.session().unwrap();
    let ss = server.engine.session().unwrap();
    assert_eq!(cs.id(), ss.id());
    assert_eq!(cs.protocol_version(), ProtocolVersion::TLS1_2);
    assert_eq!(cs.cipher_suite(), ss.cipher_suite());
    assert_eq!(cs.peer_host(), Some("localhost"));
    assert_eq!(cs.peer_port(), Some(4433));
    assert_eq!(
        cs.peer_certificates().unwrap()[0],
        certs.server.certificate
    );
    assert!(ss.peer_certificates().is_none());
    assert_eq!(ss.local_certificates()[0], certs.server.certificate);

    // No application data or alerts during a clean handshake.
    for t in client.sent_types.iter().chain(&server.sent_types) {
        assert!([HANDSHAKE, CHANGE_CIPHER_SPEC].contains(t));
    }
}

#[test]
fn finished_reported_once() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());

    handshake(&mut client, &mut server).unwrap();
    pump(&mut client, &mut server).unwrap();
    pump(&mut server, &mut client).unwrap();

    assert_eq!(client.finished, 1);
    assert_eq!(server.finished, 1);
    assert_eq!(
        client.engine.handshake_status(),
        HandshakeStatus::NotHandshaking
    );
}

#[test]
fn server_tasks_are_delegated() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());

    let hello = client.flush().unwrap();
    server.inbox.extend_from_slice(&hello);

    let mut app = [0u8; 64];
    let r = server.engine.unwrap(&server.inbox, &mut [&mut app[..]]).unwrap();
    assert_eq!(r.bytes_consumed, hello.len());
    assert_eq!(r.handshake_status, HandshakeStatus::NeedTask);

    // Nothing moves until the task ran.
    let mut out = vec![0; RECORD_BUF];
    let r = server.engine.wrap(&[], &mut out).unwrap();
    assert_eq!(r.bytes_produced, 0);
    assert_eq!(r.handshake_status, HandshakeStatus::NeedTask);

    let task = server.engine.delegated_task().unwrap();
    assert_eq!(task.kind(), TaskKind::ChooseServerCredentials);
    task.run();

    // Credentials lead to the signing task.
    let r = server.engine.wrap(&[], &mut out).unwrap();
    assert_eq!(r.handshake_status, HandshakeStatus::NeedTask);
    let task = server.engine.delegated_task().unwrap();
    assert_eq!(task.kind(), TaskKind::SignServerKeyExchange);
    task.run();

    let r = server.engine.wrap(&[], &mut out).unwrap();
    assert!(r.bytes_produced > 0);
    assert_eq!(out[0], HANDSHAKE);
}

#[test]
fn client_auth_want_without_certificate() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(
        server_builder(&certs)
            .client_auth(ClientAuth::Want)
            .build()
            .unwrap(),
    );

    handshake(&mut client, &mut server).expect("handshake");
    assert!(server.engine.session().unwrap().peer_certificates().is_none());
}

#[test]
fn client_auth_need_without_certificate() {
    let _ = env_logger::try_init();
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(
        server_builder(&certs)
            .client_auth(ClientAuth::Need)
            .build()
            .unwrap(),
    );

    let err = handshake(&mut client, &mut server).unwrap_err();
    assert_eq!(err, Error::CertificateRequired);
    assert!(server.engine.is_inbound_done());

    let err = pump(&mut server, &mut client).unwrap_err();
    assert_eq!(err, Error::AlertReceived(AlertDescription::BadCertificate));
    assert!(server.engine.is_outbound_done());
}

#[test]
fn client_auth_need_with_certificate() {
    let _ = env_logger::try_init();
    let certs = certs();
    let mut client = client(client_builder_with_cert(&certs).build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());
    server.engine.set_client_auth(ClientAuth::Need).unwrap();

    handshake(&mut client, &mut server).expect("handshake");

    let ss = server.engine.session().unwrap();
    assert_eq!(ss.peer_certificates().unwrap()[0], certs.client.certificate);
    let cs = client.engine.session().unwrap();
    assert_eq!(cs.local_certificates()[0], certs.client.certificate);
}

#[test]
fn untrusted_server_certificate() {
    let certs = certs();
    let other = generate_other();
    let config = timpl::Config::builder()
        .trust_manager(Arc::new(FingerprintTrustManager::from_certificates([
            &other[..],
        ])))
        .build()
        .unwrap();

    let mut client = client(config);
    let mut server = server(server_builder(&certs).build().unwrap());

    let err = handshake(&mut client, &mut server).unwrap_err();
    assert!(matches!(err, Error::CertificateRejected(_)), "{:?}", err);

    let err = pump(&mut client, &mut server).unwrap_err();
    assert_eq!(
        err,
        Error::AlertReceived(AlertDescription::CertificateUnknown)
    );
}

#[test]
fn client_without_trust_manager_rejects() {
    let certs = certs();
    let mut client = client(timpl::Config::builder().build().unwrap());
    let mut server = server(server_builder(&certs).build().unwrap());

    let err = handshake(&mut client, &mut server).unwrap_err();
    assert!(matches!(err, Error::CertificateRejected(_)));
}

#[test]
fn server_without_credentials() {
    let certs = certs();
    let mut client = client(client_builder(&certs).build().unwrap());
    let mut server = server(timpl::Config::builder().build().unwrap());

    let err = handshake(&mut client, &mut server).unwrap_err();
    assert!(matches!(err, Error::NoCredentials(_)), "{:?}", err);

    let err = pump(&mut server, &mut client).unwrap_err();
    assert_eq!(err, Error::AlertReceived(AlertDescription::HandshakeFailure));
}

fn generate_other() -> Vec<u8> {
    timpl::certificate::generate_self_signed_certificate(&["other"])
        .unwrap()
        .certificate
}

#[test]
fn tasks_of_one_record_come_out_in_order() {
    let _ = env_logger::try_init();
    let certs = certs();
    let mut client = client(client_builder_with_cert(&certs).build().unwrap());
    let mut server = server(
        server_builder(&certs)
            .client_auth(ClientAuth::Want)
            .build()
            .unwrap(),
    );

    pump(&mut client, &mut server).unwrap();

    // ServerHello through ServerHelloDone in a single record.
    let flight = coalesce_handshake(&server.flush().unwrap());
    let mut app = [0u8; 64];
    let r = client.engine.unwrap(&flight, &mut [&mut app[..]]).unwrap();
    assert_eq!(r.bytes_consumed, flight.len());
    assert_eq!(r.handshake_status, HandshakeStatus::NeedTask);

    let mut tasks = Vec::new();
    while let Some(task) = client.engine.delegated_task() {
        tasks.push(task);
    }
    let kinds: Vec<TaskKind> = tasks.iter().map(|t| t.kind()).collect();
    assert_eq!(
        kinds,
        [
            TaskKind::VerifyServerChain,
            TaskKind::VerifyServerKeyExchange,
            TaskKind::ChooseClientCredentials,
        ]
    );
    assert!(client.engine.delegated_task().is_none());

    for task in tasks {
        task.run();
    }
    handshake(&mut client, &mut server).expect("handshake");
    assert!(client.engine.session().is_some());
}
