//! Abbreviated handshakes from the session cache.

use std::sync::Arc;
use std::time::Duration;

use timpl::{Config, MemorySessionCache, TlsEngine};

use crate::common::*;

fn configs() -> (Arc<Config>, Arc<Config>) {
    let certs = certs();
    (
        Arc::new(client_builder(&certs).build().unwrap()),
        Arc::new(server_builder(&certs).build().unwrap()),
    )
}

#[test]
fn resumes_cached_session() {
    let _ = env_logger::try_init();
    let (client_config, server_config) = configs();

    let mut c1 = client_on(&client_config);
    let mut s1 = server_on(&server_config);
    handshake(&mut c1, &mut s1).unwrap();
    let first = c1.engine.session().unwrap();
    assert!(c1.tasks_run > 0);
    assert!(s1.tasks_run > 0);

    let mut c2 = client_on(&client_config);
    let mut s2 = server_on(&server_config);
    handshake(&mut c2, &mut s2).unwrap();

    let second = c2.engine.session().unwrap();
    assert_eq!(first.id(), second.id());
    assert_eq!(s2.engine.session().unwrap().id(), first.id());

    // No certificates, no signatures.
    assert_eq!(c2.tasks_run, 0);
    assert_eq!(s2.tasks_run, 0);

    transfer(&mut c2, &mut s2, b"resumed").unwrap();
    assert_eq!(s2.received, b"resumed");
}

#[test]
fn no_resumption_without_peer() {
    let (client_config, server_config) = configs();

    let mut c1 = client_on(&client_config);
    let mut s1 = server_on(&server_config);
    handshake(&mut c1, &mut s1).unwrap();

    let mut engine = TlsEngine::new(client_config.clone());
    engine.set_use_client_mode(true).unwrap();
    let mut c2 = Peer::new(engine);
    let mut s2 = server_on(&server_config);
    handshake(&mut c2, &mut s2).unwrap();

    assert_ne!(
        c1.engine.session().unwrap().id(),
        c2.engine.session().unwrap().id()
    );
    assert!(s2.tasks_run > 0);
}

#[test]
fn invalidated_session_is_not_resumed() {
    let (client_config, server_config) = configs();

    let mut c1 = client_on(&client_config);
    let mut s1 = server_on(&server_config);
    handshake(&mut c1, &mut s1).unwrap();
    let first = c1.engine.session().unwrap();
    first.invalidate();

    let mut c2 = client_on(&client_config);
    let mut s2 = server_on(&server_config);
    handshake(&mut c2, &mut s2).unwrap();
    assert_ne!(c2.engine.session().unwrap().id(), first.id());
}

#[test]
fn server_without_cached_session_runs_full_handshake() {
    let certs = certs();
    let client_config = Arc::new(client_builder(&certs).build().unwrap());
    let server_config = Arc::new(server_builder(&certs).build().unwrap());
    let other_server = Arc::new(
        server_builder(&certs)
            .session_cache(Arc::new(MemorySessionCache::new(
                Some(Duration::from_secs(60)),
                10,
            )))
            .build()
            .unwrap(),
    );

    let mut c1 = client_on(&client_config);
    let mut s1 = server_on(&server_config);
    handshake(&mut c1, &mut s1).unwrap();
    let first = c1.engine.session().unwrap();

    // The client offers the id, this server does not know it.
    let mut c2 = client_on(&client_config);
    let mut s2 = server_on(&other_server);
    handshake(&mut c2, &mut s2).unwrap();

    assert_ne!(c2.engine.session().unwrap().id(), first.id());
    assert!(c2.tasks_run > 0);
}
