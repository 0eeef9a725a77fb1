//! Key schedule of a TLS 1.2 AEAD handshake.

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::crypto::prf::{self, MASTER_SECRET_LEN, VERIFY_DATA_LEN};
use crate::crypto::SupportedCipherSuite;
use crate::record::CipherSpec;
use crate::types::Role;
use crate::Error;

const CLIENT_FINISHED: &str = "client finished";
const SERVER_FINISHED: &str = "server finished";

/// Master secret bound to the session hash (RFC 7627).
///
/// `session_hash` is the transcript hash up to and including the
/// ClientKeyExchange.
pub(crate) fn master_secret(
    suite: &dyn SupportedCipherSuite,
    pre_master_secret: &[u8],
    session_hash: &[u8],
) -> Result<Zeroizing<[u8; MASTER_SECRET_LEN]>, Error> {
    prf::extended_master_secret(suite.hash_algorithm(), pre_master_secret, session_hash)
}

/// Expand the key block and build the (read, write) record protection for
/// `role`.
///
/// AEAD suites need no MAC keys, so the block is
/// `client_key ‖ server_key ‖ client_iv ‖ server_iv`.
pub(crate) fn cipher_specs(
    suite: &'static dyn SupportedCipherSuite,
    master_secret: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
    role: Role,
) -> Result<(CipherSpec, CipherSpec), Error> {
    let (key_len, iv_len) = suite.key_lengths();
    let block = prf::key_block(
        suite.hash_algorithm(),
        master_secret,
        client_random,
        server_random,
        2 * (key_len + iv_len),
    )?;

    let (client_key, rest) = block.split_at(key_len);
    let (server_key, rest) = rest.split_at(key_len);
    let (client_iv, server_iv) = rest.split_at(iv_len);

    let client = CipherSpec::new(suite, client_key, client_iv)?;
    let server = CipherSpec::new(suite, server_key, &server_iv[..iv_len])?;

    Ok(match role {
        Role::Client => (server, client),
        Role::Server => (client, server),
    })
}

/// Verify data of the Finished sent by `sender`.
pub(crate) fn finished(
    suite: &dyn SupportedCipherSuite,
    master_secret: &[u8],
    sender: Role,
    handshake_hash: &[u8],
) -> Result<[u8; VERIFY_DATA_LEN], Error> {
    let label = match sender {
        Role::Client => CLIENT_FINISHED,
        Role::Server => SERVER_FINISHED,
    };
    prf::verify_data(suite.hash_algorithm(), master_secret, label, handshake_hash)
}

/// Constant time comparison of received and expected verify data.
pub(crate) fn check_finished(
    expected: &[u8; VERIFY_DATA_LEN],
    received: &[u8; VERIFY_DATA_LEN],
) -> Result<(), Error> {
    if bool::from(expected.ct_eq(received)) {
        Ok(())
    } else {
        Err(Error::FinishedMismatch)
    }
}
