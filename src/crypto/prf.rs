//! TLS 1.2 key derivation (RFC 5246 Section 5, RFC 7627).

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384};
use zeroize::Zeroizing;

use crate::types::HashAlgorithm;
use crate::Error;

/// Length of the master secret.
pub(crate) const MASTER_SECRET_LEN: usize = 48;

/// Length of Finished verify data.
pub(crate) const VERIFY_DATA_LEN: usize = 12;

/// PRF(secret, label, seed) = P_<hash>(secret, label + seed)
///
/// Fills all of `out`.
pub(crate) fn prf(
    hash: HashAlgorithm,
    secret: &[u8],
    label: &str,
    seed: &[u8],
    out: &mut [u8],
) -> Result<(), Error> {
    let mut full_seed = Vec::with_capacity(label.len() + seed.len());
    full_seed.extend_from_slice(label.as_bytes());
    full_seed.extend_from_slice(seed);

    match hash {
        HashAlgorithm::SHA256 => p_hash::<Hmac<Sha256>>(secret, &full_seed, out),
        HashAlgorithm::SHA384 => p_hash::<Hmac<Sha384>>(secret, &full_seed, out),
    }
}

fn p_hash<M>(secret: &[u8], seed: &[u8], out: &mut [u8]) -> Result<(), Error>
where
    M: Mac + KeyInit + Clone,
{
    let key = <M as Mac>::new_from_slice(secret)
        .map_err(|_| Error::Crypto("invalid PRF secret length".into()))?;

    // A(1) = HMAC_hash(secret, A(0)) where A(0) = seed
    let mut mac = key.clone();
    mac.update(seed);
    let mut a = mac.finalize().into_bytes();

    let mut written = 0;
    while written < out.len() {
        // HMAC_hash(secret, A(i) + seed)
        let mut mac = key.clone();
        mac.update(&a);
        mac.update(seed);
        let block = mac.finalize().into_bytes();

        let n = (out.len() - written).min(block.len());
        out[written..written + n].copy_from_slice(&block[..n]);
        written += n;

        // A(i+1) = HMAC_hash(secret, A(i))
        let mut mac = key.clone();
        mac.update(&a);
        a = mac.finalize().into_bytes();
    }

    Ok(())
}

/// Hash of the handshake transcript.
pub(crate) fn transcript_hash(hash: HashAlgorithm, transcript: &[u8]) -> Vec<u8> {
    match hash {
        HashAlgorithm::SHA256 => Sha256::digest(transcript).to_vec(),
        HashAlgorithm::SHA384 => Sha384::digest(transcript).to_vec(),
    }
}

/// master_secret = PRF(pre_master_secret, "extended master secret", session_hash)
pub(crate) fn extended_master_secret(
    hash: HashAlgorithm,
    pre_master_secret: &[u8],
    session_hash: &[u8],
) -> Result<Zeroizing<[u8; MASTER_SECRET_LEN]>, Error> {
    let mut master = Zeroizing::new([0u8; MASTER_SECRET_LEN]);
    prf(
        hash,
        pre_master_secret,
        "extended master secret",
        session_hash,
        &mut master[..],
    )?;
    Ok(master)
}

/// key_block = PRF(master_secret, "key expansion", server_random + client_random)
pub(crate) fn key_block(
    hash: HashAlgorithm,
    master_secret: &[u8],
    client_random: &[u8],
    server_random: &[u8],
    len: usize,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(server_random);
    seed.extend_from_slice(client_random);

    let mut block = Zeroizing::new(vec![0u8; len]);
    prf(hash, master_secret, "key expansion", &seed, &mut block[..])?;
    Ok(block)
}

/// verify_data = PRF(master_secret, finished_label, Hash(handshake_messages))
pub(crate) fn verify_data(
    hash: HashAlgorithm,
    master_secret: &[u8],
    label: &str,
    handshake_hash: &[u8],
) -> Result<[u8; VERIFY_DATA_LEN], Error> {
    let mut out = [0u8; VERIFY_DATA_LEN];
    prf(hash, master_secret, label, handshake_hash, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test vector from the IETF TLS WG mailing list, widely reused for
    // TLS 1.2 PRF (SHA-256) implementations.
    #[test]
    fn prf_sha256_vector() {
        let secret = [
            0x9b, 0xbe, 0x43, 0x6b, 0xa9, 0x40, 0xf0, 0x17, 0xb1, 0x76, 0x52, 0x84, 0x9a, 0x71,
            0xdb, 0x35,
        ];
        let seed = [
            0xa0, 0xba, 0x9f, 0x93, 0x6c, 0xda, 0x31, 0x18, 0x27, 0xa6, 0xf7, 0x96, 0xff, 0xd5,
            0x19, 0x8c,
        ];
        let mut out = [0u8; 16];
        prf(HashAlgorithm::SHA256, &secret, "test label", &seed, &mut out).unwrap();
        assert_eq!(
            out,
            [
                0xe3, 0xf2, 0x29, 0xba, 0x72, 0x7b, 0xe1, 0x7b, 0x8d, 0x12, 0x26, 0x20, 0x55, 0x7c,
                0xd4, 0x53
            ]
        );
    }

    #[test]
    fn prf_output_is_prefix_stable() {
        let mut short = [0u8; 20];
        let mut long = [0u8; 100];
        prf(HashAlgorithm::SHA384, b"k", "l", b"s", &mut short).unwrap();
        prf(HashAlgorithm::SHA384, b"k", "l", b"s", &mut long).unwrap();
        assert_eq!(&short[..], &long[..20]);
    }

    #[test]
    fn key_block_depends_on_random_order() {
        let master = [7u8; 48];
        let a = key_block(HashAlgorithm::SHA256, &master, &[1; 32], &[2; 32], 40).unwrap();
        let b = key_block(HashAlgorithm::SHA256, &master, &[2; 32], &[1; 32], 40).unwrap();
        assert_ne!(&a[..], &b[..]);
    }

    #[test]
    fn verify_data_labels_differ() {
        let master = [3u8; 48];
        let hash = transcript_hash(HashAlgorithm::SHA256, b"transcript");
        let c = verify_data(HashAlgorithm::SHA256, &master, "client finished", &hash).unwrap();
        let s = verify_data(HashAlgorithm::SHA256, &master, "server finished", &hash).unwrap();
        assert_ne!(c, s);
    }
}
