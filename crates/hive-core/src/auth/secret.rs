use rand::{Rng, RngCore, distributions::Alphanumeric};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;

pub(crate) const BOOTSTRAP_SECRET_LEN: usize = 20;
pub(crate) const SESSION_TOKEN_LEN: usize = 32;

/// Random base62 string.
pub(crate) fn random_base62(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Salted digest in the form `sha256$<salt hex>$<digest hex>`.
pub(crate) fn hash_secret(secret: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!("{SCHEME}${}${}", hex::encode(salt), hex::encode(digest(&salt, secret)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Match,
    /// Stored value predates hashing and matched verbatim.
    LegacyMatch,
    Mismatch,
}

pub(crate) fn verify(stored: &str, secret: &str) -> Verdict {
    match parse(stored) {
        Some((salt, expected)) => {
            if bool::from(digest(&salt, secret).as_slice().ct_eq(&expected)) {
                Verdict::Match
            } else {
                Verdict::Mismatch
            }
        }
        None if !stored.starts_with(SCHEME) => {
            if bool::from(stored.as_bytes().ct_eq(secret.as_bytes())) {
                Verdict::LegacyMatch
            } else {
                Verdict::Mismatch
            }
        }
        None => Verdict::Mismatch,
    }
}

/// Burn the same work as a real check, for identities that do not exist.
pub(crate) fn verify_nothing(secret: &str) {
    let _ = digest(&[0u8; SALT_LEN], secret);
}

fn digest(salt: &[u8], secret: &str) -> Vec<u8> {
    let mut h = Sha256::new();
    h.update(salt);
    h.update(secret.as_bytes());
    h.finalize().to_vec()
}

fn parse(stored: &str) -> Option<(Vec<u8>, Vec<u8>)> {
    let mut parts = stored.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let salt = hex::decode(parts.next()?).ok()?;
    let digest = hex::decode(parts.next()?).ok()?;
    if parts.next().is_some() || salt.is_empty() || digest.len() != 32 {
        return None;
    }
    Some((salt, digest))
}
