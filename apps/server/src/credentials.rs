//! Credential hashing.
//!
//! Secrets are stored as `pbkdf2-sha256$<iterations>$<salt>$<hash>` with the
//! salt and hash base64 encoded (no padding). The iteration count travels
//! with the hash, so raising the configured count only affects new hashes.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{Error, Result};

const SCHEME: &str = "pbkdf2-sha256";
pub const SALT_LENGTH: usize = 16;
pub const HASH_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    iterations: u32,
}

impl CredentialHasher {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Hash with a fresh random salt.
    pub fn hash(&self, secret: &str) -> String {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut derived = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), &salt, self.iterations, &mut derived);

        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(derived)
        )
    }

    /// Check `secret` against an encoded hash. Malformed hashes never verify.
    pub fn verify(&self, secret: &str, encoded: &str) -> bool {
        let Some((iterations, salt, expected)) = parse(encoded) else {
            return false;
        };

        let mut derived = vec![0u8; expected.len()];
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), &salt, iterations, &mut derived);
        derived.ct_eq(&expected).into()
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_blocking(&self, secret: String) -> Result<String> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| Error::Internal(format!("credential hashing task failed: {e}")))
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_blocking(&self, secret: String, encoded: String) -> Result<bool> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &encoded))
            .await
            .map_err(|e| Error::Internal(format!("credential verification task failed: {e}")))
    }
}

fn parse(encoded: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok()?;
    let salt = STANDARD_NO_PAD.decode(parts.next()?).ok()?;
    let hash = STANDARD_NO_PAD.decode(parts.next()?).ok()?;
    if parts.next().is_some() || iterations == 0 || hash.is_empty() {
        return None;
    }
    Some((iterations, salt, hash))
}

/// Hex SHA-256 of a bearer token, the form reset tokens are stored in.
pub fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time equality for stored digests.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
