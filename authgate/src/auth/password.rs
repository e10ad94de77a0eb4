//! Password hashing and verification.
//!
//! Credentials are stored as a raw 32-byte Argon2id digest next to the per-user salt
//! that produced it, so verification recomputes the digest with the same salt and
//! compares the bytes.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::rand_core::{self, OsRng, RngCore},
};
use base64::{Engine as _, engine::general_purpose};
use rand::prelude::RngExt;
use rand::rng;

use crate::{db::models::users::Credential, errors::Error, types::SessionToken};

/// Length in bytes of every stored password hash.
pub const HASH_LEN: usize = 32;

/// Smallest salt accepted from configuration.
pub const MIN_SALT_LEN: usize = 32;

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Create Argon2 instance with these parameters and a fixed 32-byte output.
    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, Some(HASH_LEN)).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    /// Secure defaults for production (Argon2id RFC recommendations)
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Where salt bytes come from.
pub trait SaltSource: Send + Sync {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), rand_core::Error>;
}

/// The operating system's random source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSaltSource;

impl SaltSource for OsSaltSource {
    fn try_fill(&self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        OsRng.try_fill_bytes(dest)
    }
}

/// Fill `length` bytes from `source`.
///
/// A failing source is reported as [`Error::Entropy`], never papered over with a weaker salt.
pub fn generate_salt_from(source: &dyn SaltSource, length: usize) -> Result<Vec<u8>, Error> {
    let mut salt = vec![0u8; length];
    source.try_fill(&mut salt).map_err(|e| Error::Entropy { message: e.to_string() })?;
    Ok(salt)
}

/// Fill `length` bytes from the operating system's random source.
pub fn generate_salt(length: usize) -> Result<Vec<u8>, Error> {
    generate_salt_from(&OsSaltSource, length)
}

/// Derive the 32-byte hash of `password` under `salt`.
pub fn hash_password(password: &str, salt: &[u8], params: Argon2Params) -> Result<[u8; HASH_LEN], Error> {
    let argon2 = params.to_argon2()?;
    let mut out = [0u8; HASH_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut out)
        .map_err(|e| Error::Internal {
            operation: format!("hash password: {e}"),
        })?;
    Ok(out)
}

/// Recompute the hash of `password` under `salt` and compare it with `expected`.
pub fn verify_password(password: &str, salt: &[u8], expected: &[u8], params: Argon2Params) -> Result<bool, Error> {
    let computed = hash_password(password, salt, params)?;
    Ok(constant_time_eq(&computed, expected))
}

/// Constant-time byte comparison to prevent timing attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Salt generation and hashing with a fixed configuration.
///
/// Cheap to clone; the hashing calls are CPU bound and meant to be run on a blocking
/// thread by async callers.
#[derive(Debug, Clone, Copy)]
pub struct CredentialCodec {
    params: Argon2Params,
    salt_length: usize,
}

impl CredentialCodec {
    pub fn new(params: Argon2Params, salt_length: usize) -> Self {
        Self { params, salt_length }
    }

    pub fn salt_length(&self) -> usize {
        self.salt_length
    }

    /// Fresh salt plus hash for a new password.
    pub fn derive(&self, password: &str) -> Result<Credential, Error> {
        self.derive_from(&OsSaltSource, password)
    }

    /// Like [`derive`](Self::derive), drawing the salt from `source`.
    pub fn derive_from(&self, source: &dyn SaltSource, password: &str) -> Result<Credential, Error> {
        let salt = generate_salt_from(source, self.salt_length)?;
        let password_hash = hash_password(password, &salt, self.params)?;
        Ok(Credential {
            password_hash: password_hash.to_vec(),
            salt,
        })
    }

    pub fn hash(&self, password: &str, salt: &[u8]) -> Result<[u8; HASH_LEN], Error> {
        hash_password(password, salt, self.params)
    }

    pub fn verify(&self, password: &str, credential: &Credential) -> Result<bool, Error> {
        verify_password(password, &credential.salt, &credential.password_hash, self.params)
    }
}

impl Default for CredentialCodec {
    fn default() -> Self {
        Self::new(Argon2Params::default(), MIN_SALT_LEN)
    }
}

/// Generate a fresh opaque session token
pub fn generate_session_token() -> SessionToken {
    // Generate 32 bytes (256 bits) of cryptographically secure random data
    let mut token_bytes = [0u8; 32];
    rng().fill(&mut token_bytes);

    // Encode as base64url without padding
    SessionToken::new(general_purpose::URL_SAFE_NO_PAD.encode(token_bytes))
}
