// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Salted, one-way password credentials.
//!
//! Hashing uses Argon2id with default parameters and a random salt from
//! `OsRng`. The plaintext is never retained: only the PHC-formatted hash is
//! kept, and `Debug` redacts even that.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest accepted secret, in characters.
pub const MIN_SECRET_LEN: usize = 3;
/// Longest accepted secret, in bytes.
pub const MAX_SECRET_LEN: usize = 72;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must be between {MIN_SECRET_LEN} and {MAX_SECRET_LEN} characters")]
    WeakSecret,

    #[error("password does not match")]
    Mismatch,

    #[error("hashing failed: {0}")]
    Hash(String),
}

/// A password credential holding only its derived hash.
///
/// Serializes as the hash string so identity snapshots can round-trip
/// through the cache; API responses must use their own DTOs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password {
    hash: String,
}

impl Password {
    /// Derive a credential from a plaintext secret.
    pub fn from_secret(secret: &str) -> Result<Self, PasswordError> {
        let mut password = Self::default();
        password.set(secret)?;
        Ok(password)
    }

    /// Wrap a hash loaded from storage.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Replace the credential with the hash of `secret`.
    pub fn set(&mut self, secret: &str) -> Result<(), PasswordError> {
        let len = secret.chars().count();
        if !(MIN_SECRET_LEN..=MAX_SECRET_LEN).contains(&len) {
            return Err(PasswordError::WeakSecret);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;

        self.hash = hash.to_string();
        Ok(())
    }

    /// Check a candidate secret against the stored hash.
    ///
    /// The final digest comparison is constant-time (done by `argon2`).
    pub fn compare(&self, candidate: &str) -> Result<(), PasswordError> {
        let parsed = PasswordHash::new(&self.hash).map_err(|_| PasswordError::Mismatch)?;
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .map_err(|_| PasswordError::Mismatch)
    }

    pub fn is_set(&self) -> bool {
        !self.hash.is_empty()
    }

    /// PHC hash string, for persistence only.
    pub(crate) fn as_hash(&self) -> &str {
        &self.hash
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}
