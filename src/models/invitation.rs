// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account invitations.
//!
//! The plaintext secret goes out by email exactly once; storage only ever
//! sees its SHA-256 digest.

use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// A pending invitation as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    /// Hex SHA-256 of the plaintext secret
    pub token_hash: String,
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
}

impl Invitation {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expiry > now
    }
}

/// Generate a new invitation secret, returning `(plaintext, hash)`.
///
/// The secret is 256 random bits, hex-encoded.
pub fn generate_token() -> (String, String) {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    let plaintext = hex::encode(bytes);
    let hash = hash_token(&plaintext);
    (plaintext, hash)
}

/// Irreversible digest of an invitation secret.
pub fn hash_token(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}
