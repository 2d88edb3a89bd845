// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage, caching, and API responses.

use super::password::Password;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account.
///
/// This is the full snapshot held by the identity cache, including the
/// credential hash. Never serialize it into an API response; use
/// [`UserResponse`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: Password,
    pub created_at: DateTime<Utc>,
    /// Inactive users cannot authenticate and are hidden from reads
    pub is_active: bool,
    pub role_id: i64,
    /// Rank of the user's role (higher is more privileged)
    pub role_level: i32,
}

/// Fields needed to insert a new (inactive) user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: Password,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub role_id: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            is_active: user.is_active,
            role_id: user.role_id,
        }
    }
}
