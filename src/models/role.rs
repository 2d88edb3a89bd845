// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role reference data.

use serde::{Deserialize, Serialize};

pub const USER: &str = "user";
pub const MODERATOR: &str = "moderator";
pub const ADMIN: &str = "admin";

/// A named role; `level` gives the total order used for authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub level: i32,
    pub description: String,
}

/// Roles every deployment starts with (mirrors the seed migration).
pub fn default_roles() -> Vec<Role> {
    vec![
        Role {
            id: 1,
            name: USER.to_string(),
            level: 1,
            description: "A user can create posts and comments".to_string(),
        },
        Role {
            id: 2,
            name: MODERATOR.to_string(),
            level: 2,
            description: "A moderator can delete other users' posts".to_string(),
        },
        Role {
            id: 3,
            name: ADMIN.to_string(),
            level: 3,
            description: "An admin can update and delete other users' posts".to_string(),
        },
    ]
}
