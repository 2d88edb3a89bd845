// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (rate limiting, authentication, authorization, etc.).

pub mod auth;
pub mod basic_auth;
pub mod permission;
pub mod post_context;
pub mod rate_limit;
pub mod security;

pub use auth::{require_auth, CurrentUser};
pub use basic_auth::require_basic_auth;
pub use permission::{require_admin, require_moderator};
pub use post_context::{load_post, PostContext};
pub use rate_limit::rate_limit;
