// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod feed;
pub mod invitation;
pub mod password;
pub mod post;
pub mod role;
pub mod user;

pub use feed::{FeedParams, FeedQuery, SortOrder};
pub use invitation::Invitation;
pub use password::Password;
pub use post::{Comment, FeedItem, NewPost, Post};
pub use role::Role;
pub use user::{NewUser, User, UserResponse};
