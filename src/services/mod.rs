// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod authenticator;
pub mod authz;
pub mod identity;
pub mod lifecycle;
pub mod mailer;
pub mod rate_limit;

pub use authenticator::{Claims, TokenAuthenticator, TokenError};
pub use authz::{AuthorizationEvaluator, AuthzError, Decision, Owned};
pub use identity::IdentityResolver;
pub use lifecycle::{LifecycleService, Registration};
pub use mailer::{MailError, Mailer, MailtrapMailer, MemoryMailer, Template, TemplateData};
pub use rate_limit::{Admission, FixedWindowLimiter};
