// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup (after loading `.env` if present) and are
//! immutable for the lifetime of the process.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Database connection settings.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    /// Deadline applied to every persistent store call.
    pub query_timeout: Duration,
}

/// Session token settings.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC signing secret (raw bytes)
    pub secret: Vec<u8>,
    /// Issuer, also used as the audience
    pub issuer: String,
    pub ttl: Duration,
}

/// Credentials guarding the health-check route.
#[derive(Debug, Clone)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

/// Identity cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub redis_url: String,
    pub user_ttl: Duration,
    /// Deadline applied to every cache store call.
    pub timeout: Duration,
}

/// Fixed-window rate limiter settings.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests admitted per window
    pub requests_per_window: u32,
    pub window: Duration,
}

/// Outbound mail settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub from_email: String,
    /// Lifetime of an invitation secret
    pub invitation_ttl: Duration,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Public base URL used in activation links
    pub api_url: String,
    /// Deployment environment name (reported by the health check)
    pub env: String,
    /// Origin allowed by CORS
    pub cors_allowed_origin: String,
    pub db: DbConfig,
    pub token: TokenConfig,
    pub basic_auth: BasicAuthConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub mail: MailConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: parse_or("PORT", 4040)?,
            api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:4040".to_string()),
            env: env::var("ENV").unwrap_or_else(|_| "development".to_string()),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5174".to_string()),
            db: DbConfig {
                url: required("DATABASE_URL")?,
                max_connections: parse_or("DB_MAX_CONNECTIONS", 30)?,
                query_timeout: Duration::from_secs(parse_or("DB_QUERY_TIMEOUT_SECS", 5)?),
            },
            token: TokenConfig {
                secret: required("AUTH_TOKEN_SECRET")?.into_bytes(),
                issuer: env::var("AUTH_TOKEN_ISSUER").unwrap_or_else(|_| "socialapi".to_string()),
                ttl: hours(parse_or("AUTH_TOKEN_TTL_HOURS", 72)?),
            },
            basic_auth: BasicAuthConfig {
                username: required("BASIC_AUTH_USERNAME")?,
                password: required("BASIC_AUTH_PASSWORD")?,
            },
            cache: CacheConfig {
                enabled: parse_bool_or("REDIS_ENABLED", false)?,
                redis_url: env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
                user_ttl: Duration::from_secs(parse_or("CACHE_USER_TTL_SECS", 60)?),
                timeout: Duration::from_secs(parse_or("CACHE_TIMEOUT_SECS", 2)?),
            },
            rate_limit: RateLimitConfig {
                enabled: parse_bool_or("RATE_LIMITER_ENABLED", true)?,
                requests_per_window: parse_or("RATE_LIMITER_REQUESTS", 20)?,
                window: Duration::from_secs(parse_or("RATE_LIMITER_WINDOW_SECS", 5)?),
            },
            mail: MailConfig {
                api_key: required("MAILTRAP_API_KEY")?.trim().to_string(),
                from_email: env::var("FROM_EMAIL")
                    .unwrap_or_else(|_| "no-reply@socialapi.dev".to_string()),
                invitation_ttl: hours(parse_or("INVITATION_TTL_HOURS", 72)?),
            },
        })
    }

    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            port: 4040,
            api_url: "http://localhost:4040".to_string(),
            env: "test".to_string(),
            cors_allowed_origin: "http://localhost:5174".to_string(),
            db: DbConfig {
                url: "postgres://localhost/social_test".to_string(),
                max_connections: 5,
                query_timeout: Duration::from_secs(5),
            },
            token: TokenConfig {
                secret: b"test_token_secret_32_bytes_long!".to_vec(),
                issuer: "socialapi".to_string(),
                ttl: hours(72),
            },
            basic_auth: BasicAuthConfig {
                username: "admin".to_string(),
                password: "admin-password".to_string(),
            },
            cache: CacheConfig {
                enabled: true,
                redis_url: "redis://localhost:6379".to_string(),
                user_ttl: Duration::from_secs(60),
                timeout: Duration::from_secs(2),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_window: 20,
                window: Duration::from_secs(5),
            },
            mail: MailConfig {
                api_key: "test_mail_key".to_string(),
                from_email: "no-reply@socialapi.dev".to_string(),
                invitation_ttl: hours(72),
            },
        }
    }
}

fn hours(n: u64) -> Duration {
    Duration::from_secs(n * 60 * 60)
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_bool_or(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
}
