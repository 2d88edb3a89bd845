// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed-window request admission.
//!
//! Each client key gets a counter that resets when its window elapses. A
//! request is admitted while the counter is below the limit; otherwise the
//! caller is told how long until the current window ends.

use crate::config::RateLimitConfig;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Expired windows are swept once the table grows past this many keys, at
/// most once per window.
const PURGE_THRESHOLD: usize = 10_000;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Per-key fixed-window counter.
///
/// Checks for one key are serialized by the map's shard lock, so concurrent
/// requests never admit more than `limit` per window.
pub struct FixedWindowLimiter {
    enabled: bool,
    limit: u32,
    window: Duration,
    windows: DashMap<String, Window>,
    epoch: Instant,
    /// Millis since `epoch` of the last sweep.
    last_purge: AtomicU64,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration, enabled: bool) -> Self {
        Self {
            enabled,
            limit,
            window,
            windows: DashMap::new(),
            epoch: Instant::now(),
            last_purge: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_window, config.window, config.enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check and count one request for `key`.
    pub fn admit(&self, key: &str) -> Admission {
        self.admit_at(key, Instant::now())
    }

    /// [`admit`](Self::admit) with an explicit clock reading.
    pub fn admit_at(&self, key: &str, now: Instant) -> Admission {
        if !self.enabled {
            return Admission::Allowed;
        }

        if self.windows.len() > PURGE_THRESHOLD && self.claim_purge(now) {
            self.purge_expired(now);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count < self.limit {
            entry.count += 1;
            return Admission::Allowed;
        }

        let elapsed = now.saturating_duration_since(entry.started);
        Admission::Rejected {
            retry_after: self.window.saturating_sub(elapsed),
        }
    }

    /// True for exactly one caller once a window has passed since the last
    /// sweep.
    fn claim_purge(&self, now: Instant) -> bool {
        let now_ms = now.saturating_duration_since(self.epoch).as_millis() as u64;
        let last = self.last_purge.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) < self.window.as_millis() as u64 {
            return false;
        }
        self.last_purge
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Drop every window that has fully elapsed.
    pub fn purge_expired(&self, now: Instant) {
        let window = self.window;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < window);
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
