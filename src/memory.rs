//! In-memory revocation cache.
//!
//! Tokens are self-verifying, so logging out cannot delete anything. Instead
//! the exact bearer string is remembered here until the moment it would have
//! expired on its own, after which the entry is useless and gets dropped.
//!
//! Deadlines live in a single min-heap next to the membership map. Due entries
//! are popped lazily on every [`RevocationCache::revoke`] and periodically by
//! one background task ([`RevocationCache::spawn_sweeper`]), so the number of
//! timers does not grow with logout traffic.
//!
//! ## 繁體中文
//!
//! 記憶體內的 token 註銷快取。token 會被記錄到它原本的到期時間為止，之後自動移除。
//! 到期時間以單一 min-heap 管理，由 `revoke` 順帶清理並搭配一個背景任務定期清理，
//! 不會為每個 token 建立計時器。

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::codec::TokenCodec;
use crate::token_hint;

/// Result of [`RevocationCache::revoke`]. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// Tracked until the token's natural expiry.
    Revoked { evict_at: DateTime<Utc> },

    /// The claims could not be trusted, so the token is tracked for the
    /// configured fallback window instead.
    RevokedWithFallback { evict_at: DateTime<Utc> },

    /// Already tracked; nothing was scheduled.
    AlreadyRevoked,

    /// The token is already dead on its own; nothing to track.
    AlreadyExpired,
}

#[derive(Default)]
struct RevocationState {
    entries: HashMap<Arc<str>, DateTime<Utc>>,
    deadlines: BinaryHeap<Reverse<(DateTime<Utc>, Arc<str>)>>,
}

impl RevocationState {
    fn has_due(&self, now: DateTime<Utc>) -> bool {
        self.deadlines
            .peek()
            .is_some_and(|Reverse((evict_at, _))| *evict_at <= now)
    }

    fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        while self.has_due(now) {
            let Some(Reverse((evict_at, token))) = self.deadlines.pop() else {
                break;
            };
            // Only drop the map entry this heap slot was scheduled for.
            if self.entries.get(&token) == Some(&evict_at) {
                self.entries.remove(&token);
                evicted += 1;
            }
        }
        evicted
    }
}

/// Tracks logged-out tokens until they expire naturally.
///
/// Construct one per process and share it behind an `Arc`. All access goes
/// through a single `RwLock`: lookups share it, inserts and evictions take it
/// exclusively for a short, bounded critical section.
///
/// ## 繁體中文
///
/// 追蹤已登出的 token，直到它們自然到期。每個行程建立一個，以 `Arc` 共享。
pub struct RevocationCache {
    state: RwLock<RevocationState>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
    fallback: Duration,
}

impl RevocationCache {
    /// `fallback` is how long a token with unreadable claims stays revoked.
    pub fn new(codec: Arc<TokenCodec>, clock: Arc<dyn Clock>, fallback: Duration) -> Self {
        Self {
            state: RwLock::new(RevocationState::default()),
            codec,
            clock,
            fallback,
        }
    }

    /// Revokes `token` until its natural expiry.
    ///
    /// Idempotent: a token that is already tracked is left alone. A token
    /// whose claims cannot be read is still revoked, for the fallback window.
    pub fn revoke(&self, token: &str) -> RevokeOutcome {
        let now = self.clock.now();
        if self.is_revoked_at(token, now) {
            return RevokeOutcome::AlreadyRevoked;
        }

        // Measured from the same `now`, so a tracked token's deadline is its `exp`.
        let (remaining, fallback) = match self.codec.remaining_lifetime_at(token, now) {
            Ok(remaining) => (remaining, false),
            Err(err) => {
                warn!(
                    token = token_hint(token),
                    error = %err,
                    "unreadable token at logout, revoking for fallback window"
                );
                (self.fallback, true)
            }
        };
        if remaining <= Duration::zero() {
            return RevokeOutcome::AlreadyExpired;
        }
        let evict_at = now
            .checked_add_signed(remaining)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut state = self.state.write();
        state.sweep(now);
        if state.entries.contains_key(token) {
            return RevokeOutcome::AlreadyRevoked;
        }
        let key: Arc<str> = Arc::from(token);
        state.entries.insert(key.clone(), evict_at);
        state.deadlines.push(Reverse((evict_at, key)));
        debug!(
            token = token_hint(token),
            %evict_at,
            tracked = state.entries.len(),
            "token revoked"
        );

        if fallback {
            RevokeOutcome::RevokedWithFallback { evict_at }
        } else {
            RevokeOutcome::Revoked { evict_at }
        }
    }

    /// Whether `token` is currently revoked. Entries past their deadline
    /// report `false` even before the sweep removes them.
    pub fn is_revoked(&self, token: &str) -> bool {
        self.is_revoked_at(token, self.clock.now())
    }

    fn is_revoked_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.state
            .read()
            .entries
            .get(token)
            .is_some_and(|evict_at| now < *evict_at)
    }

    /// Drops every entry whose deadline has passed. Returns how many were
    /// dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        if !self.state.read().has_due(now) {
            return 0;
        }
        self.state.write().sweep(now)
    }

    /// Number of tracked entries, including due ones not yet swept.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of scheduled deadlines. Equals [`len`](Self::len) after a sweep.
    pub fn scheduled(&self) -> usize {
        self.state.read().deadlines.len()
    }

    /// Spawns the periodic sweep on the current tokio runtime.
    ///
    /// The task holds only a weak reference and exits once the cache is
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let evicted = cache.sweep();
                if evicted > 0 {
                    debug!(evicted, tracked = cache.len(), "revocation sweep");
                }
            }
        })
    }
}
