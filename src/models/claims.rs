use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims embedded in every token issued by [`crate::TokenCodec`].
///
/// Timestamps are Unix epoch seconds. `exp` is always `iat` plus the
/// configured TTL.
///
/// ## 繁體中文
///
/// 每個由 [`crate::TokenCodec`] 簽發的 token 內含的 claims。
/// 時間欄位皆為 Unix epoch 秒。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account email the token was issued to.
    pub sub: String,
    /// Issued-at.
    pub iat: i64,
    /// Expiry.
    pub exp: i64,
    /// Random token id. Keeps two tokens issued to the same subject within the
    /// same second distinct.
    pub jti: String,
}

impl Claims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// A token is expired once `now >= exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
