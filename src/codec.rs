//! Signed bearer tokens.
//!
//! Tokens are compact HS256 JWTs: three base64url segments
//! (`header.claims.signature`). The signing key is derived once at start-up
//! and never changes, so a [`TokenCodec`] can be shared across threads behind
//! an `Arc` without any locking.
//!
//! ## 繁體中文
//!
//! 簽章式 bearer token。金鑰在啟動時建立一次後不再變動，因此可直接以 `Arc`
//! 在執行緒間共享，無需加鎖。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::{Claims, ConfigError, TokenError};

/// Issues and verifies bearer tokens.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Creates a codec from raw key bytes.
    pub fn new(key: &[u8], ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock in `verify`, after the
        // signature has been accepted.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
            clock,
        }
    }

    /// Creates a codec from a validated [`AuthConfig`].
    ///
    /// ## 繁體中文
    ///
    /// 由設定建立 codec；設定值不合法時回傳錯誤。
    pub fn from_config(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let key = config.signing_key()?;
        Ok(Self::new(&key, config.token_ttl(), clock))
    }

    /// Lifetime given to every issued token.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `subject`, valid from now until now + TTL.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, self.clock.now())
    }

    /// Issues a token as if it were issued at `at`.
    pub fn issue_at(&self, subject: &str, at: DateTime<Utc>) -> Result<String, TokenError> {
        let iat = at.timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat,
            exp: iat.saturating_add(self.ttl.num_seconds()),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verifies the signature, then the expiry, and returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.decode_verified(token)?;
        if claims.is_expired_at(self.clock.now()) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// Time left until the token expires, clamped at zero.
    ///
    /// Errors when the claims cannot be trusted (malformed or bad signature);
    /// the revocation path then falls back to a fixed window.
    ///
    /// ## 繁體中文
    ///
    /// token 剩餘的有效時間（最小為零）。簽章無法驗證時回傳錯誤。
    pub fn remaining_lifetime(&self, token: &str) -> Result<Duration, TokenError> {
        self.remaining_lifetime_at(token, self.clock.now())
    }

    /// [`remaining_lifetime`](Self::remaining_lifetime) measured from `now`
    /// instead of a fresh clock reading, so `now + remaining` is exactly the
    /// token's expiry.
    pub fn remaining_lifetime_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Duration, TokenError> {
        let claims = self.decode_verified(token)?;
        let expires_at = claims.expires_at().ok_or(TokenError::Malformed)?;
        Ok((expires_at - now).max(Duration::zero()))
    }

    fn decode_verified(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(classify)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn codec(clock: Arc<ManualClock>) -> TokenCodec {
        TokenCodec::new(KEY, Duration::hours(10), clock)
    }

    #[test]
    fn issued_token_round_trips() {
        let clock = Arc::new(ManualClock::new(start()));
        let codec = codec(clock);

        let token = codec.issue("user@example.com").unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, "user@example.com");
        assert_eq!(claims.exp - claims.iat, 36_000);
    }

    #[test]
    fn token_expires_after_ttl() {
        let clock = Arc::new(ManualClock::new(start()));
        let codec = codec(clock.clone());
        let token = codec.issue("user@example.com").unwrap();

        clock.set(start() + Duration::hours(10) - Duration::seconds(1));
        assert!(codec.verify(&token).is_ok());

        clock.set(start() + Duration::hours(10));
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));

        clock.set(start() + Duration::hours(10) + Duration::seconds(1));
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_key_is_rejected_as_bad_signature() {
        let clock = Arc::new(ManualClock::new(start()));
        let other = TokenCodec::new(
            b"ffffffffffffffffffffffffffffffff",
            Duration::hours(10),
            clock.clone(),
        );
        let token = other.issue("user@example.com").unwrap();

        assert_eq!(
            codec(clock).verify(&token),
            Err(TokenError::SignatureInvalid)
        );
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let clock = Arc::new(ManualClock::new(start()));
        let codec = codec(clock);
        let token = codec.issue("user@example.com").unwrap();
        let forged = codec.issue("admin@example.com").unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = forged.split('.').nth(1).unwrap();
        parts[1] = forged_claims;
        let spliced = parts.join(".");

        assert_eq!(codec.verify(&spliced), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn garbage_is_malformed() {
        let clock = Arc::new(ManualClock::new(start()));
        let codec = codec(clock);

        for token in ["", "abc", "a.b.c", "not.a.jwt.at.all"] {
            assert_eq!(codec.verify(token), Err(TokenError::Malformed), "{token}");
        }
    }

    #[test]
    fn remaining_lifetime_counts_down_and_clamps() {
        let clock = Arc::new(ManualClock::new(start()));
        let codec = codec(clock.clone());
        let token = codec.issue("user@example.com").unwrap();

        clock.set(start() + Duration::hours(5));
        assert_eq!(
            codec.remaining_lifetime(&token).unwrap(),
            Duration::hours(5)
        );

        clock.set(start() + Duration::hours(11));
        assert_eq!(codec.remaining_lifetime(&token).unwrap(), Duration::zero());

        assert_eq!(
            codec.remaining_lifetime("garbage"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn same_second_tokens_are_distinct() {
        let clock = Arc::new(ManualClock::new(start()));
        let codec = codec(clock);

        let a = codec.issue("user@example.com").unwrap();
        let b = codec.issue("user@example.com").unwrap();
        assert_ne!(a, b);
    }
}
