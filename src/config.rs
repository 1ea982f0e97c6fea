use base64::{Engine, engine::general_purpose::STANDARD};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::ConfigError;

/// Fixed token lifetime: 10 hours.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 10 * 60 * 60;

/// HS256 needs at least 256 bits of key material.
pub const MIN_SECRET_BYTES: usize = 32;

/// Upper bound for the token TTL and the revocation fallback window: 10 years.
pub const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Upper bound for the sweep interval: one day.
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

const ENV_PREFIX: &str = "PLANT_AUTH";

/// Start-up configuration. Nothing here changes after the process starts.
///
/// Loaded from `PLANT_AUTH_*` environment variables, optionally layered over a
/// config file:
///
/// | variable | default |
/// |---|---|
/// | `PLANT_AUTH_SECRET` | required, base64 |
/// | `PLANT_AUTH_TOKEN_TTL_SECS` | `36000` |
/// | `PLANT_AUTH_EXEMPT_PATHS` | `/auth/login,/auth/signup` |
/// | `PLANT_AUTH_REVOCATION_FALLBACK_SECS` | `900` |
/// | `PLANT_AUTH_SWEEP_INTERVAL_SECS` | `60` |
/// | `PLANT_AUTH_BIND_ADDR` | `127.0.0.1:8080` |
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Base64-encoded HMAC secret.
    pub secret: String,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Paths the gate never inspects. Matched exactly.
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,

    /// How long a token is kept revoked when its claims cannot be read at
    /// logout time.
    #[serde(default = "default_revocation_fallback_secs")]
    pub revocation_fallback_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_exempt_paths() -> Vec<String> {
    vec!["/auth/login".to_string(), "/auth/signup".to_string()]
}

fn default_revocation_fallback_secs() -> u64 {
    15 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl AuthConfig {
    /// Builds a config with every optional field at its default.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            token_ttl_secs: default_token_ttl_secs(),
            exempt_paths: default_exempt_paths(),
            revocation_fallback_secs: default_revocation_fallback_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            bind_addr: default_bind_addr(),
        }
    }

    /// Loads the config from `PLANT_AUTH_*` environment variables.
    ///
    /// ## 繁體中文
    ///
    /// 從 `PLANT_AUTH_*` 環境變數載入設定。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Loads `file` (if given and present) and then the environment, which
    /// wins on conflicts.
    pub fn load(file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("exempt_paths"),
            )
            .build()?
            .try_deserialize::<Self>()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects durations that are zero or out of range.
    ///
    /// ## 繁體中文
    ///
    /// 檢查各項時間設定：不可為零，也不可超過上限。
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("token_ttl_secs", self.token_ttl_secs, MAX_WINDOW_SECS)?;
        check_range(
            "revocation_fallback_secs",
            self.revocation_fallback_secs,
            MAX_WINDOW_SECS,
        )?;
        check_range(
            "sweep_interval_secs",
            self.sweep_interval_secs,
            MAX_SWEEP_INTERVAL_SECS,
        )
    }

    /// Decodes the secret into raw key bytes.
    pub fn signing_key(&self) -> Result<Vec<u8>, ConfigError> {
        let key = STANDARD
            .decode(self.secret.trim())
            .map_err(|_| ConfigError::SecretEncoding)?;
        if key.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret {
                min: MIN_SECRET_BYTES,
                actual: key.len(),
            });
        }
        Ok(key)
    }

    /// Token lifetime. Only meaningful after [`validate`](Self::validate).
    ///
    /// ## 繁體中文
    ///
    /// token 有效期限。
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs as i64)
    }

    /// How long an unreadable token stays revoked.
    pub fn revocation_fallback(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.revocation_fallback_secs as i64)
    }

    /// Period of the background sweep task.
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

fn check_range(field: &'static str, actual: u64, max: u64) -> Result<(), ConfigError> {
    if actual == 0 || actual > max {
        return Err(ConfigError::OutOfRange {
            field,
            min: 1,
            max,
            actual,
        });
    }
    Ok(())
}
