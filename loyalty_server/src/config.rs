use std::{env, time::Duration};

use accrual_tools::AccrualConfig;
use log::*;
use lpg_common::Secret;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::errors::ServerError;

const DEFAULT_LPG_HOST: &str = "127.0.0.1";
const DEFAULT_LPG_PORT: u16 = 8400;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/loyalty_store.db";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_MAX_ORDER_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;
const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// Connection settings for the external accrual calculation service. When no URL is configured the accrual
    /// worker never starts and submitted orders simply stay in their pending state.
    pub accrual: AccrualConfig,
    /// Poll/retry behaviour of the accrual worker.
    pub worker: WorkerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LPG_HOST.to_string(),
            port: DEFAULT_LPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            accrual: AccrualConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LPG_HOST").ok().unwrap_or_else(|| DEFAULT_LPG_HOST.into());
        let port = env::var("LPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for LPG_PORT. {e} Using the default, {DEFAULT_LPG_PORT}, instead."
                    );
                    DEFAULT_LPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_LPG_PORT);
        let database_url = env::var("LPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ LPG_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let accrual = AccrualConfig::new_from_env_or_default();
        let worker = WorkerConfig::from_env_or_default();
        Self { host, port, database_url, auth, accrual, worker }
    }
}

//-------------------------------------------------  WorkerConfig  ----------------------------------------------------
/// Poll/retry behaviour of the accrual worker.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Time between scans of the outstanding orders.
    pub poll_interval: Duration,
    /// Per-order retry ceiling within one scan. Once exhausted, the order is cancelled to `INVALID`.
    pub max_attempts: u32,
    /// Fixed pause between consecutive attempts for the same order.
    pub retry_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_ORDER_ATTEMPTS,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

impl WorkerConfig {
    pub fn from_env_or_default() -> Self {
        let poll_interval = parse_millis("LPG_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS);
        let retry_backoff = parse_millis("LPG_RETRY_BACKOFF_MS", DEFAULT_RETRY_BACKOFF_MS);
        let max_attempts = env::var("LPG_MAX_ORDER_ATTEMPTS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for LPG_MAX_ORDER_ATTEMPTS. {e}"))
                    .ok()
            })
            .filter(|n| {
                if *n == 0 {
                    warn!("🪛️ LPG_MAX_ORDER_ATTEMPTS must be at least 1. Using the default.");
                }
                *n > 0
            })
            .unwrap_or(DEFAULT_MAX_ORDER_ATTEMPTS);
        Self { poll_interval, max_attempts, retry_backoff }
    }
}

fn parse_millis(var: &str, default: u64) -> Duration {
    let millis = env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid configuration value for {var}. {e}")).ok())
        .unwrap_or(default);
    Duration::from_millis(millis)
}

//-------------------------------------------------  AuthConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The secret used to sign and verify JWT access tokens (HS256).
    pub jwt_secret: Secret<String>,
    /// How long an issued access token stays valid.
    pub token_lifetime: chrono::Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT signing secret has not been set. I'm using a random value for this session. DO NOT \
             operate on production like this, since all issued tokens become invalid when the server restarts. Set \
             the LPG_JWT_SECRET environment variable instead. 🚨️🚨️🚨️"
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self {
            jwt_secret: Secret::new(secret),
            token_lifetime: chrono::Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS),
        }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("LPG_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [LPG_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "LPG_JWT_SECRET must be at least 32 bytes long".to_string(),
            ));
        }
        let token_lifetime = env::var("LPG_JWT_LIFETIME_HOURS")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for LPG_JWT_LIFETIME_HOURS. {e}"))
                    .ok()
            })
            .map(chrono::Duration::hours)
            .unwrap_or_else(|| chrono::Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS));
        Ok(Self { jwt_secret: Secret::new(secret), token_lifetime })
    }
}
