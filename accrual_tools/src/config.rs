use std::{env, time::Duration};

use log::*;

pub const DEFAULT_ACCRUAL_TIMEOUT_MS: u64 = 10_000;

/// Connection settings for the accrual calculation service.
#[derive(Clone, Debug)]
pub struct AccrualConfig {
    /// Base URL of the accrual service, e.g. `http://localhost:8080`. An empty value disables the client.
    pub base_url: String,
    /// Deadline for a single calculation request. A slow upstream response counts as a failed attempt once this
    /// deadline lapses.
    pub timeout: Duration,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self { base_url: String::default(), timeout: Duration::from_millis(DEFAULT_ACCRUAL_TIMEOUT_MS) }
    }
}

impl AccrualConfig {
    pub fn new<S: Into<String>>(base_url: S, timeout: Duration) -> Self {
        Self { base_url: base_url.into(), timeout }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = env::var("LPG_ACCRUAL_URL").ok().unwrap_or_else(|| {
            info!("🧮️ LPG_ACCRUAL_URL is not set. The accrual client is disabled and orders will not be reconciled.");
            String::default()
        });
        let timeout = env::var("LPG_ACCRUAL_TIMEOUT_MS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🧮️ Invalid configuration value for LPG_ACCRUAL_TIMEOUT_MS. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_ACCRUAL_TIMEOUT_MS);
        Self { base_url, timeout: Duration::from_millis(timeout) }
    }

    /// Returns false when no upstream address has been supplied.
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}
