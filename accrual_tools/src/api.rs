use std::sync::Arc;

use log::*;
use reqwest::{Client, StatusCode};

use crate::{config::AccrualConfig, data_objects::OrderAccrual, error::AccrualApiError};

/// HTTP client for the accrual calculation service.
///
/// One instance is shared between all callers; the underlying [`Client`] holds the connection pool and the
/// per-request deadline configured in [`AccrualConfig::timeout`].
#[derive(Clone)]
pub struct AccrualApi {
    config: AccrualConfig,
    client: Arc<Client>,
}

impl AccrualApi {
    pub fn new(config: AccrualConfig) -> Result<Self, AccrualApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AccrualApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, order_number: &str) -> String {
        format!("{}/api/orders/{order_number}", self.config.base_url.trim_end_matches('/'))
    }

    /// Fetches the current calculation state for the given order number.
    ///
    /// Transport failures and timeouts are folded into [`AccrualApiError::Unavailable`]; the caller decides
    /// whether and how often to retry.
    pub async fn order_accrual(&self, order_number: &str) -> Result<OrderAccrual, AccrualApiError> {
        let url = self.url(order_number);
        trace!("🧮️ Requesting accrual state: {url}");
        let response = self.client.get(&url).send().await.map_err(|e| {
            debug!("🧮️ Accrual request for order {order_number} did not complete. {e}");
            AccrualApiError::Unavailable(e.to_string())
        })?;
        match response.status() {
            StatusCode::OK => {
                let result =
                    response.json::<OrderAccrual>().await.map_err(|e| AccrualApiError::JsonError(e.to_string()))?;
                trace!("🧮️ Order {order_number} is {} at the accrual service", result.status);
                Ok(result)
            },
            StatusCode::NO_CONTENT => Err(AccrualApiError::NotRegistered(order_number.to_string())),
            StatusCode::TOO_MANY_REQUESTS => {
                debug!("🧮️ The accrual service is rate limiting us. Backing off.");
                Err(AccrualApiError::RateLimited)
            },
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(AccrualApiError::Unavailable(format!("unexpected status {status}: {message}")))
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    #[test]
    fn url_building_handles_trailing_slashes() {
        let api = AccrualApi::new(AccrualConfig::new("http://localhost:8080/", Duration::from_secs(1))).unwrap();
        assert_eq!(api.url("12345678903"), "http://localhost:8080/api/orders/12345678903");
        let api = AccrualApi::new(AccrualConfig::new("http://localhost:8080", Duration::from_secs(1))).unwrap();
        assert_eq!(api.url("12345678903"), "http://localhost:8080/api/orders/12345678903");
    }
}
