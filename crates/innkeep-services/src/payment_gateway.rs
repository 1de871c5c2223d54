//! HTTP payment gateway adapter
//!
//! Talks JSON to a hosted payment page provider:
//! - `POST {base}/payments` starts a payment and returns the redirect URL
//! - `POST {base}/payments/verify` reports the outcome for a token

use async_trait::async_trait;
use innkeep_core::{
    config::PaymentConfig,
    traits::{GatewayPaymentStatus, PaymentGateway, PaymentVerification},
    AppError, AppResult,
};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

#[derive(Debug, Serialize)]
struct InitiateRequest<'a> {
    amount: Decimal,
    reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct InitiateResponse {
    redirect_url: String,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: GatewayPaymentStatus,
    amount: Decimal,
    #[serde(default)]
    reference: Option<String>,
}

/// Payment gateway reached over HTTP
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    return_url: Option<String>,
}

impl HttpPaymentGateway {
    /// Build the client from configuration
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the base URL is empty or the HTTP
    /// client cannot be built.
    pub fn new(config: &PaymentConfig) -> AppResult<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AppError::Config("payment.base_url is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build gateway client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            return_url: config.return_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<R> {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Gateway request to {} failed: {}", url, e);
                AppError::Gateway(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Gateway answered {} on {}: {}", status, url, detail);
            return Err(AppError::Gateway(format!("{} from {}", status, path)));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AppError::Gateway(format!("unreadable response from {}: {}", path, e)))
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self))]
    async fn initiate_payment(&self, amount: Decimal, booking_ref: &str) -> AppResult<String> {
        let body = InitiateRequest {
            amount,
            reference: booking_ref,
            return_url: self.return_url.as_deref(),
        };
        let response: InitiateResponse = self.post("payments", &body).await?;
        Ok(response.redirect_url)
    }

    #[instrument(skip(self, token))]
    async fn verify_payment(&self, token: &str) -> AppResult<PaymentVerification> {
        let response: VerifyResponse = self
            .post("payments/verify", &VerifyRequest { token })
            .await?;

        Ok(PaymentVerification {
            status: response.status,
            amount: response.amount,
            reference: response.reference,
        })
    }
}
