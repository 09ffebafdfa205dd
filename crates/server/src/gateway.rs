//! Payment provider verification.
//!
//! The provider is asked once per verification; failures surface as HTTP 502
//! and are not retried.

use async_trait::async_trait;
use engine::{GatewayVerification, Kobo};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment provider unreachable: {0}")]
    Transport(String),
    #[error("payment provider returned status {0}")]
    Status(u16),
    #[error("unexpected payment provider response: {0}")]
    Response(String),
}

/// Looks up the outcome of a checkout by its reference.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Korapay,
    Paystack,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Korapay => "https://api.korapay.com",
            Self::Paystack => "https://api.paystack.co",
        }
    }

    fn verify_url(self, base_url: &str, reference: &str) -> String {
        let base_url = base_url.trim_end_matches('/');
        match self {
            Self::Korapay => format!("{base_url}/merchant/api/v1/charges/{reference}"),
            Self::Paystack => format!("{base_url}/transaction/verify/{reference}"),
        }
    }
}

/// Verification over the provider's REST API.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    provider: Provider,
    base_url: String,
    secret_key: String,
}

impl HttpGateway {
    pub fn new(provider: Provider, base_url: Option<String>, secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider,
            base_url: base_url.unwrap_or_else(|| provider.default_base_url().to_string()),
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError> {
        let response = self
            .client
            .get(self.provider.verify_url(&self.base_url, reference))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status().as_u16()));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|err| GatewayError::Response(err.to_string()))?;
        tracing::debug!(reference, provider = ?self.provider, "payment provider answered");
        parse_verification(self.provider, reference, &body)
    }
}

/// Reads a verify response. Korapay reports naira (number or decimal
/// string), Paystack reports kobo.
pub fn parse_verification(
    provider: Provider,
    reference: &str,
    body: &Value,
) -> Result<GatewayVerification, GatewayError> {
    if body.get("status").and_then(Value::as_bool) != Some(true) {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request not successful");
        return Err(GatewayError::Response(message.to_string()));
    }
    let data = body
        .get("data")
        .ok_or_else(|| GatewayError::Response("missing data".to_string()))?;

    if let Some(echoed) = data.get("reference").and_then(Value::as_str)
        && echoed != reference
    {
        return Err(GatewayError::Response(format!(
            "reference mismatch: {echoed}"
        )));
    }

    let paid = data.get("status").and_then(Value::as_str) == Some("success");
    let raw_amount = data
        .get("amount")
        .ok_or_else(|| GatewayError::Response("missing amount".to_string()))?;
    let amount = match provider {
        Provider::Korapay => naira_amount(raw_amount)?,
        Provider::Paystack => raw_amount
            .as_i64()
            .map(Kobo::new)
            .ok_or_else(|| GatewayError::Response("invalid amount".to_string()))?,
    };

    Ok(GatewayVerification {
        reference: reference.to_string(),
        paid,
        amount,
    })
}

fn naira_amount(value: &Value) -> Result<Kobo, GatewayError> {
    let invalid = || GatewayError::Response("invalid amount".to_string());
    match value {
        Value::String(text) => text.parse::<Kobo>().map_err(|_| invalid()),
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(invalid)
            .and_then(|naira| Kobo::from_naira(naira).map_err(|_| invalid())),
        _ => Err(invalid()),
    }
}
