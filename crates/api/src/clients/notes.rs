//! Notes cleanup service client.
//!
//! POSTs `{context, text}` as JSON to the configured endpoint with a bearer
//! key and expects `{text}` back.

use std::time::Duration;

use budgetlock_core::budget::{BudgetError, NotesAssistant, NotesContext};
use budgetlock_shared::config::NotesServiceConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct CleanupRequest<'a> {
    context: &'a NotesContext,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CleanupResponse {
    text: String,
}

/// `NotesAssistant` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpNotesAssistant {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpNotesAssistant {
    /// Builds a client from configuration. Returns `Ok(None)` when no
    /// endpoint is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &NotesServiceConfig) -> Result<Option<Self>, reqwest::Error> {
        let Some(endpoint) = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
        else {
            return Ok(None);
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Some(Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }))
    }

    /// Endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl NotesAssistant for HttpNotesAssistant {
    async fn cleanup(&self, context: &NotesContext, text: &str) -> Result<String, BudgetError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&CleanupRequest { context, text });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Notes service request failed");
            BudgetError::external(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Notes service returned an error");
            return Err(BudgetError::external(format!(
                "notes service returned {status}"
            )));
        }

        let body: CleanupResponse = response
            .json()
            .await
            .map_err(|e| BudgetError::external(e.to_string()))?;
        let cleaned = body.text.trim();
        if cleaned.is_empty() {
            return Err(BudgetError::external("notes service returned empty text"));
        }

        debug!(chars = cleaned.len(), "Notes service responded");
        Ok(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn config(endpoint: Option<&str>, api_key: Option<&str>) -> NotesServiceConfig {
        NotesServiceConfig {
            endpoint: endpoint.map(ToString::to_string),
            api_key: api_key.map(ToString::to_string),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_disabled_without_endpoint() {
        assert!(
            HttpNotesAssistant::from_config(&config(None, None))
                .unwrap()
                .is_none()
        );
        assert!(
            HttpNotesAssistant::from_config(&config(Some("  "), None))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_enabled_with_endpoint() {
        let client = HttpNotesAssistant::from_config(&config(
            Some(" http://localhost:9000/cleanup "),
            Some(""),
        ))
        .unwrap()
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9000/cleanup");
        assert!(client.api_key.is_none());
    }

    #[test]
    fn test_request_shape() {
        let context = NotesContext {
            scenario_name: "Plan".to_string(),
            year: 2025,
            total_budget_income: Decimal::new(100_000, 2),
            total_budget_expenses: Decimal::new(40_000, 2),
            net_budget: Decimal::new(60_000, 2),
            total_reference_income: Decimal::ZERO,
            total_reference_expenses: Decimal::ZERO,
        };
        let value = serde_json::to_value(CleanupRequest {
            context: &context,
            text: "draft",
        })
        .unwrap();
        assert_eq!(value["text"], "draft");
        assert_eq!(value["context"]["scenario_name"], "Plan");
        assert_eq!(value["context"]["net_budget"], "600.00");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_external_error() {
        let client =
            HttpNotesAssistant::from_config(&config(Some("http://127.0.0.1:1/cleanup"), None))
                .unwrap()
                .unwrap();
        let context = NotesContext {
            scenario_name: "Plan".to_string(),
            year: 2025,
            total_budget_income: Decimal::ZERO,
            total_budget_expenses: Decimal::ZERO,
            net_budget: Decimal::ZERO,
            total_reference_income: Decimal::ZERO,
            total_reference_expenses: Decimal::ZERO,
        };
        let result = client.cleanup(&context, "draft").await;
        assert!(matches!(
            result,
            Err(BudgetError::ExternalServiceUnavailable(_))
        ));
    }
}
