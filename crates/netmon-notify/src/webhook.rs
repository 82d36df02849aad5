use crate::error::{NotifyError, Result};
use crate::utils::{truncate_string, MAX_BODY_LENGTH};
use crate::Notifier;
use async_trait::async_trait;
use netmon_common::types::{Alert, WebhookConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Url};

/// HTTP delivery channel posting a JSON rendering of the alert.
///
/// Url, method and headers are validated up front; the bearer token, when
/// present, becomes an `Authorization` header.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
    method: Method,
    headers: HeaderMap,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let url = Url::parse(&config.url).map_err(|e| {
            NotifyError::InvalidConfig(format!("invalid url '{}': {e}", config.url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NotifyError::InvalidConfig(format!(
                "unsupported url scheme '{}'",
                url.scheme()
            )));
        }

        let method = Method::from_bytes(config.method.to_uppercase().as_bytes()).map_err(|_| {
            NotifyError::InvalidConfig(format!("invalid http method '{}'", config.method))
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                NotifyError::InvalidConfig(format!("invalid header name '{name}'"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                NotifyError::InvalidConfig(format!("invalid value for header '{name}'"))
            })?;
            headers.insert(name, value);
        }
        if let Some(token) = &config.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| NotifyError::InvalidConfig("invalid bearer token".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            client: reqwest::Client::new(),
            url,
            method,
            headers,
        })
    }

    fn render_payload(alert: &Alert) -> serde_json::Value {
        serde_json::json!({
            "alert_id": alert.id,
            "rule_id": alert.rule_id,
            "rule_name": alert.rule_name,
            "device_id": alert.host_id,
            "device_name": alert.host_name,
            "severity": alert.severity.to_string(),
            "message": alert.message,
            "value": alert.value,
            "threshold": alert.threshold,
            "triggered_at": alert.triggered_at.to_rfc3339(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let payload = Self::render_payload(alert);

        let mut last_err = None;
        for attempt in 0..3u32 {
            match self
                .client
                .request(self.method.clone(), self.url.clone())
                .headers(self.headers.clone())
                .json(&payload)
                .send()
                .await
            {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    let body = match resp.text().await {
                        Ok(text) => truncate_string(&text, MAX_BODY_LENGTH),
                        Err(e) => format!("[failed to read response body: {e}]"),
                    };
                    tracing::warn!(
                        attempt = attempt + 1,
                        status = %status,
                        "Webhook returned non-success status, retrying"
                    );
                    last_err = Some(NotifyError::ApiError {
                        service: "webhook".to_string(),
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "Webhook request failed, retrying"
                    );
                    last_err = Some(NotifyError::HttpError(e));
                }
            }
            if attempt < 2 {
                tokio::time::sleep(std::time::Duration::from_millis(100 * 2u64.pow(attempt)))
                    .await;
            }
        }

        let err =
            last_err.unwrap_or_else(|| NotifyError::Other("webhook send failed".to_string()));
        tracing::error!(url = %self.url, error = %err, "Webhook failed after 3 retries");
        Err(err)
    }

    fn kind(&self) -> &'static str {
        "webhook"
    }
}
