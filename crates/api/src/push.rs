//! Client for the external mobile push gateway.

use anyhow::Context;
use lendline_config::PushConfig;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Best-effort hand-off to the push gateway. Built disabled when no endpoint
/// is configured, in which case every send is a silent no-op.
pub struct PushClient {
    inner: Option<PushInner>,
}

struct PushInner {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl PushClient {
    pub fn from_config(config: &PushConfig) -> anyhow::Result<Self> {
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(Self::disabled());
        };

        let http = reqwest::Client::builder()
            .user_agent("lendline-backend")
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .context("failed to build push gateway http client")?;

        Ok(Self {
            inner: Some(PushInner {
                http,
                endpoint,
                api_key: config.api_key.clone(),
            }),
        })
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Deliver one notification to a device. The room id rides along in the
    /// data block so the app can open the right conversation.
    pub async fn send(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
        room_id: i64,
    ) -> anyhow::Result<()> {
        let Some(inner) = &self.inner else {
            debug!("push gateway not configured, skipping notification");
            return Ok(());
        };

        let payload = json!({
            "to": device_token,
            "title": title,
            "body": body,
            "data": { "roomId": room_id.to_string() },
        });

        let mut request = inner.http.post(&inner.endpoint).json(&payload);
        if let Some(api_key) = &inner.api_key {
            request = request.bearer_auth(api_key);
        }

        request
            .send()
            .await
            .context("push gateway request failed")?
            .error_for_status()
            .context("push gateway returned error status")?;

        debug!(room_id, "push notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_client_is_a_no_op() {
        let client = PushClient::disabled();
        assert!(!client.is_enabled());
        client.send("token", "title", "body", 100).await.unwrap();
    }

    #[test]
    fn from_config_without_endpoint_is_disabled() {
        let client = PushClient::from_config(&PushConfig::default()).unwrap();
        assert!(!client.is_enabled());
    }

    #[test]
    fn from_config_with_endpoint_is_enabled() {
        let config = PushConfig {
            endpoint: Some("https://push.example/send".to_string()),
            api_key: Some("key".to_string()),
            request_timeout_seconds: 5,
        };
        let client = PushClient::from_config(&config).unwrap();
        assert!(client.is_enabled());
    }
}
