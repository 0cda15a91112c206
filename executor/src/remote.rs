//! HTTP client for the scheduler's registry and callback endpoints
//!
//! Every call POSTs JSON with the shared access token attached. Transport
//! failures and non-200 protocol codes are logged and never retried: the
//! scheduler owns retry policy and will re-dispatch on its own.

use anyhow::Context as _;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use shared::api::{callback_body, endpoints, headers, ApiResponse, RegistryParam, RunReq};
use shared::ExecutorConfig;

/// Client for executor -> scheduler calls
pub struct SchedulerClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl SchedulerClient {
    pub fn new(config: &ExecutorConfig) -> shared::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create scheduler HTTP client")?;

        Ok(Self {
            client,
            base_url: config.server_addr.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    /// POST a JSON payload to a scheduler endpoint and decode the protocol
    /// reply. The response body is always consumed so the connection can be
    /// reused.
    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> anyhow::Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);
        let payload =
            serde_json::to_vec(body).context("Failed to encode scheduler request payload")?;

        let response = self
            .client
            .post(&url)
            .header(headers::CONTENT_TYPE, headers::JSON_CONTENT_TYPE)
            .header(headers::ACCESS_TOKEN, self.access_token.as_str())
            .body(payload)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read reply body from {}", url))?;

        if !status.is_success() {
            anyhow::bail!("POST {} returned HTTP {}", url, status);
        }

        serde_json::from_slice(&body).with_context(|| format!("Failed to decode reply from {}", url))
    }

    /// Report the outcome of one dispatch. Exactly one callback is posted
    /// per accepted dispatch; failures are logged only.
    pub async fn callback(&self, req: &RunReq, code: i64, msg: &str) {
        let body = callback_body(req, code, msg);
        match self.post_json(endpoints::CALLBACK, &body).await {
            Ok(reply) if reply.is_success() => {
                debug!(log_id = req.log_id, code, "Completion callback delivered");
            }
            Ok(reply) => {
                warn!(
                    log_id = req.log_id,
                    reply_code = reply.code,
                    "Scheduler rejected completion callback"
                );
            }
            Err(e) => {
                error!(log_id = req.log_id, error = %e, "Completion callback failed");
            }
        }
    }

    /// Refresh this executor's registration lease.
    pub async fn registry(&self, param: &RegistryParam) {
        match self.post_json(endpoints::REGISTRY, param).await {
            Ok(reply) if reply.is_success() => {
                debug!(registry_key = %param.registry_key, "Registration lease refreshed");
            }
            Ok(reply) => {
                warn!(
                    registry_key = %param.registry_key,
                    reply_code = reply.code,
                    "Scheduler rejected registration"
                );
            }
            Err(e) => {
                error!(registry_key = %param.registry_key, error = %e, "Registration failed");
            }
        }
    }

    /// Remove this executor from the scheduler registry. Best effort.
    pub async fn registry_remove(&self, param: &RegistryParam) {
        match self.post_json(endpoints::REGISTRY_REMOVE, param).await {
            Ok(_) => {
                info!(registry_key = %param.registry_key, "Deregistered from scheduler");
            }
            Err(e) => {
                error!(registry_key = %param.registry_key, error = %e, "Deregistration failed");
            }
        }
    }
}
