//! HTTP client for the remote policy engine
//!
//! [`HttpPolicyEngine`] implements [`PolicyEngineEffects`] against an access
//! control policy engine exposing:
//!
//! - `POST {acp}/{flavor}/allowed` for decisions
//! - `GET {acp}/{policy_flavor}/policies/{id}` to read a policy record
//! - `PUT {acp}/{policy_flavor}/policies` to upsert a policy record
//! - `DELETE {acp}/{policy_flavor}/policies/{id}` to remove a policy record
//!
//! Requests are never retried here. Callers decide what a failure means:
//! the evaluator reads a failed decision as a deny, the synchronizer
//! propagates failed mutations.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use gatehouse_core::{
    AuthorizationDecision, AuthorizationRequest, GatehouseError, GatehouseResult, Policy,
    PolicyEngineConfig, PolicyEngineEffects, PolicyId,
};
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Policy engine client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPolicyEngine {
    config: PolicyEngineConfig,
    policies: Url,
    client: reqwest::Client,
}

impl HttpPolicyEngine {
    /// Build a client for the engine described by `config`
    pub fn new(config: PolicyEngineConfig) -> GatehouseResult<Self> {
        if config.admin_url.trim().is_empty() {
            return Err(GatehouseError::invalid("admin_url is empty"));
        }
        let policies = Url::parse(&config.policies_url())
            .map_err(|e| GatehouseError::invalid(format!("invalid admin_url: {e}")))?;
        if policies.cannot_be_a_base() {
            return Err(GatehouseError::invalid(format!(
                "admin_url {} cannot carry a path",
                config.admin_url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| GatehouseError::internal(format!("failed to build http client: {e}")))?;
        Ok(Self {
            config,
            policies,
            client,
        })
    }

    /// Configuration this client was built with
    pub fn config(&self) -> &PolicyEngineConfig {
        &self.config
    }

    /// Record endpoint for `id`. The id is pushed as a single path segment,
    /// so `/`, `#` and `?` in a caller id are escaped instead of changing the
    /// target.
    fn policy_url(&self, id: &PolicyId) -> GatehouseResult<Url> {
        let mut url = self.policies.clone();
        url.path_segments_mut()
            .map_err(|()| GatehouseError::invalid("policy endpoint cannot carry a path"))?
            .push(id.as_str());
        Ok(url)
    }

    async fn read_body(op: &'static str, resp: reqwest::Response) -> GatehouseResult<String> {
        resp.text().await.map_err(|e| {
            warn!(operation = op, error = %e, "failed to read response body");
            map_reqwest_error(e)
        })
    }

    async fn expect_success(op: &'static str, resp: reqwest::Response) -> GatehouseResult<()> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = Self::read_body(op, resp).await.unwrap_or_default();
        warn!(operation = op, status = status.as_u16(), body = %body, "non-success status");
        Err(http_status_error(status, &body))
    }
}

#[async_trait]
impl PolicyEngineEffects for HttpPolicyEngine {
    async fn is_allowed(
        &self,
        flavor: &str,
        request: &AuthorizationRequest,
    ) -> GatehouseResult<AuthorizationDecision> {
        let url = self.config.allowed_url(flavor);
        debug!(
            url = %url,
            action = %request.action,
            resource = %request.resource,
            "querying decision"
        );

        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        // A denied request is answered with 403 and a decision body.
        let status = resp.status();
        let body = Self::read_body("allowed", resp).await?;
        if !(status.is_success() || status == StatusCode::FORBIDDEN) {
            warn!(
                operation = "allowed",
                status = status.as_u16(),
                body = %body,
                "non-success status"
            );
            return Err(http_status_error(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| GatehouseError::serialization(format!("invalid decision body: {e}")))
    }

    async fn get_policy(&self, id: &PolicyId) -> GatehouseResult<Option<Policy>> {
        let url = self.policy_url(id)?;
        debug!(url = %url, "fetching policy");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(policy_id = %id, "policy not found");
            return Ok(None);
        }
        let body = Self::read_body("get_policy", resp).await?;
        if !status.is_success() {
            warn!(
                operation = "get_policy",
                status = status.as_u16(),
                body = %body,
                "non-success status"
            );
            return Err(http_status_error(status, &body));
        }
        decode_policy(&body)
    }

    async fn upsert_policy(&self, policy: &Policy) -> GatehouseResult<()> {
        let url = self.config.policies_url();
        debug!(
            url = %url,
            policy_id = %policy.id,
            resources = policy.resources.len(),
            "upserting policy"
        );

        let resp = self
            .client
            .put(&url)
            .json(policy)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::expect_success("upsert_policy", resp).await
    }

    async fn delete_policy(&self, id: &PolicyId) -> GatehouseResult<()> {
        let url = self.policy_url(id)?;
        debug!(url = %url, "deleting policy");

        let resp = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(policy_id = %id, "policy already absent");
            return Ok(());
        }
        Self::expect_success("delete_policy", resp).await
    }
}

/// An empty body, `null` or `{}` all mean "no record".
fn decode_policy(body: &str) -> GatehouseResult<Option<Policy>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| GatehouseError::serialization(format!("invalid policy body: {e}")))?;
    match &value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) if map.is_empty() => Ok(None),
        _ => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| GatehouseError::serialization(format!("invalid policy body: {e}"))),
    }
}

fn http_status_error(status: StatusCode, body: &str) -> GatehouseError {
    GatehouseError::network(format!("http status {} body={body}", status.as_u16()))
}

fn map_reqwest_error(err: reqwest::Error) -> GatehouseError {
    if err.is_body() || err.is_decode() {
        return GatehouseError::serialization(err.to_string());
    }
    GatehouseError::network(err.to_string())
}
