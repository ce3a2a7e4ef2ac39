//! `gatehouse check`: one namespaced decision query

use anyhow::Result;
use clap::Args;
use gatehouse_core::{AuthorizationRequest, PolicyEngineConfig, PolicyEngineEffects};
use tracing::info;

/// Arguments of `gatehouse check`
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Domain action, e.g. `update`
    #[arg(long)]
    pub action: String,

    /// Caller id
    #[arg(long)]
    pub subject: String,

    /// Resource class or entity id
    #[arg(long)]
    pub resource: String,

    /// Policy flavor (defaults to the configured one)
    #[arg(long)]
    pub flavor: Option<String>,
}

/// Query one decision and render it as `allowed` or `denied`
pub async fn run(
    args: &CheckArgs,
    config: &PolicyEngineConfig,
    engine: &dyn PolicyEngineEffects,
) -> Result<String> {
    let flavor = args.flavor.as_deref().unwrap_or(&config.policy_flavor);
    let request = AuthorizationRequest {
        action: config.namespaced_action(&args.action),
        subject: config.namespaced_subject(&args.subject),
        resource: config.namespaced_resource(&args.resource),
    };
    let decision = engine.is_allowed(flavor, &request).await?;
    info!(
        flavor,
        action = %request.action,
        subject = %request.subject,
        resource = %request.resource,
        allowed = decision.allowed,
        "Decision received"
    );
    let verdict = if decision.allowed {
        "allowed"
    } else {
        "denied"
    };
    Ok(verdict.to_string())
}
