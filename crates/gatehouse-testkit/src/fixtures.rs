//! Common fixtures: configuration, callers, contexts and expected requests

use gatehouse_core::{
    AuthorizationRequest, CallContext, CallerIdentity, PolicyEngineConfig, ServiceDescriptor,
};
use std::sync::Arc;

/// Root organization used by every fixture
pub const TEST_ROOT_ORG: &str = "root";

/// Configuration pointing at a non-routable engine; pair it with a mock
pub fn test_config() -> PolicyEngineConfig {
    PolicyEngineConfig::for_admin_url("http://policy.test").with_root_org(TEST_ROOT_ORG)
}

/// Caller identity with the given id
pub fn caller(id: &str) -> CallerIdentity {
    CallerIdentity::new(id)
}

/// Context for `action` on `service` with an identified caller holding `member`
pub fn member_call(service: &Arc<ServiceDescriptor>, action: &str, user_id: &str) -> CallContext {
    CallContext::new(Arc::clone(service), action)
        .with_user(caller(user_id))
        .with_roles(["member"])
}

/// Decision query the evaluator is expected to send for a rule action on a resource
pub fn expected_request(action: &str, user_id: &str, resource: &str) -> AuthorizationRequest {
    let config = test_config();
    AuthorizationRequest {
        action: config.namespaced_action(action),
        subject: config.namespaced_subject(user_id),
        resource: config.namespaced_resource(resource),
    }
}

/// Install a `tracing` subscriber honoring `RUST_LOG` for the current test
/// binary. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
