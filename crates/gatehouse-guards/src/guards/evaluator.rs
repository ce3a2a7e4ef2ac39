//! Authorization evaluator
//!
//! Decides whether a call may proceed. Evaluation runs in order:
//!
//! 1. Nothing declared: the call passes untouched.
//! 2. No caller identity: rejected with `MissingCallerContext`.
//! 3. No roles on the call: the call passes without enforcement.
//! 4. Static rules are sent to the policy engine one query at a time. Every
//!    prepared query is issued even after one has granted access, and a failed
//!    query counts as a deny.
//! 5. If no query granted access, all predicates run concurrently. The first
//!    predicate error aborts the call; any `true` grants access.
//! 6. Otherwise the call is rejected with `InsufficientPermissions`.

use super::permissions::{normalize_permissions, NormalizedPermissions};
use futures::future::try_join_all;
use gatehouse_core::{
    AuthorizationRequest, CallContext, GatehouseError, GatehouseResult, PermissionSpec,
    PolicyEngineConfig, PolicyEngineEffects,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Phase that let a call through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantedBy {
    /// The operation declares no permissions
    NotEnforced,
    /// The call carried no roles
    RoleBypass,
    /// A policy engine query answered allowed
    PolicyEngine,
    /// A local predicate answered true
    Predicate,
}

/// Outcome of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// What let the call through
    pub granted_by: GrantedBy,
    /// Decision queries sent to the engine for this call
    pub queries_issued: usize,
}

impl Decision {
    fn new(granted_by: GrantedBy, queries_issued: usize) -> Self {
        Self {
            granted_by,
            queries_issued,
        }
    }
}

/// A decision query ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQuery {
    /// Policy flavor the query is sent to
    pub flavor: String,
    /// Namespaced action, subject and resource
    pub request: AuthorizationRequest,
}

/// Per-operation evaluator, built once at registration.
pub struct AuthorizationEvaluator {
    action: String,
    permissions: NormalizedPermissions,
    config: Arc<PolicyEngineConfig>,
    engine: Arc<dyn PolicyEngineEffects>,
}

impl AuthorizationEvaluator {
    /// Evaluator for operation `action` with its declared permissions
    pub fn new(
        action: impl Into<String>,
        spec: Option<&PermissionSpec>,
        config: Arc<PolicyEngineConfig>,
        engine: Arc<dyn PolicyEngineEffects>,
    ) -> Self {
        let action = action.into();
        let permissions = normalize_permissions(&action, spec);
        Self {
            action,
            permissions,
            config,
            engine,
        }
    }

    /// Qualified operation name
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Normalized declaration the evaluator enforces
    pub fn permissions(&self) -> &NormalizedPermissions {
        &self.permissions
    }

    /// Whether the operation has anything to enforce
    pub fn is_enforced(&self) -> bool {
        !self.permissions.is_empty()
    }

    /// Decision queries for this call, in send order.
    ///
    /// Each static rule yields a query against the operation's resource class,
    /// followed by one against `params.id` when the call addresses an entity.
    pub fn prepare_queries(&self, ctx: &CallContext, caller_id: &str) -> Vec<PreparedQuery> {
        let subject = self.config.namespaced_subject(caller_id);
        let resources: Vec<String> = std::iter::once(ctx.resource_class().to_string())
            .chain(ctx.param_id())
            .map(|resource| self.config.namespaced_resource(&resource))
            .collect();

        self.permissions
            .static_rules()
            .iter()
            .flat_map(|rule| {
                let action = self.config.namespaced_action(&rule.action);
                let subject = subject.clone();
                resources.iter().map(move |resource| PreparedQuery {
                    flavor: rule.flavor.clone(),
                    request: AuthorizationRequest {
                        action: action.clone(),
                        subject: subject.clone(),
                        resource: resource.clone(),
                    },
                })
            })
            .collect()
    }

    /// Decide whether `ctx` may proceed.
    #[instrument(skip_all, fields(operation = %self.action))]
    pub async fn evaluate(&self, ctx: &CallContext) -> GatehouseResult<Decision> {
        if !self.is_enforced() {
            return Ok(Decision::new(GrantedBy::NotEnforced, 0));
        }

        let Some(user) = ctx.user() else {
            debug!("Rejected call without caller identity");
            return Err(GatehouseError::missing_caller_context(&self.action));
        };

        if ctx.roles().is_none() {
            debug!(caller = %user.id, "No roles on call, enforcement skipped");
            return Ok(Decision::new(GrantedBy::RoleBypass, 0));
        }

        let queries = self.prepare_queries(ctx, &user.id);
        let queries_issued = queries.len();
        if self.run_queries(&queries).await {
            debug!(caller = %user.id, queries_issued, "Granted by policy engine");
            return Ok(Decision::new(GrantedBy::PolicyEngine, queries_issued));
        }

        if self.run_predicates(ctx).await? {
            debug!(caller = %user.id, queries_issued, "Granted by predicate");
            return Ok(Decision::new(GrantedBy::Predicate, queries_issued));
        }

        debug!(caller = %user.id, queries_issued, "Denied");
        Err(GatehouseError::insufficient_permissions(&self.action))
    }

    async fn run_queries(&self, queries: &[PreparedQuery]) -> bool {
        let mut granted = false;
        for query in queries {
            match self.engine.is_allowed(&query.flavor, &query.request).await {
                Ok(decision) => granted |= decision.allowed,
                Err(error) => {
                    warn!(
                        flavor = %query.flavor,
                        resource = %query.request.resource,
                        error = %error,
                        "Decision query failed, counted as deny"
                    );
                }
            }
        }
        granted
    }

    async fn run_predicates(&self, ctx: &CallContext) -> GatehouseResult<bool> {
        let predicates = self.permissions.predicates();
        if predicates.is_empty() {
            return Ok(false);
        }
        let results = try_join_all(predicates.iter().map(|p| p.check(ctx))).await?;
        Ok(results.into_iter().any(|granted| granted))
    }
}

impl std::fmt::Debug for AuthorizationEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEvaluator")
            .field("action", &self.action)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::{PermissionRule, ServiceDescriptor};
    use gatehouse_testkit::{expected_request, member_call, test_config, MockPolicyEngine};
    use serde_json::json;

    fn evaluator(spec: PermissionSpec, engine: &MockPolicyEngine) -> AuthorizationEvaluator {
        AuthorizationEvaluator::new(
            "widgets.update",
            Some(&spec),
            Arc::new(test_config()),
            Arc::new(engine.clone()),
        )
    }

    #[test]
    fn test_prepare_queries_with_entity_id() {
        let engine = MockPolicyEngine::new();
        let spec = PermissionSpec::Many(vec![
            PermissionRule::new("member", "update", "exact").into(),
            PermissionRule::new("member", "read", "regex").into(),
        ]);
        let service = Arc::new(ServiceDescriptor::new("widgets"));
        let ctx = member_call(&service, "widgets.update", "U1").with_params(json!({"id": "E7"}));

        let queries = evaluator(spec, &engine).prepare_queries(&ctx, "U1");
        let expected = vec![
            PreparedQuery {
                flavor: "exact".into(),
                request: expected_request("update", "U1", "update"),
            },
            PreparedQuery {
                flavor: "exact".into(),
                request: expected_request("update", "U1", "E7"),
            },
            PreparedQuery {
                flavor: "regex".into(),
                request: expected_request("read", "U1", "update"),
            },
            PreparedQuery {
                flavor: "regex".into(),
                request: expected_request("read", "U1", "E7"),
            },
        ];
        assert_eq!(queries, expected);
    }

    #[test]
    fn test_prepare_queries_without_entity_id() {
        let engine = MockPolicyEngine::new();
        let spec = PermissionSpec::from(PermissionRule::new("member", "update", "exact"));
        let service = Arc::new(ServiceDescriptor::new("widgets"));
        let ctx = member_call(&service, "widgets.update", "U1");

        let queries = evaluator(spec, &engine).prepare_queries(&ctx, "U1");
        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0].request.resource,
            test_config().namespaced_resource("update")
        );
    }

    #[tokio::test]
    async fn test_unenforced_operation_issues_nothing() {
        let engine = MockPolicyEngine::new();
        let evaluator = AuthorizationEvaluator::new(
            "widgets.list",
            None,
            Arc::new(test_config()),
            Arc::new(engine.clone()),
        );
        let service = Arc::new(ServiceDescriptor::new("widgets"));
        let ctx = CallContext::new(service, "widgets.list");

        let decision = evaluator.evaluate(&ctx).await.unwrap();
        assert_eq!(decision, Decision::new(GrantedBy::NotEnforced, 0));
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_query_counts_as_deny() {
        let engine = MockPolicyEngine::new();
        engine.fail_queries(true);
        let spec = PermissionSpec::from(PermissionRule::new("member", "update", "exact"));
        let service = Arc::new(ServiceDescriptor::new("widgets"));
        let ctx = member_call(&service, "widgets.update", "U1");

        let err = evaluator(spec, &engine).evaluate(&ctx).await.unwrap_err();
        assert_eq!(err, GatehouseError::insufficient_permissions("widgets.update"));
        assert_eq!(engine.queries().len(), 1);
    }
}
