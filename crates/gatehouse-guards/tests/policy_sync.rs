//! Policy record synchronization through guarded create/delete operations

#![allow(clippy::unwrap_used)]

use gatehouse_core::{
    ActionDeclaration, CallContext, GatehouseError, PermissionRule, Policy, PolicyId,
    ServiceDescriptor,
};
use gatehouse_guards::{handler_fn, GuardChain, GuardedService, OperationHandler};
use gatehouse_testkit::{member_call, test_config, MockPolicyEngine, PolicyMutation};
use serde_json::{json, Value};
use std::sync::Arc;

/// Handler returning `{ "id": params.id }`
fn echo_id() -> Arc<dyn OperationHandler> {
    handler_fn(|ctx: CallContext| async move {
        Ok(json!({"id": ctx.params().get("id").cloned().unwrap_or(Value::Null)}))
    })
}

fn widgets_service(engine: &MockPolicyEngine) -> GuardedService {
    let descriptor = Arc::new(
        ServiceDescriptor::new("Widgets")
            .with_action(
                ActionDeclaration::new("create")
                    .with_permissions(PermissionRule::new("member", "create", "exact")),
            )
            .with_action(
                ActionDeclaration::new("remove")
                    .with_permissions(PermissionRule::new("member", "delete", "exact")),
            )
            .with_action(
                ActionDeclaration::new("update")
                    .with_permissions(PermissionRule::new("member", "update", "exact")),
            ),
    );
    engine.allow_everything();
    GuardChain::new(test_config(), Arc::new(engine.clone())).register_service(
        descriptor,
        ["create", "remove", "update"]
            .into_iter()
            .map(|local| (local.to_string(), echo_id())),
    )
}

fn call(service: &GuardedService, action: &str, user: &str, id: &str) -> CallContext {
    member_call(service.descriptor(), action, user).with_params(json!({"id": id}))
}

fn policy_id() -> PolicyId {
    PolicyId::for_caller("U1", "Widgets")
}

fn strs<'a>(values: impl IntoIterator<Item = &'a String>) -> Vec<&'a str> {
    values.into_iter().map(String::as_str).collect()
}

fn resources(policy: &Policy) -> Vec<&str> {
    strs(&policy.resources)
}

#[tokio::test]
async fn create_upserts_caller_policy() {
    let engine = MockPolicyEngine::new();
    let service = widgets_service(&engine);

    let result = service
        .call(&call(&service, "Widgets.create", "U1", "E1"))
        .await
        .unwrap();
    assert_eq!(result, json!({"id": "E1"}));

    let policy = engine.policy(&policy_id()).unwrap();
    assert_eq!(policy.id, "user:U1:Widgets");
    assert_eq!(resources(&policy), vec!["resources:root:E1"]);
    assert_eq!(
        strs(&policy.actions),
        vec!["actions:root:read", "actions:root:update", "actions:root:delete"]
    );
    assert_eq!(
        strs(&policy.subjects),
        vec!["subjects:root:U1"]
    );
    assert_eq!(engine.reads(), vec![policy_id()]);
}

#[tokio::test]
async fn repeated_creates_converge_on_one_record() {
    let engine = MockPolicyEngine::new();
    let service = widgets_service(&engine);

    for id in ["E1", "E2", "E3", "E2"] {
        service
            .call(&call(&service, "Widgets.create", "U1", id))
            .await
            .unwrap();
    }

    assert_eq!(engine.policy_count(), 1);
    let policy = engine.policy(&policy_id()).unwrap();
    let mut owned = resources(&policy);
    owned.sort_unstable();
    assert_eq!(
        owned,
        vec!["resources:root:E1", "resources:root:E2", "resources:root:E3"]
    );
    assert!(engine.mutations().iter().all(|mutation| matches!(
        mutation,
        PolicyMutation::Upsert(policy) if policy.id == "user:U1:Widgets"
    )));
}

#[tokio::test]
async fn callers_get_separate_records() {
    let engine = MockPolicyEngine::new();
    let service = widgets_service(&engine);

    service
        .call(&call(&service, "Widgets.create", "U1", "E1"))
        .await
        .unwrap();
    service
        .call(&call(&service, "Widgets.create", "U2", "E2"))
        .await
        .unwrap();

    assert_eq!(engine.policy_count(), 2);
    let other = engine
        .policy(&PolicyId::for_caller("U2", "Widgets"))
        .unwrap();
    assert_eq!(resources(&other), vec!["resources:root:E2"]);
}

#[tokio::test]
async fn delete_of_last_resource_removes_record() {
    let engine = MockPolicyEngine::new();
    let service = widgets_service(&engine);
    service
        .call(&call(&service, "Widgets.create", "U1", "E1"))
        .await
        .unwrap();

    service
        .call(&call(&service, "Widgets.remove", "U1", "E1"))
        .await
        .unwrap();

    assert_eq!(engine.policy(&policy_id()), None);
    assert_eq!(
        engine.mutations().last(),
        Some(&PolicyMutation::Delete(policy_id()))
    );
}

#[tokio::test]
async fn delete_of_one_of_many_resources_keeps_the_rest() {
    let engine = MockPolicyEngine::new();
    let service = widgets_service(&engine);
    for id in ["E1", "E2"] {
        service
            .call(&call(&service, "Widgets.create", "U1", id))
            .await
            .unwrap();
    }

    service
        .call(&call(&service, "Widgets.remove", "U1", "E1"))
        .await
        .unwrap();

    let policy = engine.policy(&policy_id()).unwrap();
    assert_eq!(resources(&policy), vec!["resources:root:E2"]);
    assert!(matches!(
        engine.mutations().last(),
        Some(PolicyMutation::Upsert(_))
    ));
}

#[tokio::test]
async fn delete_without_prior_record_issues_delete() {
    let engine = MockPolicyEngine::new();
    let service = widgets_service(&engine);

    service
        .call(&call(&service, "Widgets.remove", "U1", "E1"))
        .await
        .unwrap();

    assert_eq!(engine.mutations(), vec![PolicyMutation::Delete(policy_id())]);
}

#[tokio::test]
async fn update_leaves_policy_store_alone() {
    let engine = MockPolicyEngine::new();
    let service = widgets_service(&engine);

    service
        .call(&call(&service, "Widgets.update", "U1", "E1"))
        .await
        .unwrap();

    assert!(engine.mutations().is_empty());
    assert!(engine.reads().is_empty());
}

#[tokio::test]
async fn store_failure_after_success_is_a_sync_error() {
    let engine = MockPolicyEngine::new();
    let service = widgets_service(&engine);
    engine.fail_mutations(true);

    let err = service
        .call(&call(&service, "Widgets.create", "U1", "E1"))
        .await
        .unwrap_err();

    match &err {
        GatehouseError::Synchronization { policy_id, source } => {
            assert_eq!(policy_id, "user:U1:Widgets");
            assert!(matches!(**source, GatehouseError::Network { .. }));
        }
        other => panic!("expected a synchronization error, got {other:?}"),
    }
    assert!(!err.is_authorization_failure());

    // The handler ran and the record was attempted exactly once.
    assert_eq!(engine.mutations().len(), 1);
    assert_eq!(engine.policy(&policy_id()), None);
}

#[tokio::test]
async fn unknown_operation_is_not_found() {
    let engine = MockPolicyEngine::new();
    let service = widgets_service(&engine);

    let err = service
        .call(&call(&service, "Widgets.archive", "U1", "E1"))
        .await
        .unwrap_err();

    assert!(matches!(err, GatehouseError::NotFound { .. }));
}
