//! End-to-end runs of the engine against the mock provider

mod common;

use common::*;
use std::collections::BTreeMap;
use stratum_core::{Category, Diagnostic, Path, Value};
use stratum_engine::*;
use stratum_provider::*;

/// A new instance is validated, planned, applied and reported
#[tokio::test]
async fn test_create() {
    let engine = configured(MockProvider::new(provider_schema()), config()).await;
    let report = engine
        .run(vec![InstanceChange::create(address("web"), instance("ami-1"))])
        .await;

    assert!(report.is_success(), "{report}");
    assert_eq!(report.exit_code(), 0);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, InstanceStatus::Applied);
    assert_eq!(outcome.action(), Some(ActionType::Create));
    let change = outcome.change.as_ref().unwrap();
    assert!(change.planned_state.get_attr("id").is_unknown());
    assert_eq!(outcome.new_state.as_ref().unwrap().value, applied("ami-1"));
    assert_eq!(
        report.summary().to_string(),
        "1 to create, 0 to update, 0 to replace, 0 to delete, 0 unchanged"
    );

    let calls = engine.provider().calls().await;
    assert_eq!(calls.validate_resource_config.count, 1);
    assert!(!calls.read_resource.called());
    assert_eq!(calls.plan_resource_change.count, 1);
    assert_eq!(calls.apply_resource_change.count, 1);
    assert_eq!(calls.get_provider_schema.count, 1);
}

/// Re-running with the applied state is a no-op; a changed config updates
#[tokio::test]
async fn test_noop_and_update() {
    let engine = configured(MockProvider::new(provider_schema()), config()).await;
    let report = engine
        .run(vec![
            InstanceChange::update(address("same"), applied("ami-1"), instance("ami-1")),
            InstanceChange::update(address("changed"), applied("ami-1"), instance("ami-2")),
        ])
        .await;

    assert!(report.is_success(), "{report}");
    assert_eq!(report.outcomes[0].status, InstanceStatus::Unchanged);
    assert_eq!(report.outcomes[0].action(), Some(ActionType::NoOp));
    assert_eq!(report.outcomes[1].action(), Some(ActionType::Update));
    assert_eq!(
        report.outcomes[1].new_state.as_ref().unwrap().value,
        applied("ami-2")
    );
    assert_eq!(engine.provider().calls().await.read_resource.count, 2);
    assert_eq!(engine.provider().calls().await.apply_resource_change.count, 1);
}

/// Destroys produce a null state and skip PlanResourceChange unless asked
#[tokio::test]
async fn test_destroy() {
    let engine = configured(MockProvider::new(provider_schema()), config()).await;
    let report = engine
        .run(vec![
            InstanceChange::destroy(address("web"), applied("ami-1")).with_private(b"abc".to_vec())
        ])
        .await;
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.action(), Some(ActionType::Delete));
    assert_eq!(outcome.change.as_ref().unwrap().planned_private, b"abc".to_vec());
    assert!(outcome.new_state.as_ref().unwrap().value.is_null());
    assert!(!engine.provider().calls().await.plan_resource_change.called());

    let mut schema = provider_schema();
    schema.capabilities.plan_destroy = true;
    let engine = configured(MockProvider::new(schema), config()).await;
    let report = engine
        .run(vec![
            InstanceChange::destroy(address("web"), applied("ami-1")).with_private(b"abc".to_vec())
        ])
        .await;
    assert!(report.is_success(), "{report}");
    let calls = engine.provider().calls().await;
    let planned = calls.plan_resource_change.last_request.unwrap();
    assert!(planned.proposed_new_state.is_null());
    assert_eq!(planned.prior_private, b"abc".to_vec());
}

/// Refresh discovering a vanished object turns the change into a create
#[tokio::test]
async fn test_refresh_finds_object_gone() {
    let mock = MockProvider::new(provider_schema()).with_read_resource_fn(|req| {
        ReadResourceResponse {
            new_state: Value::Null,
            private: req.private.clone(),
            ..Default::default()
        }
    });
    let engine = configured(mock, config()).await;
    let report = engine
        .run(vec![
            InstanceChange::update(address("web"), applied("ami-1"), instance("ami-1")),
            InstanceChange::destroy(address("gone"), applied("ami-1")),
        ])
        .await;
    assert_eq!(report.outcomes[0].action(), Some(ActionType::Create));
    assert_eq!(report.outcomes[1].action(), Some(ActionType::NoOp));
    assert_eq!(report.outcomes[1].status, InstanceStatus::Unchanged);
}

/// Without refresh the prior state goes straight to planning
#[tokio::test]
async fn test_refresh_disabled() {
    let engine = configured(
        MockProvider::new(provider_schema()),
        config().with_refresh(false),
    )
    .await;
    let report = engine
        .run(vec![InstanceChange::update(address("web"), applied("ami-1"), instance("ami-1"))])
        .await;
    assert_eq!(report.outcomes[0].status, InstanceStatus::Unchanged);
    assert!(!engine.provider().calls().await.read_resource.called());
}

/// Stored flatmap state is upgraded before it is used
#[tokio::test]
async fn test_raw_prior_is_upgraded() {
    let engine = configured(MockProvider::new(provider_schema()), config()).await;
    let flat: BTreeMap<String, String> = [("id", ""), ("ami", "ami-1")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let report = engine
        .run(vec![
            InstanceChange::create(address("web"), instance("ami-1"))
                .with_raw_prior(RawState::Flatmap(flat), 1),
        ])
        .await;
    assert!(report.is_success(), "{report}");
    assert_eq!(report.outcomes[0].action(), Some(ActionType::NoOp));
    let calls = engine.provider().calls().await;
    assert_eq!(calls.upgrade_resource_state.count, 1);
    assert_eq!(
        calls.read_resource.last_request.unwrap().prior_state,
        applied("ami-1")
    );
}

/// An unmigratable state fails that instance only
#[tokio::test]
async fn test_upgrade_failure_is_contained() {
    let engine = configured(MockProvider::new(provider_schema()), config()).await;
    let report = engine
        .run(vec![
            InstanceChange::create(address("old"), instance("ami-1"))
                .with_raw_prior(RawState::Json(br#"{"ami":"ami-1"}"#.to_vec()), 7),
            InstanceChange::create(address("new"), instance("ami-1")),
        ])
        .await;
    assert!(!report.is_success());
    assert_eq!(report.exit_code(), 1);
    let old = report.outcome(&address("old")).unwrap();
    assert_eq!(old.status, InstanceStatus::Failed);
    assert!(old.diagnostics.has_category(Category::UpgradeFailure));
    assert!(old.change.is_none());
    let new = report.outcome(&address("new")).unwrap();
    assert_eq!(new.status, InstanceStatus::Applied);
}

/// Schema mismatches fail the instance before any planning
#[tokio::test]
async fn test_invalid_config_and_unknown_type() {
    let engine = configured(MockProvider::new(provider_schema()), config()).await;
    let report = engine
        .run(vec![
            InstanceChange::create(
                address("bad"),
                Value::object([("ami", Value::from(true))]),
            ),
            InstanceChange::create(InstanceAddress::new("unknown_type", "x"), instance("ami-1")),
            InstanceChange::create(address("good"), instance("ami-1")),
        ])
        .await;
    assert_eq!(report.outcomes[0].status, InstanceStatus::Failed);
    assert!(report.outcomes[0].diagnostics.has_category(Category::SchemaMismatch));
    assert_eq!(report.outcomes[1].status, InstanceStatus::Failed);
    assert!(report.outcomes[1].diagnostics.has_category(Category::SchemaMismatch));
    assert_eq!(report.outcomes[2].status, InstanceStatus::Applied);
    assert_eq!(report.diagnostics().errors().count(), 2);
    assert_eq!(engine.provider().calls().await.plan_resource_change.count, 1);
}

/// Running before configure halts the run after the first violation
#[tokio::test]
async fn test_ordering_violation_halts_run() {
    let engine = engine(
        MockProvider::new(provider_schema()),
        config().with_parallelism(1),
    );
    let report = engine
        .run(vec![
            InstanceChange::create(address("a"), instance("ami-1")),
            InstanceChange::create(address("b"), instance("ami-1")),
            InstanceChange::create(address("c"), instance("ami-1")),
        ])
        .await;

    assert_eq!(report.exit_code(), 1);
    let first = &report.outcomes[0];
    assert_eq!(first.status, InstanceStatus::Failed);
    let errors: Vec<&Diagnostic> = first.diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].summary,
        "Configure not called before PlanResourceChange \"test_instance\""
    );
    assert_eq!(report.count(InstanceStatus::Skipped), 2);
    assert!(report.outcomes[1].diagnostics.warnings().count() == 1);
    assert_eq!(engine.provider().calls().await.plan_resource_change.count, 1);
}

/// With halting disabled every instance reports its own violation
#[tokio::test]
async fn test_ordering_violation_without_halt() {
    let engine = engine(
        MockProvider::new(provider_schema()),
        config()
            .with_parallelism(1)
            .with_halt_on_ordering_violation(false),
    );
    let report = engine
        .run(vec![
            InstanceChange::create(address("a"), instance("ami-1")),
            InstanceChange::create(address("b"), instance("ami-1")),
        ])
        .await;
    assert_eq!(report.count(InstanceStatus::Failed), 2);
    assert_eq!(report.count(InstanceStatus::Skipped), 0);
}

/// Plan-only runs never apply
#[tokio::test]
async fn test_plan_only() {
    let engine = configured(
        MockProvider::new(provider_schema()),
        config().with_plan_only(true),
    )
    .await;
    let report = engine
        .run(vec![InstanceChange::create(address("web"), instance("ami-1"))])
        .await;
    assert_eq!(report.outcomes[0].status, InstanceStatus::Planned);
    assert!(report.outcomes[0].new_state.is_none());
    assert!(report.plan().has_changes);
    assert!(!engine.provider().calls().await.apply_resource_change.called());

    let diagnostics = engine
        .invoke_action(
            "test_reboot",
            Value::object([("instance", Value::from("i-1"))]),
        )
        .await;
    assert!(diagnostics.is_empty());
    let calls = engine.provider().calls().await;
    assert!(calls.plan_action.called());
    assert!(!calls.apply_action.called());
}

/// Apply results that break the contract are rejected by the engine
#[tokio::test]
async fn test_apply_invariants() {
    let mock = MockProvider::new(provider_schema()).with_apply_resource_change_fn(|req| {
        // echoes the plan, unknowns included
        ApplyResourceChangeResponse {
            new_state: if req.planned_state.is_null() {
                applied("zombie")
            } else {
                req.planned_state.clone()
            },
            ..Default::default()
        }
    });
    let engine = configured(mock, config()).await;
    let report = engine
        .run(vec![
            InstanceChange::create(address("web"), instance("ami-1")),
            InstanceChange::destroy(address("old"), applied("ami-1")),
            InstanceChange::update(address("same"), applied("ami-1"), instance("ami-2")),
        ])
        .await;
    for outcome in &report.outcomes[..2] {
        assert_eq!(outcome.status, InstanceStatus::Failed, "{}", outcome.address);
        assert!(outcome.diagnostics.has_category(Category::Provider));
        assert!(outcome.new_state.is_none());
    }
    // a fully known echo is acceptable
    assert_eq!(report.outcomes[2].status, InstanceStatus::Applied);
}

/// Provider errors on one instance leave the others alone
#[tokio::test]
async fn test_provider_error_is_local() {
    let mock = MockProvider::new(provider_schema()).with_plan_resource_change_fn(|req| {
        let mut resp = PlanResourceChangeResponse {
            planned_state: req.proposed_new_state.clone(),
            ..Default::default()
        };
        if req.config.get_attr("ami") == &Value::from("ami-bad") {
            resp.diagnostics.error("image not found");
        }
        resp
    });
    let engine = configured(mock, config()).await;
    let report = engine
        .run(vec![
            InstanceChange::create(address("a"), instance("ami-bad")),
            InstanceChange::create(address("b"), instance("ami-1")),
        ])
        .await;
    assert_eq!(report.outcomes[0].status, InstanceStatus::Failed);
    assert_eq!(report.outcomes[1].status, InstanceStatus::Applied);
    assert_eq!(report.diagnostics().len(), 1);
}

/// Changes to one address are applied one after the other
#[tokio::test]
async fn test_same_address_changes_run_in_turn() {
    let engine = configured(MockProvider::new(provider_schema()), config()).await;
    let report = engine
        .run(vec![
            InstanceChange::create(address("web"), instance("ami-1")),
            InstanceChange::update(address("web"), applied("ami-1"), instance("ami-2")),
        ])
        .await;
    assert!(report.is_success(), "{report}");
    assert_eq!(report.outcomes[0].action(), Some(ActionType::Create));
    assert_eq!(report.outcomes[1].action(), Some(ActionType::Update));
    assert_eq!(engine.locked_addresses().await, 0);
}

/// A plan that requires replacement destroys the object and creates a new one
#[tokio::test]
async fn test_replace() {
    let schema = instance_schema();
    let mock = MockProvider::new(provider_schema()).with_plan_resource_change_fn(move |req| {
        let mut resp = defaults::plan(&schema, req);
        let prior_ami = req.prior_state.get_attr("ami");
        if !req.prior_state.is_null() && prior_ami != req.config.get_attr("ami") {
            resp.requires_replace = vec![Path::root().attr("ami")];
        }
        resp
    });
    let engine = configured(mock, config()).await;
    let report = engine
        .run(vec![
            InstanceChange::update(address("web"), applied("ami-1"), instance("ami-2"))
                .with_private(b"old".to_vec()),
        ])
        .await;

    assert!(report.is_success(), "{report}");
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.action(), Some(ActionType::Replace));
    assert_eq!(outcome.status, InstanceStatus::Applied);
    assert_eq!(
        outcome.change.as_ref().unwrap().requires_replace,
        vec![Path::root().attr("ami")]
    );
    assert_eq!(outcome.new_state.as_ref().unwrap().value, applied("ami-2"));
    assert_eq!(
        report.summary().to_string(),
        "0 to create, 0 to update, 1 to replace, 0 to delete, 0 unchanged"
    );

    let calls = engine.provider().calls().await;
    assert_eq!(calls.plan_resource_change.count, 2);
    assert_eq!(calls.apply_resource_change.count, 2);
    let created = calls.apply_resource_change.last_request.unwrap();
    assert!(created.prior_state.is_null());
    assert_eq!(created.config, instance("ami-2"));
}

/// Plan-only stops at classifying the replacement
#[tokio::test]
async fn test_replace_plan_only() {
    let mock = MockProvider::new(provider_schema()).with_plan_resource_change_fn(|req| {
        PlanResourceChangeResponse {
            planned_state: req.proposed_new_state.clone(),
            requires_replace: vec![Path::root().attr("ami")],
            ..Default::default()
        }
    });
    let engine = configured(mock, config().with_plan_only(true)).await;
    let report = engine
        .run(vec![InstanceChange::update(
            address("web"),
            applied("ami-1"),
            instance("ami-2"),
        )])
        .await;
    assert_eq!(report.outcomes[0].action(), Some(ActionType::Replace));
    assert_eq!(report.outcomes[0].status, InstanceStatus::Planned);
    assert!(!engine.provider().calls().await.apply_resource_change.called());
}

/// A cached schema replaces GetProviderSchema only when the provider allows it
#[tokio::test]
async fn test_cached_schema() {
    let optional = provider_schema().with_capabilities(ServerCapabilities {
        get_provider_schema_optional: true,
        ..Default::default()
    });
    let cached = engine(MockProvider::new(optional.clone()), config())
        .with_cached_schema(optional);
    assert!(cached.configure(Value::empty_map()).await.is_empty());
    let report = cached
        .run(vec![InstanceChange::create(address("web"), instance("ami-1"))])
        .await;
    assert!(report.is_success(), "{report}");
    assert!(!cached.provider().calls().await.get_provider_schema.called());

    let fetched = engine(MockProvider::new(provider_schema()), config())
        .with_cached_schema(provider_schema());
    assert!(fetched.configure(Value::empty_map()).await.is_empty());
    assert_eq!(fetched.provider().calls().await.get_provider_schema.count, 1);
}

/// A provider that fails to close surfaces the error
#[tokio::test]
async fn test_close_error() {
    let mock = MockProvider::new(provider_schema())
        .with_close_error(ProviderError::CloseFailed("socket busy".into()));
    let engine = configured(mock, config()).await;
    let err = engine.close().await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Provider(ProviderError::CloseFailed(_))
    ));
}

/// Invalid published schemas stop configuration
#[tokio::test]
async fn test_invalid_schema_blocks_configure() {
    let mut bad = stratum_core::Attribute::required(stratum_core::Type::String);
    bad.computed = true;
    let schema = GetProviderSchemaResponse::new().with_resource(
        INSTANCE,
        stratum_core::Schema::new(stratum_core::Block::new().with_attribute("id", bad)),
    );
    let engine = engine(MockProvider::new(schema), config());
    let diagnostics = engine.configure(Value::empty_map()).await;
    assert!(diagnostics.has_category(Category::SchemaMismatch));
    assert!(!engine.provider().calls().await.configure_provider.called());
}

/// Configure passes the prepared config on
#[tokio::test]
async fn test_configure_uses_prepared_config() {
    let mock = MockProvider::new(provider_schema()).with_validate_provider_config_fn(|_| {
        ValidateProviderConfigResponse {
            prepared_config: Value::object([("region", Value::from("eu-1"))]),
            ..Default::default()
        }
    });
    let engine = engine(mock, config());
    assert!(engine.configure(Value::empty_map()).await.is_empty());
    let calls = engine.provider().calls().await;
    let configured = calls.configure_provider.last_request.unwrap();
    assert_eq!(configured.config.get_attr("region"), &Value::from("eu-1"));
    assert_eq!(configured.client_version, config().client_version);
}

/// Data sources, functions and stop go through the provider
#[tokio::test]
async fn test_wrappers() {
    let mock = MockProvider::new(provider_schema())
        .with_stop_error(ProviderError::StopFailed("busy".into()));
    let engine = configured(mock, config()).await;

    let read = engine
        .read_data_source(
            "test_image",
            Value::object([("filter", Value::from("debian-*"))]),
        )
        .await;
    assert!(read.diagnostics.is_empty());
    assert_eq!(read.state.get_attr("filter"), &Value::from("debian-*"));
    assert!(read.state.get_attr("image_id").is_null());

    let read = engine
        .read_data_source("test_image", Value::object([("filter", Value::from(1))]))
        .await;
    assert!(read.diagnostics.has_errors());
    assert_eq!(engine.provider().calls().await.read_data_source.count, 1);

    let result = engine.call_function("nope", vec![]).await;
    assert!(result.error.is_some());

    let imported = engine.import(INSTANCE, "i-1").await;
    assert!(imported.diagnostics.is_empty());

    let diagnostics = engine.stop().await;
    assert!(!diagnostics.has_errors());
    assert!(diagnostics.has_category(Category::Cancellation));

    engine.close().await.unwrap();
    assert_eq!(engine.provider().lifecycle().await, Lifecycle::Closed);
}

/// Zero parallelism is a configuration error
#[test]
fn test_zero_parallelism_rejected() {
    let result = Engine::new(
        std::sync::Arc::new(MockProvider::new(provider_schema())),
        EngineConfig::default().with_parallelism(0),
    );
    assert!(matches!(result, Err(EngineError::Config(_))));
}
