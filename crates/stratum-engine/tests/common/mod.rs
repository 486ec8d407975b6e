//! Shared fixtures for the engine tests

#![allow(dead_code)]

use std::sync::Arc;
use stratum_core::{Attribute, Block, Schema, Type, Value};
use stratum_engine::{Engine, EngineConfig, InstanceAddress};
use stratum_provider::{GetProviderSchemaResponse, MockProvider};

pub const INSTANCE: &str = "test_instance";

pub fn instance_schema() -> Schema {
    Schema::new(
        Block::new()
            .with_attribute("id", Attribute::computed(Type::String))
            .with_attribute("ami", Attribute::required(Type::String))
            .with_attribute("size", Attribute::optional(Type::Number)),
    )
    .with_version(2)
}

pub fn provider_schema() -> GetProviderSchemaResponse {
    GetProviderSchemaResponse::new()
        .with_resource(INSTANCE, instance_schema())
        .with_data_source(
            "test_image",
            Schema::new(
                Block::new()
                    .with_attribute("filter", Attribute::required(Type::String))
                    .with_attribute("image_id", Attribute::computed(Type::String)),
            ),
        )
        .with_action(
            "test_reboot",
            Schema::new(Block::new().with_attribute("instance", Attribute::required(Type::String))),
        )
}

pub fn config() -> EngineConfig {
    EngineConfig::default().with_parallelism(4)
}

pub fn engine(mock: MockProvider, config: EngineConfig) -> Engine<MockProvider> {
    let _ = stratum_engine::logging::init_logging(&config);
    Engine::new(Arc::new(mock), config).unwrap()
}

/// An engine over a default mock, already configured.
pub async fn configured(mock: MockProvider, config: EngineConfig) -> Engine<MockProvider> {
    let engine = engine(mock, config);
    let diagnostics = engine.configure(Value::empty_map()).await;
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    engine
}

pub fn address(name: &str) -> InstanceAddress {
    InstanceAddress::new(INSTANCE, name)
}

pub fn instance(ami: &str) -> Value {
    Value::object([("ami", Value::from(ami))])
}

/// State as the default apply leaves it for `instance(ami)`.
pub fn applied(ami: &str) -> Value {
    Value::object([
        ("id", Value::from("")),
        ("ami", Value::from(ami)),
        ("size", Value::Null),
    ])
}
