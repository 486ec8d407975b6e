//! Shared fixtures for the provider contract tests

#![allow(dead_code)]

use stratum_core::{Attribute, Block, NestedBlock, NestingMode, Schema, Type, Value};
use stratum_provider::{
    ConfigureProviderRequest, GetProviderSchemaResponse, MockProvider, Provider,
};

pub const INSTANCE: &str = "test_instance";

/// A resource type exercising every attribute flag combination.
pub fn instance_schema() -> Schema {
    Schema::new(
        Block::new()
            .with_attribute("id", Attribute::computed(Type::String))
            .with_attribute("ami", Attribute::required(Type::String))
            .with_attribute("name", Attribute::optional_computed(Type::String))
            .with_attribute("size", Attribute::optional(Type::Number))
            .with_attribute("tags", Attribute::optional(Type::map(Type::String)))
            .with_attribute("zones", Attribute::computed(Type::set(Type::String)))
            .with_block(
                "disk",
                NestedBlock::new(
                    NestingMode::List,
                    Block::new()
                        .with_attribute("label", Attribute::required(Type::String))
                        .with_attribute("serial", Attribute::computed(Type::String)),
                ),
            ),
    )
    .with_version(1)
}

pub fn provider_schema() -> GetProviderSchemaResponse {
    GetProviderSchemaResponse::new()
        .with_provider(Schema::new(
            Block::new().with_attribute("region", Attribute::optional(Type::String)),
        ))
        .with_resource(INSTANCE, instance_schema())
        .with_resource(
            "test_name",
            Schema::new(
                Block::new().with_attribute("name", Attribute::optional_computed(Type::String)),
            ),
        )
        .with_resource(
            "test_id",
            Schema::new(Block::new().with_attribute("id", Attribute::computed(Type::String))),
        )
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

pub fn mock() -> MockProvider {
    MockProvider::new(provider_schema())
}

pub async fn configured() -> MockProvider {
    let mock = mock();
    let resp = mock.configure_provider(ConfigureProviderRequest::default()).await;
    assert!(resp.diagnostics.is_empty());
    mock
}

pub fn instance(ami: &str) -> Value {
    Value::object([("ami", Value::from(ami))])
}
