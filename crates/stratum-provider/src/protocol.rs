//! Request and response types of the provider protocol
//!
//! Every response carries its own [`Diagnostics`]; nothing in this module is
//! ever reported through `Err`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stratum_core::{Diagnostics, Path, Schema, Type, Value};

/// Optional protocol features a provider advertises
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// The provider wants PlanResourceChange called for destroys too
    pub plan_destroy: bool,

    /// Callers may skip GetProviderSchema and use a cached copy
    pub get_provider_schema_optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    #[serde(default)]
    pub allow_null: bool,
}

/// Signature of a provider-defined function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub parameters: Vec<FunctionParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variadic: Option<FunctionParam>,
    pub return_type: Type,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetProviderSchemaResponse {
    /// Schema of the provider's own configuration
    pub provider: Schema,
    pub resource_types: BTreeMap<String, Schema>,
    pub data_sources: BTreeMap<String, Schema>,
    pub actions: BTreeMap<String, Schema>,
    pub functions: BTreeMap<String, FunctionSpec>,
    pub capabilities: ServerCapabilities,
    pub diagnostics: Diagnostics,
}

impl GetProviderSchemaResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    pub fn with_resource(mut self, type_name: impl Into<String>, schema: Schema) -> Self {
        self.resource_types.insert(type_name.into(), schema);
        self
    }

    pub fn with_data_source(mut self, type_name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(type_name.into(), schema);
        self
    }

    pub fn with_action(mut self, type_name: impl Into<String>, schema: Schema) -> Self {
        self.actions.insert(type_name.into(), schema);
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, spec: FunctionSpec) -> Self {
        self.functions.insert(name.into(), spec);
        self
    }

    pub fn with_capabilities(mut self, capabilities: ServerCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn resource_schema(&self, type_name: &str) -> Option<&Schema> {
        self.resource_types.get(type_name)
    }

    pub fn data_source_schema(&self, type_name: &str) -> Option<&Schema> {
        self.data_sources.get(type_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateProviderConfigRequest {
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateProviderConfigResponse {
    /// Configuration after provider-side normalisation and defaults
    pub prepared_config: Value,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateResourceConfigRequest {
    pub type_name: String,
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateResourceConfigResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateDataResourceConfigRequest {
    pub type_name: String,
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateDataResourceConfigResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigureProviderRequest {
    /// Version of the calling engine, for providers that adapt to it
    pub client_version: String,
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigureProviderResponse {
    pub diagnostics: Diagnostics,
}

/// Persisted state in one of the two legacy encodings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawState {
    Flatmap(BTreeMap<String, String>),
    Json(Vec<u8>),
}

impl RawState {
    pub fn format(&self) -> &'static str {
        match self {
            RawState::Flatmap(_) => "flatmap",
            RawState::Json(_) => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeResourceStateRequest {
    pub type_name: String,
    /// Schema version the state was written with
    pub version: i64,
    pub raw_state: RawState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradeResourceStateResponse {
    pub upgraded_state: Value,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadResourceRequest {
    pub type_name: String,
    pub prior_state: Value,
    pub private: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadResourceResponse {
    /// Null when the remote object no longer exists
    pub new_state: Value,
    pub private: Vec<u8>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResourceChangeRequest {
    pub type_name: String,
    pub prior_state: Value,
    /// Null for a destroy
    pub proposed_new_state: Value,
    pub config: Value,
    pub prior_private: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResourceChangeResponse {
    pub planned_state: Value,
    pub planned_private: Vec<u8>,
    /// Attributes whose change forces the object to be replaced
    #[serde(default)]
    pub requires_replace: Vec<Path>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyResourceChangeRequest {
    pub type_name: String,
    pub prior_state: Value,
    /// Null for a destroy
    pub planned_state: Value,
    pub config: Value,
    pub planned_private: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyResourceChangeResponse {
    pub new_state: Value,
    pub private: Vec<u8>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResourceStateRequest {
    pub type_name: String,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    pub type_name: String,
    pub state: Value,
    pub private: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResourceStateResponse {
    pub imported_resources: Vec<ImportedResource>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveResourceStateRequest {
    pub source_provider_address: String,
    pub source_type_name: String,
    pub source_schema_version: i64,
    pub source_state_json: Vec<u8>,
    pub source_private: Vec<u8>,
    pub target_type_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveResourceStateResponse {
    pub target_state: Value,
    pub target_private: Vec<u8>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadDataSourceRequest {
    pub type_name: String,
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadDataSourceResponse {
    pub state: Value,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanActionRequest {
    pub action_type: String,
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanActionResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyActionRequest {
    pub action_type: String,
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyActionResponse {
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallFunctionRequest {
    pub function_name: String,
    pub arguments: Vec<Value>,
}

/// A function failure, optionally blamed on one argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionError {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallFunctionResponse {
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FunctionError>,
}
