//! Provider trait definition

use crate::error::Result;
use crate::protocol::*;
use async_trait::async_trait;

/// Provider plugin abstraction trait
///
/// Every provider, real or mock, implements this trait. Operations never fail
/// through `Err`: problems are reported as diagnostics in the response. Only
/// [`stop`](Provider::stop) and [`close`](Provider::close) return a
/// `Result`, for failures that belong to the process rather than to an
/// operation.
///
/// Callers may invoke operations concurrently. Implementations serialise
/// access to their own shared state, except in `stop`, which must stay
/// callable while another operation is in flight.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Schemas for the provider, its resource types, data sources, actions
    /// and functions. Idempotent; callers may cache the result.
    async fn get_provider_schema(&self) -> GetProviderSchemaResponse;

    /// Check provider-level configuration and return it normalised.
    async fn validate_provider_config(
        &self,
        req: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse;

    /// Check a resource configuration against its type's schema.
    async fn validate_resource_config(
        &self,
        req: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse;

    /// Check a data source configuration against its schema.
    async fn validate_data_resource_config(
        &self,
        req: ValidateDataResourceConfigRequest,
    ) -> ValidateDataResourceConfigResponse;

    /// Configure the provider. Must be called before any instance-level
    /// operation.
    async fn configure_provider(&self, req: ConfigureProviderRequest) -> ConfigureProviderResponse;

    /// Migrate persisted state to the current schema.
    async fn upgrade_resource_state(
        &self,
        req: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse;

    /// Refresh an instance from the backend.
    async fn read_resource(&self, req: ReadResourceRequest) -> ReadResourceResponse;

    /// Compute the planned state for a change.
    async fn plan_resource_change(
        &self,
        req: PlanResourceChangeRequest,
    ) -> PlanResourceChangeResponse;

    /// Carry out a planned change.
    async fn apply_resource_change(
        &self,
        req: ApplyResourceChangeRequest,
    ) -> ApplyResourceChangeResponse;

    /// Adopt an existing backend object.
    async fn import_resource_state(
        &self,
        req: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse;

    /// Translate state from another resource type into one of this provider's.
    async fn move_resource_state(&self, req: MoveResourceStateRequest)
    -> MoveResourceStateResponse;

    async fn read_data_source(&self, req: ReadDataSourceRequest) -> ReadDataSourceResponse;

    async fn plan_action(&self, req: PlanActionRequest) -> PlanActionResponse;

    async fn apply_action(&self, req: ApplyActionRequest) -> ApplyActionResponse;

    async fn call_function(&self, req: CallFunctionRequest) -> CallFunctionResponse;

    /// Ask in-flight work to cancel at its next safe point.
    ///
    /// Must not wait for the lock other operations hold.
    async fn stop(&self) -> Result<()>;

    /// Release everything the provider holds. Terminal.
    async fn close(&self) -> Result<()>;
}
