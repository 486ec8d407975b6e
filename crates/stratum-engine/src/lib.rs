//! Stratum Engine
//!
//! Reconciles resource instances through a [`Provider`]: validates their
//! configuration, upgrades stored state, refreshes, plans and applies, and
//! reports what happened to each instance.
//!
//! ```no_run
//! use std::sync::Arc;
//! use stratum_engine::{Engine, InstanceAddress, InstanceChange};
//! use stratum_provider::{GetProviderSchemaResponse, MockProvider};
//! use stratum_core::Value;
//!
//! # async fn example() -> stratum_engine::Result<()> {
//! let config = stratum_config::load()?;
//! stratum_engine::logging::init_logging(&config)?;
//!
//! let provider = Arc::new(MockProvider::new(GetProviderSchemaResponse::new()));
//! let engine = Engine::new(provider, config)?;
//! engine.configure(Value::empty_map()).await;
//!
//! let report = engine
//!     .run(vec![InstanceChange::create(
//!         InstanceAddress::new("test_instance", "web"),
//!         Value::object([("ami", Value::from("ami-1"))]),
//!     )])
//!     .await;
//! println!("{}", report);
//! engine.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod engine;
pub mod error;
pub mod instance;
pub mod logging;
pub mod proposed;
pub mod report;

// Re-exports
pub use action::{ActionType, Plan, PlanSummary, PlannedChange};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use instance::{
    InstanceAddress, InstanceChange, InstanceOutcome, InstanceState, InstanceStatus, PriorState,
};
pub use report::RunReport;
pub use stratum_config::EngineConfig;
pub use stratum_provider::Provider;
