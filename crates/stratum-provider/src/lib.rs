//! Stratum Provider Protocol
//!
//! The contract between the reconciliation engine and a provider plugin,
//! plus the pieces every provider shares.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                stratum-engine                    │
//! │      Validate → Configure → Read → Plan → Apply  │
//! └─────────────────┬───────────────────────────────┘
//!                   │  trait Provider { ... }
//! ┌─────────────────▼───────────────────────────────┐
//! │               stratum-provider                   │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────┐ │
//! │  │  Lifecycle   │ │   Defaults   │ │ Upgrade  │ │
//! │  │    gate      │ │  plan/apply  │ │ pipeline │ │
//! │  └──────────────┘ └──────────────┘ └──────────┘ │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐ ┌───────────────┐
//! │ MockProvider  │ │ real provider │
//! └───────────────┘ └───────────────┘
//! ```

pub mod defaults;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod protocol;
pub mod provider;
pub mod upgrade;

// Re-exports
pub use error::{ProviderError, Result};
pub use lifecycle::{Lifecycle, Operation};
pub use mock::{CallLog, CallRecord, MockProvider, Responder};
pub use protocol::*;
pub use provider::Provider;
pub use upgrade::upgrade_state;
