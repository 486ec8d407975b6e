//! Stratum Core
//!
//! The value and schema model exchanged across the provider boundary.
//!
//! # Overview
//!
//! - [`Type`] / [`Value`]: a self-describing, strongly typed value tree with
//!   first-class null and unknown placeholders and exact decimal numbers
//! - [`Schema`] / [`Block`]: the declared shape of a provider, resource or
//!   data source, from which the full [`Type`] is derived
//! - [`transform()`]: the structural walk used by the default plan and apply
//!   policies
//! - Codecs: the legacy [`flatmap`] state encoding, the structured [`json`]
//!   state encoding and the [`wire`] form used for schema-checked transport
//! - [`Diagnostics`]: the append-only error/warning list every operation
//!   returns instead of failing
//!
//! ```text
//!   Schema ──implied_type()──▶ Type
//!     │                          │
//!     │ coerce_value()           │ conform() / transform()
//!     ▼                          ▼
//!   Value ◀──── flatmap / json / wire ────▶ bytes
//! ```

pub mod coerce;
pub mod conform;
pub mod diagnostics;
pub mod error;
pub mod flatmap;
pub mod json;
pub mod path;
pub mod schema;
pub mod transform;
pub mod types;
pub mod value;
pub mod wire;

// Re-exports
pub use conform::conform;
pub use diagnostics::{Category, Diagnostic, Diagnostics, Severity, SourcePos, SourceRange};
pub use error::{CoreError, Result};
pub use path::{Path, PathStep};
pub use schema::{Attribute, Block, NestedBlock, NestingMode, Schema};
pub use transform::transform;
pub use types::Type;
pub use value::Value;
pub use wire::DynamicValue;

/// Re-exported so callers can build numbers without naming the dependency.
pub use bigdecimal::BigDecimal;
