//! Schema and block definitions
//!
//! A [`Schema`] describes the configuration and state shape of a provider,
//! resource type or data source. It is produced once by the provider when
//! its schema is requested and treated as immutable afterwards.

use crate::error::{CoreError, Result};
use crate::path::{Path, PathStep};
use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A versioned top-level block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema version, compared against the version stored with state
    pub version: i64,

    /// Root block
    pub block: Block,
}

impl Schema {
    pub fn new(block: Block) -> Self {
        Self { version: 0, block }
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn implied_type(&self) -> Type {
        self.block.implied_type()
    }
}

/// A single attribute declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value type
    #[serde(rename = "type")]
    pub ty: Type,

    /// Must be set in configuration
    #[serde(default)]
    pub required: bool,

    /// May be set in configuration
    #[serde(default)]
    pub optional: bool,

    /// Set by the provider when left unset (or always, when not optional)
    #[serde(default)]
    pub computed: bool,

    /// Hide the value in user-facing output
    #[serde(default)]
    pub sensitive: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Attribute {
    fn with_flags(ty: Type, required: bool, optional: bool, computed: bool) -> Self {
        Self {
            ty,
            required,
            optional,
            computed,
            sensitive: false,
            description: None,
        }
    }

    pub fn required(ty: Type) -> Self {
        Self::with_flags(ty, true, false, false)
    }

    pub fn optional(ty: Type) -> Self {
        Self::with_flags(ty, false, true, false)
    }

    /// Computed-only: never set in configuration
    pub fn computed(ty: Type) -> Self {
        Self::with_flags(ty, false, false, true)
    }

    pub fn optional_computed(ty: Type) -> Self {
        Self::with_flags(ty, false, true, true)
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// How a nested block repeats inside its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestingMode {
    Single,
    List,
    Set,
    Map,
}

impl std::fmt::Display for NestingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NestingMode::Single => write!(f, "single"),
            NestingMode::List => write!(f, "list"),
            NestingMode::Set => write!(f, "set"),
            NestingMode::Map => write!(f, "map"),
        }
    }
}

/// A nested block declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    pub nesting: NestingMode,
    pub block: Block,
    #[serde(default)]
    pub min_items: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl NestedBlock {
    pub fn new(nesting: NestingMode, block: Block) -> Self {
        Self {
            nesting,
            block,
            min_items: 0,
            max_items: None,
        }
    }

    pub fn with_items(mut self, min_items: usize, max_items: Option<usize>) -> Self {
        self.min_items = min_items;
        self.max_items = max_items;
        self
    }

    pub fn implied_type(&self) -> Type {
        let inner = self.block.implied_type();
        match self.nesting {
            NestingMode::Single => inner,
            NestingMode::List => Type::list(inner),
            NestingMode::Set => Type::set(inner),
            NestingMode::Map => Type::map(inner),
        }
    }
}

/// Attributes plus nested blocks, both ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,

    #[serde(default)]
    pub block_types: BTreeMap<String, NestedBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block_types.insert(name.into(), block);
        self
    }

    /// The object type every value of this block must conform to.
    pub fn implied_type(&self) -> Type {
        let mut attrs: BTreeMap<String, Type> = self
            .attributes
            .iter()
            .map(|(name, attr)| (name.clone(), attr.ty.clone()))
            .collect();
        for (name, nested) in &self.block_types {
            attrs.insert(name.clone(), nested.implied_type());
        }
        Type::Object(attrs)
    }

    /// Resolve the attribute a path ends on.
    ///
    /// Attribute steps descend through nested blocks; index, key and element
    /// steps are skipped. Returns `None` for paths that end on a block, a
    /// container element, or anything undeclared.
    pub fn attribute_by_path(&self, path: &Path) -> Option<&Attribute> {
        let mut block = self;
        let steps = path.steps();
        for (i, step) in steps.iter().enumerate() {
            let PathStep::Attr(name) = step else {
                continue;
            };
            if let Some(attr) = block.attributes.get(name) {
                return (i == steps.len() - 1).then_some(attr);
            }
            match block.block_types.get(name) {
                Some(nested) => block = &nested.block,
                None => return None,
            }
        }
        None
    }

    /// Check the structural invariants of the schema.
    ///
    /// Every attribute must be exactly one of required, optional,
    /// computed-only or optional+computed; names may not be shared between an
    /// attribute and a nested block; nested block item bounds must be
    /// coherent.
    pub fn validate(&self) -> Result<()> {
        self.validate_at("")
    }

    fn validate_at(&self, prefix: &str) -> Result<()> {
        for (name, attr) in &self.attributes {
            if name.is_empty() {
                return Err(CoreError::InvalidSchema(format!(
                    "{prefix}: attribute name must not be empty"
                )));
            }
            let legal = matches!(
                (attr.required, attr.optional, attr.computed),
                (true, false, false) | (false, true, false) | (false, false, true) | (false, true, true)
            );
            if !legal {
                return Err(CoreError::InvalidSchema(format!(
                    "{prefix}{name}: attribute must be exactly one of required, optional, computed, or optional+computed"
                )));
            }
            if self.block_types.contains_key(name) {
                return Err(CoreError::InvalidSchema(format!(
                    "{prefix}{name}: name used for both an attribute and a block"
                )));
            }
        }
        for (name, nested) in &self.block_types {
            if let Some(max) = nested.max_items {
                if nested.min_items > max {
                    return Err(CoreError::InvalidSchema(format!(
                        "{prefix}{name}: min_items {} exceeds max_items {}",
                        nested.min_items, max
                    )));
                }
            }
            if nested.nesting == NestingMode::Single
                && (nested.min_items > 1 || nested.max_items.is_some_and(|m| m > 1))
            {
                return Err(CoreError::InvalidSchema(format!(
                    "{prefix}{name}: single blocks hold at most one item"
                )));
            }
            nested.block.validate_at(&format!("{prefix}{name}."))?;
        }
        Ok(())
    }
}
