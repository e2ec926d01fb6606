//! Schema model
//!
//! Attribute and block types describing resources and data sources, plus
//! the generic operations every type shares:
//!
//! - [`types`] - Attribute kinds, blocks and the provider schema
//! - [`validate`] - Configuration validation
//! - [`diff`] - Schema-aware comparison and plan computation
//! - [`sentinel`] - The `-1` encoding of nullable integers

pub mod diff;
pub mod sentinel;
pub mod types;
pub mod validate;

pub use diff::{json_equivalent, plan, values_equal, AttributeChange, Plan};
pub use types::{Attribute, Block, ProviderSchema, TypeSchema, ValueKind};
pub use validate::validate;
