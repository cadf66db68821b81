//! Parameter schema resolution
//!
//! Decides which caller-supplied parameters reach the vendor for one request.
//! Sources are layered (schema defaults, legacy custom bucket, built-in
//! bucket, request overrides) and merged key by key; validation is separate
//! and runs before a configuration is persisted.

mod resolve;
mod schema;
mod validate;

pub use resolve::{OverrideLayers, OverrideSet, is_safe_custom_key, resolve_overrides, should_emit};
pub use schema::{ParameterSchemaEntry, ParameterType, lookup};
pub use validate::{ValidationIssue, ValidationReport, validate_overrides};
