//! Rule catalog loading and validation.
//!
//! A catalog is structured data validated against JSON Schema, then checked
//! for semantic errors (duplicate ids, reserved ids, dependency cycles).
//! Loaded catalogs are immutable; a reload builds a new value.

mod parser;
mod schema;

pub use parser::{CatalogError, FormatRequirement, Rule, RuleCatalog, RESERVED_ID_PREFIXES};
pub use schema::validate_catalog_schema;
