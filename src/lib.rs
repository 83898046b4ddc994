//! Schema node model, runtime validators and a canonical application
//! definition IR for multi-language RPC code generation.
//!
//! # Overview
//!
//! Schemas are plain [`schema::SchemaNode`] trees built with the fluent
//! constructors in [`builder`]. A tree compiles into a
//! [`compiler::CompiledSchema`] exposing four pure operations: `validate`,
//! `parse`, `serialize` and `mock`. Named schemas live in a
//! [`registry::TypeRegistry`] so recursive and shared types resolve by id.
//! [`appdef::AppDefinitionBuilder`] assembles procedures and definitions
//! into an [`appdef::AppDefinition`], whose canonical JSON form is stable
//! across independent implementations.
//!
//! # Quick start
//!
//! ```rust
//! use rpc_schema::builder::*;
//! use rpc_schema::compiler::CompiledSchema;
//! use rpc_schema::registry::TypeRegistry;
//!
//! let user = object([
//!     ("id", string()),
//!     ("name", string()),
//!     ("age", optional(uint8())),
//! ]);
//! let compiled = CompiledSchema::compile(&user, &TypeRegistry::new()).unwrap();
//!
//! let outcome = compiled.validate(&serde_json::json!({ "id": "1", "name": "a" }));
//! assert!(outcome.is_valid());
//! ```

pub mod appdef;
pub mod builder;
pub mod compiler;
pub mod error;
pub mod registry;
pub mod schema;

pub use appdef::{
    procedure, AppDefinition, AppDefinitionBuilder, HttpMethod, ProcedureDefinition,
    ProcedureValidators, TransportKind,
};
pub use builder::SchemaBuilder;
pub use compiler::{CompiledSchema, ValidationIssue, ValidationOutcome};
pub use error::{
    AppDefError, DefinitionConflictError, ErrorPayload, ParseFailure, SchemaBuildError,
    SerializeError,
};
pub use registry::TypeRegistry;
pub use schema::{FieldDef, NodeKind, NodeMetadata, PrimitiveKind, SchemaNode};

#[cfg(test)]
mod tests;
