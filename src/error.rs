//! Error types for schema construction, compilation and runtime decoding.
//!
//! Construction-time errors ([`SchemaBuildError`], [`DefinitionConflictError`])
//! are fatal at startup and abort the build immediately. Runtime decode
//! failures ([`ParseFailure`]) are always returned as values, never raised
//! past the call boundary, and map onto the client-facing [`ErrorPayload`].

use serde::Serialize;
use thiserror::Error;

use crate::compiler::ValidationOutcome;

/// Error raised while constructing schema nodes or registering them.
///
/// All variants are programming errors in the schema declarations and are
/// unrecoverable at runtime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaBuildError {
    /// Two structurally different definitions share one id.
    #[error("schema id '{id}' is already registered with a different definition")]
    IdCollision {
        /// The contested id.
        id: String,
    },

    /// A discriminator declares the same tag value twice.
    #[error("discriminator tag value '{value}' declared more than once")]
    DuplicateTagValue {
        /// The repeated tag value.
        value: String,
    },

    /// A discriminator variant declares a field with the tag's name.
    #[error("discriminator variant '{value}' redeclares the tag field '{tag}'")]
    TagFieldRedeclared {
        /// The offending variant's tag value.
        value: String,
        /// The tag field name.
        tag: String,
    },

    /// A discriminator variant is not an object.
    #[error("discriminator variant '{value}' must be an object")]
    NonObjectVariant {
        /// The offending variant's tag value.
        value: String,
    },

    /// `partial` applied to a node that is neither an object nor a
    /// discriminator of objects.
    #[error("partial requires an object or a discriminator of objects")]
    InvalidPartialTarget,

    /// An object declares the same field name twice.
    #[error("object field '{name}' declared more than once")]
    DuplicateField {
        /// The repeated field name.
        name: String,
    },

    /// A ref points at an id with no registry entry.
    #[error("ref '{id}' does not resolve to a registered schema")]
    UnresolvedRef {
        /// The dangling id.
        id: String,
    },

    /// A recursive resolver produced no structure, only a ref back to the
    /// id being resolved.
    #[error("recursive schema '{id}' resolves to itself without intervening structure")]
    UnterminatedRecursion {
        /// The id being resolved.
        id: String,
    },

    /// A recursive registration was attempted for an id already mid-resolution.
    #[error("schema id '{id}' is already being resolved")]
    AlreadyResolving {
        /// The in-flight id.
        id: String,
    },

    /// A procedure name failed the dot-namespaced format rules.
    #[error("invalid procedure name '{name}': {reason}")]
    InvalidProcedureName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two procedures registered under one name.
    #[error("procedure '{name}' registered more than once")]
    DuplicateProcedure {
        /// The repeated procedure name.
        name: String,
    },
}

/// Two procedures disagree on the definition behind a shared schema id.
///
/// Raised while building the application definition; fatal at startup. Both
/// procedures are named so the conflict can be traced to its declarations.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "schema id '{id}' has conflicting definitions: first declared by '{first_procedure}', \
     redeclared differently by '{second_procedure}'"
)]
pub struct DefinitionConflictError {
    /// The contested schema id.
    pub id: String,
    /// Procedure that registered the id first.
    pub first_procedure: String,
    /// Procedure whose tree carried the conflicting definition.
    pub second_procedure: String,
}

/// Error raised while building an application definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppDefError {
    /// A schema-level construction error surfaced during the build walk.
    #[error(transparent)]
    Schema(#[from] SchemaBuildError),

    /// Two procedures disagree on a shared schema id.
    #[error(transparent)]
    Conflict(#[from] DefinitionConflictError),
}

/// Failure while decoding text into a validated value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFailure {
    /// The input is not well-formed JSON at all.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// The input decoded but does not match the schema. Carries the same
    /// path-qualified diagnostics `validate` produces.
    #[error("input does not match schema ({} issue(s))", .0.errors.len())]
    Invalid(ValidationOutcome),
}

/// Failure while canonically serializing a value that does not conform to
/// the schema. Never produced for values `validate` accepted.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("value does not conform to schema at '{path}': expected {expected}")]
pub struct SerializeError {
    /// Path to the nonconforming position.
    pub path: String,
    /// What the schema expected there.
    pub expected: String,
}

// =============================================================================
// Client-facing payload
// =============================================================================

/// Wire-serializable error payload handed to the transport layer.
///
/// The transport decides the user-visible status mapping; this type only
/// fixes the payload shape: `{ code, message, data?, stack? }`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    /// Numeric error code, HTTP-status-like.
    pub code: u16,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Optional stack of context lines for debugging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
}

impl ErrorPayload {
    /// Create a payload with the given code and message.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            stack: None,
        }
    }

    /// Attach structured details.
    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    /// Attach a stack of context lines.
    pub fn with_stack(mut self, stack: Vec<String>) -> Self {
        self.stack = Some(stack);
        self
    }

    /// 400 payload for malformed or nonconforming client input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// 404 payload for an unknown procedure or resource.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// 500 payload for unexpected server-side failures.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }
}

impl From<ParseFailure> for ErrorPayload {
    fn from(failure: ParseFailure) -> Self {
        match failure {
            ParseFailure::Malformed(detail) => {
                Self::bad_request("invalid input: expected well-formed JSON").with_data(detail)
            }
            ParseFailure::Invalid(outcome) => {
                Self::bad_request("input does not match the expected schema")
                    .with_data(&outcome.errors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ValidationIssue;
    use serde_json::json;

    #[test]
    fn test_payload_shape() {
        let payload = ErrorPayload::bad_request("nope")
            .with_data(json!({"field": "id"}))
            .with_stack(vec!["handler".into()]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "code": 400,
                "message": "nope",
                "data": {"field": "id"},
                "stack": ["handler"],
            })
        );
    }

    #[test]
    fn test_payload_omits_unset_fields() {
        let value = serde_json::to_value(ErrorPayload::internal("boom")).unwrap();
        assert_eq!(value, json!({"code": 500, "message": "boom"}));
    }

    #[test]
    fn test_parse_failure_maps_to_bad_request() {
        let outcome = ValidationOutcome::from_errors(vec![ValidationIssue::new("id", "string")]);
        let payload = ErrorPayload::from(ParseFailure::Invalid(outcome));
        assert_eq!(payload.code, 400);
        assert_eq!(payload.data.unwrap()[0]["path"], "id");
    }
}
