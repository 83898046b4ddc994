//! Fluent construction surface for schema nodes.
//!
//! One factory per node kind, leaf-first: primitives, then compounds, then
//! discriminators and refs. Options attach through the `with_*` methods on
//! [`SchemaNode`]:
//!
//! ```rust
//! use rpc_schema::builder::*;
//!
//! let user = object([
//!     ("id", string()),
//!     ("name", string()),
//!     ("bio", optional(nullable(string()))),
//! ])
//! .with_id("User");
//! ```
//!
//! Recursion goes through [`SchemaBuilder::recursive`], which owns the
//! [`TypeRegistry`] the refs resolve against.

use tracing::trace;

use crate::error::SchemaBuildError;
use crate::registry::TypeRegistry;
use crate::schema::{FieldDef, NodeKind, PrimitiveKind, SchemaNode};

// =============================================================================
// Primitive factories
// =============================================================================

/// UTF-8 string schema.
pub fn string() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::String))
}

/// Boolean schema.
pub fn boolean() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Boolean))
}

/// Signed 8-bit integer schema.
pub fn int8() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Int8))
}

/// Signed 16-bit integer schema.
pub fn int16() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Int16))
}

/// Signed 32-bit integer schema.
pub fn int32() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Int32))
}

/// Signed 64-bit integer schema.
pub fn int64() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Int64))
}

/// Unsigned 8-bit integer schema.
pub fn uint8() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Uint8))
}

/// Unsigned 16-bit integer schema.
pub fn uint16() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Uint16))
}

/// Unsigned 32-bit integer schema.
pub fn uint32() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Uint32))
}

/// Unsigned 64-bit integer schema.
pub fn uint64() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Uint64))
}

/// 32-bit float schema.
pub fn float32() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Float32))
}

/// 64-bit float schema.
pub fn float64() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Float64))
}

/// RFC3339 timestamp schema.
pub fn timestamp() -> SchemaNode {
    SchemaNode::new(NodeKind::Primitive(PrimitiveKind::Timestamp))
}

// =============================================================================
// Compound factories
// =============================================================================

/// Ordered set of string literals.
pub fn enum_of<I, S>(values: I) -> SchemaNode
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    SchemaNode::new(NodeKind::Enum(values.into_iter().map(Into::into).collect()))
}

/// Ordered mapping of field name to schema. Field declaration order is
/// preserved everywhere downstream. Duplicate field names are rejected at
/// compile time, not here, so declarations stay infallible.
pub fn object<I, S>(fields: I) -> SchemaNode
where
    I: IntoIterator<Item = (S, SchemaNode)>,
    S: Into<String>,
{
    SchemaNode::new(NodeKind::Object(
        fields
            .into_iter()
            .map(|(name, node)| FieldDef { name: name.into(), node })
            .collect(),
    ))
}

/// Homogeneous list of `of`.
pub fn array(of: SchemaNode) -> SchemaNode {
    SchemaNode::new(NodeKind::Array(Box::new(of)))
}

/// String-keyed mapping of homogeneous `of` values.
pub fn record(of: SchemaNode) -> SchemaNode {
    SchemaNode::new(NodeKind::Record(Box::new(of)))
}

/// Tagged union dispatching on the string field `tag`.
///
/// Fails when a variant is not an object, redeclares the tag field, or when
/// two variants share a tag value.
pub fn discriminator<I, S>(tag: impl Into<String>, variants: I) -> Result<SchemaNode, SchemaBuildError>
where
    I: IntoIterator<Item = (S, SchemaNode)>,
    S: Into<String>,
{
    let tag = tag.into();
    let variants: Vec<(String, SchemaNode)> = variants
        .into_iter()
        .map(|(value, node)| (value.into(), node))
        .collect();

    for (value, node) in &variants {
        let NodeKind::Object(fields) = &node.kind else {
            return Err(SchemaBuildError::NonObjectVariant { value: value.clone() });
        };
        if fields.iter().any(|f| f.name == tag) {
            return Err(SchemaBuildError::TagFieldRedeclared {
                value: value.clone(),
                tag,
            });
        }
    }
    for (i, (value, _)) in variants.iter().enumerate() {
        if variants[..i].iter().any(|(seen, _)| seen == value) {
            return Err(SchemaBuildError::DuplicateTagValue { value: value.clone() });
        }
    }

    Ok(SchemaNode::new(NodeKind::Discriminator { tag, variants }))
}

/// Named pointer to a registry entry.
pub fn ref_node(id: impl Into<String>) -> SchemaNode {
    SchemaNode::new(NodeKind::Ref(id.into()))
}

// =============================================================================
// Modifiers
// =============================================================================

/// Accept `null` in place of a conforming value.
pub fn nullable(mut node: SchemaNode) -> SchemaNode {
    node.nullable = true;
    node
}

/// Accept absence when the node sits in field position. Explicit `null` is
/// still rejected unless the node is also nullable.
pub fn optional(mut node: SchemaNode) -> SchemaNode {
    node.optional = true;
    node
}

/// Derive a new object with every top-level field forced optional.
///
/// For a discriminator of objects, every variant is made partial; the tag
/// field stays required since dispatch depends on it. The derived node (and
/// derived variants) carry no id; attach a fresh one with
/// [`SchemaNode::with_id`].
pub fn partial(node: SchemaNode) -> Result<SchemaNode, SchemaBuildError> {
    match node.kind {
        NodeKind::Object(fields) => {
            let fields = fields
                .into_iter()
                .map(|f| FieldDef {
                    name: f.name,
                    node: optional(f.node),
                })
                .collect();
            Ok(SchemaNode {
                kind: NodeKind::Object(fields),
                nullable: node.nullable,
                optional: node.optional,
                metadata: Default::default(),
            })
        }
        NodeKind::Discriminator { tag, variants } => {
            let variants = variants
                .into_iter()
                .map(|(value, variant)| partial(variant).map(|v| (value, v)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SchemaNode {
                kind: NodeKind::Discriminator { tag, variants },
                nullable: node.nullable,
                optional: node.optional,
                metadata: Default::default(),
            })
        }
        _ => Err(SchemaBuildError::InvalidPartialTarget),
    }
}

// =============================================================================
// Builder with registry
// =============================================================================

/// Construction context owning the [`TypeRegistry`] refs resolve against.
///
/// The registry is explicit so independent application definitions can
/// coexist; hand it (by reference) to [`crate::compiler::CompiledSchema::compile`]
/// and [`crate::appdef::AppDefinitionBuilder`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    registry: TypeRegistry,
}

impl SchemaBuilder {
    /// Create a builder with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry built so far.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Consume the builder, keeping the registry.
    pub fn into_registry(self) -> TypeRegistry {
        self.registry
    }

    /// Register a named, possibly self-referential schema.
    ///
    /// A `Ref(id)` placeholder is registered immediately, then `resolver` is
    /// invoked with a handle to it so the returned body may embed
    /// self-references. The body is stored as the registry entry for `id`
    /// and the handle is returned for use in other schemas.
    ///
    /// Resolution is deferred exactly one level: a body that is itself a
    /// bare ref back to `id` carries no structure and is rejected.
    pub fn recursive<F>(&mut self, id: &str, resolver: F) -> Result<SchemaNode, SchemaBuildError>
    where
        F: FnOnce(SchemaNode) -> SchemaNode,
    {
        self.registry.declare(id)?;
        trace!(id, "resolving recursive schema");

        let handle = ref_node(id);
        let body = resolver(handle.clone());

        if matches!(&body.kind, NodeKind::Ref(target) if target == id) {
            return Err(SchemaBuildError::UnterminatedRecursion { id: id.to_string() });
        }

        let body = match body.id() {
            None => body.with_id(id),
            Some(declared) if declared == id => body,
            Some(_) => {
                return Err(SchemaBuildError::IdCollision { id: id.to_string() });
            }
        };

        self.registry.register(id, body)?;
        Ok(handle)
    }
}
