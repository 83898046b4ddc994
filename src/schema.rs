//! Schema node model and its canonical JSON encoding.
//!
//! A [`SchemaNode`] is one typed unit of the schema description language:
//! a primitive, enum, object, array, record, discriminator or ref. Nodes are
//! plain data assembled by the builder functions in [`crate::builder`] and
//! consumed by the compiler and the application-definition builder.
//!
//! Nullability and optionality are node-level flags rather than wrapper
//! nodes, so `nullable(optional(string()))` is still a single node.
//!
//! The `Serialize` impl in this module is the canonical wire encoding that
//! independent implementations must reproduce byte-for-byte: one
//! discriminant key per kind, object properties in declaration order, flags
//! and metadata emitted only when set.

use serde::ser::{Serialize, SerializeMap, Serializer};

// =============================================================================
// Primitives
// =============================================================================

/// The closed set of primitive schema types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// UTF-8 string
    String,
    /// Boolean
    Boolean,
    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 8-bit integer
    Uint8,
    /// Unsigned 16-bit integer
    Uint16,
    /// Unsigned 32-bit integer
    Uint32,
    /// Unsigned 64-bit integer
    Uint64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// RFC3339 timestamp carried as a string
    Timestamp,
}

impl PrimitiveKind {
    /// Wire name of the primitive, used as the `"type"` discriminant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Timestamp => "timestamp",
        }
    }
}

// =============================================================================
// Node model
// =============================================================================

/// A named object field. Declaration order of fields is significant and
/// preserved through compilation and serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name as it appears on the wire.
    pub name: String,
    /// The field's schema. Its `optional` flag marks the field optional.
    pub node: SchemaNode,
}

/// The kind of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A primitive type.
    Primitive(PrimitiveKind),
    /// An ordered set of string literals.
    Enum(Vec<String>),
    /// An ordered mapping of field name to node.
    Object(Vec<FieldDef>),
    /// A homogeneous list.
    Array(Box<SchemaNode>),
    /// A string-keyed mapping of homogeneous values.
    Record(Box<SchemaNode>),
    /// A tagged union dispatching on one string field.
    Discriminator {
        /// Name of the tag field.
        tag: String,
        /// Tag value to object variant, in declaration order.
        variants: Vec<(String, SchemaNode)>,
    },
    /// A named pointer to a registry entry, used for reuse and recursion.
    Ref(String),
}

/// Advisory metadata attached to a node. Deprecation and description never
/// change validation behavior, only annotation in the IR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMetadata {
    /// Registry id. Required for recursive/reusable nodes.
    pub id: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
    /// Whether the node is deprecated.
    pub is_deprecated: bool,
}

impl NodeMetadata {
    /// True when no field is set, in which case the `"metadata"` key is
    /// omitted from the wire encoding.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.description.is_none() && !self.is_deprecated
    }
}

/// One typed unit of the schema description language.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// The node kind.
    pub kind: NodeKind,
    /// Whether `null` is accepted in place of a conforming value.
    pub nullable: bool,
    /// Whether absence is accepted when the node sits in field position.
    pub optional: bool,
    /// Advisory metadata.
    pub metadata: NodeMetadata,
}

impl SchemaNode {
    /// Create a node of the given kind with no flags and empty metadata.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            nullable: false,
            optional: false,
            metadata: NodeMetadata::default(),
        }
    }

    /// Attach a registry id, making the node named and reusable.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.id = Some(id.into());
        self
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// Mark the node deprecated.
    pub fn deprecated(mut self) -> Self {
        self.metadata.is_deprecated = true;
        self
    }

    /// The node's registry id, if any.
    pub fn id(&self) -> Option<&str> {
        self.metadata.id.as_deref()
    }

    /// Structural equality: kinds, flags and ids must match recursively;
    /// descriptions and deprecation markers are ignored. This is the
    /// comparison behind identical-redefinition dedup and collision
    /// detection.
    pub fn structurally_equal(&self, other: &SchemaNode) -> bool {
        if self.nullable != other.nullable
            || self.optional != other.optional
            || self.metadata.id != other.metadata.id
        {
            return false;
        }
        match (&self.kind, &other.kind) {
            (NodeKind::Primitive(a), NodeKind::Primitive(b)) => a == b,
            (NodeKind::Enum(a), NodeKind::Enum(b)) => a == b,
            (NodeKind::Object(a), NodeKind::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.name == y.name && x.node.structurally_equal(&y.node))
            }
            (NodeKind::Array(a), NodeKind::Array(b)) => a.structurally_equal(b),
            (NodeKind::Record(a), NodeKind::Record(b)) => a.structurally_equal(b),
            (
                NodeKind::Discriminator { tag: ta, variants: va },
                NodeKind::Discriminator { tag: tb, variants: vb },
            ) => {
                ta == tb
                    && va.len() == vb.len()
                    && va
                        .iter()
                        .zip(vb)
                        .all(|((xa, na), (xb, nb))| xa == xb && na.structurally_equal(nb))
            }
            (NodeKind::Ref(a), NodeKind::Ref(b)) => a == b,
            _ => false,
        }
    }
}

// =============================================================================
// Canonical wire encoding
// =============================================================================

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match &self.kind {
            NodeKind::Primitive(p) => {
                map.serialize_entry("type", p.type_name())?;
            }
            NodeKind::Enum(values) => {
                map.serialize_entry("enum", values)?;
            }
            NodeKind::Object(fields) => {
                map.serialize_entry(
                    "properties",
                    &FieldMap { fields, optional: false },
                )?;
                if fields.iter().any(|f| f.node.optional) {
                    map.serialize_entry(
                        "optionalProperties",
                        &FieldMap { fields, optional: true },
                    )?;
                }
            }
            NodeKind::Array(of) => {
                map.serialize_entry("elements", of)?;
            }
            NodeKind::Record(of) => {
                map.serialize_entry("values", of)?;
            }
            NodeKind::Discriminator { tag, variants } => {
                map.serialize_entry("discriminator", tag)?;
                map.serialize_entry("mapping", &VariantMap { variants })?;
            }
            NodeKind::Ref(id) => {
                map.serialize_entry("ref", id)?;
            }
        }
        if self.nullable {
            map.serialize_entry("nullable", &true)?;
        }
        if !self.metadata.is_empty() {
            map.serialize_entry("metadata", &MetadataRepr(&self.metadata))?;
        }
        map.end()
    }
}

/// Serializes one half of an object's field list (required or optional) as a
/// map in declaration order.
struct FieldMap<'a> {
    fields: &'a [FieldDef],
    optional: bool,
}

impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for field in self.fields.iter().filter(|f| f.node.optional == self.optional) {
            map.serialize_entry(&field.name, &field.node)?;
        }
        map.end()
    }
}

struct VariantMap<'a> {
    variants: &'a [(String, SchemaNode)],
}

impl Serialize for VariantMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (value, node) in self.variants {
            map.serialize_entry(value, node)?;
        }
        map.end()
    }
}

struct MetadataRepr<'a>(&'a NodeMetadata);

impl Serialize for MetadataRepr<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(id) = &self.0.id {
            map.serialize_entry("id", id)?;
        }
        if let Some(description) = &self.0.description {
            map.serialize_entry("description", description)?;
        }
        if self.0.is_deprecated {
            map.serialize_entry("isDeprecated", &true)?;
        }
        map.end()
    }
}
