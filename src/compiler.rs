//! Node compiler: validate, parse, serialize and mock for a schema tree.
//!
//! [`CompiledSchema::compile`] flattens a node tree (and every registry
//! entry it references) into an arena of compiled nodes. Ref targets get a
//! stub slot reserved and memoized *before* their bodies are lowered, so
//! recursive and mutually-referential schemas compile in a single pass over
//! the declaration graph without re-entering an in-progress id.
//!
//! The compiled operations are pure functions over immutable state: no
//! interior mutability, no I/O, safe to call from any number of threads.
//!
//! Validation walks the schema and the value in lock-step and accumulates
//! path-qualified issues (`items[2].name`). Serialization emits the
//! canonical encoding: object keys in declaration order regardless of input
//! order, discriminator tag first, undeclared fields dropped.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat};
use rand::Rng;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ParseFailure, SchemaBuildError, SerializeError};
use crate::registry::TypeRegistry;
use crate::schema::{FieldDef, NodeKind, PrimitiveKind, SchemaNode};

/// Index of a node in the compiled arena.
type NodeIx = usize;

/// Largest integer a JSON double can represent exactly.
const MAX_SAFE_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Depth at which `mock` stops descending into nullable/optional branches.
const MOCK_MAX_DEPTH: usize = 6;

/// Unconditional recursion cut-off for `mock`. A schema whose only escape
/// hatches are required and non-nullable admits no finite value; past this
/// depth `mock` emits `null` instead of recursing further.
const MOCK_DEPTH_HARD_LIMIT: usize = 64;

// =============================================================================
// Diagnostics
// =============================================================================

/// One path-qualified validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted path with bracketed indices, e.g. `items[2].name`. Empty for
    /// the root value.
    pub path: String,
    /// What the schema expected at that position.
    #[serde(rename = "expectedType")]
    pub expected: String,
}

impl ValidationIssue {
    /// Create an issue at `path` expecting `expected`.
    pub fn new(path: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
        }
    }
}

/// Result of validating a value against a compiled schema.
///
/// Returned as a value, never raised: `validate` is total and cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    /// Whether the value conforms.
    pub valid: bool,
    /// Diagnostics, empty when valid.
    pub errors: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    /// A passing outcome.
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Build an outcome from accumulated issues; valid iff none.
    pub fn from_errors(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Whether the value conformed.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

// =============================================================================
// Compiled representation
// =============================================================================

#[derive(Debug, Clone)]
struct CompiledField {
    name: String,
    ix: NodeIx,
    optional: bool,
}

#[derive(Debug, Clone)]
enum CompiledKind {
    Primitive(PrimitiveKind),
    Enum(Vec<String>),
    Object(Vec<CompiledField>),
    Array(NodeIx),
    Record(NodeIx),
    Discriminator {
        tag: String,
        variants: Vec<(String, NodeIx)>,
    },
    /// Indirection kept only when a ref occurrence carries its own
    /// nullability; otherwise refs lower straight to their target index.
    Ref(NodeIx),
}

#[derive(Debug, Clone)]
struct CompiledNode {
    kind: CompiledKind,
    nullable: bool,
}

/// A schema compiled for runtime use.
///
/// Immutable after construction; `validate`, `parse`, `serialize` and
/// `mock` may run concurrently from any number of threads.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    nodes: Vec<CompiledNode>,
    root: NodeIx,
}

impl CompiledSchema {
    /// Compile `node`, resolving refs through `registry`.
    ///
    /// Fails on dangling refs, pure ref cycles, duplicate object fields and
    /// malformed discriminators.
    pub fn compile(node: &SchemaNode, registry: &TypeRegistry) -> Result<Self, SchemaBuildError> {
        let mut lowering = Lowering {
            nodes: Vec::new(),
            by_id: HashMap::new(),
            sources: HashMap::new(),
            registry,
        };
        let root = lowering.lower(node)?;
        debug!(nodes = lowering.nodes.len(), "schema compiled");
        Ok(Self {
            nodes: lowering.nodes,
            root,
        })
    }

    // -------------------------------------------------------------------------
    // validate
    // -------------------------------------------------------------------------

    /// Check `value` against the schema. Pure and total: never panics,
    /// always returns an outcome with path-qualified diagnostics on failure.
    pub fn validate(&self, value: &Value) -> ValidationOutcome {
        let mut errors = Vec::new();
        self.check(self.root, value, "", &mut errors);
        ValidationOutcome::from_errors(errors)
    }

    fn check(&self, ix: NodeIx, value: &Value, path: &str, errors: &mut Vec<ValidationIssue>) {
        let node = &self.nodes[ix];
        if value.is_null() {
            if !node.nullable {
                errors.push(ValidationIssue::new(path, self.expected_name(ix)));
            }
            return;
        }
        match &node.kind {
            CompiledKind::Ref(target) => self.check(*target, value, path, errors),
            CompiledKind::Primitive(p) => {
                if !primitive_matches(*p, value) {
                    errors.push(ValidationIssue::new(path, p.type_name()));
                }
            }
            CompiledKind::Enum(values) => {
                let matched = value
                    .as_str()
                    .is_some_and(|s| values.iter().any(|v| v == s));
                if !matched {
                    errors.push(ValidationIssue::new(
                        path,
                        format!("enum [{}]", values.join(", ")),
                    ));
                }
            }
            CompiledKind::Object(fields) => match value.as_object() {
                Some(obj) => self.check_fields(fields, obj, path, errors),
                None => errors.push(ValidationIssue::new(path, "object")),
            },
            CompiledKind::Array(element) => match value.as_array() {
                Some(items) => {
                    for (i, item) in items.iter().enumerate() {
                        self.check(*element, item, &format!("{path}[{i}]"), errors);
                    }
                }
                None => errors.push(ValidationIssue::new(path, "array")),
            },
            CompiledKind::Record(element) => match value.as_object() {
                Some(entries) => {
                    for (key, entry) in entries {
                        self.check(*element, entry, &join_path(path, key), errors);
                    }
                }
                None => errors.push(ValidationIssue::new(path, "record")),
            },
            CompiledKind::Discriminator { tag, variants } => {
                let Some(obj) = value.as_object() else {
                    errors.push(ValidationIssue::new(path, "object"));
                    return;
                };
                // Tag first; fail fast before touching variant fields.
                let Some(tag_value) = obj.get(tag).and_then(Value::as_str) else {
                    errors.push(ValidationIssue::new(
                        join_path(path, tag),
                        format!("discriminator tag '{tag}'"),
                    ));
                    return;
                };
                let Some((_, variant_ix)) = variants.iter().find(|(v, _)| v == tag_value) else {
                    errors.push(ValidationIssue::new(
                        join_path(path, tag),
                        "unknown discriminator value",
                    ));
                    return;
                };
                if let CompiledKind::Object(fields) = &self.nodes[*variant_ix].kind {
                    self.check_fields(fields, obj, path, errors);
                }
            }
        }
    }

    fn check_fields(
        &self,
        fields: &[CompiledField],
        obj: &Map<String, Value>,
        path: &str,
        errors: &mut Vec<ValidationIssue>,
    ) {
        // Unknown fields are ignored, uniformly.
        for field in fields {
            let child_path = join_path(path, &field.name);
            match obj.get(&field.name) {
                Some(v) => self.check(field.ix, v, &child_path, errors),
                None => {
                    if !field.optional {
                        errors.push(ValidationIssue::new(
                            child_path,
                            self.expected_name(field.ix),
                        ));
                    }
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // parse
    // -------------------------------------------------------------------------

    /// Decode UTF-8 JSON text into a validated value.
    ///
    /// Distinguishes text that is not JSON at all
    /// ([`ParseFailure::Malformed`]) from well-formed JSON that does not
    /// match the schema ([`ParseFailure::Invalid`], carrying the same
    /// diagnostics `validate` produces). Timestamp strings are checked as
    /// RFC3339 but kept in their original lexical form, so fractional
    /// seconds round-trip verbatim.
    pub fn parse(&self, text: &str) -> Result<Value, ParseFailure> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ParseFailure::Malformed(e.to_string()))?;
        let outcome = self.validate(&value);
        if outcome.is_valid() {
            Ok(value)
        } else {
            Err(ParseFailure::Invalid(outcome))
        }
    }

    // -------------------------------------------------------------------------
    // serialize
    // -------------------------------------------------------------------------

    /// Canonically encode `value` as JSON text.
    ///
    /// Object keys are emitted in field declaration order regardless of the
    /// input's order, discriminator tags come first, and fields the schema
    /// does not declare are dropped. Never fails for a value `validate`
    /// accepted. The canonical value is rebuilt as a declaration-ordered
    /// `serde_json::Map` and rendered by serde_json, so escaping and number
    /// formatting are the library's, not this crate's.
    pub fn serialize(&self, value: &Value) -> Result<String, SerializeError> {
        let canonical = self.canonicalize(self.root, value, "")?;
        Ok(canonical.to_string())
    }

    fn canonicalize(&self, ix: NodeIx, value: &Value, path: &str) -> Result<Value, SerializeError> {
        let node = &self.nodes[ix];
        if value.is_null() {
            if node.nullable {
                return Ok(Value::Null);
            }
            return Err(self.nonconforming(ix, path));
        }
        match &node.kind {
            CompiledKind::Ref(target) => self.canonicalize(*target, value, path),
            CompiledKind::Primitive(p) => {
                if !primitive_matches(*p, value) {
                    return Err(self.nonconforming(ix, path));
                }
                Ok(value.clone())
            }
            CompiledKind::Enum(values) => match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => Ok(value.clone()),
                _ => Err(self.nonconforming(ix, path)),
            },
            CompiledKind::Object(fields) => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| self.nonconforming(ix, path))?;
                let mut map = Map::new();
                self.canonical_fields(fields, obj, path, &mut map)?;
                Ok(Value::Object(map))
            }
            CompiledKind::Array(element) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| self.nonconforming(ix, path))?;
                let canonical = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.canonicalize(*element, item, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(canonical))
            }
            CompiledKind::Record(element) => {
                let entries = value
                    .as_object()
                    .ok_or_else(|| self.nonconforming(ix, path))?;
                // Records have no declared order; input key order is kept.
                let mut map = Map::new();
                for (key, entry) in entries {
                    map.insert(
                        key.clone(),
                        self.canonicalize(*element, entry, &join_path(path, key))?,
                    );
                }
                Ok(Value::Object(map))
            }
            CompiledKind::Discriminator { tag, variants } => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| self.nonconforming(ix, path))?;
                let tag_value = obj.get(tag).and_then(Value::as_str).ok_or_else(|| {
                    SerializeError {
                        path: join_path(path, tag),
                        expected: format!("discriminator tag '{tag}'"),
                    }
                })?;
                let (_, variant_ix) = variants
                    .iter()
                    .find(|(v, _)| v == tag_value)
                    .ok_or_else(|| SerializeError {
                        path: join_path(path, tag),
                        expected: "unknown discriminator value".to_string(),
                    })?;
                let mut map = Map::new();
                map.insert(tag.clone(), Value::String(tag_value.to_string()));
                if let CompiledKind::Object(fields) = &self.nodes[*variant_ix].kind {
                    self.canonical_fields(fields, obj, path, &mut map)?;
                }
                Ok(Value::Object(map))
            }
        }
    }

    /// Collect declared fields in declaration order, skipping absent
    /// optional fields and dropping anything the schema does not declare.
    fn canonical_fields(
        &self,
        fields: &[CompiledField],
        obj: &Map<String, Value>,
        path: &str,
        out: &mut Map<String, Value>,
    ) -> Result<(), SerializeError> {
        for field in fields {
            let child_path = join_path(path, &field.name);
            match obj.get(&field.name) {
                None if field.optional => continue,
                None => {
                    return Err(SerializeError {
                        path: child_path,
                        expected: self.expected_name(field.ix),
                    });
                }
                Some(v) => {
                    out.insert(
                        field.name.clone(),
                        self.canonicalize(field.ix, v, &child_path)?,
                    );
                }
            }
        }
        Ok(())
    }

    fn nonconforming(&self, ix: NodeIx, path: &str) -> SerializeError {
        SerializeError {
            path: path.to_string(),
            expected: self.expected_name(ix),
        }
    }

    // -------------------------------------------------------------------------
    // mock
    // -------------------------------------------------------------------------

    /// Produce a structurally valid example value.
    ///
    /// Required fields are always present, enum values come from the
    /// declared set and discriminator tags from the declared mapping. Past
    /// [`MOCK_MAX_DEPTH`] nullable nodes yield `null` and optional fields
    /// are omitted, so recursive schemas produce finite samples. A schema
    /// that admits no finite value at all (required, non-nullable
    /// self-reference) is cut off with `null` at
    /// [`MOCK_DEPTH_HARD_LIMIT`]; the output then cannot validate, but the
    /// call still terminates.
    pub fn mock<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        self.mock_at(self.root, rng, 0)
    }

    fn mock_at<R: Rng + ?Sized>(&self, ix: NodeIx, rng: &mut R, depth: usize) -> Value {
        let node = &self.nodes[ix];
        if depth >= MOCK_DEPTH_HARD_LIMIT {
            return Value::Null;
        }
        if depth >= MOCK_MAX_DEPTH && node.nullable {
            return Value::Null;
        }
        match &node.kind {
            CompiledKind::Ref(target) => self.mock_at(*target, rng, depth + 1),
            CompiledKind::Primitive(p) => mock_primitive(*p, rng),
            CompiledKind::Enum(values) => match values.first() {
                Some(_) => Value::String(values[rng.gen_range(0..values.len())].clone()),
                None => Value::String(String::new()),
            },
            CompiledKind::Object(fields) => {
                Value::Object(self.mock_fields(fields, rng, depth))
            }
            CompiledKind::Array(element) => {
                let len = if depth >= MOCK_MAX_DEPTH { 0 } else { rng.gen_range(0..=2) };
                Value::Array(
                    (0..len)
                        .map(|_| self.mock_at(*element, rng, depth + 1))
                        .collect(),
                )
            }
            CompiledKind::Record(element) => {
                let len = if depth >= MOCK_MAX_DEPTH { 0 } else { rng.gen_range(0..=2) };
                let mut map = Map::new();
                for i in 0..len {
                    map.insert(format!("key{i}"), self.mock_at(*element, rng, depth + 1));
                }
                Value::Object(map)
            }
            CompiledKind::Discriminator { tag, variants } => {
                if variants.is_empty() {
                    return Value::Object(Map::new());
                }
                let pick = if depth >= MOCK_MAX_DEPTH { 0 } else { rng.gen_range(0..variants.len()) };
                let (value, variant_ix) = &variants[pick];
                let mut map = Map::new();
                map.insert(tag.clone(), Value::String(value.clone()));
                if let CompiledKind::Object(fields) = &self.nodes[*variant_ix].kind {
                    map.extend(self.mock_fields(fields, rng, depth));
                }
                Value::Object(map)
            }
        }
    }

    fn mock_fields<R: Rng + ?Sized>(
        &self,
        fields: &[CompiledField],
        rng: &mut R,
        depth: usize,
    ) -> Map<String, Value> {
        let mut map = Map::new();
        for field in fields {
            if field.optional && (depth >= MOCK_MAX_DEPTH || rng.gen_bool(0.5)) {
                continue;
            }
            map.insert(field.name.clone(), self.mock_at(field.ix, rng, depth + 1));
        }
        map
    }

    // -------------------------------------------------------------------------
    // shared
    // -------------------------------------------------------------------------

    fn expected_name(&self, ix: NodeIx) -> String {
        match &self.nodes[ix].kind {
            CompiledKind::Primitive(p) => p.type_name().to_string(),
            CompiledKind::Enum(_) => "enum".to_string(),
            CompiledKind::Object(_) | CompiledKind::Discriminator { .. } => "object".to_string(),
            CompiledKind::Array(_) => "array".to_string(),
            CompiledKind::Record(_) => "record".to_string(),
            CompiledKind::Ref(target) => self.expected_name(*target),
        }
    }
}

// =============================================================================
// Lowering
// =============================================================================

struct Lowering<'r> {
    nodes: Vec<CompiledNode>,
    /// Named nodes and ref targets compile once; every later occurrence
    /// reuses the memoized index.
    by_id: HashMap<String, NodeIx>,
    /// Source node behind each memoized id, kept so later occurrences can
    /// be checked for structural agreement.
    sources: HashMap<String, SchemaNode>,
    registry: &'r TypeRegistry,
}

/// Whether `occurrence` agrees with the id's first `definition`. Nullability
/// and optionality at the top level belong to the use site, not the shared
/// definition, so they are excluded from the comparison.
fn same_definition(occurrence: &SchemaNode, definition: &SchemaNode) -> bool {
    let aligned = SchemaNode {
        kind: occurrence.kind.clone(),
        nullable: definition.nullable,
        optional: definition.optional,
        metadata: occurrence.metadata.clone(),
    };
    aligned.structurally_equal(definition)
}

impl Lowering<'_> {
    fn lower(&mut self, node: &SchemaNode) -> Result<NodeIx, SchemaBuildError> {
        if let NodeKind::Ref(id) = &node.kind {
            let target = self.lower_registry(id)?;
            // A ref occurrence with its own nullability keeps a wrapper so
            // the flag does not leak onto the shared target.
            if node.nullable && !self.nodes[target].nullable {
                let ix = self.reserve();
                self.nodes[ix] = CompiledNode {
                    kind: CompiledKind::Ref(target),
                    nullable: true,
                };
                return Ok(ix);
            }
            return Ok(target);
        }

        if let Some(id) = node.id() {
            if let Some(&ix) = self.by_id.get(id) {
                let agrees = self
                    .sources
                    .get(id)
                    .is_some_and(|source| same_definition(node, source));
                if !agrees {
                    return Err(SchemaBuildError::IdCollision { id: id.to_string() });
                }
                return Ok(self.occurrence(ix, node.nullable));
            }
            // An inline named node may not shadow a registered id with a
            // different shape.
            match self.registry.resolved(id) {
                Some(registered) if !same_definition(node, registered) => {
                    return Err(SchemaBuildError::IdCollision { id: id.to_string() });
                }
                Some(_) => {
                    let target = self.lower_registry(id)?;
                    return Ok(self.occurrence(target, node.nullable));
                }
                None => {}
            }
            let ix = self.reserve();
            self.by_id.insert(id.to_string(), ix);
            self.sources.insert(id.to_string(), node.clone());
            let kind = self.lower_kind(node)?;
            self.nodes[ix] = CompiledNode {
                kind,
                nullable: node.nullable,
            };
            return Ok(ix);
        }

        let ix = self.reserve();
        let kind = self.lower_kind(node)?;
        self.nodes[ix] = CompiledNode {
            kind,
            nullable: node.nullable,
        };
        Ok(ix)
    }

    /// Lower the registry entry behind `id`, following pure-ref aliases to
    /// their terminal body and memoizing every id on the chain.
    fn lower_registry(&mut self, id: &str) -> Result<NodeIx, SchemaBuildError> {
        if let Some(&ix) = self.by_id.get(id) {
            return Ok(ix);
        }

        let mut chain = vec![id.to_string()];
        loop {
            let current = chain.last().cloned().unwrap_or_default();
            let body = self
                .registry
                .resolved(&current)
                .ok_or(SchemaBuildError::UnresolvedRef { id: current.clone() })?;
            match &body.kind {
                NodeKind::Ref(next) => {
                    // A cycle of refs with no structure anywhere never
                    // reaches a terminal node.
                    if chain.iter().any(|c| c == next) {
                        return Err(SchemaBuildError::UnresolvedRef { id: next.clone() });
                    }
                    chain.push(next.clone());
                }
                _ => break,
            }
        }

        let terminal = chain.last().cloned().unwrap_or_default();
        let ix = self.reserve();
        for link in &chain {
            self.by_id.insert(link.clone(), ix);
        }
        // Clone releases the registry borrow before recursive lowering.
        let body = match self.registry.resolved(&terminal) {
            Some(node) => node.clone(),
            None => return Err(SchemaBuildError::UnresolvedRef { id: terminal }),
        };
        for link in &chain {
            self.sources.insert(link.clone(), body.clone());
        }
        let kind = self.lower_kind(&body)?;
        self.nodes[ix] = CompiledNode {
            kind,
            nullable: body.nullable,
        };
        Ok(ix)
    }

    fn lower_kind(&mut self, node: &SchemaNode) -> Result<CompiledKind, SchemaBuildError> {
        match &node.kind {
            NodeKind::Primitive(p) => Ok(CompiledKind::Primitive(*p)),
            NodeKind::Enum(values) => Ok(CompiledKind::Enum(values.clone())),
            NodeKind::Object(fields) => Ok(CompiledKind::Object(self.lower_fields(fields)?)),
            NodeKind::Array(of) => Ok(CompiledKind::Array(self.lower(of)?)),
            NodeKind::Record(of) => Ok(CompiledKind::Record(self.lower(of)?)),
            NodeKind::Discriminator { tag, variants } => {
                // Hand-built nodes bypass the builder checks, so the
                // invariants are re-established here.
                let mut lowered = Vec::with_capacity(variants.len());
                for (i, (value, variant)) in variants.iter().enumerate() {
                    if variants[..i].iter().any(|(seen, _)| seen == value) {
                        return Err(SchemaBuildError::DuplicateTagValue { value: value.clone() });
                    }
                    let NodeKind::Object(fields) = &variant.kind else {
                        return Err(SchemaBuildError::NonObjectVariant { value: value.clone() });
                    };
                    if fields.iter().any(|f| f.name == *tag) {
                        return Err(SchemaBuildError::TagFieldRedeclared {
                            value: value.clone(),
                            tag: tag.clone(),
                        });
                    }
                    lowered.push((value.clone(), self.lower(variant)?));
                }
                Ok(CompiledKind::Discriminator {
                    tag: tag.clone(),
                    variants: lowered,
                })
            }
            NodeKind::Ref(id) => Ok(CompiledKind::Ref(self.lower_registry(id)?)),
        }
    }

    fn lower_fields(&mut self, fields: &[FieldDef]) -> Result<Vec<CompiledField>, SchemaBuildError> {
        let mut lowered = Vec::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaBuildError::DuplicateField {
                    name: field.name.clone(),
                });
            }
            lowered.push(CompiledField {
                name: field.name.clone(),
                ix: self.lower(&field.node)?,
                optional: field.node.optional,
            });
        }
        Ok(lowered)
    }

    /// Reuse a shared target from a new occurrence, keeping a wrapper node
    /// when the use site's nullability differs from the definition's so
    /// neither flag leaks onto the other.
    fn occurrence(&mut self, target: NodeIx, nullable: bool) -> NodeIx {
        if self.nodes[target].nullable == nullable {
            return target;
        }
        let ix = self.reserve();
        self.nodes[ix] = CompiledNode {
            kind: CompiledKind::Ref(target),
            nullable,
        };
        ix
    }

    fn reserve(&mut self) -> NodeIx {
        // Stub overwritten once the body is lowered.
        self.nodes.push(CompiledNode {
            kind: CompiledKind::Enum(Vec::new()),
            nullable: false,
        });
        self.nodes.len() - 1
    }
}

// =============================================================================
// Scalar helpers
// =============================================================================

fn primitive_matches(p: PrimitiveKind, value: &Value) -> bool {
    match p {
        PrimitiveKind::String => value.is_string(),
        PrimitiveKind::Boolean => value.is_boolean(),
        PrimitiveKind::Timestamp => value
            .as_str()
            .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
        PrimitiveKind::Float32 | PrimitiveKind::Float64 => value.is_number(),
        PrimitiveKind::Int8 => integral(value).is_some_and(|v| (-128..=127).contains(&v)),
        PrimitiveKind::Int16 => integral(value).is_some_and(|v| (-32_768..=32_767).contains(&v)),
        PrimitiveKind::Int32 => {
            integral(value).is_some_and(|v| (i32::MIN as i128..=i32::MAX as i128).contains(&v))
        }
        PrimitiveKind::Int64 => {
            integral(value).is_some_and(|v| (i64::MIN as i128..=i64::MAX as i128).contains(&v))
        }
        PrimitiveKind::Uint8 => integral(value).is_some_and(|v| (0..=255).contains(&v)),
        PrimitiveKind::Uint16 => integral(value).is_some_and(|v| (0..=65_535).contains(&v)),
        PrimitiveKind::Uint32 => {
            integral(value).is_some_and(|v| (0..=u32::MAX as i128).contains(&v))
        }
        PrimitiveKind::Uint64 => {
            integral(value).is_some_and(|v| (0..=u64::MAX as i128).contains(&v))
        }
    }
}

/// Integral interpretation of a JSON number. A generic number with no
/// fractional component (`1.0`) counts; `1.5` does not.
fn integral(value: &Value) -> Option<i128> {
    if let Some(i) = value.as_i64() {
        return Some(i as i128);
    }
    if let Some(u) = value.as_u64() {
        return Some(u as i128);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_FLOAT_INT {
        Some(f as i128)
    } else {
        None
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn mock_primitive<R: Rng + ?Sized>(p: PrimitiveKind, rng: &mut R) -> Value {
    match p {
        PrimitiveKind::String => Value::String(mock_word(rng)),
        PrimitiveKind::Boolean => Value::Bool(rng.gen()),
        PrimitiveKind::Int8 => Value::from(rng.gen_range(-128i64..=127)),
        PrimitiveKind::Int16 => Value::from(rng.gen_range(-32_768i64..=32_767)),
        PrimitiveKind::Int32 => Value::from(rng.gen_range(i32::MIN as i64..=i32::MAX as i64)),
        PrimitiveKind::Int64 => Value::from(rng.gen::<i64>()),
        PrimitiveKind::Uint8 => Value::from(rng.gen_range(0u64..=255)),
        PrimitiveKind::Uint16 => Value::from(rng.gen_range(0u64..=65_535)),
        PrimitiveKind::Uint32 => Value::from(rng.gen_range(0u64..=u32::MAX as u64)),
        PrimitiveKind::Uint64 => Value::from(rng.gen::<u64>()),
        PrimitiveKind::Float32 | PrimitiveKind::Float64 => {
            Value::from(rng.gen_range(-1_000_000.0f64..1_000_000.0))
        }
        PrimitiveKind::Timestamp => {
            let secs = rng.gen_range(0i64..=2_000_000_000);
            let formatted = DateTime::from_timestamp(secs, 0)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string());
            Value::String(formatted)
        }
    }
}

fn mock_word<R: Rng + ?Sized>(rng: &mut R) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    let len = rng.gen_range(3..=10);
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
