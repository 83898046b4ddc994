//! Application definition: the canonical, language-neutral IR describing
//! all procedures and named schemas of one API.
//!
//! Built once at startup by walking registered procedures in declaration
//! order, then immutable. Independent implementations of the same logical
//! API must produce this document identically; everything here is ordered
//! and deterministic for that reason.
//!
//! ```rust
//! use rpc_schema::appdef::{procedure, AppDefinitionBuilder};
//! use rpc_schema::builder::*;
//!
//! let app = AppDefinitionBuilder::new()
//!     .procedure(
//!         procedure("users.deleteUser")
//!             .post()
//!             .params(object([("id", string())]))
//!             .response(object([("id", string()), ("name", string())])),
//!     )
//!     .build()
//!     .unwrap();
//! assert!(app.definitions().is_empty());
//! ```

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, trace};

use crate::builder::ref_node;
use crate::compiler::CompiledSchema;
use crate::error::{AppDefError, DefinitionConflictError, SchemaBuildError};
use crate::registry::TypeRegistry;
use crate::schema::{FieldDef, NodeKind, SchemaNode};

// =============================================================================
// Transport
// =============================================================================

/// HTTP method of a unary procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

/// How a procedure exchanges messages with its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// One request, one response.
    Unary {
        /// HTTP method used by HTTP-style transports.
        method: HttpMethod,
    },
    /// One request, a server-pushed stream of responses.
    ServerStream,
    /// Bidirectional event stream.
    EventStream,
}

impl TransportKind {
    /// Wire name of the transport.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Unary { .. } => "unary",
            Self::ServerStream => "serverStream",
            Self::EventStream => "eventStream",
        }
    }

    /// The HTTP method, for unary transports.
    pub fn method(&self) -> Option<HttpMethod> {
        match self {
            Self::Unary { method } => Some(*method),
            _ => None,
        }
    }
}

// =============================================================================
// Procedures
// =============================================================================

/// One registered procedure of the API.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDefinition {
    /// Dot-namespaced name, e.g. `users.deleteUser`.
    pub name: String,
    /// Message exchange shape.
    pub transport: TransportKind,
    /// Parameter schema, if the procedure takes input.
    pub params: Option<SchemaNode>,
    /// Response schema, if the procedure returns output.
    pub response: Option<SchemaNode>,
    /// Human-readable description.
    pub description: Option<String>,
    /// Whether the procedure is deprecated (annotation only).
    pub is_deprecated: bool,
}

/// Start building a procedure with the given dot-namespaced name.
///
/// Defaults to a unary POST; switch with the method and stream setters.
pub fn procedure(name: impl Into<String>) -> ProcedureBuilder {
    ProcedureBuilder {
        def: ProcedureDefinition {
            name: name.into(),
            transport: TransportKind::Unary {
                method: HttpMethod::Post,
            },
            params: None,
            response: None,
            description: None,
            is_deprecated: false,
        },
    }
}

/// Fluent builder for one [`ProcedureDefinition`].
#[derive(Debug, Clone)]
pub struct ProcedureBuilder {
    def: ProcedureDefinition,
}

impl ProcedureBuilder {
    /// Unary GET.
    pub fn get(mut self) -> Self {
        self.def.transport = TransportKind::Unary { method: HttpMethod::Get };
        self
    }

    /// Unary POST.
    pub fn post(mut self) -> Self {
        self.def.transport = TransportKind::Unary { method: HttpMethod::Post };
        self
    }

    /// Unary PUT.
    pub fn put(mut self) -> Self {
        self.def.transport = TransportKind::Unary { method: HttpMethod::Put };
        self
    }

    /// Unary PATCH.
    pub fn patch(mut self) -> Self {
        self.def.transport = TransportKind::Unary { method: HttpMethod::Patch };
        self
    }

    /// Unary DELETE.
    pub fn delete(mut self) -> Self {
        self.def.transport = TransportKind::Unary { method: HttpMethod::Delete };
        self
    }

    /// Server-pushed response stream.
    pub fn server_stream(mut self) -> Self {
        self.def.transport = TransportKind::ServerStream;
        self
    }

    /// Bidirectional event stream.
    pub fn event_stream(mut self) -> Self {
        self.def.transport = TransportKind::EventStream;
        self
    }

    /// Set the parameter schema.
    pub fn params(mut self, node: SchemaNode) -> Self {
        self.def.params = Some(node);
        self
    }

    /// Set the response schema.
    pub fn response(mut self, node: SchemaNode) -> Self {
        self.def.response = Some(node);
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.def.description = Some(description.into());
        self
    }

    /// Mark the procedure deprecated.
    pub fn deprecated(mut self) -> Self {
        self.def.is_deprecated = true;
        self
    }

    /// Finish the definition.
    pub fn finish(self) -> ProcedureDefinition {
        self.def
    }
}

impl From<ProcedureBuilder> for ProcedureDefinition {
    fn from(builder: ProcedureBuilder) -> Self {
        builder.finish()
    }
}

/// Check the dot-namespaced procedure name format: non-empty, no leading,
/// trailing or consecutive dots, alphanumerics and underscores only.
pub fn validate_procedure_name(name: &str) -> Result<(), SchemaBuildError> {
    let reject = |reason: &str| {
        Err(SchemaBuildError::InvalidProcedureName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };
    if name.is_empty() {
        return reject("name is empty");
    }
    if name.starts_with('.') || name.ends_with('.') {
        return reject("name starts or ends with a dot");
    }
    if name.contains("..") {
        return reject("name contains consecutive dots");
    }
    if let Some(c) = name
        .chars()
        .find(|&c| !c.is_ascii_alphanumeric() && c != '_' && c != '.')
    {
        return Err(SchemaBuildError::InvalidProcedureName {
            name: name.to_string(),
            reason: format!("invalid character '{c}'"),
        });
    }
    Ok(())
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles procedures and named schemas into an [`AppDefinition`].
///
/// Registration order is stable and significant: it is the order of the
/// `procedures` and `definitions` maps in the output document.
#[derive(Debug, Default)]
pub struct AppDefinitionBuilder {
    registry: TypeRegistry,
    procedures: Vec<ProcedureDefinition>,
}

impl AppDefinitionBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the registry refs resolve against, usually taken from the
    /// [`crate::builder::SchemaBuilder`] that declared the schemas.
    pub fn registry(mut self, registry: &TypeRegistry) -> Self {
        self.registry = registry.clone();
        self
    }

    /// Register a procedure. Name validation and duplicate detection run at
    /// [`build`](Self::build) time, keeping the chain infallible.
    pub fn procedure(mut self, def: impl Into<ProcedureDefinition>) -> Self {
        self.procedures.push(def.into());
        self
    }

    /// Walk all registered procedures and produce the immutable IR.
    ///
    /// Every node carrying an id is hoisted into `definitions` (first
    /// occurrence wins, identical re-occurrences are skipped) and its tree
    /// position replaced by a ref. A structurally different body under an
    /// already-registered id fails with a [`DefinitionConflictError`]
    /// naming both procedures. The build fails fast on the first conflict:
    /// a malformed IR is never produced.
    pub fn build(self) -> Result<AppDefinition, AppDefError> {
        let mut hoisting = Hoisting {
            registry: &self.registry,
            definitions: IndexMap::new(),
            owners: HashMap::new(),
        };
        let mut procedures = IndexMap::new();

        for def in self.procedures {
            let ProcedureDefinition {
                name,
                transport,
                params,
                response,
                description,
                is_deprecated,
            } = def;
            validate_procedure_name(&name)?;
            if procedures.contains_key(&name) {
                return Err(SchemaBuildError::DuplicateProcedure { name }.into());
            }
            trace!(procedure = %name, "walking procedure schemas");

            let params = params
                .map(|node| hoisting.hoist(node, &name, &mut HashSet::new()))
                .transpose()?;
            let response = response
                .map(|node| hoisting.hoist(node, &name, &mut HashSet::new()))
                .transpose()?;

            procedures.insert(
                name.clone(),
                ProcedureDefinition {
                    name,
                    transport,
                    params,
                    response,
                    description,
                    is_deprecated,
                },
            );
        }

        debug!(
            procedures = procedures.len(),
            definitions = hoisting.definitions.len(),
            "application definition built"
        );
        Ok(AppDefinition {
            schema_version: "1".to_string(),
            procedures,
            definitions: hoisting.definitions,
        })
    }
}

struct Hoisting<'r> {
    registry: &'r TypeRegistry,
    definitions: IndexMap<String, SchemaNode>,
    /// id -> name of the procedure that registered it first, for conflict
    /// reporting.
    owners: HashMap<String, String>,
}

impl Hoisting<'_> {
    /// Canonicalize one tree: named subtrees move to `definitions` and
    /// their positions become refs carrying the occurrence's flags.
    fn hoist(
        &mut self,
        node: SchemaNode,
        proc: &str,
        in_progress: &mut HashSet<String>,
    ) -> Result<SchemaNode, AppDefError> {
        if let NodeKind::Ref(id) = &node.kind {
            let id = id.clone();
            self.ensure_from_registry(&id, proc, in_progress)?;
            return Ok(node);
        }

        if let Some(id) = node.id().map(str::to_string) {
            let use_site = {
                let mut r = ref_node(&id);
                r.nullable = node.nullable;
                r.optional = node.optional;
                r
            };
            self.ensure_definition(&id, node, proc, in_progress)?;
            return Ok(use_site);
        }

        self.hoist_children(node, proc, in_progress)
    }

    fn hoist_children(
        &mut self,
        node: SchemaNode,
        proc: &str,
        in_progress: &mut HashSet<String>,
    ) -> Result<SchemaNode, AppDefError> {
        let kind = match node.kind {
            NodeKind::Object(fields) => NodeKind::Object(
                fields
                    .into_iter()
                    .map(|f| {
                        self.hoist(f.node, proc, in_progress)
                            .map(|hoisted| FieldDef { name: f.name, node: hoisted })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            NodeKind::Array(of) => {
                NodeKind::Array(Box::new(self.hoist(*of, proc, in_progress)?))
            }
            NodeKind::Record(of) => {
                NodeKind::Record(Box::new(self.hoist(*of, proc, in_progress)?))
            }
            NodeKind::Discriminator { tag, variants } => NodeKind::Discriminator {
                tag,
                variants: variants
                    .into_iter()
                    .map(|(value, variant)| {
                        self.hoist(variant, proc, in_progress).map(|v| (value, v))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            },
            kind => kind,
        };
        Ok(SchemaNode { kind, ..node })
    }

    /// Make sure `definitions[id]` holds the canonical body derived from
    /// `body`. First occurrence wins; identical re-occurrences are skipped.
    fn ensure_definition(
        &mut self,
        id: &str,
        body: SchemaNode,
        proc: &str,
        in_progress: &mut HashSet<String>,
    ) -> Result<(), AppDefError> {
        if in_progress.contains(id) {
            // Recursive re-entry; the definition is being built above us.
            return Ok(());
        }
        in_progress.insert(id.to_string());
        let result = self.ensure_definition_inner(id, body, proc, in_progress);
        in_progress.remove(id);
        result
    }

    fn ensure_definition_inner(
        &mut self,
        id: &str,
        body: SchemaNode,
        proc: &str,
        in_progress: &mut HashSet<String>,
    ) -> Result<(), AppDefError> {
        if self.definitions.contains_key(id) {
            let candidate = self.hoist_children(body, proc, in_progress)?;
            // contains_key above guarantees the entry exists; re-borrow so
            // hoisting children could grow the map in between.
            let existing = &self.definitions[id];
            if existing.structurally_equal(&candidate) {
                trace!(id, "identical definition skipped");
                return Ok(());
            }
            let first = self
                .owners
                .get(id)
                .cloned()
                .unwrap_or_else(|| proc.to_string());
            return Err(DefinitionConflictError {
                id: id.to_string(),
                first_procedure: first,
                second_procedure: proc.to_string(),
            }
            .into());
        }

        // Reserve the slot first so the definition's position reflects
        // first-occurrence order even when hoisting its children registers
        // further definitions.
        self.definitions.insert(id.to_string(), body.clone());
        self.owners.insert(id.to_string(), proc.to_string());
        let canonical = self.hoist_children(body, proc, in_progress)?;
        self.definitions.insert(id.to_string(), canonical);
        trace!(id, procedure = proc, "schema hoisted into definitions");
        Ok(())
    }

    /// Resolve a bare ref through the registry and hoist its body.
    fn ensure_from_registry(
        &mut self,
        id: &str,
        proc: &str,
        in_progress: &mut HashSet<String>,
    ) -> Result<(), AppDefError> {
        if self.definitions.contains_key(id) || in_progress.contains(id) {
            return Ok(());
        }
        let body = self
            .registry
            .resolved(id)
            .cloned()
            .ok_or(SchemaBuildError::UnresolvedRef { id: id.to_string() })?;
        self.ensure_definition(id, body, proc, in_progress)
    }
}

// =============================================================================
// The IR document
// =============================================================================

/// The canonical application definition, immutable after build.
#[derive(Debug, Clone)]
pub struct AppDefinition {
    schema_version: String,
    procedures: IndexMap<String, ProcedureDefinition>,
    definitions: IndexMap<String, SchemaNode>,
}

impl AppDefinition {
    /// IR format version.
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Procedures in registration order.
    pub fn procedures(&self) -> &IndexMap<String, ProcedureDefinition> {
        &self.procedures
    }

    /// Named schema definitions in first-occurrence order.
    pub fn definitions(&self) -> &IndexMap<String, SchemaNode> {
        &self.definitions
    }

    /// Look up one procedure.
    pub fn procedure(&self, name: &str) -> Option<&ProcedureDefinition> {
        self.procedures.get(name)
    }

    /// Canonical single-line JSON document. Two independently built
    /// definitions of the same logical API compare byte-for-byte equal.
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(self).expect("application definition always serializes")
    }

    /// Pretty-printed document for humans.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).expect("application definition always serializes")
    }

    /// Compile runtime validators for every procedure, keyed by procedure
    /// name. The definition is self-contained: refs resolve against its own
    /// `definitions` map.
    pub fn compile_validators(
        &self,
    ) -> Result<IndexMap<String, ProcedureValidators>, SchemaBuildError> {
        let mut registry = TypeRegistry::new();
        for (id, node) in &self.definitions {
            registry.register(id, node.clone())?;
        }
        let mut compiled = IndexMap::new();
        for (name, def) in &self.procedures {
            compiled.insert(
                name.clone(),
                ProcedureValidators {
                    params: def
                        .params
                        .as_ref()
                        .map(|n| CompiledSchema::compile(n, &registry))
                        .transpose()?,
                    response: def
                        .response
                        .as_ref()
                        .map(|n| CompiledSchema::compile(n, &registry))
                        .transpose()?,
                },
            );
        }
        Ok(compiled)
    }
}

/// Compiled params/response validators for one procedure, handed to the
/// transport layer.
#[derive(Debug, Clone)]
pub struct ProcedureValidators {
    /// Validator for the parameter role, if the procedure takes input.
    pub params: Option<CompiledSchema>,
    /// Validator for the response role, if the procedure returns output.
    pub response: Option<CompiledSchema>,
}

impl Serialize for AppDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("schemaVersion", &self.schema_version)?;
        map.serialize_entry("procedures", &ProcedureMapRepr(&self.procedures))?;
        map.serialize_entry("definitions", &self.definitions)?;
        map.end()
    }
}

struct ProcedureMapRepr<'a>(&'a IndexMap<String, ProcedureDefinition>);

impl Serialize for ProcedureMapRepr<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, def) in self.0 {
            map.serialize_entry(name, &ProcedureRepr(def))?;
        }
        map.end()
    }
}

struct ProcedureRepr<'a>(&'a ProcedureDefinition);

impl Serialize for ProcedureRepr<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let def = self.0;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("transport", def.transport.wire_name())?;
        if let Some(method) = def.transport.method() {
            map.serialize_entry("method", method.as_str())?;
        }
        if let Some(params) = &def.params {
            map.serialize_entry("params", params)?;
        }
        if let Some(response) = &def.response {
            map.serialize_entry("response", response)?;
        }
        if def.is_deprecated {
            map.serialize_entry("isDeprecated", &true)?;
        }
        if let Some(description) = &def.description {
            map.serialize_entry("description", description)?;
        }
        map.end()
    }
}
