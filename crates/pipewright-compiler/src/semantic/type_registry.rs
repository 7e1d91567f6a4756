//! Type registry
//!
//! Each file's types are registered once, in import order, into an immutable
//! [`FileSnapshot`]. A snapshot is a pure function of the file's own
//! declarations and the snapshots of the files it imports directly; nothing
//! is shared or mutated across files.
//!
//! Type identity is canonical: a type is identified by the file declaring
//! it and its declared name. An import alias only changes the local binding.

use crate::import::ImportEdge;
use crate::semantic::suggest::{did_you_mean, suggest};
use indexmap::IndexMap;
use pipewright_core::ast::{Primitive, SchemaTypeNode, TypeDeclarationNode};
use pipewright_core::{Diagnostic, DiagnosticCode, Span};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Named type expansion stops after this many hops (alias loops)
const MAX_EXPANSION_DEPTH: usize = 64;

static UNKNOWN: ResolvedType = ResolvedType::Unknown;

/// Canonical identity of a named type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId {
    pub file: String,
    pub name: String,
}

impl TypeId {
    pub fn new(file: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.file)
    }
}

/// A type with every reference linked to a canonical identity
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedType {
    Object(IndexMap<String, ResolvedType>),
    Array(Box<ResolvedType>),
    Union(Vec<ResolvedType>),
    Primitive(Primitive),
    Literal(String),
    Null,
    Named(TypeId),
    /// Could not be resolved; already diagnosed or deliberately unchecked
    Unknown,
}

impl ResolvedType {
    pub fn is_null(&self) -> bool {
        matches!(self, ResolvedType::Null)
    }

    /// The single non-null member of a `T | null` union
    pub fn non_null_member(members: &[ResolvedType]) -> Option<&ResolvedType> {
        let mut rest = members.iter().filter(|m| !m.is_null());
        match (rest.next(), rest.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedType::Object(fields) => {
                f.write_str("{ ")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                f.write_str(" }")
            }
            ResolvedType::Array(item) => write!(f, "{}[]", item),
            ResolvedType::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
            ResolvedType::Primitive(p) => write!(f, "{}", p),
            ResolvedType::Literal(value) => write!(f, "\"{}\"", value),
            ResolvedType::Null => f.write_str("null"),
            ResolvedType::Named(id) => f.write_str(&id.name),
            ResolvedType::Unknown => f.write_str("unknown"),
        }
    }
}

/// A registered type declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub id: TypeId,
    pub span: Span,
    pub body: ResolvedType,
}

/// Immutable view of the types visible in one file
#[derive(Debug, Clone, Default)]
pub struct FileSnapshot {
    file: String,

    /// Types declared by this file, importable by others
    exports: IndexMap<String, TypeId>,

    /// Local name to canonical identity (own declarations, then imports)
    bindings: IndexMap<String, TypeId>,

    /// Local names bound to imports whose source is unavailable
    opaque: BTreeSet<String>,

    /// Every definition reachable from this file, own and transitive
    definitions: BTreeMap<TypeId, Arc<TypeDefinition>>,
}

impl FileSnapshot {
    /// Snapshot with no types, for files that could not be registered
    pub fn empty(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Canonical identity bound to a local name
    pub fn lookup(&self, local: &str) -> Option<&TypeId> {
        self.bindings.get(local)
    }

    pub fn definition(&self, id: &TypeId) -> Option<&TypeDefinition> {
        self.definitions.get(id).map(Arc::as_ref)
    }

    /// Types this file declares itself, in declaration order
    pub fn exports(&self) -> impl Iterator<Item = (&String, &TypeId)> {
        self.exports.iter()
    }

    /// Local type names in binding order
    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Link a type written in this file.
    ///
    /// Unknown references and unrecognized primitives become
    /// [`ResolvedType::Unknown`]; use [`FileSnapshot::link_checked`] to also
    /// diagnose them.
    pub fn link(&self, node: &SchemaTypeNode) -> ResolvedType {
        let mut sink = Vec::new();
        self.link_into(node, &Span::default(), &mut sink, 0)
    }

    /// Link a type written in this file, reporting unknown type names
    pub fn link_checked(
        &self,
        node: &SchemaTypeNode,
        span: &Span,
        max_suggestion_distance: usize,
    ) -> (ResolvedType, Vec<Diagnostic>) {
        let mut unknown = Vec::new();
        let linked = self.link_into(node, span, &mut unknown, max_suggestion_distance);
        (linked, unknown)
    }

    fn link_into(
        &self,
        node: &SchemaTypeNode,
        span: &Span,
        diagnostics: &mut Vec<Diagnostic>,
        max_distance: usize,
    ) -> ResolvedType {
        match node {
            SchemaTypeNode::Object { fields } => {
                let mut linked = IndexMap::new();
                for field in fields {
                    let field_span = if field.span.is_unknown() { span } else { &field.span };
                    let ty = self.link_into(&field.ty, field_span, diagnostics, max_distance);
                    // Duplicate fields are reported by schema validation; first one wins
                    linked.entry(field.name.clone()).or_insert(ty);
                }
                ResolvedType::Object(linked)
            }
            SchemaTypeNode::Array { item } => {
                ResolvedType::Array(Box::new(self.link_into(item, span, diagnostics, max_distance)))
            }
            SchemaTypeNode::Union { members } => ResolvedType::Union(
                members
                    .iter()
                    .map(|m| self.link_into(m, span, diagnostics, max_distance))
                    .collect(),
            ),
            SchemaTypeNode::Primitive { name } => Primitive::from_name(name)
                .map(ResolvedType::Primitive)
                .unwrap_or(ResolvedType::Unknown),
            SchemaTypeNode::Literal { value } => ResolvedType::Literal(value.clone()),
            SchemaTypeNode::Null => ResolvedType::Null,
            SchemaTypeNode::Reference { name } => {
                if let Some(id) = self.bindings.get(name) {
                    ResolvedType::Named(id.clone())
                } else {
                    if !self.opaque.contains(name) {
                        let hint = did_you_mean(suggest(name, self.local_names(), max_distance));
                        diagnostics.push(
                            Diagnostic::error(
                                DiagnosticCode::UNDEFINED_TYPE,
                                format!("unknown type '{}'", name),
                                span.clone(),
                            )
                            .with_optional_hint(hint),
                        );
                    }
                    ResolvedType::Unknown
                }
            }
        }
    }

    /// Follow named types to the structure they stand for
    pub fn expand<'a>(&'a self, ty: &'a ResolvedType) -> &'a ResolvedType {
        let mut current = ty;
        for _ in 0..MAX_EXPANSION_DEPTH {
            match current {
                ResolvedType::Named(id) => match self.definitions.get(id) {
                    Some(def) => current = &def.body,
                    None => return &UNKNOWN,
                },
                other => return other,
            }
        }
        &UNKNOWN
    }
}

/// Registers per-file type declarations into snapshots
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    max_suggestion_distance: usize,
}

impl TypeRegistry {
    pub fn new(max_suggestion_distance: usize) -> Self {
        Self {
            max_suggestion_distance,
        }
    }

    /// Build the snapshot of `file`.
    ///
    /// `edges` are the file's resolved imports; `snapshots` must already hold
    /// every import target that could be registered. Targets missing from it
    /// have been diagnosed elsewhere, so their names are bound opaquely.
    pub fn register(
        &self,
        file: &str,
        declarations: &[TypeDeclarationNode],
        edges: &[ImportEdge],
        snapshots: &BTreeMap<String, Arc<FileSnapshot>>,
    ) -> (Arc<FileSnapshot>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let mut snapshot = FileSnapshot::empty(file);
        let mut declared_at: IndexMap<&str, &Span> = IndexMap::new();

        // 1. Own declarations
        let mut registered = Vec::new();
        for decl in declarations {
            if let Some(first) = declared_at.get(decl.name.as_str()) {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::DUPLICATE_TYPE,
                        format!("type '{}' is declared more than once", decl.name),
                        decl.span.clone(),
                    )
                    .with_hint(format!("first declared at {}", first)),
                );
                continue;
            }
            declared_at.insert(&decl.name, &decl.span);
            let id = TypeId::new(file, decl.name.clone());
            snapshot.exports.insert(decl.name.clone(), id.clone());
            snapshot.bindings.insert(decl.name.clone(), id);
            registered.push(decl);
        }

        // 2. Imported names, pulled from the already merged snapshots
        for edge in edges {
            let Some(source) = snapshots.get(&edge.target) else {
                for name in &edge.names {
                    snapshot.opaque.insert(name.local_name().to_string());
                }
                continue;
            };

            for name in &edge.names {
                let span = if name.span.is_unknown() { &edge.span } else { &name.span };
                let Some(id) = source.exports.get(&name.name) else {
                    let hint = did_you_mean(suggest(
                        &name.name,
                        source.exports.keys().map(String::as_str),
                        self.max_suggestion_distance,
                    ));
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::UNKNOWN_IMPORTED_NAME,
                            format!("'{}' does not declare a type named '{}'", edge.target, name.name),
                            span.clone(),
                        )
                        .with_optional_hint(hint),
                    );
                    snapshot.opaque.insert(name.local_name().to_string());
                    continue;
                };

                let local = name.local_name();
                match snapshot.bindings.get(local) {
                    Some(existing) if existing == id => {}
                    Some(existing) => {
                        diagnostics.push(
                            Diagnostic::error(
                                DiagnosticCode::BINDING_COLLISION,
                                format!(
                                    "'{}' is already bound to {} in this file",
                                    local, existing
                                ),
                                span.clone(),
                            )
                            .with_hint(format!("import it under another name: {} as ...", name.name)),
                        );
                    }
                    None => {
                        snapshot.bindings.insert(local.to_string(), id.clone());
                    }
                }
            }

            for (id, def) in &source.definitions {
                snapshot.definitions.entry(id.clone()).or_insert_with(|| Arc::clone(def));
            }
        }

        // 3. Link own bodies against the full binding set
        for decl in registered {
            let (body, unknown) =
                snapshot.link_checked(&decl.body, &decl.span, self.max_suggestion_distance);
            diagnostics.extend(unknown);
            let id = TypeId::new(file, decl.name.clone());
            snapshot.definitions.insert(
                id.clone(),
                Arc::new(TypeDefinition {
                    id,
                    span: decl.span.clone(),
                    body,
                }),
            );
        }

        (Arc::new(snapshot), diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewright_core::ast::ImportedName;

    fn registry() -> TypeRegistry {
        TypeRegistry::new(2)
    }

    fn decl(name: &str, body: SchemaTypeNode, line: u32) -> TypeDeclarationNode {
        TypeDeclarationNode::new(name, body).with_span(Span::line("a.flow", line))
    }

    #[test]
    fn test_duplicate_declaration_reported_at_second_span() {
        let decls = vec![
            decl("Report", SchemaTypeNode::primitive("string"), 1),
            decl("Report", SchemaTypeNode::primitive("int"), 4),
        ];
        let (snapshot, diags) = registry().register("a.flow", &decls, &[], &BTreeMap::new());

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code(), DiagnosticCode::DUPLICATE_TYPE);
        assert_eq!(diags[0].span().start_line, 4);
        let id = snapshot.lookup("Report").unwrap();
        assert_eq!(
            snapshot.definition(id).unwrap().body,
            ResolvedType::Primitive(Primitive::String)
        );
    }

    #[test]
    fn test_unknown_reference_suggests_nearest() {
        let decls = vec![
            decl("Result", SchemaTypeNode::primitive("string"), 1),
            decl("Wrapper", SchemaTypeNode::array(SchemaTypeNode::reference("Reslt")), 2),
        ];
        let (_, diags) = registry().register("a.flow", &decls, &[], &BTreeMap::new());

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code(), DiagnosticCode::UNDEFINED_TYPE);
        assert!(diags[0].hint().unwrap().contains("Result"));
    }

    #[test]
    fn test_alias_keeps_canonical_identity() {
        let (types, _) = registry().register(
            "types.flow",
            &[TypeDeclarationNode::new("Report", SchemaTypeNode::primitive("json"))],
            &[],
            &BTreeMap::new(),
        );
        let mut snapshots = BTreeMap::new();
        snapshots.insert("types.flow".to_string(), types);

        let edges = vec![ImportEdge::new(
            "types.flow",
            vec![ImportedName::aliased("Report", "R")],
        )];
        let decls = vec![decl("Wrapped", SchemaTypeNode::array(SchemaTypeNode::reference("R")), 3)];
        let (snapshot, diags) = registry().register("main.flow", &decls, &edges, &snapshots);

        assert!(diags.is_empty());
        assert_eq!(snapshot.lookup("R"), Some(&TypeId::new("types.flow", "Report")));
        assert!(snapshot.lookup("Report").is_none());

        let wrapped = snapshot.lookup("Wrapped").unwrap().clone();
        let body = &snapshot.definition(&wrapped).unwrap().body;
        assert_eq!(
            body,
            &ResolvedType::Array(Box::new(ResolvedType::Named(TypeId::new("types.flow", "Report"))))
        );
    }

    #[test]
    fn test_only_named_imports_are_bound() {
        let (types, _) = registry().register(
            "types.flow",
            &[
                TypeDeclarationNode::new("Report", SchemaTypeNode::primitive("json")),
                TypeDeclarationNode::new("Status", SchemaTypeNode::primitive("string")),
            ],
            &[],
            &BTreeMap::new(),
        );
        let snapshots = BTreeMap::from([("types.flow".to_string(), types)]);
        let edges = vec![ImportEdge::new("types.flow", vec![ImportedName::new("Report")])];
        let decls = vec![decl("S", SchemaTypeNode::reference("Status"), 2)];

        let (_, diags) = registry().register("main.flow", &decls, &edges, &snapshots);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code(), DiagnosticCode::UNDEFINED_TYPE);
    }

    #[test]
    fn test_unknown_imported_name() {
        let (types, _) = registry().register(
            "types.flow",
            &[TypeDeclarationNode::new("Report", SchemaTypeNode::primitive("json"))],
            &[],
            &BTreeMap::new(),
        );
        let snapshots = BTreeMap::from([("types.flow".to_string(), types)]);
        let edges = vec![ImportEdge::new("types.flow", vec![ImportedName::new("Reprot")])];

        let (_, diags) = registry().register("main.flow", &[], &edges, &snapshots);
        assert_eq!(diags[0].code(), DiagnosticCode::UNKNOWN_IMPORTED_NAME);
        assert_eq!(diags[0].hint(), Some("did you mean 'Report'?"));
    }

    #[test]
    fn test_alias_colliding_with_declaration() {
        let (types, _) = registry().register(
            "types.flow",
            &[TypeDeclarationNode::new("Report", SchemaTypeNode::primitive("json"))],
            &[],
            &BTreeMap::new(),
        );
        let snapshots = BTreeMap::from([("types.flow".to_string(), types)]);
        let edges = vec![ImportEdge::new("types.flow", vec![ImportedName::new("Report")])];
        let decls = vec![decl("Report", SchemaTypeNode::primitive("string"), 1)];

        let (_, diags) = registry().register("main.flow", &decls, &edges, &snapshots);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code(), DiagnosticCode::BINDING_COLLISION);
    }

    #[test]
    fn test_unavailable_import_is_opaque() {
        let edges = vec![ImportEdge::new("missing.flow", vec![ImportedName::new("Report")])];
        let decls = vec![decl("R", SchemaTypeNode::reference("Report"), 1)];

        let (_, diags) = registry().register("main.flow", &decls, &edges, &BTreeMap::new());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_expand_follows_aliases_and_stops_on_loops() {
        let decls = vec![
            decl("A", SchemaTypeNode::reference("B"), 1),
            decl("B", SchemaTypeNode::primitive("int"), 2),
            decl("X", SchemaTypeNode::reference("Y"), 3),
            decl("Y", SchemaTypeNode::reference("X"), 4),
        ];
        let (snapshot, diags) = registry().register("a.flow", &decls, &[], &BTreeMap::new());
        assert!(diags.is_empty());

        let a = ResolvedType::Named(TypeId::new("a.flow", "A"));
        assert_eq!(snapshot.expand(&a), &ResolvedType::Primitive(Primitive::Int));

        let x = ResolvedType::Named(TypeId::new("a.flow", "X"));
        assert_eq!(snapshot.expand(&x), &ResolvedType::Unknown);
    }
}
