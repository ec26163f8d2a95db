//! Native syntax tree produced by the parser.
//!
//! Nodes live in a flat arena owned by [`CompilationUnit`] and refer to each
//! other by [`NodeId`]. Bindings are not stored in the nodes: the scope and
//! attribution passes record them in a side table keyed by node id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::binding::Binding;
use crate::constant::Constant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Byte range plus 1-based line and column of the first byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Annotation,
    Record,
}

impl TypeKind {
    pub fn is_interface(self) -> bool {
        matches!(self, TypeKind::Interface | TypeKind::Annotation)
    }
}

/// Declaration modifiers as a bit set.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const PUBLIC: Modifiers = Modifiers(1);
    pub const PRIVATE: Modifiers = Modifiers(1 << 1);
    pub const PROTECTED: Modifiers = Modifiers(1 << 2);
    pub const STATIC: Modifiers = Modifiers(1 << 3);
    pub const FINAL: Modifiers = Modifiers(1 << 4);
    pub const SYNCHRONIZED: Modifiers = Modifiers(1 << 5);
    pub const VOLATILE: Modifiers = Modifiers(1 << 6);
    pub const TRANSIENT: Modifiers = Modifiers(1 << 7);
    pub const NATIVE: Modifiers = Modifiers(1 << 8);
    pub const ABSTRACT: Modifiers = Modifiers(1 << 10);
    pub const STRICTFP: Modifiers = Modifiers(1 << 11);
    pub const DEFAULT: Modifiers = Modifiers(1 << 12);

    pub const fn empty() -> Self {
        Modifiers(0)
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "public" => Self::PUBLIC,
            "private" => Self::PRIVATE,
            "protected" => Self::PROTECTED,
            "static" => Self::STATIC,
            "final" => Self::FINAL,
            "synchronized" => Self::SYNCHRONIZED,
            "volatile" => Self::VOLATILE,
            "transient" => Self::TRANSIENT,
            "native" => Self::NATIVE,
            "abstract" => Self::ABSTRACT,
            "strictfp" => Self::STRICTFP,
            "default" => Self::DEFAULT,
            _ => return None,
        })
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Modifiers) {
        self.0 |= other.0;
    }

    pub fn is_private(self) -> bool {
        self.contains(Self::PRIVATE)
    }

    pub fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    pub fn is_final(self) -> bool {
        self.contains(Self::FINAL)
    }

    /// Keywords in source order, for display.
    pub fn keywords(self) -> Vec<&'static str> {
        const ORDER: [(Modifiers, &str); 12] = [
            (Modifiers::PUBLIC, "public"),
            (Modifiers::PROTECTED, "protected"),
            (Modifiers::PRIVATE, "private"),
            (Modifiers::ABSTRACT, "abstract"),
            (Modifiers::DEFAULT, "default"),
            (Modifiers::STATIC, "static"),
            (Modifiers::FINAL, "final"),
            (Modifiers::TRANSIENT, "transient"),
            (Modifiers::VOLATILE, "volatile"),
            (Modifiers::SYNCHRONIZED, "synchronized"),
            (Modifiers::NATIVE, "native"),
            (Modifiers::STRICTFP, "strictfp"),
        ];
        ORDER
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, k)| *k)
            .collect()
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl std::fmt::Debug for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Modifiers({})", self.keywords().join(" "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub annotations: Vec<NodeId>,
    pub type_parameters: Vec<String>,
    pub superclass: Option<NodeId>,
    pub interfaces: Vec<NodeId>,
    /// Fields, including enum constants and record components.
    pub fields: Vec<NodeId>,
    /// Methods and constructors.
    pub methods: Vec<NodeId>,
    pub member_types: Vec<NodeId>,
    /// Instance and static initializer blocks.
    pub initializers: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub is_constructor: bool,
    pub modifiers: Modifiers,
    pub annotations: Vec<NodeId>,
    pub type_parameters: Vec<String>,
    /// `None` for constructors.
    pub return_type: Option<NodeId>,
    pub parameters: Vec<NodeId>,
    pub body: Option<NodeId>,
    /// Default value of an annotation type element.
    pub default_value: Option<NodeId>,
}

/// A single declarator. `int a, b;` produces two of these sharing the same
/// `statement` span.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub annotations: Vec<NodeId>,
    /// `None` for `var`, inferred lambda parameters and enum constants.
    pub type_ref: Option<NodeId>,
    pub initializer: Option<NodeId>,
    pub is_varargs: bool,
    pub is_enum_constant: bool,
    pub statement: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    TypeDeclaration(TypeDecl),
    MethodDeclaration(MethodDecl),
    FieldDeclaration(VariableDecl),
    Argument(VariableDecl),
    LocalDeclaration(VariableDecl),
    Block {
        statements: Vec<NodeId>,
    },
    Annotation {
        type_ref: NodeId,
        /// `(name, value)`; a single-element annotation uses `value`.
        pairs: Vec<(String, NodeId)>,
    },
    MessageSend {
        receiver: Option<NodeId>,
        selector: String,
        arguments: Vec<NodeId>,
    },
    Allocation {
        type_ref: NodeId,
        arguments: Vec<NodeId>,
        anonymous_body: Option<NodeId>,
    },
    ExplicitConstructorCall {
        is_super: bool,
        arguments: Vec<NodeId>,
    },
    SingleNameReference {
        name: String,
    },
    QualifiedNameReference {
        tokens: Vec<String>,
    },
    FieldReference {
        receiver: NodeId,
        name: String,
    },
    TypeReference {
        /// Name as written, type arguments removed.
        name: String,
        arguments: Vec<NodeId>,
        dimensions: u8,
    },
    ThisReference {
        is_super: bool,
    },
    /// `None` is the `null` literal.
    Literal {
        value: Option<Constant>,
    },
    ArrayInitializer {
        elements: Vec<NodeId>,
    },
    ClassLiteral {
        type_ref: NodeId,
    },
    /// Operators, casts (`cast`, operands `[type, value]`), parentheses
    /// (`()`), conditionals (`?:`) and assignments.
    Expression {
        operator: String,
        operands: Vec<NodeId>,
    },
    Other {
        kind: String,
        children: Vec<NodeId>,
    },
}

impl NodeKind {
    /// Short name of the variant, as used in the converted tree.
    pub fn name(&self) -> &str {
        match self {
            NodeKind::TypeDeclaration(_) => "TypeDeclaration",
            NodeKind::MethodDeclaration(m) if m.is_constructor => "ConstructorDeclaration",
            NodeKind::MethodDeclaration(_) => "MethodDeclaration",
            NodeKind::FieldDeclaration(_) => "FieldDeclaration",
            NodeKind::Argument(_) => "Argument",
            NodeKind::LocalDeclaration(_) => "LocalDeclaration",
            NodeKind::Block { .. } => "Block",
            NodeKind::Annotation { .. } => "Annotation",
            NodeKind::MessageSend { .. } => "MessageSend",
            NodeKind::Allocation { .. } => "AllocationExpression",
            NodeKind::ExplicitConstructorCall { .. } => "ExplicitConstructorCall",
            NodeKind::SingleNameReference { .. } => "SingleNameReference",
            NodeKind::QualifiedNameReference { .. } => "QualifiedNameReference",
            NodeKind::FieldReference { .. } => "FieldReference",
            NodeKind::TypeReference { .. } => "TypeReference",
            NodeKind::ThisReference { is_super: true } => "SuperReference",
            NodeKind::ThisReference { .. } => "ThisReference",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::ArrayInitializer { .. } => "ArrayInitializer",
            NodeKind::ClassLiteral { .. } => "ClassLiteralAccess",
            NodeKind::Expression { .. } => "Expression",
            NodeKind::Other { kind, .. } => kind,
        }
    }

    /// Declared or referenced simple name, when the node has one.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            NodeKind::TypeDeclaration(t) => Some(&t.name),
            NodeKind::MethodDeclaration(m) => Some(&m.name),
            NodeKind::FieldDeclaration(v) | NodeKind::Argument(v) | NodeKind::LocalDeclaration(v) => {
                Some(&v.name)
            }
            NodeKind::MessageSend { selector, .. } => Some(selector),
            NodeKind::SingleNameReference { name } | NodeKind::FieldReference { name, .. } => {
                Some(name)
            }
            NodeKind::QualifiedNameReference { tokens } => tokens.last().map(String::as_str),
            NodeKind::TypeReference { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn variable(&self) -> Option<&VariableDecl> {
        match self {
            NodeKind::FieldDeclaration(v) | NodeKind::Argument(v) | NodeKind::LocalDeclaration(v) => {
                Some(v)
            }
            _ => None,
        }
    }

    /// Children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self {
            NodeKind::TypeDeclaration(t) => {
                out.extend(&t.annotations);
                out.extend(t.superclass);
                out.extend(&t.interfaces);
                out.extend(&t.fields);
                out.extend(&t.initializers);
                out.extend(&t.methods);
                out.extend(&t.member_types);
            }
            NodeKind::MethodDeclaration(m) => {
                out.extend(&m.annotations);
                out.extend(m.return_type);
                out.extend(&m.parameters);
                out.extend(m.default_value);
                out.extend(m.body);
            }
            NodeKind::FieldDeclaration(v) | NodeKind::Argument(v) | NodeKind::LocalDeclaration(v) => {
                out.extend(&v.annotations);
                out.extend(v.type_ref);
                out.extend(v.initializer);
            }
            NodeKind::Block { statements } => out.extend(statements),
            NodeKind::Annotation { type_ref, pairs } => {
                out.push(*type_ref);
                out.extend(pairs.iter().map(|(_, v)| *v));
            }
            NodeKind::MessageSend {
                receiver,
                arguments,
                ..
            } => {
                out.extend(*receiver);
                out.extend(arguments);
            }
            NodeKind::Allocation {
                type_ref,
                arguments,
                anonymous_body,
            } => {
                out.push(*type_ref);
                out.extend(arguments);
                out.extend(*anonymous_body);
            }
            NodeKind::ExplicitConstructorCall { arguments, .. } => out.extend(arguments),
            NodeKind::FieldReference { receiver, .. } => out.push(*receiver),
            NodeKind::TypeReference { arguments, .. } => out.extend(arguments),
            NodeKind::ArrayInitializer { elements } => out.extend(elements),
            NodeKind::ClassLiteral { type_ref } => out.push(*type_ref),
            NodeKind::Expression { operands, .. } => out.extend(operands),
            NodeKind::Other { children, .. } => out.extend(children),
            NodeKind::SingleNameReference { .. }
            | NodeKind::QualifiedNameReference { .. }
            | NodeKind::ThisReference { .. }
            | NodeKind::Literal { .. } => {}
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeNode {
    pub parent: Option<NodeId>,
    pub span: Span,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Dotted name without the trailing `.*`.
    pub name: String,
    pub on_demand: bool,
    pub is_static: bool,
    pub span: Span,
}

/// Per-unit naming context computed when types are entered.
#[derive(Debug, Clone, Default)]
pub(crate) struct UnitScope {
    pub package: String,
    pub imports: Vec<Import>,
    pub top_types: Vec<crate::binding::TypeId>,
}

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub path: PathBuf,
    pub package: Option<String>,
    pub package_annotations: Vec<NodeId>,
    pub imports: Vec<Import>,
    /// Top-level type declarations.
    pub types: Vec<NodeId>,
    pub syntax_errors: Vec<Span>,
    nodes: Vec<NativeNode>,
    bindings: HashMap<NodeId, Binding>,
    pub(crate) scope: UnitScope,
}

impl CompilationUnit {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            package: None,
            package_annotations: Vec::new(),
            imports: Vec::new(),
            types: Vec::new(),
            syntax_errors: Vec::new(),
            nodes: Vec::new(),
            bindings: HashMap::new(),
            scope: UnitScope::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&NativeNode> {
        self.nodes.get(id.index())
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).map(NodeKind::children).unwrap_or_default()
    }

    /// Root-level nodes: package annotations then type declarations.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.package_annotations.iter().chain(&self.types).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NativeNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn binding(&self, id: NodeId) -> Option<Binding> {
        self.bindings.get(&id).copied()
    }

    pub(crate) fn bind(&mut self, id: NodeId, binding: Binding) {
        self.bindings.insert(id, binding);
    }

    pub(crate) fn push(&mut self, node: NativeNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub(crate) fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.kind = kind;
        }
    }

    pub fn has_syntax_errors(&self) -> bool {
        !self.syntax_errors.is_empty()
    }

    pub fn type_decl(&self, id: NodeId) -> Option<&TypeDecl> {
        match self.kind(id)? {
            NodeKind::TypeDeclaration(t) => Some(t),
            _ => None,
        }
    }

    pub fn method_decl(&self, id: NodeId) -> Option<&MethodDecl> {
        match self.kind(id)? {
            NodeKind::MethodDeclaration(m) => Some(m),
            _ => None,
        }
    }

    /// True when an annotation type is declared at top level or as a direct
    /// member of a top-level type.
    pub fn declares_annotation_type(&self) -> bool {
        self.types.iter().any(|&top| {
            let Some(decl) = self.type_decl(top) else {
                return false;
            };
            decl.kind == TypeKind::Annotation
                || decl
                    .member_types
                    .iter()
                    .filter_map(|&m| self.type_decl(m))
                    .any(|m| m.kind == TypeKind::Annotation)
        })
    }

    /// Finds a type declaration by its dotted name relative to the package
    /// (`Outer.Inner`).
    pub fn find_type(&self, relative_name: &str) -> Option<NodeId> {
        let mut segments = relative_name.split('.');
        let first = segments.next()?;
        let mut current = *self
            .types
            .iter()
            .find(|&&t| self.type_decl(t).map(|d| d.name.as_str()) == Some(first))?;
        for segment in segments {
            let decl = self.type_decl(current)?;
            current = *decl
                .member_types
                .iter()
                .find(|&&m| self.type_decl(m).map(|d| d.name.as_str()) == Some(segment))?;
        }
        Some(current)
    }
}
