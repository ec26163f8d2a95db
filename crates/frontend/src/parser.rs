//! tree-sitter based Java parser producing the native arena tree.

use tree_sitter::{Node, Parser};

use crate::ast::{
    CompilationUnit, Import, MethodDecl, Modifiers, NativeNode, NodeId, NodeKind, Span, TypeDecl,
    TypeKind, VariableDecl,
};
use crate::constant::{parse_floating_literal, parse_integer_literal, unescape, Constant};
use crate::names::strip_type_arguments;
use crate::source::SourceUnit;
use crate::CompileFault;

pub struct JavaParser {
    parser: Parser,
}

impl JavaParser {
    pub fn new() -> Result<Self, CompileFault> {
        let mut parser = Parser::new();
        parser
            .set_language(tree_sitter_java::language())
            .map_err(|e| CompileFault::Internal {
                file: None,
                message: format!("cannot load the Java grammar: {e}"),
            })?;
        Ok(Self { parser })
    }

    /// Parses one unit. Syntax errors are recorded on the unit, not
    /// returned.
    pub fn parse(&mut self, unit: &SourceUnit) -> Result<CompilationUnit, CompileFault> {
        let src = unit.contents();
        let tree = self
            .parser
            .parse(src, None)
            .ok_or_else(|| CompileFault::Internal {
                file: Some(unit.path().to_path_buf()),
                message: "parser produced no tree".to_string(),
            })?;
        let root = tree.root_node();
        let mut builder = Builder {
            src,
            out: CompilationUnit::new(unit.path().to_path_buf()),
        };
        builder.program(root);
        builder.collect_errors(root);
        Ok(builder.out)
    }
}

/// Parses a single unit with a fresh parser.
pub fn parse_unit(unit: &SourceUnit) -> Result<CompilationUnit, CompileFault> {
    JavaParser::new()?.parse(unit)
}

#[derive(Clone, Copy)]
enum VarRole {
    Field,
    Argument,
    Local,
}

impl VarRole {
    fn wrap(self, decl: VariableDecl) -> NodeKind {
        match self {
            VarRole::Field => NodeKind::FieldDeclaration(decl),
            VarRole::Argument => NodeKind::Argument(decl),
            VarRole::Local => NodeKind::LocalDeclaration(decl),
        }
    }
}

fn span(node: Node) -> Span {
    let start = node.start_position();
    Span {
        start: node.start_byte(),
        end: node.end_byte(),
        line: start.row + 1,
        column: start.column + 1,
    }
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

fn all_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children = node.children(&mut cursor).collect();
    children
}

fn is_type_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "annotation_type_declaration"
            | "record_declaration"
    )
}

fn is_expression(kind: &str) -> bool {
    kind.ends_with("_literal")
        || kind.ends_with("_expression")
        || matches!(
            kind,
            "identifier"
                | "field_access"
                | "scoped_identifier"
                | "method_invocation"
                | "this"
                | "super"
                | "true"
                | "false"
                | "text_block"
                | "array_initializer"
                | "element_value_array_initializer"
                | "annotation"
                | "marker_annotation"
                | "array_access"
                | "method_reference"
        )
}

fn is_type_node(kind: &str) -> bool {
    matches!(
        kind,
        "type_identifier"
            | "scoped_type_identifier"
            | "generic_type"
            | "array_type"
            | "integral_type"
            | "floating_point_type"
            | "boolean_type"
            | "void_type"
            | "annotated_type"
    )
}

fn to_camel(kind: &str) -> String {
    let mut out = String::new();
    let mut up = true;
    for ch in kind.chars() {
        if ch == '_' {
            up = true;
        } else if up {
            out.push(ch.to_ascii_uppercase());
            up = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn compact(text: &str) -> String {
    text.split_whitespace().collect()
}

struct Builder<'s> {
    src: &'s str,
    out: CompilationUnit,
}

impl<'s> Builder<'s> {
    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.src.as_bytes()).unwrap_or("")
    }

    fn reserve(&mut self, parent: Option<NodeId>, node: Node) -> NodeId {
        self.out.push(NativeNode {
            parent,
            span: span(node),
            kind: NodeKind::Other {
                kind: String::new(),
                children: Vec::new(),
            },
        })
    }

    fn leaf(&mut self, parent: NodeId, node: Node, kind: NodeKind) -> NodeId {
        self.out.push(NativeNode {
            parent: Some(parent),
            span: span(node),
            kind,
        })
    }

    fn collect_errors(&mut self, node: Node) {
        if node.is_error() || node.is_missing() {
            self.out.syntax_errors.push(span(node));
            return;
        }
        if node.has_error() {
            for child in all_children(node) {
                self.collect_errors(child);
            }
        }
    }

    fn program(&mut self, root: Node) {
        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => self.package(child),
                "import_declaration" => self.import(child),
                kind if is_type_declaration(kind) => {
                    let id = self.type_declaration(child, None);
                    self.out.types.push(id);
                }
                _ => {}
            }
        }
    }

    fn package(&mut self, node: Node) {
        for child in named_children(node) {
            match child.kind() {
                "annotation" | "marker_annotation" => {
                    let id = self.annotation(child, None);
                    self.out.package_annotations.push(id);
                }
                "identifier" | "scoped_identifier" => {
                    self.out.package = Some(compact(self.text(child)));
                }
                _ => {}
            }
        }
    }

    fn import(&mut self, node: Node) {
        let mut import = Import {
            name: String::new(),
            on_demand: false,
            is_static: false,
            span: span(node),
        };
        for child in all_children(node) {
            match child.kind() {
                "static" => import.is_static = true,
                "asterisk" => import.on_demand = true,
                "identifier" | "scoped_identifier" => import.name = compact(self.text(child)),
                _ => {}
            }
        }
        if !import.name.is_empty() {
            self.out.imports.push(import);
        }
    }

    fn type_declaration(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
        let id = self.reserve(parent, node);
        let kind = match node.kind() {
            "interface_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            "annotation_type_declaration" => TypeKind::Annotation,
            "record_declaration" => TypeKind::Record,
            _ => TypeKind::Class,
        };
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let mut decl = TypeDecl {
            name,
            kind,
            modifiers: Modifiers::empty(),
            annotations: Vec::new(),
            type_parameters: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            member_types: Vec::new(),
            initializers: Vec::new(),
        };
        for child in named_children(node) {
            match child.kind() {
                "modifiers" => {
                    let (modifiers, annotations) = self.modifiers(child, id);
                    decl.modifiers = modifiers;
                    decl.annotations = annotations;
                }
                "type_parameters" => decl.type_parameters = self.type_parameters(child),
                "superclass" => {
                    if let Some(ty) = named_children(child).into_iter().find(|c| is_type_node(c.kind())) {
                        decl.superclass = Some(self.type_ref(ty, id));
                    }
                }
                "super_interfaces" | "extends_interfaces" => {
                    for item in named_children(child) {
                        if item.kind() == "type_list" {
                            for ty in named_children(item) {
                                decl.interfaces.push(self.type_ref(ty, id));
                            }
                        } else if is_type_node(item.kind()) {
                            decl.interfaces.push(self.type_ref(item, id));
                        }
                    }
                }
                "formal_parameters" if kind == TypeKind::Record => {
                    for component in named_children(child) {
                        if component.kind() == "formal_parameter" {
                            let field = self.parameter(component, id, VarRole::Field);
                            decl.fields.push(field);
                        }
                    }
                }
                "class_body" | "interface_body" | "annotation_type_body" | "enum_body" => {
                    self.type_body(child, id, &mut decl)
                }
                _ => {}
            }
        }
        self.out.set_kind(id, NodeKind::TypeDeclaration(decl));
        id
    }

    fn type_body(&mut self, body: Node, id: NodeId, decl: &mut TypeDecl) {
        for member in named_children(body) {
            match member.kind() {
                "field_declaration" | "constant_declaration" => {
                    let fields = self.variables(member, id, VarRole::Field);
                    decl.fields.extend(fields);
                }
                "method_declaration"
                | "constructor_declaration"
                | "compact_constructor_declaration"
                | "annotation_type_element_declaration" => {
                    let method = self.method(member, id);
                    decl.methods.push(method);
                }
                "enum_constant" => {
                    let constant = self.enum_constant(member, id);
                    decl.fields.push(constant);
                }
                "enum_body_declarations" => self.type_body(member, id, decl),
                "block" => {
                    let block = self.block(member, id);
                    decl.initializers.push(block);
                }
                "static_initializer" => {
                    if let Some(block) = named_children(member).into_iter().find(|c| c.kind() == "block") {
                        let block = self.block(block, id);
                        decl.initializers.push(block);
                    }
                }
                kind if is_type_declaration(kind) => {
                    let member_type = self.type_declaration(member, Some(id));
                    decl.member_types.push(member_type);
                }
                _ => {}
            }
        }
    }

    fn modifiers(&mut self, node: Node, owner: NodeId) -> (Modifiers, Vec<NodeId>) {
        let mut modifiers = Modifiers::empty();
        let mut annotations = Vec::new();
        for child in all_children(node) {
            match child.kind() {
                "annotation" | "marker_annotation" => {
                    annotations.push(self.annotation(child, Some(owner)));
                }
                keyword => {
                    if let Some(m) = Modifiers::from_keyword(keyword) {
                        modifiers.insert(m);
                    }
                }
            }
        }
        (modifiers, annotations)
    }

    fn modifiers_of(&mut self, node: Node, owner: NodeId) -> (Modifiers, Vec<NodeId>) {
        match named_children(node).into_iter().find(|c| c.kind() == "modifiers") {
            Some(m) => self.modifiers(m, owner),
            None => (Modifiers::empty(), Vec::new()),
        }
    }

    fn type_parameters(&self, node: Node) -> Vec<String> {
        named_children(node)
            .into_iter()
            .filter(|p| p.kind() == "type_parameter")
            .filter_map(|p| {
                named_children(p)
                    .into_iter()
                    .find(|c| matches!(c.kind(), "type_identifier" | "identifier"))
                    .map(|c| self.text(c).to_string())
            })
            .collect()
    }

    fn annotation(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
        let id = self.reserve(parent, node);
        let name_node = node.child_by_field_name("name").unwrap_or(node);
        let type_ref = self.leaf(
            id,
            name_node,
            NodeKind::TypeReference {
                name: compact(self.text(name_node)),
                arguments: Vec::new(),
                dimensions: 0,
            },
        );
        let mut pairs = Vec::new();
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for arg in named_children(arguments) {
                if arg.kind() == "element_value_pair" {
                    let key = arg
                        .child_by_field_name("key")
                        .map(|k| self.text(k).to_string())
                        .unwrap_or_default();
                    if let Some(value) = arg.child_by_field_name("value") {
                        let value = self.expression(value, id);
                        pairs.push((key, value));
                    }
                } else if arg.kind() != "line_comment" && arg.kind() != "block_comment" {
                    let value = self.expression(arg, id);
                    pairs.push(("value".to_string(), value));
                }
            }
        }
        self.out.set_kind(id, NodeKind::Annotation { type_ref, pairs });
        id
    }

    fn type_ref(&mut self, node: Node, parent: NodeId) -> NodeId {
        self.type_ref_dims(node, parent, 0)
    }

    fn type_ref_dims(&mut self, node: Node, parent: NodeId, extra: u8) -> NodeId {
        let id = self.reserve(Some(parent), node);
        let (name, arguments, dimensions) = self.type_parts(node, id);
        self.out.set_kind(
            id,
            NodeKind::TypeReference {
                name,
                arguments,
                dimensions: dimensions + extra,
            },
        );
        id
    }

    fn type_parts(&mut self, node: Node, id: NodeId) -> (String, Vec<NodeId>, u8) {
        match node.kind() {
            "array_type" => {
                let dims = node
                    .child_by_field_name("dimensions")
                    .map(|d| self.dimension_count(d))
                    .unwrap_or(1);
                match node.child_by_field_name("element") {
                    Some(element) => {
                        let (name, args, inner) = self.type_parts(element, id);
                        (name, args, inner + dims)
                    }
                    None => (compact(&strip_type_arguments(self.text(node))), Vec::new(), dims),
                }
            }
            "generic_type" => {
                let children = named_children(node);
                let name = children
                    .iter()
                    .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))
                    .map(|c| compact(&strip_type_arguments(self.text(*c))))
                    .unwrap_or_default();
                let mut arguments = Vec::new();
                if let Some(args) = children.iter().find(|c| c.kind() == "type_arguments") {
                    for arg in named_children(*args) {
                        arguments.push(self.type_ref(arg, id));
                    }
                }
                (name, arguments, 0)
            }
            "annotated_type" | "wildcard" => {
                match named_children(node)
                    .into_iter()
                    .rev()
                    .find(|c| is_type_node(c.kind()))
                {
                    Some(inner) => self.type_parts(inner, id),
                    None => ("Object".to_string(), Vec::new(), 0),
                }
            }
            _ => (compact(&strip_type_arguments(self.text(node))), Vec::new(), 0),
        }
    }

    fn dimension_count(&self, node: Node) -> u8 {
        self.text(node).matches('[').count() as u8
    }

    fn method(&mut self, node: Node, parent: NodeId) -> NodeId {
        let id = self.reserve(Some(parent), node);
        let is_constructor = matches!(
            node.kind(),
            "constructor_declaration" | "compact_constructor_declaration"
        );
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let (modifiers, annotations) = self.modifiers_of(node, id);
        let type_parameters = node
            .child_by_field_name("type_parameters")
            .map(|t| self.type_parameters(t))
            .unwrap_or_default();
        let extra = node
            .child_by_field_name("dimensions")
            .map(|d| self.dimension_count(d))
            .unwrap_or(0);
        let return_type = if is_constructor {
            None
        } else {
            node.child_by_field_name("type")
                .map(|t| self.type_ref_dims(t, id, extra))
        };
        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| self.parameters(p, id, VarRole::Argument))
            .unwrap_or_default();
        let default_value = node
            .child_by_field_name("value")
            .map(|v| self.expression(v, id));
        let body = node.child_by_field_name("body").map(|b| self.block(b, id));
        self.out.set_kind(
            id,
            NodeKind::MethodDeclaration(MethodDecl {
                name,
                is_constructor,
                modifiers,
                annotations,
                type_parameters,
                return_type,
                parameters,
                body,
                default_value,
            }),
        );
        id
    }

    fn parameters(&mut self, node: Node, parent: NodeId, role: VarRole) -> Vec<NodeId> {
        named_children(node)
            .into_iter()
            .filter(|p| matches!(p.kind(), "formal_parameter" | "spread_parameter"))
            .map(|p| self.parameter(p, parent, role))
            .collect()
    }

    fn parameter(&mut self, node: Node, parent: NodeId, role: VarRole) -> NodeId {
        let id = self.reserve(Some(parent), node);
        let (mut modifiers, annotations) = self.modifiers_of(node, id);
        let is_varargs = node.kind() == "spread_parameter";
        let (type_node, name_node, dims) = if is_varargs {
            let children = named_children(node);
            let declarator = children.iter().copied().find(|c| c.kind() == "variable_declarator");
            let ty = children.iter().copied().find(|c| is_type_node(c.kind()));
            let name = declarator.and_then(|d| d.child_by_field_name("name"));
            (ty, name, 1)
        } else {
            let dims = node
                .child_by_field_name("dimensions")
                .map(|d| self.dimension_count(d))
                .unwrap_or(0);
            (
                node.child_by_field_name("type"),
                node.child_by_field_name("name"),
                dims,
            )
        };
        if matches!(role, VarRole::Field) {
            modifiers.insert(Modifiers::PRIVATE | Modifiers::FINAL);
        }
        let type_ref = type_node.map(|t| self.type_ref_dims(t, id, dims));
        let name = name_node
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        self.out.set_kind(
            id,
            role.wrap(VariableDecl {
                name,
                modifiers,
                annotations,
                type_ref,
                initializer: None,
                is_varargs,
                is_enum_constant: false,
                statement: span(node),
            }),
        );
        id
    }

    /// One node per declarator of a field or local variable statement.
    fn variables(&mut self, node: Node, parent: NodeId, role: VarRole) -> Vec<NodeId> {
        let statement = span(node);
        let modifiers_node = named_children(node)
            .into_iter()
            .find(|c| c.kind() == "modifiers");
        let type_node = node
            .child_by_field_name("type")
            .filter(|t| self.text(*t) != "var");
        let mut out = Vec::new();
        for declarator in named_children(node) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let id = self.reserve(Some(parent), declarator);
            let (modifiers, annotations) = match modifiers_node {
                Some(m) => self.modifiers(m, id),
                None => (Modifiers::empty(), Vec::new()),
            };
            let dims = declarator
                .child_by_field_name("dimensions")
                .map(|d| self.dimension_count(d))
                .unwrap_or(0);
            let type_ref = type_node.map(|t| self.type_ref_dims(t, id, dims));
            let initializer = declarator
                .child_by_field_name("value")
                .map(|v| self.expression(v, id));
            let name = declarator
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default();
            self.out.set_kind(
                id,
                role.wrap(VariableDecl {
                    name,
                    modifiers,
                    annotations,
                    type_ref,
                    initializer,
                    is_varargs: false,
                    is_enum_constant: false,
                    statement,
                }),
            );
            out.push(id);
        }
        out
    }

    fn enum_constant(&mut self, node: Node, parent: NodeId) -> NodeId {
        let id = self.reserve(Some(parent), node);
        let (mut modifiers, annotations) = self.modifiers_of(node, id);
        modifiers.insert(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL);
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let mut init_children = Vec::new();
        let arguments = node.child_by_field_name("arguments");
        let body = node.child_by_field_name("body");
        let initializer = if arguments.is_some() || body.is_some() {
            let init = self.reserve(Some(id), node);
            if let Some(args) = arguments {
                init_children.extend(self.arguments(args, init));
            }
            if let Some(body) = body {
                init_children.push(self.anonymous_body(body, init));
            }
            self.out.set_kind(
                init,
                NodeKind::Other {
                    kind: "EnumConstantInitializer".to_string(),
                    children: init_children,
                },
            );
            Some(init)
        } else {
            None
        };
        self.out.set_kind(
            id,
            NodeKind::FieldDeclaration(VariableDecl {
                name,
                modifiers,
                annotations,
                type_ref: None,
                initializer,
                is_varargs: false,
                is_enum_constant: true,
                statement: span(node),
            }),
        );
        id
    }

    fn block(&mut self, node: Node, parent: NodeId) -> NodeId {
        let id = self.reserve(Some(parent), node);
        let mut statements = Vec::new();
        for child in named_children(node) {
            statements.extend(self.statement(child, id));
        }
        self.out.set_kind(id, NodeKind::Block { statements });
        id
    }

    fn statement(&mut self, node: Node, parent: NodeId) -> Vec<NodeId> {
        match node.kind() {
            "line_comment" | "block_comment" | "comment" => Vec::new(),
            "local_variable_declaration" => self.variables(node, parent, VarRole::Local),
            "block" | "constructor_body" => vec![self.block(node, parent)],
            "explicit_constructor_invocation" => vec![self.constructor_call(node, parent)],
            "enhanced_for_statement" => vec![self.foreach(node, parent)],
            "catch_clause" => vec![self.catch_clause(node, parent)],
            "resource" if node.child_by_field_name("type").is_some() => {
                vec![self.resource(node, parent)]
            }
            kind if is_type_declaration(kind) => vec![self.type_declaration(node, Some(parent))],
            kind if is_expression(kind) => vec![self.expression(node, parent)],
            _ => vec![self.generic(node, parent)],
        }
    }

    fn generic(&mut self, node: Node, parent: NodeId) -> NodeId {
        let id = self.reserve(Some(parent), node);
        let mut children = Vec::new();
        for child in named_children(node) {
            children.extend(self.statement(child, id));
        }
        let kind = if node.is_error() {
            "Error".to_string()
        } else {
            to_camel(node.kind())
        };
        self.out.set_kind(id, NodeKind::Other { kind, children });
        id
    }

    fn single_local(
        &mut self,
        holder: Node,
        parent: NodeId,
        type_node: Option<Node>,
        name_node: Option<Node>,
        initializer: Option<Node>,
    ) -> NodeId {
        let id = self.reserve(Some(parent), name_node.unwrap_or(holder));
        let (modifiers, annotations) = self.modifiers_of(holder, id);
        let type_ref = type_node
            .filter(|t| self.text(*t) != "var")
            .map(|t| self.type_ref(t, id));
        let initializer = initializer.map(|v| self.expression(v, id));
        let name = name_node
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        self.out.set_kind(
            id,
            NodeKind::LocalDeclaration(VariableDecl {
                name,
                modifiers,
                annotations,
                type_ref,
                initializer,
                is_varargs: false,
                is_enum_constant: false,
                statement: span(holder),
            }),
        );
        id
    }

    fn foreach(&mut self, node: Node, parent: NodeId) -> NodeId {
        let id = self.reserve(Some(parent), node);
        let variable = self.single_local(
            node,
            id,
            node.child_by_field_name("type"),
            node.child_by_field_name("name"),
            None,
        );
        let mut children = vec![variable];
        if let Some(value) = node.child_by_field_name("value") {
            children.push(self.expression(value, id));
        }
        if let Some(body) = node.child_by_field_name("body") {
            children.extend(self.statement(body, id));
        }
        self.out.set_kind(
            id,
            NodeKind::Other {
                kind: "ForeachStatement".to_string(),
                children,
            },
        );
        id
    }

    fn catch_clause(&mut self, node: Node, parent: NodeId) -> NodeId {
        let id = self.reserve(Some(parent), node);
        let mut children = Vec::new();
        for child in named_children(node) {
            if child.kind() == "catch_formal_parameter" {
                let ty = named_children(child)
                    .into_iter()
                    .find(|c| c.kind() == "catch_type")
                    .and_then(|c| named_children(c).into_iter().find(|t| is_type_node(t.kind())));
                let name = child.child_by_field_name("name");
                children.push(self.single_local(child, id, ty, name, None));
            } else {
                children.extend(self.statement(child, id));
            }
        }
        self.out.set_kind(
            id,
            NodeKind::Other {
                kind: "CatchClause".to_string(),
                children,
            },
        );
        id
    }

    fn resource(&mut self, node: Node, parent: NodeId) -> NodeId {
        self.single_local(
            node,
            parent,
            node.child_by_field_name("type"),
            node.child_by_field_name("name"),
            node.child_by_field_name("value"),
        )
    }

    fn constructor_call(&mut self, node: Node, parent: NodeId) -> NodeId {
        let id = self.reserve(Some(parent), node);
        let is_super = node
            .child_by_field_name("constructor")
            .map_or(false, |c| c.kind() == "super");
        let arguments = node
            .child_by_field_name("arguments")
            .map(|a| self.arguments(a, id))
            .unwrap_or_default();
        self.out.set_kind(
            id,
            NodeKind::ExplicitConstructorCall {
                is_super,
                arguments,
            },
        );
        id
    }

    fn arguments(&mut self, node: Node, parent: NodeId) -> Vec<NodeId> {
        named_children(node)
            .into_iter()
            .filter(|c| !matches!(c.kind(), "line_comment" | "block_comment"))
            .map(|c| self.expression(c, parent))
            .collect()
    }

    fn anonymous_body(&mut self, body: Node, parent: NodeId) -> NodeId {
        let id = self.reserve(Some(parent), body);
        let mut children = Vec::new();
        for member in named_children(body) {
            match member.kind() {
                "method_declaration" | "constructor_declaration" => {
                    children.push(self.method(member, id))
                }
                "field_declaration" => children.extend(self.variables(member, id, VarRole::Field)),
                "block" => children.push(self.block(member, id)),
                kind if is_type_declaration(kind) => {
                    children.push(self.type_declaration(member, Some(id)))
                }
                _ => {}
            }
        }
        self.out.set_kind(
            id,
            NodeKind::Other {
                kind: "AnonymousClassBody".to_string(),
                children,
            },
        );
        id
    }

    /// Dotted identifier chain (`a.b.c`), if the expression is one.
    fn name_tokens(&self, node: Node) -> Option<Vec<String>> {
        match node.kind() {
            "identifier" => Some(vec![self.text(node).to_string()]),
            "scoped_identifier" => Some(
                compact(self.text(node))
                    .split('.')
                    .map(str::to_string)
                    .collect(),
            ),
            "field_access" => {
                let mut tokens = self.name_tokens(node.child_by_field_name("object")?)?;
                let field = node.child_by_field_name("field")?;
                if field.kind() != "identifier" {
                    return None;
                }
                tokens.push(self.text(field).to_string());
                Some(tokens)
            }
            _ => None,
        }
    }

    fn expression(&mut self, node: Node, parent: NodeId) -> NodeId {
        let kind = node.kind();
        match kind {
            "identifier" => self.leaf(
                parent,
                node,
                NodeKind::SingleNameReference {
                    name: self.text(node).to_string(),
                },
            ),
            "this" | "super" => self.leaf(
                parent,
                node,
                NodeKind::ThisReference {
                    is_super: kind == "super",
                },
            ),
            "scoped_identifier" | "field_access" => match self.name_tokens(node) {
                Some(tokens) if tokens.len() > 1 => {
                    self.leaf(parent, node, NodeKind::QualifiedNameReference { tokens })
                }
                _ => {
                    let id = self.reserve(Some(parent), node);
                    let receiver = match node.child_by_field_name("object") {
                        Some(object) => self.expression(object, id),
                        None => self.leaf(id, node, NodeKind::ThisReference { is_super: false }),
                    };
                    let name = node
                        .child_by_field_name("field")
                        .map(|f| self.text(f).to_string())
                        .unwrap_or_default();
                    self.out
                        .set_kind(id, NodeKind::FieldReference { receiver, name });
                    id
                }
            },
            "method_invocation" => {
                let id = self.reserve(Some(parent), node);
                let receiver = node
                    .child_by_field_name("object")
                    .map(|o| self.expression(o, id));
                let selector = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default();
                let arguments = node
                    .child_by_field_name("arguments")
                    .map(|a| self.arguments(a, id))
                    .unwrap_or_default();
                self.out.set_kind(
                    id,
                    NodeKind::MessageSend {
                        receiver,
                        selector,
                        arguments,
                    },
                );
                id
            }
            "object_creation_expression" => {
                let id = self.reserve(Some(parent), node);
                let type_ref = match node.child_by_field_name("type") {
                    Some(t) => self.type_ref(t, id),
                    None => self.leaf(
                        id,
                        node,
                        NodeKind::TypeReference {
                            name: String::new(),
                            arguments: Vec::new(),
                            dimensions: 0,
                        },
                    ),
                };
                let arguments = node
                    .child_by_field_name("arguments")
                    .map(|a| self.arguments(a, id))
                    .unwrap_or_default();
                let anonymous_body = named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "class_body")
                    .map(|b| self.anonymous_body(b, id));
                self.out.set_kind(
                    id,
                    NodeKind::Allocation {
                        type_ref,
                        arguments,
                        anonymous_body,
                    },
                );
                id
            }
            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal"
            | "binary_integer_literal" => self.number(node, parent, parse_integer_literal),
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                self.number(node, parent, parse_floating_literal)
            }
            "true" | "false" => self.leaf(
                parent,
                node,
                NodeKind::Literal {
                    value: Some(Constant::Boolean(kind == "true")),
                },
            ),
            "null_literal" => self.leaf(parent, node, NodeKind::Literal { value: None }),
            "character_literal" => {
                let text = self.text(node);
                let body = text
                    .strip_prefix('\'')
                    .and_then(|t| t.strip_suffix('\''))
                    .unwrap_or(text);
                let value = unescape(body).chars().next().map(Constant::Char);
                self.leaf(parent, node, NodeKind::Literal { value })
            }
            "string_literal" | "text_block" => {
                let value = Constant::String(self.string_value(node));
                self.leaf(parent, node, NodeKind::Literal { value: Some(value) })
            }
            "array_initializer" | "element_value_array_initializer" => {
                let id = self.reserve(Some(parent), node);
                let elements = self.arguments(node, id);
                self.out.set_kind(id, NodeKind::ArrayInitializer { elements });
                id
            }
            "annotation" | "marker_annotation" => self.annotation(node, Some(parent)),
            "class_literal" => {
                let id = self.reserve(Some(parent), node);
                let type_ref = match named_children(node).into_iter().next() {
                    Some(t) => self.type_ref(t, id),
                    None => self.leaf(
                        id,
                        node,
                        NodeKind::TypeReference {
                            name: String::new(),
                            arguments: Vec::new(),
                            dimensions: 0,
                        },
                    ),
                };
                self.out.set_kind(id, NodeKind::ClassLiteral { type_ref });
                id
            }
            "binary_expression" | "assignment_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| o.kind().to_string())
                    .unwrap_or_default();
                let fields = [node.child_by_field_name("left"), node.child_by_field_name("right")];
                self.operator(node, parent, operator, &fields)
            }
            "unary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| o.kind().to_string())
                    .unwrap_or_default();
                let fields = [node.child_by_field_name("operand")];
                self.operator(node, parent, operator, &fields)
            }
            "update_expression" => {
                let children = all_children(node);
                let operator = children
                    .iter()
                    .find(|c| !c.is_named())
                    .map(|c| c.kind().to_string())
                    .unwrap_or_default();
                let operand = children.into_iter().find(|c| c.is_named());
                self.operator(node, parent, operator, &[operand])
            }
            "parenthesized_expression" => {
                let inner = named_children(node).into_iter().next();
                self.operator(node, parent, "()".to_string(), &[inner])
            }
            "ternary_expression" => {
                let fields = [
                    node.child_by_field_name("condition"),
                    node.child_by_field_name("consequence"),
                    node.child_by_field_name("alternative"),
                ];
                self.operator(node, parent, "?:".to_string(), &fields)
            }
            "cast_expression" => {
                let id = self.reserve(Some(parent), node);
                let mut operands = Vec::new();
                if let Some(ty) = node.child_by_field_name("type") {
                    operands.push(self.type_ref(ty, id));
                }
                if let Some(value) = node.child_by_field_name("value") {
                    operands.push(self.expression(value, id));
                }
                self.out.set_kind(
                    id,
                    NodeKind::Expression {
                        operator: "cast".to_string(),
                        operands,
                    },
                );
                id
            }
            "instanceof_expression" => {
                let id = self.reserve(Some(parent), node);
                let mut operands = Vec::new();
                if let Some(left) = node.child_by_field_name("left") {
                    operands.push(self.expression(left, id));
                }
                if let Some(right) = node.child_by_field_name("right") {
                    operands.push(self.type_ref(right, id));
                }
                self.out.set_kind(
                    id,
                    NodeKind::Expression {
                        operator: "instanceof".to_string(),
                        operands,
                    },
                );
                id
            }
            "lambda_expression" => self.lambda(node, parent),
            _ if is_type_node(kind) => self.type_ref(node, parent),
            _ => self.generic(node, parent),
        }
    }

    fn operator(
        &mut self,
        node: Node,
        parent: NodeId,
        operator: String,
        operands: &[Option<Node>],
    ) -> NodeId {
        let id = self.reserve(Some(parent), node);
        let operands = operands
            .iter()
            .flatten()
            .map(|o| self.expression(*o, id))
            .collect();
        self.out
            .set_kind(id, NodeKind::Expression { operator, operands });
        id
    }

    fn number(
        &mut self,
        node: Node,
        parent: NodeId,
        parse: fn(&str) -> Option<Constant>,
    ) -> NodeId {
        let text = self.text(node);
        match parse(text) {
            Some(value) => self.leaf(parent, node, NodeKind::Literal { value: Some(value) }),
            None => self.leaf(
                parent,
                node,
                NodeKind::Other {
                    kind: "NumberLiteral".to_string(),
                    children: Vec::new(),
                },
            ),
        }
    }

    fn string_value(&self, node: Node) -> String {
        let text = self.text(node);
        if let Some(block) = text.strip_prefix("\"\"\"") {
            let block = block.strip_suffix("\"\"\"").unwrap_or(block);
            let body = block.split_once('\n').map_or("", |(_, rest)| rest);
            let lines: Vec<&str> = body.lines().collect();
            let indent = lines
                .iter()
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.len() - l.trim_start().len())
                .min()
                .unwrap_or(0);
            let joined: Vec<&str> = lines
                .iter()
                .map(|l| l.get(indent..).unwrap_or("").trim_end())
                .collect();
            return unescape(&joined.join("\n"));
        }
        let body = text
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(text);
        unescape(body)
    }

    fn lambda(&mut self, node: Node, parent: NodeId) -> NodeId {
        let id = self.reserve(Some(parent), node);
        let mut children = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            match params.kind() {
                "identifier" => children.push(self.single_local(params, id, None, Some(params), None)),
                "inferred_parameters" => {
                    for p in named_children(params) {
                        children.push(self.single_local(p, id, None, Some(p), None));
                    }
                }
                _ => children.extend(self.parameters(params, id, VarRole::Local)),
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            children.extend(self.statement(body, id));
        }
        self.out.set_kind(
            id,
            NodeKind::Other {
                kind: "LambdaExpression".to_string(),
                children,
            },
        );
        id
    }
}
