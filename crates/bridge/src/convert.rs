//! Converts native compilation units into generic [`FileAst`] trees.
//!
//! Node ids are assigned in pre-order so the flat index lines up with ids.
//! Most nodes keep a [`NativeRef`] to the node they came from. Variable
//! declarations are regrouped the way the generic tree models them
//! (`VariableDeclaration` > `VariableDefinition` > `VariableDefinitionEntry`)
//! and carry no reference, nor do method bodies and statement expressions;
//! the locator recovers those.

use frontend::{CompilationUnit, Constant, NodeId, NodeKind, Span, TypeKind};
use ir::{AstNode, FileAst, Meta, NativeRef};
use serde_json::Value as JsonValue;

pub const FILE_TYPE: &str = "java";

/// Builds the generic tree of `tree`.
pub fn convert(tree: &CompilationUnit) -> FileAst {
    let file = tree.path.to_string_lossy().into_owned();
    let mut converter = Converter {
        tree,
        file: file.clone(),
        next_id: 0,
    };
    let root = converter.unit();
    let mut ast = FileAst::new(file, FILE_TYPE.to_string());
    ast.push(root);
    ast
}

struct Converter<'t> {
    tree: &'t CompilationUnit,
    file: String,
    next_id: usize,
}

impl<'t> Converter<'t> {
    fn shell(
        &mut self,
        kind: &str,
        value: JsonValue,
        parent: Option<usize>,
        span: Span,
        native: Option<NativeRef>,
    ) -> AstNode {
        let id = self.next_id;
        self.next_id += 1;
        AstNode {
            id,
            parent,
            kind: kind.to_string(),
            value,
            native,
            children: Vec::new(),
            meta: Meta {
                file: self.file.clone(),
                line: span.line,
                column: span.column,
            },
        }
    }

    fn unit(&mut self) -> AstNode {
        let tree = self.tree;
        let package = tree.package.clone().map_or(JsonValue::Null, JsonValue::String);
        let start = Span {
            line: 1,
            column: 1,
            ..Span::default()
        };
        let mut root = self.shell("CompilationUnit", package.clone(), None, start, None);
        if tree.package.is_some() {
            let first = tree.package_annotations.first().copied();
            let span = first
                .and_then(|n| tree.node(n))
                .map_or(start, |n| n.span);
            let mut decl = self.shell(
                "PackageDeclaration",
                package,
                Some(root.id),
                span,
                first.map(native),
            );
            decl.children = self.children(&tree.package_annotations, decl.id);
            root.children.push(decl);
        }
        for import in &tree.imports {
            let kind = if import.is_static {
                "StaticImportDeclaration"
            } else {
                "ImportDeclaration"
            };
            let name = if import.on_demand {
                format!("{}.*", import.name)
            } else {
                import.name.clone()
            };
            let node = self.shell(kind, JsonValue::String(name), Some(root.id), import.span, None);
            root.children.push(node);
        }
        let types = self.children(&tree.types, root.id);
        root.children.extend(types);
        root
    }

    /// Converts sibling nodes, folding declarators of one statement into a
    /// single declaration.
    fn children(&mut self, ids: &[NodeId], parent: usize) -> Vec<AstNode> {
        let tree = self.tree;
        let mut out = Vec::with_capacity(ids.len());
        let mut i = 0;
        while i < ids.len() {
            match declarator(tree.kind(ids[i])) {
                Some(Declarator::Parameter) => {
                    out.push(self.definition(&ids[i..=i], parent));
                    i += 1;
                }
                Some(group) => {
                    let statement = statement_span(tree.kind(ids[i]));
                    let mut end = i + 1;
                    while end < ids.len()
                        && declarator(tree.kind(ids[end])) == Some(group)
                        && statement_span(tree.kind(ids[end])) == statement
                    {
                        end += 1;
                    }
                    out.push(self.declaration(&ids[i..end], parent));
                    i = end;
                }
                None => {
                    out.extend(self.node(ids[i], parent));
                    i += 1;
                }
            }
        }
        out
    }

    fn declaration(&mut self, declarators: &[NodeId], parent: usize) -> AstNode {
        let span = self.span_of(declarators[0]);
        let mut node = self.shell("VariableDeclaration", JsonValue::Null, Some(parent), span, None);
        node.children.push(self.definition(declarators, node.id));
        node
    }

    /// `VariableDefinition` holding the shared annotations and type of the
    /// declarators, then one entry per declarator.
    fn definition(&mut self, declarators: &[NodeId], parent: usize) -> AstNode {
        let tree = self.tree;
        let span = self.span_of(declarators[0]);
        let mut node = self.shell("VariableDefinition", JsonValue::Null, Some(parent), span, None);
        if let Some(first) = tree.kind(declarators[0]).and_then(NodeKind::variable) {
            let shared: Vec<NodeId> = first.annotations.iter().copied().chain(first.type_ref).collect();
            let converted = self.children(&shared, node.id);
            node.children.extend(converted);
        }
        for &declarator in declarators {
            let Some(var) = tree.kind(declarator).and_then(NodeKind::variable) else {
                continue;
            };
            let span = self.span_of(declarator);
            let mut entry = self.shell(
                "VariableDefinitionEntry",
                JsonValue::String(var.name.clone()),
                Some(node.id),
                span,
                None,
            );
            if let Some(init) = var.initializer {
                entry.children.extend(self.node(init, entry.id));
            }
            node.children.push(entry);
        }
        node
    }

    fn node(&mut self, id: NodeId, parent: usize) -> Option<AstNode> {
        let tree = self.tree;
        let native_node = tree.node(id)?;
        let (kind, value) = describe(tree, &native_node.kind);
        let mut node = self.shell(&kind, value, Some(parent), native_node.span, Some(native(id)));
        match &native_node.kind {
            NodeKind::Annotation { pairs, .. } => {
                for (name, value) in pairs {
                    let span = self.span_of(*value);
                    let mut element = self.shell(
                        "AnnotationElement",
                        JsonValue::String(name.clone()),
                        Some(node.id),
                        span,
                        None,
                    );
                    element.children.extend(self.node(*value, element.id));
                    node.children.push(element);
                }
            }
            NodeKind::MethodDeclaration(method) => {
                node.children = self.children(&native_node.kind.children(), node.id);
                // Locals of the body resolve through the method.
                if let Some(body) = method.body {
                    for child in &mut node.children {
                        if child.native == Some(native(body)) {
                            child.native = None;
                        }
                    }
                }
            }
            NodeKind::Other { kind, children } if kind == "ExpressionStatement" => {
                node.children = self.children(children, node.id);
                if let [expression] = node.children.as_mut_slice() {
                    node.native = expression.native.take();
                }
            }
            other => {
                node.children = self.children(&other.children(), node.id);
            }
        }
        Some(node)
    }

    fn span_of(&self, id: NodeId) -> Span {
        self.tree.node(id).map(|n| n.span).unwrap_or_default()
    }
}

fn native(id: NodeId) -> NativeRef {
    NativeRef(id.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Declarator {
    Field,
    Local,
    Parameter,
}

fn declarator(kind: Option<&NodeKind>) -> Option<Declarator> {
    match kind? {
        NodeKind::FieldDeclaration(_) => Some(Declarator::Field),
        NodeKind::LocalDeclaration(_) => Some(Declarator::Local),
        NodeKind::Argument(_) => Some(Declarator::Parameter),
        _ => None,
    }
}

fn statement_span(kind: Option<&NodeKind>) -> Option<Span> {
    kind.and_then(NodeKind::variable).map(|v| v.statement)
}

/// Generic kind and value of a native node.
fn describe(tree: &CompilationUnit, kind: &NodeKind) -> (String, JsonValue) {
    let name = |s: &str| JsonValue::String(s.to_string());
    match kind {
        NodeKind::TypeDeclaration(decl) => {
            let kind = match decl.kind {
                TypeKind::Class => "ClassDeclaration",
                TypeKind::Interface => "InterfaceDeclaration",
                TypeKind::Enum => "EnumDeclaration",
                TypeKind::Annotation => "AnnotationDeclaration",
                TypeKind::Record => "RecordDeclaration",
            };
            (kind.to_string(), name(&decl.name))
        }
        NodeKind::MethodDeclaration(m) => (kind.name().to_string(), name(&m.name)),
        NodeKind::Annotation { type_ref, .. } => ("Annotation".to_string(), type_name(tree, *type_ref)),
        NodeKind::MessageSend { selector, .. } => ("MethodInvocation".to_string(), name(selector)),
        NodeKind::Allocation { type_ref, .. } => {
            ("ConstructorInvocation".to_string(), type_name(tree, *type_ref))
        }
        NodeKind::ExplicitConstructorCall { is_super: true, .. } => {
            ("SuperConstructorInvocation".to_string(), JsonValue::Null)
        }
        NodeKind::ExplicitConstructorCall { .. } => {
            ("AlternateConstructorInvocation".to_string(), JsonValue::Null)
        }
        NodeKind::SingleNameReference { name: n } => ("VariableReference".to_string(), name(n)),
        NodeKind::QualifiedNameReference { tokens } => ("Select".to_string(), name(&tokens.join("."))),
        NodeKind::FieldReference { name: n, .. } => ("Select".to_string(), name(n)),
        NodeKind::TypeReference { name: n, .. } => ("TypeReference".to_string(), name(n)),
        NodeKind::ThisReference { is_super: true } => ("Super".to_string(), JsonValue::Null),
        NodeKind::ThisReference { .. } => ("This".to_string(), JsonValue::Null),
        NodeKind::Literal { value } => literal(value.as_ref()),
        NodeKind::ArrayInitializer { .. } => ("ArrayInitializer".to_string(), JsonValue::Null),
        NodeKind::ClassLiteral { type_ref } => ("ClassLiteral".to_string(), type_name(tree, *type_ref)),
        NodeKind::Expression { operator, operands } => {
            let kind = match operator.as_str() {
                "cast" => "Cast",
                "()" => "Parenthesized",
                "?:" => "InlineIfExpression",
                "instanceof" => "InstanceOf",
                op if is_assignment(op) => "Assignment",
                _ if operands.len() == 1 => "UnaryExpression",
                _ => "BinaryExpression",
            };
            (kind.to_string(), name(operator))
        }
        NodeKind::Block { .. } => ("Block".to_string(), JsonValue::Null),
        NodeKind::FieldDeclaration(v) | NodeKind::Argument(v) | NodeKind::LocalDeclaration(v) => {
            (kind.name().to_string(), name(&v.name))
        }
        NodeKind::Other { kind, .. } => (kind.clone(), JsonValue::Null),
    }
}

fn is_assignment(op: &str) -> bool {
    op.ends_with('=') && !matches!(op, "==" | "!=" | "<=" | ">=")
}

fn type_name(tree: &CompilationUnit, type_ref: NodeId) -> JsonValue {
    match tree.kind(type_ref) {
        Some(NodeKind::TypeReference { name, .. }) => JsonValue::String(name.clone()),
        _ => JsonValue::Null,
    }
}

fn literal(value: Option<&Constant>) -> (String, JsonValue) {
    let (kind, value) = match value {
        None => ("NullLiteral", JsonValue::Null),
        Some(Constant::Boolean(b)) => ("BooleanLiteral", JsonValue::Bool(*b)),
        Some(Constant::Char(c)) => ("CharLiteral", JsonValue::String(c.to_string())),
        Some(Constant::String(s)) => ("StringLiteral", JsonValue::String(s.clone())),
        Some(Constant::Byte(v)) => ("IntegralLiteral", JsonValue::from(*v)),
        Some(Constant::Short(v)) => ("IntegralLiteral", JsonValue::from(*v)),
        Some(Constant::Int(v)) => ("IntegralLiteral", JsonValue::from(*v)),
        Some(Constant::Long(v)) => ("IntegralLiteral", JsonValue::from(*v)),
        Some(Constant::Float(v)) => ("FloatingLiteral", JsonValue::from(f64::from(*v))),
        Some(Constant::Double(v)) => ("FloatingLiteral", JsonValue::from(*v)),
    };
    (kind.to_string(), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::compile_one;

    #[test]
    fn ids_follow_the_flat_index() {
        let (result, path) = compile_one(
            "p/A.java",
            "package p; import java.util.*; class A { int a = 1, b; void f(int x) { int y = x; g(y); } void g(int v) {} }",
        );
        let ast = convert(result.tree(&path).unwrap());
        assert_eq!(ast.file_type, "java");
        for (position, node) in ast.index.iter().enumerate() {
            assert_eq!(node.id, position);
            for child in &node.children {
                assert_eq!(child.parent, Some(node.id));
            }
        }
        assert_eq!(ast.nodes[0].kind, "CompilationUnit");
        assert!(ast.find("ImportDeclaration", "java.util.*").is_some());
    }

    #[test]
    fn declarators_of_one_statement_share_a_definition() {
        let (result, path) = compile_one("A.java", "class A { int a = 1, b; String c; }");
        let ast = convert(result.tree(&path).unwrap());
        let declarations: Vec<&AstNode> = ast
            .index
            .iter()
            .filter(|n| n.kind == "VariableDeclaration")
            .collect();
        assert_eq!(declarations.len(), 2);
        let entries: Vec<Vec<&str>> = declarations
            .iter()
            .map(|d| {
                d.children[0]
                    .children
                    .iter()
                    .filter(|c| c.kind == "VariableDefinitionEntry")
                    .filter_map(AstNode::name)
                    .collect()
            })
            .collect();
        assert_eq!(entries, vec![vec!["a", "b"], vec!["c"]]);
        let a = ast.find("VariableDefinitionEntry", "a").unwrap();
        assert!(a.native.is_none());
        assert_eq!(a.children[0].kind, "IntegralLiteral");
        assert_eq!(a.children[0].value, serde_json::json!(1));
    }

    #[test]
    fn bodies_and_statement_expressions_lose_their_reference() {
        let (result, path) = compile_one("A.java", "class A { void f() { g(); } void g() {} }");
        let ast = convert(result.tree(&path).unwrap());
        let f = ast.find("MethodDeclaration", "f").unwrap();
        assert!(f.native.is_some());
        let body = f.children.iter().find(|c| c.kind == "Block").unwrap();
        assert!(body.native.is_none());
        let statement = &body.children[0];
        assert_eq!(statement.kind, "ExpressionStatement");
        assert!(statement.native.is_some());
        assert_eq!(statement.children[0].kind, "MethodInvocation");
        assert!(statement.children[0].native.is_none());
    }
}
