//! Recovers the native node behind a generic node.

use frontend::{CompilationUnit, NodeId, NodeKind};
use ir::{AstNode, FileAst};

/// Native node for `node`, which must belong to `ast`, the converted form of
/// `tree`.
///
/// A direct back-reference wins. Variable declarations unwrap to their only
/// entry, which is then matched by name against the declarations of the
/// nearest enclosing node that has a reference. Anything else falls back to
/// the parent's reference.
pub fn locate(ast: &FileAst, node: &AstNode, tree: &CompilationUnit) -> Option<NodeId> {
    if let Some(native) = node.native {
        return Some(NodeId(native.0));
    }
    if let Some(entry) = single_entry(node) {
        if let Some(found) = locate_entry(ast, entry, tree) {
            return Some(found);
        }
    }
    ast.parent(node.id)
        .and_then(|p| p.native)
        .map(|native| NodeId(native.0))
}

fn single_entry(node: &AstNode) -> Option<&AstNode> {
    match node.kind.as_str() {
        "VariableDefinitionEntry" => Some(node),
        "VariableDefinition" => {
            let mut entries = node
                .children
                .iter()
                .filter(|c| c.kind == "VariableDefinitionEntry");
            match (entries.next(), entries.next()) {
                (Some(entry), None) => Some(entry),
                _ => None,
            }
        }
        "VariableDeclaration" => match node.children.as_slice() {
            [definition] => single_entry(definition),
            _ => None,
        },
        _ => None,
    }
}

fn locate_entry(ast: &FileAst, entry: &AstNode, tree: &CompilationUnit) -> Option<NodeId> {
    let name = entry.name()?;
    let holder = ast.ancestors(entry.id).find_map(|a| a.native)?;
    let holder = NodeId(holder.0);
    match tree.kind(holder)? {
        NodeKind::MethodDeclaration(method) => {
            let body_locals = method
                .body
                .map(|body| tree.children(body))
                .unwrap_or_default();
            named(tree, &method.parameters, name).or_else(|| local_named(tree, &body_locals, name))
        }
        NodeKind::TypeDeclaration(decl) => named(tree, &decl.fields, name),
        NodeKind::Block { statements } => local_named(tree, statements, name),
        // for-each, catch and resource variables
        other => local_named(tree, &other.children(), name),
    }
}

fn named(tree: &CompilationUnit, candidates: &[NodeId], name: &str) -> Option<NodeId> {
    candidates.iter().copied().find(|&id| {
        tree.kind(id)
            .and_then(NodeKind::variable)
            .map_or(false, |v| v.name == name)
    })
}

fn local_named(tree: &CompilationUnit, candidates: &[NodeId], name: &str) -> Option<NodeId> {
    candidates.iter().copied().find(|&id| {
        matches!(tree.kind(id), Some(NodeKind::LocalDeclaration(v)) if v.name == name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::convert;
    use crate::tests::compile_one;

    const SOURCE: &str = "class A { int x = 1, y; String s; \
        int f(int p) { int q = p; { int r = q; } for (String e : new String[0]) { q += e.length(); } return q; } }";

    fn entry<'a>(ast: &'a FileAst, name: &str) -> &'a AstNode {
        ast.find("VariableDefinitionEntry", name).unwrap()
    }

    fn declared(tree: &CompilationUnit, id: NodeId) -> (&str, &str) {
        let kind = tree.kind(id).unwrap();
        (kind.name(), kind.declared_name().unwrap_or_default())
    }

    #[test]
    fn entries_resolve_through_their_holder() {
        let (result, path) = compile_one("A.java", SOURCE);
        let tree = result.tree(&path).unwrap();
        let ast = convert(tree);
        let cases = [
            ("x", ("FieldDeclaration", "x")),
            ("y", ("FieldDeclaration", "y")),
            ("p", ("Argument", "p")),
            ("q", ("LocalDeclaration", "q")),
            ("r", ("LocalDeclaration", "r")),
            ("e", ("LocalDeclaration", "e")),
        ];
        for (name, expected) in cases {
            let found = locate(&ast, entry(&ast, name), tree).unwrap();
            assert_eq!(declared(tree, found), expected, "entry {name}");
        }
    }

    #[test]
    fn single_definitions_unwrap_but_groups_do_not() {
        let (result, path) = compile_one("A.java", SOURCE);
        let tree = result.tree(&path).unwrap();
        let ast = convert(tree);
        let s_definition = ast.get(entry(&ast, "s").parent.unwrap()).unwrap();
        let s_declaration = ast.parent(s_definition.id).unwrap();
        for node in [s_definition, s_declaration] {
            let found = locate(&ast, node, tree).unwrap();
            assert_eq!(declared(tree, found), ("FieldDeclaration", "s"));
        }
        // Two entries and a parent without a reference.
        let group = ast.get(entry(&ast, "x").parent.unwrap()).unwrap();
        assert!(locate(&ast, group, tree).is_none());
        let declaration = ast.parent(group.id).unwrap();
        let found = locate(&ast, declaration, tree).unwrap();
        assert_eq!(declared(tree, found), ("TypeDeclaration", "A"));
    }

    #[test]
    fn direct_references_win_and_orphans_use_their_parent() {
        let (result, path) = compile_one("A.java", "class A { void f() { g(); } void g() {} }");
        let tree = result.tree(&path).unwrap();
        let ast = convert(tree);
        let f = ast.find("MethodDeclaration", "f").unwrap();
        let found = locate(&ast, f, tree).unwrap();
        assert_eq!(declared(tree, found), ("MethodDeclaration", "f"));

        let call = ast.find("MethodInvocation", "g").unwrap();
        assert!(call.native.is_none());
        let found = locate(&ast, call, tree).unwrap();
        assert_eq!(declared(tree, found), ("MessageSend", "g"));

        let root = &ast.nodes[0];
        assert!(locate(&ast, root, tree).is_none());
    }
}
