use super::*;
use serde_json::{self, Value as JsonValue};

fn meta(line: usize) -> Meta {
    Meta {
        file: "A.java".into(),
        line,
        column: 1,
    }
}

fn leaf(id: usize, parent: usize, kind: &str, name: &str, native: Option<u32>) -> AstNode {
    AstNode {
        id,
        parent: Some(parent),
        kind: kind.into(),
        value: JsonValue::String(name.into()),
        native: native.map(NativeRef),
        children: vec![],
        meta: meta(id + 1),
    }
}

fn sample() -> FileAst {
    let entry = leaf(2, 1, "VariableDefinitionEntry", "x", None);
    let mut def = leaf(1, 0, "VariableDefinition", "", None);
    def.value = JsonValue::Null;
    def.children = vec![entry];
    let root = AstNode {
        id: 0,
        parent: None,
        kind: "MethodDeclaration".into(),
        value: JsonValue::String("run".into()),
        native: Some(NativeRef(7)),
        children: vec![def],
        meta: meta(1),
    };
    let mut file_ast = FileAst::new("A.java".into(), "java".into());
    file_ast.push(root);
    file_ast
}

#[test]
fn ast_node_serialization_preserves_meta_and_native() {
    let node = leaf(3, 0, "Identifier", "x", Some(4));
    let json = serde_json::to_string(&node).unwrap();
    let v: JsonValue = serde_json::from_str(&json).unwrap();
    assert_eq!(v["meta"]["file"], "A.java");
    assert_eq!(v["meta"]["line"], 4);
    assert_eq!(v["native"], 4);

    let deser: AstNode = serde_json::from_str(&json).unwrap();
    assert_eq!(deser.meta, node.meta);
    assert_eq!(deser.native, Some(NativeRef(4)));
}

#[test]
fn native_reference_defaults_to_none() {
    let json = r#"{"id":0,"parent":null,"kind":"Identifier","value":"x","children":[],"meta":{"file":"a","line":1,"column":1}}"#;
    let node: AstNode = serde_json::from_str(json).unwrap();
    assert!(node.native.is_none());
}

#[test]
fn ast_node_deserialization_fails_without_meta() {
    let json = r#"{"id":0,"parent":null,"kind":"Identifier","value":"x","children":[]}"#;
    assert!(serde_json::from_str::<AstNode>(json).is_err());
}

#[test]
fn file_ast_parent_child_navigation() {
    let file_ast = sample();
    assert_eq!(file_ast.parent(1).expect("parent").kind, "MethodDeclaration");
    let children = file_ast.children(0);
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, 1);
    assert!(file_ast.parent(0).is_none());
    assert!(file_ast.children(2).is_empty());
    assert!(file_ast.parent(42).is_none());
    assert!(file_ast.children(42).is_empty());
}

#[test]
fn ancestors_walk_to_the_root() {
    let file_ast = sample();
    let kinds: Vec<&str> = file_ast.ancestors(2).map(|n| n.kind.as_str()).collect();
    assert_eq!(kinds, vec!["VariableDefinition", "MethodDeclaration"]);
    assert_eq!(file_ast.ancestors(0).count(), 0);
}

#[test]
fn find_matches_kind_and_name() {
    let file_ast = sample();
    assert_eq!(file_ast.find("VariableDefinitionEntry", "x").map(|n| n.id), Some(2));
    assert!(file_ast.find("VariableDefinitionEntry", "y").is_none());
}

#[test]
fn dot_export_lists_edges() {
    let dot = sample().to_dot();
    assert!(dot.contains("0 [label=\"MethodDeclaration:run\"]"));
    assert!(dot.contains("1 -> 2;"));
}
