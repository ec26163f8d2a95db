use std::path::{Path, PathBuf};

use frontend::{Constant, NodeKind, SourceUnit};
use pretty_assertions::assert_eq;

use crate::{
    compile, BridgeOptions, CompilationResult, JsonAnnotations, ResolvedClass, ResolvedSymbol,
    Resolver, SourceRegistry, Value, WarnedFiles,
};

pub(crate) fn compile_all(sources: &[(&str, &str)]) -> CompilationResult {
    let units = sources
        .iter()
        .map(|(path, text)| SourceUnit::new(*path, *text))
        .collect();
    compile(units, &[], &BridgeOptions::default(), &mut WarnedFiles::default())
}

pub(crate) fn compile_one(path: &str, text: &str) -> (CompilationResult, PathBuf) {
    (compile_all(&[(path, text)]), PathBuf::from(path))
}

fn class<'a>(rx: &Resolver<'a>, name: &str) -> ResolvedClass<'a> {
    rx.find_class(name)
        .unwrap_or_else(|| panic!("class {name} not found"))
}

fn annotation_names(annotations: &[crate::ResolvedAnnotation<'_>]) -> Vec<String> {
    annotations.iter().map(|a| a.name()).collect()
}

#[test]
fn overriding_methods_mask_inherited_ones() {
    let result = compile_all(&[(
        "p/C.java",
        "package p; \
         class A { void run(String s) {} void other() {} private void hidden() {} } \
         class B extends A { void run(String s) {} } \
         class C extends B { void run(String t) {} private void own() {} C(int x) {} }",
    )]);
    let rx = Resolver::new(&result).unwrap();
    let c = class(&rx, "p.C");

    let runs: Vec<_> = c
        .methods(true)
        .into_iter()
        .filter(|m| m.name() == "run")
        .collect();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].declaring_class().unwrap().qualified_name(), "p.C");

    let names: Vec<String> = c.methods(true).iter().map(|m| m.name()).collect();
    assert!(names.contains(&"other".to_string()));
    assert!(names.contains(&"own".to_string()));
    assert!(names.contains(&"toString".to_string()));
    assert!(!names.contains(&"hidden".to_string()));
    assert!(!names.contains(&"C".to_string()));

    let own: Vec<String> = c.methods(false).iter().map(|m| m.name()).collect();
    assert_eq!(own, vec!["run", "own"]);

    let constructors = c.constructors();
    assert_eq!(constructors.len(), 1);
    assert_eq!(constructors[0].name(), "C");
    assert_eq!(constructors[0].signature(), "<init>(int)");
    assert!(constructors[0].super_method().is_none());
}

#[test]
fn super_methods_follow_the_superclass_chain() {
    let result = compile_all(&[(
        "p/C.java",
        "package p; \
         class A { void run(String s) {} } \
         class B extends A { void run(String s) {} } \
         class C extends B { void run(String t) {} void run(int i) {} }",
    )]);
    let rx = Resolver::new(&result).unwrap();
    let c = class(&rx, "p.C");
    let run = c.methods_named("run");
    assert_eq!(run.len(), 2);
    let string_run = run
        .iter()
        .find(|m| m.argument_type(0).as_deref() == Some("java.lang.String"))
        .unwrap();
    let b_run = string_run.super_method().unwrap();
    assert_eq!(b_run.declaring_class().unwrap().name(), "B");
    let a_run = b_run.super_method().unwrap();
    assert_eq!(a_run.declaring_class().unwrap().name(), "A");
    assert!(a_run.super_method().is_none());
    assert!(string_run.is_overriding());

    let int_run = run.iter().find(|m| m.argument_type(0).as_deref() == Some("int")).unwrap();
    assert!(int_run.super_method().is_none());
    assert!(!int_run.is_overriding());
    assert_eq!(int_run.signature(), "run(int)");
}

#[test]
fn overrides_through_parameterized_supertypes() {
    let result = compile_all(&[(
        "p/K.java",
        "package p; \
         class A<T> { void f(T t) {} <T> void g(T t) {} } \
         class B extends A<String> { void f(String s) {} void g(Object o) {} } \
         class C<U> extends A<U> {} \
         class D extends C<Integer> { void f(Integer i) {} } \
         class E extends A<String> { void f(Integer i) {} } \
         class R extends A { void f(Object o) {} } \
         class K implements Comparable<K> { public int compareTo(K o) { return 0; } }",
    )]);
    let rx = Resolver::new(&result).unwrap();
    let declared_in = |m: &crate::ResolvedMethod<'_>| m.declaring_class().unwrap().qualified_name();

    let b = class(&rx, "p.B");
    let f = b.methods_named("f");
    assert_eq!(f.len(), 1);
    assert_eq!(f[0].signature(), "f(java.lang.String)");
    assert_eq!(declared_in(&f[0].super_method().unwrap()), "p.A");
    assert!(f[0].is_overriding());
    let g = b.methods_named("g");
    assert_eq!(g.len(), 1);
    assert!(g[0].super_method().is_some());

    let d = class(&rx, "p.D").methods_named("f");
    assert_eq!(d.len(), 1);
    assert_eq!(declared_in(&d[0].super_method().unwrap()), "p.A");

    let e = class(&rx, "p.E").methods_named("f");
    assert_eq!(e.len(), 2);
    assert!(e.iter().all(|m| declared_in(m) != "p.E" || m.super_method().is_none()));

    let raw = class(&rx, "p.R").methods_named("f");
    assert_eq!(raw.len(), 1);
    assert!(raw[0].super_method().is_some());

    let compare_to = class(&rx, "p.K").methods_named("compareTo")[0];
    assert!(compare_to.super_method().is_none());
    assert!(compare_to.is_overriding());
    assert_eq!(
        class(&rx, "p.A").methods_named("f")[0].signature(),
        "f(java.lang.Object)"
    );
}

#[test]
fn private_super_methods_only_count_within_one_outermost_type() {
    let result = compile_all(&[(
        "p/A.java",
        "package p; \
         class A { private void f() {} } \
         class B extends A { void f() {} } \
         class Outer { static class X { private void g() {} } static class Y extends X { void g() {} } }",
    )]);
    let rx = Resolver::new(&result).unwrap();
    let b_f = class(&rx, "p.B").methods_named("f");
    assert_eq!(b_f.len(), 1);
    assert!(b_f[0].super_method().is_none());

    let y_g = &class(&rx, "p.Outer.Y").methods_named("g")[0];
    let x_g = y_g.super_method().unwrap();
    assert_eq!(x_g.declaring_class().unwrap().qualified_name(), "p.Outer.X");
}

#[test]
fn strict_checks_start_at_the_superclass() {
    let result = compile_all(&[
        ("p/A.java", "package p; public class A implements Runnable { public void run() {} }"),
        ("p/B.java", "package p; public class B extends A {}"),
    ]);
    let rx = Resolver::new(&result).unwrap();
    let a = class(&rx, "p.A");
    let b = class(&rx, "p.B");
    assert!(b.is_implementing("java.lang.Runnable", false));
    assert!(b.is_implementing("java.lang.Runnable", true));
    assert!(a.is_implementing("java.lang.Runnable", false));
    assert!(!a.is_implementing("java.lang.Runnable", true));

    assert!(b.is_subclass_of("p.A", true));
    assert!(a.is_subclass_of("p.A", false));
    assert!(!a.is_subclass_of("p.A", true));
    assert!(b.is_subclass_of("java.lang.Object", true));
    assert!(b.is_inheriting_from("java.lang.Runnable", true));
    assert!(!b.is_inheriting_from("java.io.Serializable", false));
}

#[test]
fn superinterfaces_are_checked_recursively() {
    let result = compile_all(&[(
        "p/I.java",
        "package p; interface Base {} interface I extends Base {} class Impl implements I {}",
    )]);
    let rx = Resolver::new(&result).unwrap();
    let imp = class(&rx, "p.Impl");
    assert!(imp.is_implementing("p.Base", false));
    assert!(imp.is_implementing("p.I", false));
    assert!(!imp.is_implementing("p.Impl", false));
    assert!(class(&rx, "p.I").is_interface());
}

#[test]
fn names_drop_type_arguments() {
    let result = compile_all(&[(
        "p/Box.java",
        "package p; class Box<T> { class Inner<U> {} static class Plain {} }",
    )]);
    let rx = Resolver::new(&result).unwrap();
    let boxed = class(&rx, "p.Box");
    assert_eq!(boxed.name(), "Box");
    assert_eq!(boxed.qualified_name(), "p.Box");
    let inner = class(&rx, "p.Box.Inner");
    assert_eq!(inner.name(), "Inner");
    assert_eq!(inner.qualified_name(), "p.Box.Inner");
    assert_eq!(inner.containing_class(), Some(boxed));
    assert!(class(&rx, "p.Box.Plain").is_in_package("p"));
}

#[test]
fn inherited_fields_are_masked_by_name() {
    let result = compile_all(&[(
        "p/B.java",
        "package p; class A { int x; private int y; static final int N = 2 * 3; } class B extends A { String x; }",
    )]);
    let rx = Resolver::new(&result).unwrap();
    let b = class(&rx, "p.B");
    let fields: Vec<(&str, String)> = b
        .fields(true)
        .iter()
        .map(|f| (f.name(), f.type_name()))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("x", "java.lang.String".to_string()),
            ("N", "int".to_string())
        ]
    );
    let n = b.field("N").unwrap();
    assert_eq!(n.value(), Some(Constant::Int(6)));
    assert!(n.is_static() && n.is_final());
    assert!(b.field("y").is_none());
}

#[test]
fn class_annotations_come_from_the_most_derived_annotated_level() {
    let result = compile_all(&[(
        "p/C.java",
        "package p; @Deprecated class A {} @FunctionalInterface class B extends A {} class C extends B {}",
    )]);
    let rx = Resolver::new(&result).unwrap();
    let c = class(&rx, "p.C");
    assert!(c.annotations(false).is_empty());
    assert_eq!(
        annotation_names(&c.annotations(true)),
        vec!["java.lang.FunctionalInterface"]
    );
    assert_eq!(
        annotation_names(&class(&rx, "p.A").annotations(true)),
        vec!["java.lang.Deprecated"]
    );
}

#[test]
fn external_class_annotations_share_the_winning_level() {
    let result = compile_all(&[(
        "p/C.java",
        "package p; @Deprecated class A {} class B extends A {} class C extends B {} class D extends A {}",
    )]);
    let db = JsonAnnotations::from_json(
        r#"{ "classes": {
            "p.A": { "annotations": [{ "name": "javax.annotation.Nonnull" }] },
            "p.B": { "annotations": [{ "name": "javax.annotation.concurrent.Immutable" }] }
        } }"#,
    )
    .unwrap();
    let rx = Resolver::new(&result).unwrap().with_external(&db);
    assert_eq!(
        annotation_names(&class(&rx, "p.C").annotations(true)),
        vec!["javax.annotation.concurrent.Immutable"]
    );
    assert_eq!(
        annotation_names(&class(&rx, "p.D").annotations(true)),
        vec!["java.lang.Deprecated", "javax.annotation.Nonnull"]
    );
    assert!(class(&rx, "p.C").annotations(false).is_empty());
}

#[test]
fn method_annotations_merge_the_override_chain() {
    let result = compile_all(&[(
        "p/B.java",
        "package p; \
         class A { @Deprecated void run(@SuppressWarnings(\"x\") String s) {} } \
         class B extends A { @Override @Deprecated void run(String s) {} }",
    )]);
    let rx = Resolver::new(&result).unwrap();
    let run = &class(&rx, "p.B").methods_named("run")[0];
    assert_eq!(
        annotation_names(&run.annotations()),
        vec!["java.lang.Override", "java.lang.Deprecated"]
    );
    assert_eq!(
        annotation_names(&run.parameter_annotations(0)),
        vec!["java.lang.SuppressWarnings"]
    );
    assert!(run.parameter_annotations(3).is_empty());
}

#[test]
fn external_annotations_are_merged_and_deduplicated() {
    let result = compile_all(&[(
        "p/A.java",
        "package p; @Deprecated class A { static final String NAME = \"a\"; void run(String s) {} }",
    )]);
    let db = JsonAnnotations::from_json(
        r#"{ "classes": { "p.A": {
            "annotations": [{ "name": "java.lang.Deprecated" }, { "name": "javax.annotation.Nonnull" }],
            "methods": { "run(java.lang.String)": {
                "annotations": [{ "name": "javax.annotation.CheckReturnValue", "values": { "when": "ALWAYS", "level": 2 } }],
                "parameters": { "0": [{ "name": "javax.annotation.Nullable" }] }
            } },
            "fields": { "NAME": [{ "name": "javax.annotation.concurrent.GuardedBy", "values": { "value": ["lock"] } }] }
        } } }"#,
    )
    .unwrap();
    let rx = Resolver::new(&result).unwrap().with_external(&db);
    let a = class(&rx, "p.A");
    assert_eq!(
        annotation_names(&a.annotations(false)),
        vec!["java.lang.Deprecated", "javax.annotation.Nonnull"]
    );
    assert!(!a.annotations(false)[0].is_external());

    let run = &a.methods_named("run")[0];
    let annotations = run.annotations();
    assert_eq!(annotation_names(&annotations), vec!["javax.annotation.CheckReturnValue"]);
    assert_eq!(
        annotations[0].value("when"),
        Some(Value::Constant(Constant::String("ALWAYS".to_string())))
    );
    assert_eq!(annotations[0].value("level"), Some(Value::Constant(Constant::Int(2))));
    assert_eq!(
        annotation_names(&run.parameter_annotations(0)),
        vec!["javax.annotation.Nullable"]
    );

    let name = a.field("NAME").unwrap();
    let guarded = &name.annotations()[0];
    assert_eq!(
        guarded.value("value"),
        Some(Value::Array(vec![Value::Constant(Constant::String("lock".to_string()))]))
    );
}

#[test]
fn typedef_annotations_keep_their_named_constants() {
    let result = compile_all(&[
        (
            "q/IntDef.java",
            "package q; public @interface IntDef { int[] value() default {}; boolean flag() default false; }",
        ),
        (
            "p/Mode.java",
            "package p; import q.IntDef; @IntDef({Mode.ON, Mode.OFF, -1}) public @interface Mode { int ON = 1; int OFF = 0; }",
        ),
        (
            "p/User.java",
            "package p; import q.IntDef; public class User { @IntDef({Mode.ON, 5}) int state; }",
        ),
    ]);
    let rx = Resolver::new(&result).unwrap();
    let mode = class(&rx, "p.Mode");
    let typedef = &mode.annotations(false)[0];
    assert_eq!(typedef.name(), "q.IntDef");
    let Some(Value::Array(values)) = typedef.value("value") else {
        panic!("expected an array value");
    };
    let rendered: Vec<String> = values
        .iter()
        .map(|v| match v {
            Value::Symbol(ResolvedSymbol::Field(f)) => format!("field {}", f.name()),
            Value::Constant(c) => format!("const {c}"),
            other => format!("{other:?}"),
        })
        .collect();
    assert_eq!(rendered, vec!["field ON", "field OFF", "const -1"]);

    // Outside an annotation type the folded values are used.
    let state = class(&rx, "p.User").field("state").unwrap();
    let folded = &state.annotations()[0];
    assert_eq!(
        folded.value("value"),
        Some(Value::Array(vec![
            Value::Constant(Constant::Int(1)),
            Value::Constant(Constant::Int(5))
        ]))
    );
}

#[test]
fn enum_constant_values_resolve_to_fields() {
    let result = compile_all(&[(
        "p/Keep.java",
        "package p; import java.lang.annotation.*; @Retention(RetentionPolicy.SOURCE) @interface Keep { String why() default \"none\"; }",
    )]);
    let rx = Resolver::new(&result).unwrap();
    let keep = class(&rx, "p.Keep");
    assert!(keep.is_annotation_type());
    let retention = &keep.annotations(false)[0];
    match retention.value("value") {
        Some(Value::Symbol(ResolvedSymbol::Field(f))) => {
            assert_eq!(f.name(), "SOURCE");
            assert!(f.is_enum_constant());
        }
        other => panic!("unexpected {other:?}"),
    }
    let why = &keep.methods_named("why")[0];
    assert_eq!(
        why.default_value(),
        Some(Value::Constant(Constant::String("none".to_string())))
    );
}

#[test]
fn problem_bindings_resolve_to_nothing() {
    let (result, path) = compile_one(
        "A.java",
        "class A { Missing m; void f() { missing(); int n = 1; n++; } }",
    );
    let rx = Resolver::new(&result).unwrap();
    let tree = result.tree(&path).unwrap();
    for (id, node) in tree.iter() {
        match &node.kind {
            NodeKind::MessageSend { selector, .. } if selector == "missing" => {
                assert!(rx.resolve(tree, id).is_none());
            }
            NodeKind::TypeReference { name, .. } if name == "Missing" => {
                assert!(rx.resolve(tree, id).is_none());
            }
            NodeKind::LocalDeclaration(v) => {
                let symbol = rx.resolve(tree, id).unwrap();
                assert_eq!(symbol.name(), v.name);
                assert_eq!(symbol.as_variable().unwrap().type_name(), "int");
            }
            _ => {}
        }
    }
}

#[test]
fn expression_types_are_classes() {
    let (result, path) = compile_one(
        "p/A.java",
        "package p; class A { String name; A self() { return this; } int f() { String s = \"x\"; return s.length() + self().name.length(); } }",
    );
    let rx = Resolver::new(&result).unwrap();
    let tree = result.tree(&path).unwrap();
    let mut seen = 0;
    for (id, node) in tree.iter() {
        let expected = match &node.kind {
            NodeKind::SingleNameReference { name } if name == "s" => "java.lang.String",
            NodeKind::Literal { value: Some(Constant::String(_)) } => "java.lang.String",
            NodeKind::MessageSend { selector, .. } if selector == "self" => "p.A",
            NodeKind::ThisReference { is_super: false } => "p.A",
            _ => continue,
        };
        seen += 1;
        let ty = rx.type_of(tree, id).unwrap();
        assert_eq!(ty.qualified_name(), expected);
    }
    assert_eq!(seen, 4);
}

#[test]
fn symbols_narrow_to_their_kind() {
    let (result, path) = compile_one(
        "p/A.java",
        "package p; @Deprecated abstract class A { enum Mode { ON } Mode mode; \
         abstract void run(int a, String b); void go() { Mode m = Mode.ON; } }",
    );
    let rx = Resolver::new(&result).unwrap();
    let tree = result.tree(&path).unwrap();
    let mut seen = Vec::new();
    for (id, node) in tree.iter() {
        let Some(symbol) = rx.resolve(tree, id) else {
            continue;
        };
        match &node.kind {
            NodeKind::TypeDeclaration(decl) if decl.name == "A" => {
                assert!(symbol.as_class().unwrap().is_abstract());
                assert!(symbol.as_method().is_none());
                seen.push("class");
            }
            NodeKind::MethodDeclaration(_) if symbol.describe().contains("run(") => {
                let run = symbol.as_method().unwrap();
                assert_eq!(run.argument_count(), 2);
                assert!(run.is_abstract());
                seen.push("method");
            }
            NodeKind::FieldDeclaration(_) => {
                let mode = symbol.as_field().unwrap().type_class().unwrap();
                assert!(mode.is_enum());
                assert_eq!(mode.qualified_name(), "p.A.Mode");
                seen.push("field");
            }
            NodeKind::LocalDeclaration(_) => {
                let m = symbol.as_variable().unwrap();
                assert_eq!(m.type_class().unwrap().qualified_name(), "p.A.Mode");
                seen.push("variable");
            }
            NodeKind::Annotation { .. } => {
                assert_eq!(symbol.as_annotation().unwrap().name(), "java.lang.Deprecated");
                seen.push("annotation");
            }
            _ => {}
        }
    }
    // the enum constant is a field declaration too
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen, vec!["annotation", "class", "field", "method", "variable"]);

    let env = result.env().unwrap();
    let package = env.type_binding(env.get_type("p.A").unwrap()).unwrap().package;
    let symbol = rx.resolve_binding(frontend::Binding::Package(package)).unwrap();
    assert_eq!(symbol.as_package().unwrap().name(), "p");
    assert!(symbol.as_class().is_none());
}

#[test]
fn package_annotations_come_from_package_info() {
    let result = compile_all(&[
        ("p/package-info.java", "@Deprecated package p;"),
        ("p/A.java", "package p; class A {}"),
    ]);
    let rx = Resolver::new(&result).unwrap();
    let package = class(&rx, "p.A").package().unwrap();
    assert_eq!(package.name(), "p");
    assert_eq!(annotation_names(&package.annotations()), vec!["java.lang.Deprecated"]);
}

#[test]
fn generic_nodes_resolve_through_the_locator() {
    let mut registry = SourceRegistry::new();
    registry.unit(
        "p/A.java",
        "package p; class A { int count; int f(int step) { int next = count + step; g(next); return next; } void g(int v) {} }",
    );
    registry.compile(&[], &BridgeOptions::default(), &mut WarnedFiles::default());
    let ast = registry.convert(Path::new("p/A.java")).unwrap();
    let rx = registry.resolver(None).unwrap();

    let resolve = |kind: &str, name: &str| {
        let node = ast.find(kind, name).unwrap_or_else(|| panic!("{kind} {name}"));
        rx.resolve_generic(&ast, node).map(|s| s.describe())
    };
    assert_eq!(resolve("VariableDefinitionEntry", "count").as_deref(), Some("field p.A#count"));
    assert_eq!(resolve("VariableDefinitionEntry", "step").as_deref(), Some("variable step: int"));
    assert_eq!(resolve("VariableDefinitionEntry", "next").as_deref(), Some("variable next: int"));
    assert_eq!(resolve("MethodInvocation", "g").as_deref(), Some("method p.A#g(int)"));
    assert_eq!(resolve("ClassDeclaration", "A").as_deref(), Some("class p.A"));

    let step = ast.find("VariableDefinitionEntry", "step").unwrap();
    let symbol = rx.resolve_generic(&ast, step).unwrap();
    let variable = symbol.as_variable().unwrap();
    assert!(variable.is_parameter());
    assert_eq!(variable.declaring_method().unwrap().name(), "f");
}

#[test]
fn removal_keeps_units_declaring_annotation_types() {
    let mut registry = SourceRegistry::new();
    registry.unit("p/A.java", "package p; class A {}");
    registry.unit("p/Mode.java", "package p; public @interface Mode {}");
    registry.unit("p/Holder.java", "package p; class Holder { @interface Inner {} }");
    registry.compile(&[], &BridgeOptions::default(), &mut WarnedFiles::default());

    assert!(registry.remove(Path::new("p/A.java")));
    assert!(registry.get(Path::new("p/A.java")).is_none());
    assert!(registry.tree(Path::new("p/A.java")).is_none());

    for (file, qualified) in [("p/Mode.java", "p.Mode"), ("p/Holder.java", "p.Holder.Inner")] {
        assert!(!registry.remove(Path::new(file)));
        assert!(registry.get(Path::new(file)).is_some());
        let (declared_in, _) = registry.find_type_declaration(qualified).unwrap();
        assert_eq!(declared_in, Path::new(file));
    }
    assert_eq!(registry.len(), 2);
}

#[test]
fn units_are_identified_by_path() {
    let mut registry = SourceRegistry::new();
    registry.unit("A.java", "class A {}");
    let again = registry.unit("A.java", "class Changed {}");
    assert_eq!(again.contents(), "class A {}");
    assert_eq!(registry.len(), 1);
}

#[test]
fn disposal_regimes() {
    let mut registry = SourceRegistry::new();
    registry.unit("A.java", "class A { void f() {} }");
    registry.compile(&[], &BridgeOptions::default(), &mut WarnedFiles::default());
    assert!(registry.convert(Path::new("A.java")).is_some());
    assert_eq!(registry.cached_conversions(), 1);

    registry.dispose_caches();
    assert_eq!(registry.cached_conversions(), 0);
    assert!(registry.tree(Path::new("A.java")).is_some());
    assert!(registry.resolver(None).is_some());

    registry.dispose();
    registry.dispose();
    assert!(registry.get(Path::new("A.java")).is_none());
    assert!(registry.tree(Path::new("A.java")).is_none());
    assert!(registry.convert(Path::new("A.java")).is_none());
    assert!(registry.resolver(None).is_none());
    assert!(registry.find_type_declaration("A").is_none());
}

#[test]
fn disposed_results_answer_nothing() {
    let (mut result, path) = compile_one("A.java", "class A {}");
    assert!(result.names().is_some());
    result.dispose();
    assert!(result.is_disposed());
    assert!(result.tree(&path).is_none());
    assert!(result.env().is_none());
    assert!(result.names().is_none());
    assert!(Resolver::new(&result).is_none());
    result.dispose();
}
