use crate::{
    Binding, Compiler, CompilerOptions, ElementValue, LookupEnvironment, NameEnvironment,
    NodeKind, ResultCollector, SourceUnit, StandardProcessor, UnitResult,
};

pub(crate) fn compile_with_options(
    options: CompilerOptions,
    sources: &[(&str, &str)],
) -> (Vec<UnitResult>, LookupEnvironment) {
    run(options, NameEnvironment::default(), sources)
}

pub(crate) fn compile_with(
    names: NameEnvironment,
    sources: &[(&str, &str)],
) -> (Vec<UnitResult>, LookupEnvironment) {
    run(CompilerOptions::default(), names, sources)
}

pub(crate) fn compile_sources(sources: &[(&str, &str)]) -> (Vec<UnitResult>, LookupEnvironment) {
    compile_with_options(CompilerOptions::default(), sources)
}

fn run(
    options: CompilerOptions,
    names: NameEnvironment,
    sources: &[(&str, &str)],
) -> (Vec<UnitResult>, LookupEnvironment) {
    let units: Vec<SourceUnit> = sources
        .iter()
        .map(|(path, text)| SourceUnit::new(*path, *text))
        .collect();
    let mut compiler = Compiler::new(options, names);
    let mut collector = ResultCollector::default();
    compiler
        .compile(&units, &mut StandardProcessor, &mut collector)
        .unwrap();
    let (_, env) = compiler.into_environments();
    (collector.results, env)
}

#[test]
fn runnable_implementation_is_visible_through_the_hierarchy() {
    let (results, env) = compile_sources(&[
        ("p/A.java", "package p; public class A implements Runnable { public void run() {} }"),
        ("p/B.java", "package p; public class B extends A {}"),
    ]);
    assert!(results.iter().all(|r| r.problems.is_empty()));
    let a = env.get_type("p.A").unwrap();
    let b = env.get_type("p.B").unwrap();
    let runnable = env.get_type("java.lang.Runnable").unwrap();
    assert!(env.is_compatible(b, runnable));
    assert_eq!(env.type_binding(a).unwrap().interfaces, vec![runnable]);
    assert!(env.type_binding(b).unwrap().interfaces.is_empty());
    assert_eq!(env.type_binding(b).unwrap().superclass, Some(a));
}

#[test]
fn package_info_annotations_bind_to_the_package() {
    let (results, env) = compile_sources(&[
        ("p/package-info.java", "@Deprecated package p;"),
        ("p/A.java", "package p; class A {}"),
    ]);
    assert!(results[0].problems.is_empty(), "{:?}", results[0].problems);
    let package = env.find_package("p").unwrap();
    let binding = env.package_binding(package).unwrap();
    assert_eq!(binding.annotations.len(), 1);
    let deprecated = env.annotation(binding.annotations[0]).unwrap();
    assert_eq!(env.qualified_name(deprecated.annotation_type), "java.lang.Deprecated");
    assert!(binding.declaration.is_some());
}

#[test]
fn every_reference_in_a_body_is_bound() {
    let (results, _) = compile_sources(&[(
        "p/A.java",
        "package p; import java.util.List; class A { static final int LIMIT = 3; String name; \
         int f(String[] args) { for (String s : args) { if (s.length() > LIMIT) { return s.length(); } } return args.length; } }",
    )]);
    let result = &results[0];
    let tree = result.tree.as_ref().unwrap();
    let unbound: Vec<String> = tree
        .iter()
        .filter(|(_, n)| {
            matches!(
                n.kind,
                NodeKind::SingleNameReference { .. } | NodeKind::MessageSend { .. }
            )
        })
        .filter(|(id, _)| tree.binding(*id).map_or(true, Binding::is_problem))
        .map(|(_, n)| n.kind.declared_name().unwrap_or_default().to_string())
        .collect();
    assert!(unbound.is_empty(), "unbound: {unbound:?}");
    // java.util.List is not on the classpath.
    assert_eq!(result.problems.len(), 1);
}

#[test]
fn element_values_referencing_enum_constants_keep_the_field() {
    let (_, env) = compile_sources(&[(
        "p/T.java",
        "package p; import java.lang.annotation.*; @Target({ElementType.FIELD, ElementType.METHOD}) @interface T {}",
    )]);
    let t = env.get_type("p.T").unwrap();
    let annotation = env.annotation(env.type_binding(t).unwrap().annotations[0]).unwrap();
    let ElementValue::Array(values) = &annotation.pairs[0].1 else {
        panic!("expected array value");
    };
    let names: Vec<&str> = values
        .iter()
        .map(|v| match v {
            ElementValue::Field(f) => env.field(*f).unwrap().name.as_str(),
            _ => "?",
        })
        .collect();
    assert_eq!(names, vec!["FIELD", "METHOD"]);
}

#[test]
fn annotations_are_skipped_when_not_stored() {
    let options = CompilerOptions {
        store_annotations: false,
        ..CompilerOptions::default()
    };
    let (_, env) = compile_with_options(options, &[("A.java", "@Deprecated class A {}")]);
    let a = env.get_type("A").unwrap();
    assert!(env.type_binding(a).unwrap().annotations.is_empty());
}

#[test]
fn messages_are_rendered_when_requested() {
    let options = CompilerOptions {
        compute_messages: true,
        ..CompilerOptions::default()
    };
    let (results, _) = compile_with_options(options, &[("A.java", "class A extends Missing {}")]);
    let problem = &results[0].problems[0];
    assert_eq!(problem.message.as_deref(), Some("Missing cannot be resolved to a type"));
    assert_eq!(problem.line, 1);
}

#[test]
fn supertype_arguments_substitute_inherited_signatures() {
    let (_, env) = compile_sources(&[(
        "p/D.java",
        "package p; \
         class A<T> { void f(T t) {} } \
         class C<U> extends A<U> {} \
         class D extends C<Integer> {} \
         class R extends A {}",
    )]);
    let a = env.get_type("p.A").unwrap();
    let c = env.get_type("p.C").unwrap();
    let d = env.get_type("p.D").unwrap();
    let r = env.get_type("p.R").unwrap();
    let f = env
        .type_binding(a)
        .unwrap()
        .methods
        .iter()
        .filter_map(|m| env.method(*m))
        .find(|m| m.selector == "f")
        .unwrap();

    assert_eq!(env.type_binding(d).unwrap().arguments_of(c).len(), 1);
    assert_eq!(f.erased_parameters(&env), vec!["java.lang.Object"]);
    assert_eq!(
        f.erased_parameters_in(&env.substitution(d, a), &env),
        vec!["java.lang.Integer"]
    );
    assert!(env.substitution(r, a).is_empty());
    assert_eq!(
        f.erased_parameters_in(&env.substitution(r, a), &env),
        vec!["java.lang.Object"]
    );
}
