//! The lookup environment: owner of every binding produced by a compile
//! pass.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::ast::{Modifiers, TypeKind};
use crate::binding::{
    AnnotationBinding, AnnotationId, FieldBinding, FieldId, LocalBinding, LocalId, MethodBinding,
    MethodId, PackageBinding, PackageId, Substitution, TypeBinding, TypeId, TypeOrigin, TypeSig,
};
use crate::constant::PrimitiveType;
use crate::name_env::NameEnvironment;

struct PlatformType {
    name: &'static str,
    kind: TypeKind,
    superclass: Option<&'static str>,
    interfaces: &'static [&'static str],
    /// `(selector, parameter types, return type)`.
    methods: &'static [(&'static str, &'static [&'static str], &'static str)],
}

const fn class(
    name: &'static str,
    superclass: &'static str,
    interfaces: &'static [&'static str],
) -> PlatformType {
    PlatformType {
        name,
        kind: TypeKind::Class,
        superclass: Some(superclass),
        interfaces,
        methods: &[],
    }
}

const fn interface(name: &'static str, interfaces: &'static [&'static str]) -> PlatformType {
    PlatformType {
        name,
        kind: TypeKind::Interface,
        superclass: None,
        interfaces,
        methods: &[],
    }
}

const fn annotation(name: &'static str) -> PlatformType {
    PlatformType {
        name,
        kind: TypeKind::Annotation,
        superclass: None,
        interfaces: &["java.lang.annotation.Annotation"],
        methods: &[],
    }
}

const OBJECT: &str = "java.lang.Object";
const STRING: &str = "java.lang.String";

/// Types that are always resolvable, whatever the classpath holds. Order
/// matters: supertypes come first.
static PLATFORM_TYPES: &[PlatformType] = &[
    PlatformType {
        name: OBJECT,
        kind: TypeKind::Class,
        superclass: None,
        interfaces: &[],
        methods: &[
            ("equals", &[OBJECT], "boolean"),
            ("hashCode", &[], "int"),
            ("toString", &[], STRING),
            ("getClass", &[], "java.lang.Class"),
            ("notify", &[], "void"),
            ("notifyAll", &[], "void"),
            ("wait", &[], "void"),
        ],
    },
    interface("java.io.Serializable", &[]),
    PlatformType {
        name: "java.lang.Comparable",
        kind: TypeKind::Interface,
        superclass: None,
        interfaces: &[],
        methods: &[("compareTo", &["T"], "int")],
    },
    PlatformType {
        name: "java.lang.CharSequence",
        kind: TypeKind::Interface,
        superclass: None,
        interfaces: &[],
        methods: &[("length", &[], "int"), ("charAt", &["int"], "char")],
    },
    interface("java.lang.Cloneable", &[]),
    interface("java.lang.Iterable", &[]),
    interface("java.lang.AutoCloseable", &[]),
    PlatformType {
        name: "java.lang.Runnable",
        kind: TypeKind::Interface,
        superclass: None,
        interfaces: &[],
        methods: &[("run", &[], "void")],
    },
    PlatformType {
        name: STRING,
        kind: TypeKind::Class,
        superclass: Some(OBJECT),
        interfaces: &[
            "java.io.Serializable",
            "java.lang.Comparable",
            "java.lang.CharSequence",
        ],
        methods: &[
            ("length", &[], "int"),
            ("isEmpty", &[], "boolean"),
            ("charAt", &["int"], "char"),
            ("equals", &[OBJECT], "boolean"),
            ("substring", &["int"], STRING),
            ("substring", &["int", "int"], STRING),
            ("trim", &[], STRING),
            ("valueOf", &[OBJECT], STRING),
        ],
    },
    class("java.lang.Class", OBJECT, &["java.io.Serializable"]),
    class("java.lang.Number", OBJECT, &["java.io.Serializable"]),
    class("java.lang.Integer", "java.lang.Number", &["java.lang.Comparable"]),
    class("java.lang.Long", "java.lang.Number", &["java.lang.Comparable"]),
    class("java.lang.Short", "java.lang.Number", &["java.lang.Comparable"]),
    class("java.lang.Byte", "java.lang.Number", &["java.lang.Comparable"]),
    class("java.lang.Float", "java.lang.Number", &["java.lang.Comparable"]),
    class("java.lang.Double", "java.lang.Number", &["java.lang.Comparable"]),
    class("java.lang.Boolean", OBJECT, &["java.io.Serializable", "java.lang.Comparable"]),
    class("java.lang.Character", OBJECT, &["java.io.Serializable", "java.lang.Comparable"]),
    class("java.lang.Void", OBJECT, &[]),
    class("java.lang.StringBuilder", OBJECT, &["java.lang.CharSequence"]),
    class("java.lang.Math", OBJECT, &[]),
    class("java.lang.System", OBJECT, &[]),
    class("java.lang.Thread", OBJECT, &["java.lang.Runnable"]),
    class("java.lang.Throwable", OBJECT, &["java.io.Serializable"]),
    class("java.lang.Exception", "java.lang.Throwable", &[]),
    class("java.lang.RuntimeException", "java.lang.Exception", &[]),
    class("java.lang.Error", "java.lang.Throwable", &[]),
    class("java.lang.IllegalArgumentException", "java.lang.RuntimeException", &[]),
    class("java.lang.IllegalStateException", "java.lang.RuntimeException", &[]),
    class("java.lang.NullPointerException", "java.lang.RuntimeException", &[]),
    class(
        "java.lang.Enum",
        OBJECT,
        &["java.lang.Comparable", "java.io.Serializable"],
    ),
    class("java.lang.Record", OBJECT, &[]),
    PlatformType {
        name: "java.lang.annotation.Annotation",
        kind: TypeKind::Interface,
        superclass: None,
        interfaces: &[],
        methods: &[("annotationType", &[], "java.lang.Class")],
    },
    PlatformType {
        name: "java.lang.annotation.RetentionPolicy",
        kind: TypeKind::Enum,
        superclass: Some("java.lang.Enum"),
        interfaces: &[],
        methods: &[],
    },
    PlatformType {
        name: "java.lang.annotation.ElementType",
        kind: TypeKind::Enum,
        superclass: Some("java.lang.Enum"),
        interfaces: &[],
        methods: &[],
    },
    annotation("java.lang.Override"),
    annotation("java.lang.Deprecated"),
    annotation("java.lang.FunctionalInterface"),
    annotation("java.lang.SafeVarargs"),
    PlatformType {
        name: "java.lang.SuppressWarnings",
        kind: TypeKind::Annotation,
        superclass: None,
        interfaces: &["java.lang.annotation.Annotation"],
        methods: &[("value", &[], "java.lang.String[]")],
    },
    annotation("java.lang.annotation.Documented"),
    annotation("java.lang.annotation.Inherited"),
    PlatformType {
        name: "java.lang.annotation.Retention",
        kind: TypeKind::Annotation,
        superclass: None,
        interfaces: &["java.lang.annotation.Annotation"],
        methods: &[("value", &[], "java.lang.annotation.RetentionPolicy")],
    },
    PlatformType {
        name: "java.lang.annotation.Target",
        kind: TypeKind::Annotation,
        superclass: None,
        interfaces: &["java.lang.annotation.Annotation"],
        methods: &[("value", &[], "java.lang.annotation.ElementType[]")],
    },
    PlatformType {
        name: "java.lang.annotation.Repeatable",
        kind: TypeKind::Annotation,
        superclass: None,
        interfaces: &["java.lang.annotation.Annotation"],
        methods: &[("value", &[], "java.lang.Class")],
    },
];

/// Type parameters of the generic platform types. Method signatures above
/// refer to them by name.
static PLATFORM_TYPE_PARAMETERS: &[(&str, &[&str])] = &[
    ("java.lang.Comparable", &["T"]),
    ("java.lang.Iterable", &["T"]),
    ("java.lang.Class", &["T"]),
    ("java.lang.Enum", &["E"]),
];

static PLATFORM_ENUM_CONSTANTS: &[(&str, &[&str])] = &[
    ("java.lang.annotation.RetentionPolicy", &["SOURCE", "CLASS", "RUNTIME"]),
    (
        "java.lang.annotation.ElementType",
        &[
            "TYPE",
            "FIELD",
            "METHOD",
            "PARAMETER",
            "CONSTRUCTOR",
            "LOCAL_VARIABLE",
            "ANNOTATION_TYPE",
            "PACKAGE",
            "TYPE_PARAMETER",
            "TYPE_USE",
        ],
    ),
];

/// Owns all bindings of one compile pass.
#[derive(Debug, Default)]
pub struct LookupEnvironment {
    types: Vec<TypeBinding>,
    methods: Vec<MethodBinding>,
    fields: Vec<FieldBinding>,
    locals: Vec<LocalBinding>,
    packages: Vec<PackageBinding>,
    annotations: Vec<AnnotationBinding>,
    by_name: HashMap<String, TypeId>,
    packages_by_name: HashMap<String, PackageId>,
    missing: HashSet<String>,
}

impl LookupEnvironment {
    /// Creates an environment with the platform types installed.
    pub fn new() -> Self {
        let mut env = Self::default();
        env.install_platform();
        env
    }

    fn install_platform(&mut self) {
        for platform in PLATFORM_TYPES {
            let (package, simple) = split_qualified(platform.name);
            let package = self.package(package);
            let superclass = platform.superclass.and_then(|s| self.get_type(s));
            let interfaces = platform
                .interfaces
                .iter()
                .filter_map(|i| self.get_type(i))
                .collect();
            let id = self.add_type(TypeBinding {
                simple_name: simple.to_string(),
                package,
                enclosing: None,
                kind: platform.kind,
                modifiers: Modifiers::PUBLIC,
                type_parameters: PLATFORM_TYPE_PARAMETERS
                    .iter()
                    .find(|(name, _)| *name == platform.name)
                    .map(|(_, params)| params.iter().map(|p| p.to_string()).collect())
                    .unwrap_or_default(),
                superclass,
                interfaces,
                supertype_arguments: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
                member_types: Vec::new(),
                annotations: Vec::new(),
                origin: TypeOrigin::Platform,
                readable_name: platform.name.to_string(),
            });
            for (selector, params, ret) in platform.methods {
                let parameters = params.iter().map(|p| self.platform_sig_in(id, p)).collect();
                let mut modifiers = Modifiers::PUBLIC;
                if platform.kind.is_interface() {
                    modifiers.insert(Modifiers::ABSTRACT);
                }
                if *selector == "valueOf" {
                    modifiers.insert(Modifiers::STATIC);
                }
                let method = self.add_method(MethodBinding {
                    selector: selector.to_string(),
                    declaring: Some(id),
                    is_constructor: false,
                    modifiers,
                    type_parameters: Vec::new(),
                    parameter_names: (0..params.len()).map(|i| format!("arg{i}")).collect(),
                    parameters,
                    is_varargs: false,
                    return_type: self.platform_sig(ret),
                    annotations: Vec::new(),
                    parameter_annotations: vec![Vec::new(); params.len()],
                    declaration: None,
                    default_value: None,
                });
                self.types[id.index()].methods.push(method);
            }
            if platform.kind == TypeKind::Class {
                let ctor = self.add_method(MethodBinding {
                    selector: simple.to_string(),
                    declaring: Some(id),
                    is_constructor: true,
                    modifiers: Modifiers::PUBLIC,
                    type_parameters: Vec::new(),
                    parameters: Vec::new(),
                    parameter_names: Vec::new(),
                    is_varargs: false,
                    return_type: TypeSig::Void,
                    annotations: Vec::new(),
                    parameter_annotations: Vec::new(),
                    declaration: None,
                    default_value: None,
                });
                self.types[id.index()].methods.push(ctor);
            }
        }
        for (owner, constants) in PLATFORM_ENUM_CONSTANTS {
            let Some(owner) = self.get_type(owner) else {
                continue;
            };
            for name in *constants {
                let field = self.add_field(FieldBinding {
                    name: name.to_string(),
                    declaring: owner,
                    modifiers: Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL,
                    ty: TypeSig::class(owner),
                    constant: None,
                    annotations: Vec::new(),
                    declaration: None,
                    is_enum_constant: true,
                });
                self.types[owner.index()].fields.push(field);
            }
        }
    }

    /// Like [`Self::platform_sig`], with the type parameters of `owner` in
    /// scope.
    fn platform_sig_in(&self, owner: TypeId, name: &str) -> TypeSig {
        let is_variable = self
            .type_binding(owner)
            .map_or(false, |t| t.type_parameters.iter().any(|p| p == name));
        if is_variable {
            TypeSig::Variable {
                name: name.to_string(),
                bound: None,
            }
        } else {
            self.platform_sig(name)
        }
    }

    fn platform_sig(&self, name: &str) -> TypeSig {
        if let Some(element) = name.strip_suffix("[]") {
            return TypeSig::Array(Box::new(self.platform_sig(element)));
        }
        if name == "void" {
            return TypeSig::Void;
        }
        if let Some(p) = PrimitiveType::from_keyword(name) {
            return TypeSig::Primitive(p);
        }
        match self.get_type(name) {
            Some(id) => TypeSig::class(id),
            None => TypeSig::Unresolved(name.to_string()),
        }
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn type_binding(&self, id: TypeId) -> Option<&TypeBinding> {
        self.types.get(id.index())
    }

    pub(crate) fn type_mut(&mut self, id: TypeId) -> Option<&mut TypeBinding> {
        self.types.get_mut(id.index())
    }

    pub fn method(&self, id: MethodId) -> Option<&MethodBinding> {
        self.methods.get(id.index())
    }

    pub(crate) fn method_mut(&mut self, id: MethodId) -> Option<&mut MethodBinding> {
        self.methods.get_mut(id.index())
    }

    pub fn field(&self, id: FieldId) -> Option<&FieldBinding> {
        self.fields.get(id.index())
    }

    pub(crate) fn field_mut(&mut self, id: FieldId) -> Option<&mut FieldBinding> {
        self.fields.get_mut(id.index())
    }

    pub fn local(&self, id: LocalId) -> Option<&LocalBinding> {
        self.locals.get(id.index())
    }

    pub(crate) fn local_mut(&mut self, id: LocalId) -> Option<&mut LocalBinding> {
        self.locals.get_mut(id.index())
    }

    pub fn package_binding(&self, id: PackageId) -> Option<&PackageBinding> {
        self.packages.get(id.index())
    }

    pub(crate) fn package_mut(&mut self, id: PackageId) -> Option<&mut PackageBinding> {
        self.packages.get_mut(id.index())
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&AnnotationBinding> {
        self.annotations.get(id.index())
    }

    pub(crate) fn add_type(&mut self, binding: TypeBinding) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        let qualified = self.compose_name(binding.package, binding.enclosing, &binding.simple_name);
        self.missing.remove(&qualified);
        self.by_name.insert(qualified, id);
        if let Some(outer) = binding.enclosing {
            if let Some(outer) = self.types.get_mut(outer.index()) {
                outer.member_types.push(id);
            }
        }
        self.types.push(binding);
        id
    }

    pub(crate) fn add_method(&mut self, binding: MethodBinding) -> MethodId {
        self.methods.push(binding);
        MethodId(self.methods.len() as u32 - 1)
    }

    pub(crate) fn add_field(&mut self, binding: FieldBinding) -> FieldId {
        self.fields.push(binding);
        FieldId(self.fields.len() as u32 - 1)
    }

    pub(crate) fn add_local(&mut self, binding: LocalBinding) -> LocalId {
        self.locals.push(binding);
        LocalId(self.locals.len() as u32 - 1)
    }

    pub(crate) fn add_annotation(&mut self, binding: AnnotationBinding) -> AnnotationId {
        self.annotations.push(binding);
        AnnotationId(self.annotations.len() as u32 - 1)
    }

    /// Gets or creates the package binding for `name` (empty for the
    /// default package).
    pub(crate) fn package(&mut self, name: &str) -> PackageId {
        if let Some(id) = self.packages_by_name.get(name) {
            return *id;
        }
        let id = PackageId(self.packages.len() as u32);
        self.packages.push(PackageBinding {
            name: name.to_string(),
            annotations: Vec::new(),
            declaration: None,
        });
        self.packages_by_name.insert(name.to_string(), id);
        id
    }

    pub fn find_package(&self, name: &str) -> Option<PackageId> {
        self.packages_by_name.get(name).copied()
    }

    /// Type already known to the environment, without consulting the
    /// classpath. Nested types use dots: `p.Outer.Inner`.
    pub fn get_type(&self, qualified: &str) -> Option<TypeId> {
        self.by_name.get(qualified).copied()
    }

    /// Known type, else a classpath probe. Failed probes are remembered.
    pub fn lookup_type(&mut self, names: &NameEnvironment, qualified: &str) -> Option<TypeId> {
        if let Some(id) = self.get_type(qualified) {
            return Some(id);
        }
        if self.missing.contains(qualified) {
            return None;
        }
        let found = names.find_type(qualified);
        let Some(found) = found else {
            self.missing.insert(qualified.to_string());
            return None;
        };
        trace!(name = qualified, location = %found.location.display(), "binary type");
        let package = self.package(&found.package);
        let object = self.get_type(OBJECT);
        let mut enclosing = None;
        let mut prefix = found.package.clone();
        for simple in &found.nesting {
            let dotted = if prefix.is_empty() {
                simple.clone()
            } else {
                format!("{prefix}.{simple}")
            };
            let id = match self.get_type(&dotted) {
                Some(id) => id,
                None => {
                    let readable = if found.package.is_empty() {
                        simple.clone()
                    } else {
                        format!("{}.{simple}", found.package)
                    };
                    self.add_type(TypeBinding {
                        simple_name: simple.clone(),
                        package,
                        enclosing,
                        kind: TypeKind::Class,
                        modifiers: Modifiers::PUBLIC,
                        type_parameters: Vec::new(),
                        superclass: object,
                        interfaces: Vec::new(),
                        supertype_arguments: Vec::new(),
                        methods: Vec::new(),
                        fields: Vec::new(),
                        member_types: Vec::new(),
                        annotations: Vec::new(),
                        origin: TypeOrigin::Binary {
                            location: found.location.clone(),
                        },
                        readable_name: readable,
                    })
                }
            };
            enclosing = Some(id);
            prefix = dotted;
        }
        enclosing
    }

    fn compose_name(&self, package: PackageId, enclosing: Option<TypeId>, simple: &str) -> String {
        match enclosing {
            Some(outer) => format!("{}.{simple}", self.qualified_name(outer)),
            None => match self.packages.get(package.index()) {
                Some(p) if !p.name.is_empty() => format!("{}.{simple}", p.name),
                _ => simple.to_string(),
            },
        }
    }

    /// Fully qualified, dotted name including enclosing types.
    pub fn qualified_name(&self, id: TypeId) -> String {
        let Some(binding) = self.types.get(id.index()) else {
            return String::new();
        };
        self.compose_name(binding.package, binding.enclosing, &binding.simple_name)
    }

    pub fn package_name(&self, id: TypeId) -> &str {
        self.types
            .get(id.index())
            .and_then(|t| self.packages.get(t.package.index()))
            .map(|p| p.name.as_str())
            .unwrap_or("")
    }

    /// Superclass chain starting at `id` itself. Stops on cycles.
    pub fn superclasses(&self, id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        let mut current = Some(id);
        let mut remaining = self.types.len() + 1;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let this = current?;
            current = self.types.get(this.index()).and_then(|t| t.superclass);
            Some(this)
        })
    }

    pub fn outermost_enclosing(&self, id: TypeId) -> TypeId {
        let mut current = id;
        let mut remaining = self.types.len();
        while let Some(outer) = self.types.get(current.index()).and_then(|t| t.enclosing) {
            if remaining == 0 {
                break;
            }
            remaining -= 1;
            current = outer;
        }
        current
    }

    /// Whether `sub` is `sup` or one of its subtypes, interfaces included.
    pub fn is_compatible(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![sub];
        while let Some(t) = stack.pop() {
            if t == sup {
                return true;
            }
            if !seen.insert(t) {
                continue;
            }
            if let Some(binding) = self.types.get(t.index()) {
                stack.extend(binding.superclass);
                stack.extend(&binding.interfaces);
            }
        }
        false
    }

    /// Variables of `ancestor` expressed in the terms of `from`, following
    /// the first supertype path between them. Empty when no type argument
    /// flows down that path (raw or non-generic supertypes) or when
    /// `ancestor` is not a supertype of `from`.
    pub fn substitution(&self, from: TypeId, ancestor: TypeId) -> Substitution {
        let mut seen = HashSet::new();
        let mut stack = vec![(from, Substitution::default())];
        while let Some((current, substitution)) = stack.pop() {
            if current == ancestor {
                return substitution;
            }
            if !seen.insert(current) {
                continue;
            }
            let Some(binding) = self.types.get(current.index()) else {
                continue;
            };
            for &supertype in binding.interfaces.iter().rev().chain(&binding.superclass) {
                let Some(parameters) = self
                    .types
                    .get(supertype.index())
                    .map(|t| &t.type_parameters)
                else {
                    continue;
                };
                let bindings = parameters
                    .iter()
                    .zip(binding.arguments_of(supertype))
                    .map(|(p, arg)| (p.clone(), arg.substitute(&substitution)))
                    .collect();
                stack.push((supertype, Substitution::new(bindings)));
            }
        }
        Substitution::default()
    }

    pub fn object(&self) -> Option<TypeId> {
        self.get_type(OBJECT)
    }

    pub fn string(&self) -> Option<TypeId> {
        self.get_type(STRING)
    }

    /// Drops every binding. Afterwards the environment answers nothing.
    pub fn reset(&mut self) {
        self.types.clear();
        self.methods.clear();
        self.fields.clear();
        self.locals.clear();
        self.packages.clear();
        self.annotations.clear();
        self.by_name.clear();
        self.packages_by_name.clear();
        self.missing.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

pub(crate) fn split_qualified(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_types_are_installed() {
        let env = LookupEnvironment::new();
        let runnable = env.get_type("java.lang.Runnable").unwrap();
        let thread = env.get_type("java.lang.Thread").unwrap();
        assert!(env.is_compatible(thread, runnable));
        assert_eq!(env.qualified_name(runnable), "java.lang.Runnable");
        let object = env.object().unwrap();
        assert!(env.type_binding(object).unwrap().superclass.is_none());
        let exc = env.get_type("java.lang.RuntimeException").unwrap();
        let chain: Vec<String> = env.superclasses(exc).map(|t| env.qualified_name(t)).collect();
        assert_eq!(
            chain,
            vec![
                "java.lang.RuntimeException",
                "java.lang.Exception",
                "java.lang.Throwable",
                "java.lang.Object"
            ]
        );
    }

    #[test]
    fn missing_types_are_negatively_cached() {
        let mut env = LookupEnvironment::new();
        let names = NameEnvironment::default();
        assert!(env.lookup_type(&names, "x.Nope").is_none());
        assert!(env.missing.contains("x.Nope"));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut env = LookupEnvironment::new();
        env.reset();
        assert!(env.is_empty());
        assert!(env.object().is_none());
        assert_eq!(env.qualified_name(TypeId(0)), "");
    }
}
