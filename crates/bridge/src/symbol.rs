//! Resolved symbols: borrowed views over the lookup environment.
//!
//! A view holds a [`Resolver`] and the id of one binding. Every accessor
//! walks the binding graph on demand. Equality and hashing use the binding
//! id only.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use frontend::names::{simple_name, strip_type_arguments};
use frontend::scope::lookup_order;
use frontend::{
    AnnotationBinding, AnnotationId, Binding, CompilationUnit, Constant, ElementValue,
    FieldBinding, FieldId, LocalBinding, LocalId, MethodBinding, MethodId, Modifiers, NodeId,
    NodeKind, PackageBinding, PackageId, TypeBinding, TypeId, TypeKind,
};
use serde_json::Value as JsonValue;

use crate::external::ExternalAnnotation;
use crate::facade::Resolver;
use crate::unique::{ensure_unique, Named};

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSymbol<'env> {
    Class(ResolvedClass<'env>),
    Method(ResolvedMethod<'env>),
    Field(ResolvedField<'env>),
    Variable(ResolvedVariable<'env>),
    Annotation(ResolvedAnnotation<'env>),
    Package(ResolvedPackage<'env>),
}

impl<'env> ResolvedSymbol<'env> {
    pub fn name(&self) -> String {
        match self {
            ResolvedSymbol::Class(c) => c.name(),
            ResolvedSymbol::Method(m) => m.name(),
            ResolvedSymbol::Field(f) => f.name().to_string(),
            ResolvedSymbol::Variable(v) => v.name().to_string(),
            ResolvedSymbol::Annotation(a) => a.name(),
            ResolvedSymbol::Package(p) => p.name().to_string(),
        }
    }

    pub fn as_class(&self) -> Option<&ResolvedClass<'env>> {
        match self {
            ResolvedSymbol::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&ResolvedMethod<'env>> {
        match self {
            ResolvedSymbol::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&ResolvedField<'env>> {
        match self {
            ResolvedSymbol::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&ResolvedVariable<'env>> {
        match self {
            ResolvedSymbol::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&ResolvedAnnotation<'env>> {
        match self {
            ResolvedSymbol::Annotation(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_package(&self) -> Option<&ResolvedPackage<'env>> {
        match self {
            ResolvedSymbol::Package(p) => Some(p),
            _ => None,
        }
    }

    /// Short label used in listings, e.g. `class p.A`.
    pub fn describe(&self) -> String {
        match self {
            ResolvedSymbol::Class(c) => format!("class {}", c.qualified_name()),
            ResolvedSymbol::Method(m) => format!(
                "method {}#{}",
                m.declaring_class().map(|c| c.qualified_name()).unwrap_or_default(),
                m.signature()
            ),
            ResolvedSymbol::Field(f) => format!(
                "field {}#{}",
                f.declaring_class().map(|c| c.qualified_name()).unwrap_or_default(),
                f.name()
            ),
            ResolvedSymbol::Variable(v) => format!("variable {}: {}", v.name(), v.type_name()),
            ResolvedSymbol::Annotation(a) => format!("annotation @{}", a.name()),
            ResolvedSymbol::Package(p) => format!("package {}", p.name()),
        }
    }
}

macro_rules! binding_view {
    ($(#[$meta:meta])* $name:ident, $id:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'env> {
            rx: Resolver<'env>,
            id: $id,
        }

        impl<'env> $name<'env> {
            pub(crate) fn new(rx: Resolver<'env>, id: $id) -> Self {
                Self { rx, id }
            }

            pub fn id(&self) -> $id {
                self.id
            }
        }

        impl PartialEq for $name<'_> {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $name<'_> {}

        impl Hash for $name<'_> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }
    };
}

binding_view!(ResolvedClass, TypeId);
binding_view!(ResolvedMethod, MethodId);
binding_view!(ResolvedField, FieldId);
binding_view!(ResolvedVariable, LocalId);
binding_view!(ResolvedPackage, PackageId);

// Classes

impl<'env> ResolvedClass<'env> {
    fn binding(&self) -> Option<&'env TypeBinding> {
        self.rx.env.type_binding(self.id)
    }

    fn view(&self, id: TypeId) -> ResolvedClass<'env> {
        ResolvedClass::new(self.rx, id)
    }

    /// Simple name without type arguments.
    pub fn name(&self) -> String {
        self.binding()
            .map(|b| simple_name(&strip_type_arguments(&b.readable_name)).to_string())
            .unwrap_or_default()
    }

    /// Dotted name without type arguments. Member types always carry the
    /// name of their enclosing type, even when the readable name lacks it.
    pub fn qualified_name(&self) -> String {
        let Some(binding) = self.binding() else {
            return String::new();
        };
        let readable = strip_type_arguments(&binding.readable_name);
        match binding.enclosing {
            Some(outer) => {
                let outer = self.view(outer).qualified_name();
                if readable.starts_with(&format!("{outer}.")) {
                    readable
                } else {
                    format!("{outer}.{}", simple_name(&readable))
                }
            }
            None => readable,
        }
    }

    pub fn kind(&self) -> Option<TypeKind> {
        self.binding().map(|b| b.kind)
    }

    pub fn is_interface(&self) -> bool {
        self.kind() == Some(TypeKind::Interface)
    }

    pub fn is_enum(&self) -> bool {
        self.kind() == Some(TypeKind::Enum)
    }

    pub fn is_annotation_type(&self) -> bool {
        self.kind() == Some(TypeKind::Annotation)
    }

    pub fn is_abstract(&self) -> bool {
        self.binding()
            .map_or(false, |b| b.modifiers.contains(Modifiers::ABSTRACT))
    }

    /// Members are unknown for classpath types.
    pub fn is_binary(&self) -> bool {
        self.binding().map_or(false, TypeBinding::is_binary)
    }

    pub fn is_in_package(&self, package: &str) -> bool {
        self.binding().is_some() && self.rx.env.package_name(self.id) == package
    }

    pub fn package(&self) -> Option<ResolvedPackage<'env>> {
        self.binding().map(|b| ResolvedPackage::new(self.rx, b.package))
    }

    pub fn superclass(&self) -> Option<ResolvedClass<'env>> {
        self.binding()?.superclass.map(|s| self.view(s))
    }

    pub fn interfaces(&self) -> Vec<ResolvedClass<'env>> {
        self.binding()
            .map(|b| b.interfaces.iter().map(|i| self.view(*i)).collect())
            .unwrap_or_default()
    }

    pub fn containing_class(&self) -> Option<ResolvedClass<'env>> {
        self.binding()?.enclosing.map(|e| self.view(e))
    }

    /// Whether `qualified` names this class or, unless `strict`, one of its
    /// superclasses. A strict check starts at the superclass.
    pub fn is_subclass_of(&self, qualified: &str, strict: bool) -> bool {
        let Some(start) = self.start(strict) else {
            return false;
        };
        self.rx
            .env
            .superclasses(start)
            .any(|t| self.view(t).qualified_name() == qualified)
    }

    /// Whether a class of the superclass chain implements `qualified`,
    /// directly or through superinterfaces. A strict check starts at the
    /// superclass, so a class directly implementing the interface does not
    /// count.
    pub fn is_implementing(&self, qualified: &str, strict: bool) -> bool {
        let Some(start) = self.start(strict) else {
            return false;
        };
        let mut seen = HashSet::new();
        self.rx.env.superclasses(start).any(|t| {
            self.rx
                .env
                .type_binding(t)
                .map_or(false, |b| {
                    b.interfaces
                        .iter()
                        .any(|i| self.interface_matches(*i, qualified, &mut seen))
                })
        })
    }

    pub fn is_inheriting_from(&self, qualified: &str, strict: bool) -> bool {
        self.is_subclass_of(qualified, strict) || self.is_implementing(qualified, strict)
    }

    fn start(&self, strict: bool) -> Option<TypeId> {
        if strict {
            self.binding()?.superclass
        } else {
            self.binding().map(|_| self.id)
        }
    }

    fn interface_matches(&self, id: TypeId, qualified: &str, seen: &mut HashSet<TypeId>) -> bool {
        if !seen.insert(id) {
            return false;
        }
        if self.view(id).qualified_name() == qualified {
            return true;
        }
        self.rx.env.type_binding(id).map_or(false, |b| {
            b.interfaces
                .iter()
                .any(|i| self.interface_matches(*i, qualified, seen))
        })
    }

    /// Levels visited by member enumeration: this class, then its
    /// superclasses when `include_inherited` is set.
    fn levels(&self, include_inherited: bool) -> Vec<TypeId> {
        if include_inherited {
            self.rx.env.superclasses(self.id).collect()
        } else {
            self.binding().map(|_| vec![self.id]).unwrap_or_default()
        }
    }

    /// Methods, constructors excluded. Inherited methods are masked by a
    /// more derived method with the same selector and erasure; private
    /// methods of superclasses are skipped.
    pub fn methods(&self, include_inherited: bool) -> Vec<ResolvedMethod<'env>> {
        let env = self.rx.env;
        // selector and erased parameters, seen from this class
        let mut kept: Vec<(&str, Vec<String>)> = Vec::new();
        let mut out = Vec::new();
        for (depth, level) in self.levels(include_inherited).into_iter().enumerate() {
            let Some(binding) = env.type_binding(level) else {
                continue;
            };
            let substitution = env.substitution(self.id, level);
            for &id in &binding.methods {
                let Some(method) = env.method(id) else {
                    continue;
                };
                if method.is_constructor || (depth > 0 && method.is_private()) {
                    continue;
                }
                let erased = method.erased_parameters_in(&substitution, env);
                let masked = kept
                    .iter()
                    .any(|(selector, params)| *selector == method.selector && *params == erased);
                if masked {
                    continue;
                }
                kept.push((method.selector.as_str(), erased));
                out.push(ResolvedMethod::new(self.rx, id));
            }
        }
        out
    }

    pub fn methods_named(&self, name: &str) -> Vec<ResolvedMethod<'env>> {
        self.methods(true)
            .into_iter()
            .filter(|m| m.name() == name)
            .collect()
    }

    pub fn constructors(&self) -> Vec<ResolvedMethod<'env>> {
        let env = self.rx.env;
        self.binding()
            .map(|b| {
                b.methods
                    .iter()
                    .filter(|m| env.method(**m).map_or(false, |m| m.is_constructor))
                    .map(|m| ResolvedMethod::new(self.rx, *m))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fields, inherited ones masked by name.
    pub fn fields(&self, include_inherited: bool) -> Vec<ResolvedField<'env>> {
        let env = self.rx.env;
        let mut names: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for (depth, level) in self.levels(include_inherited).into_iter().enumerate() {
            let Some(binding) = env.type_binding(level) else {
                continue;
            };
            for &id in &binding.fields {
                let Some(field) = env.field(id) else {
                    continue;
                };
                if depth > 0 && field.modifiers.is_private() {
                    continue;
                }
                if names.insert(field.name.as_str()) {
                    out.push(ResolvedField::new(self.rx, id));
                }
            }
        }
        out
    }

    pub fn field(&self, name: &str) -> Option<ResolvedField<'env>> {
        self.fields(true).into_iter().find(|f| f.name() == name)
    }

    /// Annotations of the class. With `include_inherited`, the most derived
    /// level carrying native or external annotations supplies both kinds.
    pub fn annotations(&self, include_inherited: bool) -> Vec<ResolvedAnnotation<'env>> {
        let env = self.rx.env;
        for level in self.levels(include_inherited) {
            let Some(binding) = env.type_binding(level) else {
                continue;
            };
            let external = match self.rx.external {
                Some(repository) => repository.class_annotations(&self.view(level).qualified_name()),
                None => Vec::new(),
            };
            if !binding.annotations.is_empty() || !external.is_empty() {
                return merge(self.rx, &binding.annotations, external);
            }
        }
        Vec::new()
    }
}

// Methods

impl<'env> ResolvedMethod<'env> {
    fn binding(&self) -> Option<&'env MethodBinding> {
        self.rx.env.method(self.id)
    }

    /// Selector, or the simple name of the declaring class for constructors.
    pub fn name(&self) -> String {
        match self.binding() {
            Some(m) if m.is_constructor => self
                .declaring_class()
                .map(|c| c.name())
                .unwrap_or_else(|| m.selector.clone()),
            Some(m) => m.selector.clone(),
            None => String::new(),
        }
    }

    pub fn declaring_class(&self) -> Option<ResolvedClass<'env>> {
        self.binding()?
            .declaring
            .map(|d| ResolvedClass::new(self.rx, d))
    }

    pub fn is_constructor(&self) -> bool {
        self.binding().map_or(false, |m| m.is_constructor)
    }

    pub fn is_static(&self) -> bool {
        self.binding().map_or(false, MethodBinding::is_static)
    }

    pub fn is_private(&self) -> bool {
        self.binding().map_or(false, MethodBinding::is_private)
    }

    pub fn is_abstract(&self) -> bool {
        self.binding()
            .map_or(false, |m| m.modifiers.contains(Modifiers::ABSTRACT))
    }

    pub fn is_varargs(&self) -> bool {
        self.binding().map_or(false, |m| m.is_varargs)
    }

    pub fn argument_count(&self) -> usize {
        self.binding().map_or(0, |m| m.parameters.len())
    }

    /// Erased type of argument `index`.
    pub fn argument_type(&self, index: usize) -> Option<String> {
        self.binding()?
            .parameters
            .get(index)
            .map(|p| p.erasure(self.rx.env))
    }

    pub fn argument_name(&self, index: usize) -> Option<&'env str> {
        self.binding()?
            .parameter_names
            .get(index)
            .map(String::as_str)
    }

    /// Return type when it is a class.
    pub fn return_type(&self) -> Option<ResolvedClass<'env>> {
        let id = self.binding()?.return_type.class_id()?;
        Some(ResolvedClass::new(self.rx, id))
    }

    pub fn return_type_name(&self) -> Option<String> {
        Some(self.binding()?.return_type.erasure(self.rx.env))
    }

    /// `selector(erased,parameter,types)`; constructors use `<init>`.
    pub fn signature(&self) -> String {
        let Some(m) = self.binding() else {
            return String::new();
        };
        let selector = if m.is_constructor { "<init>" } else { &m.selector };
        format!("{selector}({})", m.erased_parameters(self.rx.env).join(","))
    }

    /// Nearest superclass method with the same selector and erasure. A
    /// private match only counts when it is declared in the same outermost
    /// type.
    pub fn super_method(&self) -> Option<ResolvedMethod<'env>> {
        let env = self.rx.env;
        let method = self.binding()?;
        if method.is_constructor {
            return None;
        }
        let declaring = method.declaring?;
        let start = env.type_binding(declaring)?.superclass?;
        let erased = method.erased_parameters(env);
        for level in env.superclasses(start) {
            let Some(binding) = env.type_binding(level) else {
                continue;
            };
            let substitution = env.substitution(declaring, level);
            let found = binding.methods.iter().copied().find(|id| {
                env.method(*id).map_or(false, |candidate| {
                    !candidate.is_constructor
                        && candidate.selector == method.selector
                        && candidate.erased_parameters_in(&substitution, env) == erased
                })
            });
            let Some(found) = found else {
                continue;
            };
            let is_private = env.method(found).map_or(false, MethodBinding::is_private);
            if is_private && env.outermost_enclosing(level) != env.outermost_enclosing(declaring) {
                return None;
            }
            return Some(ResolvedMethod::new(self.rx, found));
        }
        None
    }

    /// Whether a supertype, interfaces included, declares a method this one
    /// overrides.
    pub fn is_overriding(&self) -> bool {
        if self.super_method().is_some_and(|s| !s.is_private()) {
            return true;
        }
        let env = self.rx.env;
        let Some(method) = self.binding() else {
            return false;
        };
        if method.is_constructor || method.is_static() {
            return false;
        }
        let Some(declaring) = method.declaring else {
            return false;
        };
        let erased = method.erased_parameters(env);
        lookup_order(env, declaring)
            .into_iter()
            .filter(|t| *t != declaring)
            .filter_map(|t| Some((t, env.type_binding(t)?)))
            .filter(|(_, binding)| binding.is_interface())
            .any(|(t, binding)| {
                let substitution = env.substitution(declaring, t);
                binding
                    .methods
                    .iter()
                    .filter_map(|id| env.method(*id))
                    .any(|m| {
                        m.selector == method.selector
                            && m.erased_parameters_in(&substitution, env) == erased
                    })
            })
    }

    /// This method and its super methods, stopping before a private one.
    fn chain(&self) -> Vec<ResolvedMethod<'env>> {
        let mut chain = vec![*self];
        let mut current = *self;
        while let Some(next) = current.super_method() {
            if next.is_private() || chain.contains(&next) {
                break;
            }
            chain.push(next);
            current = next;
        }
        chain
    }

    /// Annotations of the method and of the methods it overrides, merged
    /// with external annotations and deduplicated by name.
    pub fn annotations(&self) -> Vec<ResolvedAnnotation<'env>> {
        let mut out = Vec::new();
        for method in self.chain() {
            let Some(binding) = method.binding() else {
                continue;
            };
            out.extend(
                binding
                    .annotations
                    .iter()
                    .map(|a| ResolvedAnnotation::native(self.rx, *a)),
            );
            if let (Some(repository), Some(class)) = (self.rx.external, method.declaring_class()) {
                out.extend(
                    repository
                        .method_annotations(&class.qualified_name(), &method.signature())
                        .into_iter()
                        .map(ResolvedAnnotation::External),
                );
            }
        }
        ensure_unique(out)
    }

    /// Annotations of parameter `index`, collected like [`Self::annotations`].
    pub fn parameter_annotations(&self, index: usize) -> Vec<ResolvedAnnotation<'env>> {
        let mut out = Vec::new();
        for method in self.chain() {
            let Some(binding) = method.binding() else {
                continue;
            };
            if let Some(ids) = binding.parameter_annotations.get(index) {
                out.extend(ids.iter().map(|a| ResolvedAnnotation::native(self.rx, *a)));
            }
            if let (Some(repository), Some(class)) = (self.rx.external, method.declaring_class()) {
                out.extend(
                    repository
                        .parameter_annotations(&class.qualified_name(), &method.signature(), index)
                        .into_iter()
                        .map(ResolvedAnnotation::External),
                );
            }
        }
        ensure_unique(out)
    }

    /// Default value of an annotation type element.
    pub fn default_value(&self) -> Option<Value<'env>> {
        element(self.rx, self.binding()?.default_value.as_ref()?)
    }
}

impl Named for ResolvedMethod<'_> {
    fn name(&self) -> String {
        ResolvedMethod::name(self)
    }
}

// Fields, variables, packages

impl<'env> ResolvedField<'env> {
    fn binding(&self) -> Option<&'env FieldBinding> {
        self.rx.env.field(self.id)
    }

    pub fn name(&self) -> &'env str {
        self.binding().map(|f| f.name.as_str()).unwrap_or_default()
    }

    pub fn declaring_class(&self) -> Option<ResolvedClass<'env>> {
        self.binding().map(|f| ResolvedClass::new(self.rx, f.declaring))
    }

    pub fn type_name(&self) -> String {
        self.binding()
            .map(|f| f.ty.erasure(self.rx.env))
            .unwrap_or_default()
    }

    pub fn type_class(&self) -> Option<ResolvedClass<'env>> {
        let id = self.binding()?.ty.class_id()?;
        Some(ResolvedClass::new(self.rx, id))
    }

    pub fn is_static(&self) -> bool {
        self.binding().map_or(false, |f| f.modifiers.is_static())
    }

    pub fn is_final(&self) -> bool {
        self.binding().map_or(false, |f| f.modifiers.is_final())
    }

    pub fn is_enum_constant(&self) -> bool {
        self.binding().map_or(false, |f| f.is_enum_constant)
    }

    /// Folded compile-time value.
    pub fn value(&self) -> Option<Constant> {
        self.binding()?.constant.clone()
    }

    pub fn annotations(&self) -> Vec<ResolvedAnnotation<'env>> {
        let Some(binding) = self.binding() else {
            return Vec::new();
        };
        let mut external = Vec::new();
        if let (Some(repository), Some(class)) = (self.rx.external, self.declaring_class()) {
            external = repository.field_annotations(&class.qualified_name(), &binding.name);
        }
        merge(self.rx, &binding.annotations, external)
    }
}

impl Named for ResolvedField<'_> {
    fn name(&self) -> String {
        ResolvedField::name(self).to_string()
    }
}

impl<'env> ResolvedVariable<'env> {
    fn binding(&self) -> Option<&'env LocalBinding> {
        self.rx.env.local(self.id)
    }

    pub fn name(&self) -> &'env str {
        self.binding().map(|l| l.name.as_str()).unwrap_or_default()
    }

    pub fn type_name(&self) -> String {
        self.binding()
            .map(|l| l.ty.erasure(self.rx.env))
            .unwrap_or_default()
    }

    pub fn type_class(&self) -> Option<ResolvedClass<'env>> {
        let id = self.binding()?.ty.class_id()?;
        Some(ResolvedClass::new(self.rx, id))
    }

    /// Method, catch and lambda parameters.
    pub fn is_parameter(&self) -> bool {
        self.binding().map_or(false, |l| l.is_argument)
    }

    pub fn is_final(&self) -> bool {
        self.binding().map_or(false, |l| l.modifiers.is_final())
    }

    pub fn declaring_method(&self) -> Option<ResolvedMethod<'env>> {
        let id = self.binding()?.declaring_method?;
        Some(ResolvedMethod::new(self.rx, id))
    }

    pub fn annotations(&self) -> Vec<ResolvedAnnotation<'env>> {
        self.binding()
            .map(|l| merge(self.rx, &l.annotations, Vec::new()))
            .unwrap_or_default()
    }
}

impl<'env> ResolvedPackage<'env> {
    fn binding(&self) -> Option<&'env PackageBinding> {
        self.rx.env.package_binding(self.id)
    }

    pub fn name(&self) -> &'env str {
        self.binding().map(|p| p.name.as_str()).unwrap_or_default()
    }

    /// Annotations from `package-info.java`.
    pub fn annotations(&self) -> Vec<ResolvedAnnotation<'env>> {
        self.binding()
            .map(|p| merge(self.rx, &p.annotations, Vec::new()))
            .unwrap_or_default()
    }
}

fn merge<'env>(
    rx: Resolver<'env>,
    native: &[AnnotationId],
    external: Vec<ExternalAnnotation>,
) -> Vec<ResolvedAnnotation<'env>> {
    let all = native
        .iter()
        .map(|a| ResolvedAnnotation::native(rx, *a))
        .chain(external.into_iter().map(ResolvedAnnotation::External))
        .collect();
    ensure_unique(all)
}

// Annotations

#[derive(Debug, Clone)]
pub enum ResolvedAnnotation<'env> {
    Native { rx: Resolver<'env>, id: AnnotationId },
    External(ExternalAnnotation),
}

/// Element name and value of an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationValue<'env> {
    pub name: String,
    pub value: Value<'env>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value<'env> {
    Constant(Constant),
    Symbol(ResolvedSymbol<'env>),
    Array(Vec<Value<'env>>),
}

/// Typedef-style annotations whose values are rebuilt from source so the
/// named constants they list survive folding.
const TYPEDEF_ANNOTATIONS: &[&str] = &["IntDef", "StringDef"];

impl<'env> ResolvedAnnotation<'env> {
    pub(crate) fn native(rx: Resolver<'env>, id: AnnotationId) -> Self {
        ResolvedAnnotation::Native { rx, id }
    }

    fn binding(&self) -> Option<(Resolver<'env>, &'env AnnotationBinding)> {
        match self {
            ResolvedAnnotation::Native { rx, id } => Some((*rx, rx.env.annotation(*id)?)),
            ResolvedAnnotation::External(_) => None,
        }
    }

    /// Qualified name of the annotation type.
    pub fn name(&self) -> String {
        match self {
            ResolvedAnnotation::Native { .. } => self
                .annotation_type()
                .map(|t| t.qualified_name())
                .unwrap_or_default(),
            ResolvedAnnotation::External(external) => external.name.clone(),
        }
    }

    pub fn annotation_type(&self) -> Option<ResolvedClass<'env>> {
        let (rx, binding) = self.binding()?;
        Some(ResolvedClass::new(rx, binding.annotation_type))
    }

    pub fn is_external(&self) -> bool {
        matches!(self, ResolvedAnnotation::External(_))
    }

    pub fn values(&self) -> Vec<AnnotationValue<'env>> {
        match self {
            ResolvedAnnotation::External(external) => external
                .values
                .iter()
                .filter_map(|(name, value)| {
                    Some(AnnotationValue {
                        name: name.clone(),
                        value: json_value(value)?,
                    })
                })
                .collect(),
            ResolvedAnnotation::Native { .. } => {
                if let Some(values) = self.reconstructed() {
                    return values;
                }
                let Some((rx, binding)) = self.binding() else {
                    return Vec::new();
                };
                binding
                    .pairs
                    .iter()
                    .filter_map(|(name, value)| {
                        Some(AnnotationValue {
                            name: name.clone(),
                            value: element(rx, value)?,
                        })
                    })
                    .collect()
            }
        }
    }

    pub fn value(&self, name: &str) -> Option<Value<'env>> {
        self.values()
            .into_iter()
            .find(|v| v.name == name)
            .map(|v| v.value)
    }

    /// Values of a typedef-style annotation placed on an annotation type,
    /// read from its source tree.
    fn reconstructed(&self) -> Option<Vec<AnnotationValue<'env>>> {
        let (rx, binding) = self.binding()?;
        let type_name = rx.env.qualified_name(binding.annotation_type);
        if !TYPEDEF_ANNOTATIONS.contains(&simple_name(&type_name)) {
            return None;
        }
        let declaration = binding.declaration.as_ref()?;
        let tree = rx.result.tree(&declaration.file)?;
        let holder = tree.parent(declaration.node)?;
        if tree.type_decl(holder)?.kind != TypeKind::Annotation {
            return None;
        }
        let NodeKind::Annotation { pairs, .. } = tree.kind(declaration.node)? else {
            return None;
        };
        Some(
            pairs
                .iter()
                .filter_map(|(name, expr)| {
                    Some(AnnotationValue {
                        name: name.clone(),
                        value: raw_value(rx, tree, *expr)?,
                    })
                })
                .collect(),
        )
    }
}

impl PartialEq for ResolvedAnnotation<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                ResolvedAnnotation::Native { id: a, .. },
                ResolvedAnnotation::Native { id: b, .. },
            ) => a == b,
            (ResolvedAnnotation::External(a), ResolvedAnnotation::External(b)) => a == b,
            _ => false,
        }
    }
}

impl Named for ResolvedAnnotation<'_> {
    fn name(&self) -> String {
        ResolvedAnnotation::name(self)
    }
}

fn element<'env>(rx: Resolver<'env>, value: &ElementValue) -> Option<Value<'env>> {
    Some(match value {
        ElementValue::Constant(c) => Value::Constant(c.clone()),
        ElementValue::Type(sig) => {
            Value::Symbol(ResolvedSymbol::Class(ResolvedClass::new(rx, sig.class_id()?)))
        }
        ElementValue::Field(f) => Value::Symbol(ResolvedSymbol::Field(ResolvedField::new(rx, *f))),
        ElementValue::Annotation(a) => {
            Value::Symbol(ResolvedSymbol::Annotation(ResolvedAnnotation::native(rx, *a)))
        }
        ElementValue::Array(values) => {
            Value::Array(values.iter().filter_map(|v| element(rx, v)).collect())
        }
        ElementValue::Unresolved => return None,
    })
}

fn raw_value<'env>(rx: Resolver<'env>, tree: &CompilationUnit, expr: NodeId) -> Option<Value<'env>> {
    match tree.kind(expr)? {
        NodeKind::Literal { value } => value.clone().map(Value::Constant),
        NodeKind::ArrayInitializer { elements } => Some(Value::Array(
            elements
                .iter()
                .filter_map(|e| raw_value(rx, tree, *e))
                .collect(),
        )),
        NodeKind::SingleNameReference { .. }
        | NodeKind::QualifiedNameReference { .. }
        | NodeKind::FieldReference { .. } => match tree.binding(expr)? {
            Binding::Field(f) => Some(Value::Symbol(ResolvedSymbol::Field(ResolvedField::new(rx, f)))),
            _ => None,
        },
        NodeKind::Expression { operator, operands } => match (operator.as_str(), operands.as_slice()) {
            ("()", [inner]) => raw_value(rx, tree, *inner),
            (op, [operand]) => match raw_value(rx, tree, *operand)? {
                Value::Constant(c) => Constant::unary(op, &c).map(Value::Constant),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

fn json_value<'env>(value: &JsonValue) -> Option<Value<'env>> {
    Some(match value {
        JsonValue::Bool(b) => Value::Constant(Constant::Boolean(*b)),
        JsonValue::String(s) => Value::Constant(Constant::String(s.clone())),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => match i32::try_from(i) {
                Ok(small) => Value::Constant(Constant::Int(small)),
                Err(_) => Value::Constant(Constant::Long(i)),
            },
            None => Value::Constant(Constant::Double(n.as_f64()?)),
        },
        JsonValue::Array(values) => Value::Array(values.iter().filter_map(json_value).collect()),
        JsonValue::Null | JsonValue::Object(_) => return None,
    })
}
