//! Scope building over all units of a batch: types are entered, hierarchies
//! connected, members built, constants folded and annotations bound before
//! any method body is attributed.

use std::collections::HashSet;

use tracing::trace;

use crate::ast::{CompilationUnit, Modifiers, NodeId, NodeKind, TypeDecl, TypeKind, UnitScope};
use crate::binding::{
    AnnotationBinding, AnnotationId, Binding, DeclRef, ElementValue, FieldBinding, FieldId,
    LocalBinding, MethodBinding, MethodId, PackageId, ProblemReason, TypeBinding, TypeId,
    TypeOrigin, TypeSig,
};
use crate::compiler::CompilerOptions;
use crate::constant::{Constant, PrimitiveType};
use crate::lookup::LookupEnvironment;
use crate::name_env::NameEnvironment;
use crate::names::{qualifier, simple_name};
use crate::problem::{Problem, ProblemFactory, ProblemId};
use crate::source::SourceUnit;

/// A unit between parsing and per-unit processing.
pub(crate) struct ParsedUnit {
    pub source: SourceUnit,
    pub tree: CompilationUnit,
    pub problems: Vec<Problem>,
}

/// Naming context inside a unit.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    pub current_type: Option<TypeId>,
    pub method_type_params: Vec<String>,
}

impl Scope {
    pub fn in_type(current_type: TypeId) -> Self {
        Self {
            current_type: Some(current_type),
            method_type_params: Vec::new(),
        }
    }
}

pub(crate) enum NamedType {
    Type(TypeId),
    Variable(String),
}

/// Source type declarations of a unit that were entered, outermost first.
/// Local and anonymous types are not part of the binding graph.
pub fn source_types(tree: &CompilationUnit) -> Vec<(NodeId, TypeId)> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = tree.types.iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        let Some(Binding::Type(id)) = tree.binding(node) else {
            continue;
        };
        out.push((node, id));
        if let Some(decl) = tree.type_decl(node) {
            stack.extend(decl.member_types.iter().rev());
        }
    }
    out
}

/// Field named `name` declared in `ty` or inherited by it.
pub fn find_field(env: &LookupEnvironment, ty: TypeId, name: &str) -> Option<FieldId> {
    let mut seen = HashSet::new();
    let mut stack = vec![ty];
    while let Some(t) = stack.pop() {
        if !seen.insert(t) {
            continue;
        }
        let binding = env.type_binding(t)?;
        if let Some(f) = binding
            .fields
            .iter()
            .copied()
            .find(|f| env.field(*f).map(|b| b.name.as_str()) == Some(name))
        {
            return Some(f);
        }
        stack.extend(binding.interfaces.iter().rev());
        stack.extend(binding.superclass);
    }
    None
}

/// Member type named `name` of `ty` or of one of its supertypes.
pub fn find_member_type(env: &LookupEnvironment, ty: TypeId, name: &str) -> Option<TypeId> {
    let mut seen = HashSet::new();
    let mut stack = vec![ty];
    while let Some(t) = stack.pop() {
        if !seen.insert(t) {
            continue;
        }
        let binding = env.type_binding(t)?;
        if let Some(m) = binding
            .member_types
            .iter()
            .copied()
            .find(|m| env.type_binding(*m).map(|b| b.simple_name.as_str()) == Some(name))
        {
            return Some(m);
        }
        stack.extend(binding.interfaces.iter().rev());
        stack.extend(binding.superclass);
    }
    None
}

/// Whether some type in the hierarchy of `ty` came from the classpath, so
/// its members cannot be enumerated.
pub fn has_unknown_members(env: &LookupEnvironment, ty: TypeId) -> bool {
    let mut seen = HashSet::new();
    let mut stack = vec![ty];
    while let Some(t) = stack.pop() {
        if !seen.insert(t) {
            continue;
        }
        let Some(binding) = env.type_binding(t) else {
            return true;
        };
        if !binding.has_members() {
            return true;
        }
        stack.extend(&binding.interfaces);
        stack.extend(binding.superclass);
    }
    false
}

fn widening_rank(p: PrimitiveType) -> Option<u8> {
    Some(match p {
        PrimitiveType::Byte => 1,
        PrimitiveType::Short | PrimitiveType::Char => 2,
        PrimitiveType::Int => 3,
        PrimitiveType::Long => 4,
        PrimitiveType::Float => 5,
        PrimitiveType::Double => 6,
        PrimitiveType::Boolean => return None,
    })
}

/// Loose assignability used to pick between candidate methods.
pub fn is_assignable(env: &LookupEnvironment, arg: &TypeSig, param: &TypeSig) -> bool {
    match (arg, param) {
        (_, TypeSig::Variable { .. }) | (TypeSig::Unresolved(_), _) | (_, TypeSig::Unresolved(_)) => {
            true
        }
        (TypeSig::Primitive(a), TypeSig::Primitive(p)) => {
            a == p
                || match (widening_rank(*a), widening_rank(*p)) {
                    (Some(a_rank), Some(p_rank)) => {
                        a_rank < p_rank && !(*p == PrimitiveType::Char)
                    }
                    _ => false,
                }
        }
        (TypeSig::Primitive(_), TypeSig::Class { .. }) | (TypeSig::Class { .. }, TypeSig::Primitive(_)) => true,
        (TypeSig::Array(a), TypeSig::Array(p)) => is_assignable(env, a, p),
        (TypeSig::Array(_), TypeSig::Class { id, .. }) => Some(*id) == env.object(),
        (TypeSig::Class { id: a, .. }, TypeSig::Class { id: p, .. }) => {
            Some(*p) == env.object() || env.is_compatible(*a, *p)
        }
        (TypeSig::Variable { .. }, _) => true,
        (a, p) => a == p,
    }
}

/// Hierarchy order used for member lookup: the type, its superclasses,
/// then every superinterface. Interfaces end with `java.lang.Object`.
pub fn lookup_order(env: &LookupEnvironment, ty: TypeId) -> Vec<TypeId> {
    let mut order: Vec<TypeId> = env.superclasses(ty).collect();
    let mut seen: HashSet<TypeId> = order.iter().copied().collect();
    let mut index = 0;
    while index < order.len() {
        if let Some(binding) = env.type_binding(order[index]) {
            for i in &binding.interfaces {
                if seen.insert(*i) {
                    order.push(*i);
                }
            }
        }
        index += 1;
    }
    if let Some(object) = env.object() {
        if seen.insert(object) {
            order.push(object);
        }
    }
    order
}

/// Method `selector` applicable to `args` in the hierarchy of `ty`. When no
/// candidate matches the known argument types the first one by arity wins.
pub fn find_method(
    env: &LookupEnvironment,
    ty: TypeId,
    selector: &str,
    args: &[Option<TypeSig>],
) -> Option<MethodId> {
    let candidates: Vec<MethodId> = lookup_order(env, ty)
        .into_iter()
        .filter_map(|t| env.type_binding(t))
        .flat_map(|t| t.methods.iter().copied())
        .filter(|m| {
            env.method(*m).map_or(false, |b| {
                !b.is_constructor && b.selector == selector && b.accepts_arity(args.len())
            })
        })
        .collect();
    pick_applicable(env, &candidates, args)
}

pub fn find_constructor(
    env: &LookupEnvironment,
    ty: TypeId,
    args: &[Option<TypeSig>],
) -> Option<MethodId> {
    let candidates: Vec<MethodId> = env
        .type_binding(ty)?
        .methods
        .iter()
        .copied()
        .filter(|m| {
            env.method(*m)
                .map_or(false, |b| b.is_constructor && b.accepts_arity(args.len()))
        })
        .collect();
    pick_applicable(env, &candidates, args)
}

fn pick_applicable(
    env: &LookupEnvironment,
    candidates: &[MethodId],
    args: &[Option<TypeSig>],
) -> Option<MethodId> {
    candidates
        .iter()
        .copied()
        .find(|m| {
            let Some(method) = env.method(*m) else {
                return false;
            };
            args.iter().enumerate().all(|(i, arg)| {
                let Some(arg) = arg else { return true };
                let param = match method.parameters.get(i) {
                    Some(p) if !(method.is_varargs && i + 1 >= method.parameters.len()) => p,
                    _ => return true,
                };
                is_assignable(env, arg, param)
            })
        })
        .or_else(|| candidates.first().copied())
}

/// Name resolution services for one unit.
pub(crate) struct UnitResolver<'a> {
    pub env: &'a mut LookupEnvironment,
    pub names: &'a NameEnvironment,
    pub factory: &'a ProblemFactory,
    pub tree: &'a mut CompilationUnit,
    pub problems: &'a mut Vec<Problem>,
    unit_scope: UnitScope,
    /// Suppresses problem reports during repeated passes.
    pub quiet: bool,
}

impl<'a> UnitResolver<'a> {
    pub fn new(
        env: &'a mut LookupEnvironment,
        names: &'a NameEnvironment,
        factory: &'a ProblemFactory,
        tree: &'a mut CompilationUnit,
        problems: &'a mut Vec<Problem>,
    ) -> Self {
        let unit_scope = tree.scope.clone();
        Self {
            env,
            names,
            factory,
            tree,
            problems,
            unit_scope,
            quiet: false,
        }
    }

    pub fn decl_ref(&self, node: NodeId) -> DeclRef {
        DeclRef {
            file: self.tree.path.clone(),
            node,
        }
    }

    pub fn report(&mut self, id: ProblemId, node: NodeId, arguments: Vec<String>) {
        if self.quiet {
            return;
        }
        let span = self.tree.node(node).map(|n| n.span).unwrap_or_default();
        let problem = self.factory.error(id, &self.tree.path, span, arguments);
        self.problems.push(problem);
    }

    fn lookup(&mut self, qualified: &str) -> Option<TypeId> {
        self.env.lookup_type(self.names, qualified)
    }

    fn qualify(&self, name: &str) -> String {
        if self.unit_scope.package.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.unit_scope.package)
        }
    }

    pub fn resolve_type_name(&mut self, scope: &Scope, name: &str) -> Option<NamedType> {
        if let Some((first, rest)) = name.split_once('.') {
            if let Some(NamedType::Type(outer)) = self.resolve_simple_type(scope, first) {
                let mut current = Some(outer);
                for segment in rest.split('.') {
                    current = current.and_then(|t| find_member_type(self.env, t, segment));
                }
                if let Some(found) = current {
                    return Some(NamedType::Type(found));
                }
            }
            return self.lookup(name).map(NamedType::Type);
        }
        self.resolve_simple_type(scope, name)
    }

    fn resolve_simple_type(&mut self, scope: &Scope, name: &str) -> Option<NamedType> {
        if scope.method_type_params.iter().any(|p| p == name) {
            return Some(NamedType::Variable(name.to_string()));
        }
        let mut current = scope.current_type;
        while let Some(t) = current {
            let binding = self.env.type_binding(t)?;
            if binding.type_parameters.iter().any(|p| p == name) {
                return Some(NamedType::Variable(name.to_string()));
            }
            if binding.simple_name == name {
                return Some(NamedType::Type(t));
            }
            let enclosing = binding.enclosing;
            if let Some(member) = find_member_type(self.env, t, name) {
                return Some(NamedType::Type(member));
            }
            current = enclosing;
        }
        for &top in &self.unit_scope.top_types {
            if self.env.type_binding(top).map(|b| b.simple_name.as_str()) == Some(name) {
                return Some(NamedType::Type(top));
            }
        }
        let single: Vec<String> = self
            .unit_scope
            .imports
            .iter()
            .filter(|i| !i.on_demand && simple_name(&i.name) == name)
            .map(|i| i.name.clone())
            .collect();
        for import in single {
            if let Some(t) = self.lookup(&import) {
                return Some(NamedType::Type(t));
            }
        }
        let local = self.qualify(name);
        if let Some(t) = self.lookup(&local) {
            return Some(NamedType::Type(t));
        }
        let on_demand: Vec<String> = self
            .unit_scope
            .imports
            .iter()
            .filter(|i| i.on_demand)
            .map(|i| format!("{}.{name}", i.name))
            .collect();
        for candidate in on_demand {
            if let Some(t) = self.lookup(&candidate) {
                return Some(NamedType::Type(t));
            }
        }
        self.lookup(&format!("java.lang.{name}")).map(NamedType::Type)
    }

    /// Resolves a `TypeReference` node, binding it and reporting failures.
    pub fn resolve_type_ref(&mut self, scope: &Scope, node: NodeId) -> TypeSig {
        let Some(NodeKind::TypeReference {
            name,
            arguments,
            dimensions,
        }) = self.tree.kind(node).cloned()
        else {
            return TypeSig::Unresolved(String::new());
        };
        let base = if name == "void" {
            TypeSig::Void
        } else if let Some(p) = PrimitiveType::from_keyword(&name) {
            TypeSig::Primitive(p)
        } else {
            match self.resolve_type_name(scope, &name) {
                Some(NamedType::Type(id)) => {
                    self.tree.bind(node, Binding::Type(id));
                    let mut args = Vec::with_capacity(arguments.len());
                    for arg in &arguments {
                        args.push(self.resolve_type_ref(scope, *arg));
                    }
                    TypeSig::Class { id, args }
                }
                Some(NamedType::Variable(name)) => TypeSig::Variable { name, bound: None },
                None => {
                    self.tree.bind(node, Binding::Problem(ProblemReason::NotFound));
                    self.report(ProblemId::UNDEFINED_TYPE, node, vec![name.clone()]);
                    TypeSig::Unresolved(name)
                }
            }
        };
        base.array_of(dimensions)
    }

    /// Field visible under `name` from `scope`: the current type and its
    /// enclosing types (inherited members included), then static imports.
    pub fn resolve_field_name(&mut self, scope: &Scope, name: &str) -> Option<FieldId> {
        let mut current = scope.current_type;
        while let Some(t) = current {
            if let Some(f) = find_field(self.env, t, name) {
                return Some(f);
            }
            current = self.env.type_binding(t).and_then(|b| b.enclosing);
        }
        let statics: Vec<(String, bool)> = self
            .unit_scope
            .imports
            .iter()
            .filter(|i| i.is_static && (i.on_demand || simple_name(&i.name) == name))
            .map(|i| (i.name.clone(), i.on_demand))
            .collect();
        for (import, on_demand) in statics {
            let owner_name = if on_demand { import.as_str() } else { qualifier(&import) };
            if let Some(owner) = self.lookup(owner_name) {
                if let Some(f) = find_field(self.env, owner, name) {
                    return Some(f);
                }
            }
        }
        None
    }

    /// `Type.FIELD` or `pkg.Type.FIELD`, the type prefix being the shortest
    /// one that resolves.
    pub fn resolve_qualified_field(&mut self, scope: &Scope, tokens: &[String]) -> Option<FieldId> {
        for split in 1..tokens.len() {
            let prefix = tokens[..split].join(".");
            let Some(NamedType::Type(mut owner)) = self.resolve_type_name(scope, &prefix) else {
                continue;
            };
            let mut field = None;
            for token in &tokens[split..] {
                if let Some(f) = find_field(self.env, owner, token) {
                    field = Some(f);
                    owner = match self.env.field(f).and_then(|b| b.ty.class_id()) {
                        Some(t) => t,
                        None => break,
                    };
                } else if let Some(member) = find_member_type(self.env, owner, token) {
                    owner = member;
                    field = None;
                } else {
                    return None;
                }
            }
            return field;
        }
        None
    }

    /// Folds a constant expression, binding the names it reads.
    pub fn fold(&mut self, scope: &Scope, expr: NodeId) -> Option<Constant> {
        match self.tree.kind(expr)?.clone() {
            NodeKind::Literal { value } => value,
            NodeKind::Expression { operator, operands } => match (operator.as_str(), operands.as_slice()) {
                ("()", [inner]) => self.fold(scope, *inner),
                ("cast", [ty, value]) => {
                    let target = self.resolve_type_ref(scope, *ty);
                    let value = self.fold(scope, *value)?;
                    coerce(self.env, value, &target)
                }
                ("?:", [condition, then, otherwise]) => match self.fold(scope, *condition)? {
                    Constant::Boolean(true) => self.fold(scope, *then),
                    Constant::Boolean(false) => self.fold(scope, *otherwise),
                    _ => None,
                },
                (op, [operand]) => Constant::unary(op, &self.fold(scope, *operand)?),
                (op, [left, right]) => {
                    let left = self.fold(scope, *left)?;
                    let right = self.fold(scope, *right)?;
                    Constant::binary(op, &left, &right)
                }
                _ => None,
            },
            NodeKind::SingleNameReference { name } => {
                let field = self.resolve_field_name(scope, &name)?;
                self.tree.bind(expr, Binding::Field(field));
                self.env.field(field)?.constant.clone()
            }
            NodeKind::QualifiedNameReference { tokens } => {
                let field = self.resolve_qualified_field(scope, &tokens)?;
                self.tree.bind(expr, Binding::Field(field));
                self.env.field(field)?.constant.clone()
            }
            _ => None,
        }
    }

    /// Evaluates an annotation element value.
    pub fn element_value(
        &mut self,
        scope: &Scope,
        expr: NodeId,
        expected: Option<&TypeSig>,
    ) -> ElementValue {
        let Some(kind) = self.tree.kind(expr).cloned() else {
            return ElementValue::Unresolved;
        };
        let component = match expected {
            Some(TypeSig::Array(inner)) => Some(inner.as_ref()),
            other => other,
        };
        match kind {
            NodeKind::ArrayInitializer { elements } => ElementValue::Array(
                elements
                    .iter()
                    .map(|e| self.element_value(scope, *e, component))
                    .collect(),
            ),
            NodeKind::Annotation { .. } => match self.build_annotation(scope, expr) {
                Some(id) => ElementValue::Annotation(id),
                None => ElementValue::Unresolved,
            },
            NodeKind::ClassLiteral { type_ref } => {
                ElementValue::Type(self.resolve_type_ref(scope, type_ref))
            }
            _ => {
                if let Some(constant) = self.fold(scope, expr) {
                    let constant = match component.and_then(TypeSig::primitive) {
                        Some(p) => constant.convert(p).unwrap_or(constant),
                        None => constant,
                    };
                    return ElementValue::Constant(constant);
                }
                match self.tree.binding(expr) {
                    Some(Binding::Field(f)) => ElementValue::Field(f),
                    _ => ElementValue::Unresolved,
                }
            }
        }
    }

    /// Builds the binding for an annotation node. `None` when the
    /// annotation type cannot be resolved.
    pub fn build_annotation(&mut self, scope: &Scope, node: NodeId) -> Option<AnnotationId> {
        let Some(NodeKind::Annotation { type_ref, pairs }) = self.tree.kind(node).cloned() else {
            return None;
        };
        let Some(annotation_type) = self.resolve_type_ref(scope, type_ref).class_id() else {
            self.tree.bind(node, Binding::Problem(ProblemReason::NotFound));
            return None;
        };
        let mut values = Vec::with_capacity(pairs.len());
        for (name, value) in pairs {
            let element = self.env.type_binding(annotation_type).and_then(|t| {
                t.methods.iter().copied().find(|m| {
                    self.env
                        .method(*m)
                        .map_or(false, |b| b.selector == name && b.parameters.is_empty())
                })
            });
            let expected = element.and_then(|m| self.env.method(m)).map(|m| m.return_type.clone());
            if element.is_none() && !has_unknown_members(self.env, annotation_type) {
                let owner = self.env.qualified_name(annotation_type);
                self.report(ProblemId::UNDEFINED_ANNOTATION_MEMBER, value, vec![name.clone(), owner]);
            }
            let value = self.element_value(scope, value, expected.as_ref());
            values.push((name, value));
        }
        let declaration = Some(self.decl_ref(node));
        let id = self.env.add_annotation(AnnotationBinding {
            annotation_type,
            pairs: values,
            declaration,
        });
        self.tree.bind(node, Binding::Annotation(id));
        Some(id)
    }

    fn build_annotations(&mut self, scope: &Scope, nodes: &[NodeId]) -> Vec<AnnotationId> {
        nodes
            .iter()
            .filter_map(|n| self.build_annotation(scope, *n))
            .collect()
    }
}

fn coerce(env: &LookupEnvironment, value: Constant, target: &TypeSig) -> Option<Constant> {
    match target {
        TypeSig::Primitive(p) => value.convert(*p),
        TypeSig::Class { id, .. } if Some(*id) == env.string() => {
            matches!(value, Constant::String(_)).then_some(value)
        }
        _ => None,
    }
}

/// Runs every scope building step over the batch.
pub(crate) fn build(
    units: &mut [ParsedUnit],
    env: &mut LookupEnvironment,
    names: &NameEnvironment,
    factory: &ProblemFactory,
    options: &CompilerOptions,
) {
    for unit in units.iter_mut() {
        enter_types(unit, env, factory);
    }
    for unit in units.iter_mut() {
        let mut r = UnitResolver::new(env, names, factory, &mut unit.tree, &mut unit.problems);
        check_imports(&mut r);
        connect_hierarchies(&mut r);
    }
    for unit in units.iter_mut() {
        let mut r = UnitResolver::new(env, names, factory, &mut unit.tree, &mut unit.problems);
        build_members(&mut r);
    }
    fold_constants(units, env, names, factory);
    if options.store_annotations {
        for unit in units.iter_mut() {
            let mut r = UnitResolver::new(env, names, factory, &mut unit.tree, &mut unit.problems);
            bind_annotations(&mut r);
        }
    }
}

fn enter_types(unit: &mut ParsedUnit, env: &mut LookupEnvironment, factory: &ProblemFactory) {
    let package = unit.tree.package.clone().unwrap_or_default();
    let package_id = env.package(&package);
    unit.tree.scope = UnitScope {
        package,
        imports: unit.tree.imports.clone(),
        top_types: Vec::new(),
    };
    let mut top_types = Vec::new();
    for node in unit.tree.types.clone() {
        if let Some(id) = enter_type(unit, env, factory, node, package_id, None) {
            top_types.push(id);
        }
    }
    unit.tree.scope.top_types = top_types;
}

fn enter_type(
    unit: &mut ParsedUnit,
    env: &mut LookupEnvironment,
    factory: &ProblemFactory,
    node: NodeId,
    package: PackageId,
    enclosing: Option<TypeId>,
) -> Option<TypeId> {
    let decl = unit.tree.type_decl(node)?.clone();
    if decl.name.is_empty() {
        return None;
    }
    let qualified = match enclosing {
        Some(outer) => format!("{}.{}", env.qualified_name(outer), decl.name),
        None if unit.tree.scope.package.is_empty() => decl.name.clone(),
        None => format!("{}.{}", unit.tree.scope.package, decl.name),
    };
    if env.get_type(&qualified).is_some() {
        let span = unit.tree.node(node).map(|n| n.span).unwrap_or_default();
        let problem = factory.error(ProblemId::DUPLICATE_TYPES, &unit.tree.path, span, vec![qualified]);
        unit.problems.push(problem);
        return None;
    }
    let mut modifiers = decl.modifiers;
    if decl.kind.is_interface() {
        modifiers.insert(Modifiers::ABSTRACT);
    }
    let enclosing_is_interface = enclosing
        .and_then(|e| env.type_binding(e))
        .map_or(false, |e| e.is_interface());
    if enclosing.is_some() && (decl.kind != TypeKind::Class || enclosing_is_interface) {
        modifiers.insert(Modifiers::STATIC);
    }
    if enclosing_is_interface {
        modifiers.insert(Modifiers::PUBLIC);
    }
    let readable_name = if decl.type_parameters.is_empty() {
        qualified.clone()
    } else {
        format!("{qualified}<{}>", decl.type_parameters.join(","))
    };
    let id = env.add_type(TypeBinding {
        simple_name: decl.name.clone(),
        package,
        enclosing,
        kind: decl.kind,
        modifiers,
        type_parameters: decl.type_parameters.clone(),
        superclass: None,
        interfaces: Vec::new(),
        supertype_arguments: Vec::new(),
        methods: Vec::new(),
        fields: Vec::new(),
        member_types: Vec::new(),
        annotations: Vec::new(),
        origin: TypeOrigin::Source(DeclRef {
            file: unit.tree.path.clone(),
            node,
        }),
        readable_name,
    });
    trace!(name = %qualified, "entered type");
    unit.tree.bind(node, Binding::Type(id));
    for member in &decl.member_types {
        enter_type(unit, env, factory, *member, package, Some(id));
    }
    Some(id)
}

fn check_imports(r: &mut UnitResolver<'_>) {
    for import in r.tree.imports.clone() {
        let resolved = if import.is_static {
            let owner = if import.on_demand {
                import.name.as_str()
            } else {
                qualifier(&import.name)
            };
            r.lookup(owner).is_some()
        } else if import.on_demand {
            r.env.find_package(&import.name).is_some()
                || r.names.is_package(&import.name)
                || r.lookup(&import.name).is_some()
        } else {
            r.lookup(&import.name).is_some()
        };
        if !resolved {
            let problem = r.factory.error(
                ProblemId::IMPORT_NOT_FOUND,
                &r.tree.path,
                import.span,
                vec![import.name.clone()],
            );
            r.problems.push(problem);
        }
    }
}

fn connect_hierarchies(r: &mut UnitResolver<'_>) {
    for (node, ty) in source_types(r.tree) {
        let Some(decl) = r.tree.type_decl(node).cloned() else {
            continue;
        };
        let Some(binding) = r.env.type_binding(ty) else {
            continue;
        };
        let scope = Scope {
            current_type: binding.enclosing,
            method_type_params: binding.type_parameters.clone(),
        };
        let object = r.env.object();
        let mut arguments: Vec<(TypeId, Vec<TypeSig>)> = Vec::new();
        let declared = decl.superclass.and_then(|s| match r.resolve_type_ref(&scope, s) {
            TypeSig::Class { id, args } => Some((s, id, args)),
            other => other.class_id().map(|id| (s, id, Vec::new())),
        });
        let mut superclass = match decl.kind {
            TypeKind::Interface | TypeKind::Annotation => None,
            TypeKind::Enum => r.env.get_type("java.lang.Enum"),
            TypeKind::Record => r.env.get_type("java.lang.Record"),
            TypeKind::Class => match &declared {
                Some((reference, id, _)) => {
                    let (reference, id) = (*reference, *id);
                    let is_interface = r.env.type_binding(id).map_or(false, |b| b.is_interface());
                    if is_interface {
                        let args = vec![r.env.qualified_name(id), decl.name.clone()];
                        r.report(ProblemId::SUPERCLASS_MUST_BE_A_CLASS, reference, args);
                        object
                    } else {
                        Some(id)
                    }
                }
                None => object,
            },
        };
        if let Some(type_binding) = r.env.type_mut(ty) {
            type_binding.superclass = superclass;
        }
        if let Some(sup) = superclass {
            if r.env.superclasses(sup).any(|s| s == ty) {
                r.report(ProblemId::HIERARCHY_CIRCULARITY, node, vec![decl.name.clone()]);
                superclass = object.filter(|o| *o != ty);
                if let Some(type_binding) = r.env.type_mut(ty) {
                    type_binding.superclass = superclass;
                }
            }
        }

        if let Some((_, id, args)) = declared {
            if superclass == Some(id) && !args.is_empty() {
                arguments.push((id, args));
            }
        }

        let mut interfaces = Vec::new();
        for reference in &decl.interfaces {
            let (id, args) = match r.resolve_type_ref(&scope, *reference) {
                TypeSig::Class { id, args } => (id, args),
                other => match other.class_id() {
                    Some(id) => (id, Vec::new()),
                    None => continue,
                },
            };
            let known_class = r
                .env
                .type_binding(id)
                .map_or(false, |b| b.has_members() && !b.is_interface());
            if known_class {
                let args = vec![r.env.qualified_name(id), decl.name.clone()];
                r.report(ProblemId::SUPERINTERFACE_MUST_BE_AN_INTERFACE, *reference, args);
                continue;
            }
            if id == ty || r.env.is_compatible(id, ty) {
                r.report(ProblemId::HIERARCHY_CIRCULARITY, node, vec![decl.name.clone()]);
                continue;
            }
            if !args.is_empty() {
                arguments.push((id, args));
            }
            interfaces.push(id);
        }
        if decl.kind == TypeKind::Annotation {
            if let Some(annotation) = r.env.get_type("java.lang.annotation.Annotation") {
                interfaces.push(annotation);
            }
        }
        if let Some(type_binding) = r.env.type_mut(ty) {
            type_binding.interfaces = interfaces;
            type_binding.supertype_arguments = arguments;
        }
    }
}

fn build_members(r: &mut UnitResolver<'_>) {
    for (node, ty) in source_types(r.tree) {
        let Some(decl) = r.tree.type_decl(node).cloned() else {
            continue;
        };
        let scope = Scope::in_type(ty);
        let is_interface = decl.kind.is_interface();

        for field_node in &decl.fields {
            let Some(var) = r.tree.kind(*field_node).and_then(NodeKind::variable).cloned() else {
                continue;
            };
            let duplicate = r
                .env
                .type_binding(ty)
                .map_or(false, |t| t.fields.iter().any(|f| r.env.field(*f).map(|b| b.name.as_str()) == Some(var.name.as_str())));
            if duplicate {
                r.report(ProblemId::DUPLICATE_FIELD, *field_node, vec![decl.name.clone(), var.name.clone()]);
                r.tree.bind(*field_node, Binding::Problem(ProblemReason::Ambiguous));
                continue;
            }
            let mut modifiers = var.modifiers;
            if is_interface {
                modifiers.insert(Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL);
            }
            let ty_sig = if var.is_enum_constant {
                TypeSig::class(ty)
            } else {
                match var.type_ref {
                    Some(reference) => r.resolve_type_ref(&scope, reference),
                    None => TypeSig::Unresolved("var".to_string()),
                }
            };
            let declaration = Some(r.decl_ref(*field_node));
            let field = r.env.add_field(FieldBinding {
                name: var.name.clone(),
                declaring: ty,
                modifiers,
                ty: ty_sig,
                constant: None,
                annotations: Vec::new(),
                declaration,
                is_enum_constant: var.is_enum_constant,
            });
            if let Some(t) = r.env.type_mut(ty) {
                t.fields.push(field);
            }
            r.tree.bind(*field_node, Binding::Field(field));
        }

        let mut has_constructor = false;
        for method_node in &decl.methods {
            let Some(md) = r.tree.method_decl(*method_node).cloned() else {
                continue;
            };
            has_constructor |= md.is_constructor;
            let method_scope = Scope {
                current_type: Some(ty),
                method_type_params: md.type_parameters.clone(),
            };
            let mut modifiers = md.modifiers;
            if is_interface && !md.is_constructor {
                if !modifiers.is_private() {
                    modifiers.insert(Modifiers::PUBLIC);
                }
                if md.body.is_none() && !modifiers.is_static() {
                    modifiers.insert(Modifiers::ABSTRACT);
                }
            }
            let mut parameters = Vec::with_capacity(md.parameters.len());
            let mut parameter_names = Vec::with_capacity(md.parameters.len());
            let mut is_varargs = false;
            for p in &md.parameters {
                let Some(var) = r.tree.kind(*p).and_then(NodeKind::variable).cloned() else {
                    continue;
                };
                let sig = match var.type_ref {
                    Some(reference) => r.resolve_type_ref(&method_scope, reference),
                    None => TypeSig::Unresolved(String::new()),
                };
                is_varargs = var.is_varargs;
                parameters.push(sig);
                parameter_names.push(var.name);
            }
            let return_type = match md.return_type {
                Some(reference) => r.resolve_type_ref(&method_scope, reference),
                None => TypeSig::Void,
            };
            let candidate = MethodBinding {
                selector: md.name.clone(),
                declaring: Some(ty),
                is_constructor: md.is_constructor,
                modifiers,
                type_parameters: md.type_parameters.clone(),
                parameter_annotations: vec![Vec::new(); parameters.len()],
                parameters,
                parameter_names,
                is_varargs,
                return_type,
                annotations: Vec::new(),
                declaration: Some(r.decl_ref(*method_node)),
                default_value: None,
            };
            let duplicate = r.env.type_binding(ty).map_or(false, |t| {
                t.methods.iter().filter_map(|m| r.env.method(*m)).any(|m| {
                    m.selector == candidate.selector
                        && m.is_constructor == candidate.is_constructor
                        && m.has_same_erasure(&candidate, r.env)
                })
            });
            if duplicate {
                let erased = candidate.erased_parameters(r.env).join(", ");
                let args = vec![format!("{}({erased})", candidate.selector), decl.name.clone()];
                r.report(ProblemId::DUPLICATE_METHOD, *method_node, args);
            }
            let method = r.env.add_method(candidate);
            if let Some(t) = r.env.type_mut(ty) {
                t.methods.push(method);
            }
            r.tree.bind(*method_node, Binding::Method(method));
            bind_parameters(r, method, &md.parameters);
        }

        add_implicit_members(r, ty, &decl, has_constructor);
    }
}

fn bind_parameters(r: &mut UnitResolver<'_>, method: MethodId, nodes: &[NodeId]) {
    let Some(binding) = r.env.method(method).cloned() else {
        return;
    };
    for (index, node) in nodes.iter().enumerate() {
        let Some(var) = r.tree.kind(*node).and_then(NodeKind::variable).cloned() else {
            continue;
        };
        let ty = binding
            .parameters
            .get(index)
            .cloned()
            .unwrap_or_else(|| TypeSig::Unresolved(String::new()));
        let declaration = r.decl_ref(*node);
        let local = r.env.add_local(LocalBinding {
            name: var.name,
            ty,
            modifiers: var.modifiers,
            is_argument: true,
            declaring_method: Some(method),
            annotations: Vec::new(),
            declaration,
            used: false,
        });
        r.tree.bind(*node, Binding::Local(local));
    }
}

fn synthetic_method(
    declaring: TypeId,
    selector: &str,
    is_constructor: bool,
    modifiers: Modifiers,
    parameters: Vec<(String, TypeSig)>,
    return_type: TypeSig,
) -> MethodBinding {
    let (parameter_names, parameters): (Vec<String>, Vec<TypeSig>) = parameters.into_iter().unzip();
    MethodBinding {
        selector: selector.to_string(),
        declaring: Some(declaring),
        is_constructor,
        modifiers,
        type_parameters: Vec::new(),
        parameter_annotations: vec![Vec::new(); parameters.len()],
        parameters,
        parameter_names,
        is_varargs: false,
        return_type,
        annotations: Vec::new(),
        declaration: None,
        default_value: None,
    }
}

/// Default constructors, enum helpers and record accessors.
fn add_implicit_members(
    r: &mut UnitResolver<'_>,
    ty: TypeId,
    decl: &TypeDecl,
    has_constructor: bool,
) {
    let mut added = Vec::new();
    let components: Vec<(String, TypeSig)> = if decl.kind == TypeKind::Record {
        decl.fields
            .iter()
            .filter_map(|f| match r.tree.binding(*f) {
                Some(Binding::Field(id)) => r.env.field(id).map(|b| (b.name.clone(), b.ty.clone())),
                _ => None,
            })
            .collect()
    } else {
        Vec::new()
    };
    if !has_constructor && matches!(decl.kind, TypeKind::Class | TypeKind::Enum | TypeKind::Record) {
        let access = if decl.kind == TypeKind::Enum {
            Modifiers::PRIVATE
        } else {
            let mut access = Modifiers::empty();
            for m in [Modifiers::PUBLIC, Modifiers::PROTECTED, Modifiers::PRIVATE] {
                if decl.modifiers.contains(m) {
                    access.insert(m);
                }
            }
            access
        };
        added.push(synthetic_method(ty, &decl.name, true, access, components.clone(), TypeSig::Void));
    }
    if decl.kind == TypeKind::Enum {
        let public_static = Modifiers::PUBLIC | Modifiers::STATIC;
        added.push(synthetic_method(
            ty,
            "values",
            false,
            public_static,
            Vec::new(),
            TypeSig::class(ty).array_of(1),
        ));
        let string = r
            .env
            .string()
            .map(TypeSig::class)
            .unwrap_or_else(|| TypeSig::Unresolved("String".to_string()));
        added.push(synthetic_method(
            ty,
            "valueOf",
            false,
            public_static,
            vec![("name".to_string(), string)],
            TypeSig::class(ty),
        ));
    }
    for (name, sig) in components {
        let declared = r.env.type_binding(ty).map_or(false, |t| {
            t.methods
                .iter()
                .filter_map(|m| r.env.method(*m))
                .any(|m| m.selector == name && m.parameters.is_empty())
        });
        if !declared {
            added.push(synthetic_method(ty, &name, false, Modifiers::PUBLIC, Vec::new(), sig));
        }
    }
    for method in added {
        let id = r.env.add_method(method);
        if let Some(t) = r.env.type_mut(ty) {
            t.methods.push(id);
        }
    }
}

fn constant_candidate(env: &LookupEnvironment, field: &FieldBinding, is_interface: bool) -> bool {
    (field.modifiers.is_final() || is_interface)
        && match &field.ty {
            TypeSig::Primitive(_) => true,
            TypeSig::Class { id, .. } => Some(*id) == env.string(),
            _ => false,
        }
}

/// Folds `final` field initializers until no further field becomes
/// constant, so constants may refer to constants declared later or in
/// other units.
fn fold_constants(
    units: &mut [ParsedUnit],
    env: &mut LookupEnvironment,
    names: &NameEnvironment,
    factory: &ProblemFactory,
) {
    let mut pending = Vec::new();
    for (index, unit) in units.iter().enumerate() {
        for (node, ty) in source_types(&unit.tree) {
            let is_interface = env.type_binding(ty).map_or(false, |t| t.is_interface());
            let Some(decl) = unit.tree.type_decl(node) else {
                continue;
            };
            for field_node in &decl.fields {
                let Some(Binding::Field(field)) = unit.tree.binding(*field_node) else {
                    continue;
                };
                let initializer = unit
                    .tree
                    .kind(*field_node)
                    .and_then(NodeKind::variable)
                    .and_then(|v| v.initializer);
                let Some(initializer) = initializer else {
                    continue;
                };
                if env
                    .field(field)
                    .map_or(false, |f| constant_candidate(env, f, is_interface))
                {
                    pending.push((index, ty, field, initializer));
                }
            }
        }
    }
    loop {
        let before = pending.len();
        pending.retain(|&(index, ty, field, initializer)| {
            let unit = &mut units[index];
            let mut r = UnitResolver::new(env, names, factory, &mut unit.tree, &mut unit.problems);
            r.quiet = true;
            let folded = r.fold(&Scope::in_type(ty), initializer);
            let target = r.env.field(field).map(|f| f.ty.clone());
            let value = match (folded, target) {
                (Some(value), Some(target)) => coerce(r.env, value, &target),
                _ => None,
            };
            match value {
                Some(value) => {
                    if let Some(f) = r.env.field_mut(field) {
                        f.constant = Some(value);
                    }
                    false
                }
                None => true,
            }
        });
        if pending.len() == before {
            break;
        }
    }
}

fn bind_annotations(r: &mut UnitResolver<'_>) {
    let package_annotations = r.tree.package_annotations.clone();
    if !package_annotations.is_empty() {
        let ids = r.build_annotations(&Scope::default(), &package_annotations);
        let package = r.tree.scope.package.clone();
        let package_id = r.env.package(&package);
        let declaration = Some(r.decl_ref(package_annotations[0]));
        if let Some(p) = r.env.package_mut(package_id) {
            p.annotations.extend(ids);
            p.declaration = declaration;
        }
        r.tree.bind(package_annotations[0], Binding::Package(package_id));
    }
    for (node, ty) in source_types(r.tree) {
        let Some(decl) = r.tree.type_decl(node).cloned() else {
            continue;
        };
        let scope = Scope::in_type(ty);
        let ids = r.build_annotations(&scope, &decl.annotations);
        if let Some(t) = r.env.type_mut(ty) {
            t.annotations = ids;
        }
        for field_node in &decl.fields {
            let Some(Binding::Field(field)) = r.tree.binding(*field_node) else {
                continue;
            };
            let annotations = r
                .tree
                .kind(*field_node)
                .and_then(NodeKind::variable)
                .map(|v| v.annotations.clone())
                .unwrap_or_default();
            let ids = r.build_annotations(&scope, &annotations);
            if let Some(f) = r.env.field_mut(field) {
                f.annotations = ids;
            }
        }
        for method_node in &decl.methods {
            let Some(Binding::Method(method)) = r.tree.binding(*method_node) else {
                continue;
            };
            let Some(md) = r.tree.method_decl(*method_node).cloned() else {
                continue;
            };
            let method_scope = Scope {
                current_type: Some(ty),
                method_type_params: md.type_parameters.clone(),
            };
            let ids = r.build_annotations(&method_scope, &md.annotations);
            let mut per_parameter = Vec::with_capacity(md.parameters.len());
            for p in &md.parameters {
                let annotations = r
                    .tree
                    .kind(*p)
                    .and_then(NodeKind::variable)
                    .map(|v| v.annotations.clone())
                    .unwrap_or_default();
                let parameter_ids = r.build_annotations(&method_scope, &annotations);
                if let Some(Binding::Local(local)) = r.tree.binding(*p) {
                    if let Some(l) = r.env.local_mut(local) {
                        l.annotations = parameter_ids.clone();
                    }
                }
                per_parameter.push(parameter_ids);
            }
            let default_value = md.default_value.map(|value| {
                let expected = r.env.method(method).map(|m| m.return_type.clone());
                r.element_value(&method_scope, value, expected.as_ref())
            });
            if let Some(m) = r.env.method_mut(method) {
                m.annotations = ids;
                m.parameter_annotations = per_parameter;
                m.default_value = default_value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_unit;

    fn build_units(sources: &[(&str, &str)]) -> (Vec<ParsedUnit>, LookupEnvironment) {
        let mut units: Vec<ParsedUnit> = sources
            .iter()
            .map(|(path, src)| {
                let source = SourceUnit::new(*path, *src);
                let tree = parse_unit(&source).unwrap();
                ParsedUnit {
                    source,
                    tree,
                    problems: Vec::new(),
                }
            })
            .collect();
        let mut env = LookupEnvironment::new();
        let names = NameEnvironment::default();
        let factory = ProblemFactory::new(true, false);
        build(&mut units, &mut env, &names, &factory, &CompilerOptions::default());
        (units, env)
    }

    #[test]
    fn enters_nested_types_with_qualified_names() {
        let (_, env) = build_units(&[("p/Outer.java", "package p; class Outer { static class Inner {} }")]);
        let inner = env.get_type("p.Outer.Inner").unwrap();
        let outer = env.get_type("p.Outer").unwrap();
        assert_eq!(env.type_binding(inner).unwrap().enclosing, Some(outer));
        assert_eq!(env.outermost_enclosing(inner), outer);
    }

    #[test]
    fn duplicate_types_are_reported() {
        let (units, _) = build_units(&[("a/A.java", "class A {}"), ("b/A.java", "class A {}")]);
        assert!(units[0].problems.is_empty());
        assert_eq!(units[1].problems[0].id, ProblemId::DUPLICATE_TYPES);
    }

    #[test]
    fn hierarchy_defaults_and_cycles() {
        let (units, env) = build_units(&[
            ("E.java", "enum E { A, B }"),
            ("X.java", "class X extends Y {} class Y extends X {}"),
            ("M.java", "@interface M {}"),
        ]);
        let e = env.get_type("E").unwrap();
        assert_eq!(env.type_binding(e).unwrap().superclass, env.get_type("java.lang.Enum"));
        let m = env.get_type("M").unwrap();
        let m = env.type_binding(m).unwrap();
        assert!(m.superclass.is_none());
        assert_eq!(m.interfaces, vec![env.get_type("java.lang.annotation.Annotation").unwrap()]);
        assert!(units[1]
            .problems
            .iter()
            .any(|p| p.id == ProblemId::HIERARCHY_CIRCULARITY));
        let x = env.get_type("X").unwrap();
        assert!(env.superclasses(x).count() <= 3);
    }

    #[test]
    fn constants_fold_across_units_and_forward_references() {
        let (_, env) = build_units(&[
            ("p/A.java", "package p; class A { static final int X = B.Y * 2; static final String S = \"v\" + X; }"),
            ("p/B.java", "package p; class B { static final int Y = Z + 1; static final int Z = 20; static int NOT_FINAL = 3; }"),
        ]);
        let a = env.get_type("p.A").unwrap();
        let x = find_field(&env, a, "X").unwrap();
        assert_eq!(env.field(x).unwrap().constant, Some(Constant::Int(42)));
        let s = find_field(&env, a, "S").unwrap();
        assert_eq!(env.field(s).unwrap().constant, Some(Constant::String("v42".into())));
        let b = env.get_type("p.B").unwrap();
        let not_final = find_field(&env, b, "NOT_FINAL").unwrap();
        assert_eq!(env.field(not_final).unwrap().constant, None);
    }

    #[test]
    fn annotations_use_folded_values() {
        let (_, env) = build_units(&[(
            "p/Mode.java",
            "package p; import java.lang.annotation.*; @Retention(RetentionPolicy.SOURCE) @interface Mode { int A = 1; int B = 2; int[] value() default {A, B}; }",
        )]);
        let mode = env.get_type("p.Mode").unwrap();
        let binding = env.type_binding(mode).unwrap();
        assert_eq!(binding.annotations.len(), 1);
        let retention = env.annotation(binding.annotations[0]).unwrap();
        assert!(matches!(retention.pairs[0].1, ElementValue::Field(_)));
        let value = binding
            .methods
            .iter()
            .filter_map(|m| env.method(*m))
            .find(|m| m.selector == "value")
            .unwrap();
        assert_eq!(
            value.default_value,
            Some(ElementValue::Array(vec![
                ElementValue::Constant(Constant::Int(1)),
                ElementValue::Constant(Constant::Int(2)),
            ]))
        );
    }

    #[test]
    fn implicit_members_are_added() {
        let (_, env) = build_units(&[("C.java", "public class C {} enum E { ONE }")]);
        let c = env.get_type("C").unwrap();
        let ctor = env
            .type_binding(c)
            .unwrap()
            .methods
            .iter()
            .filter_map(|m| env.method(*m))
            .find(|m| m.is_constructor)
            .unwrap();
        assert!(ctor.modifiers.contains(Modifiers::PUBLIC));
        let e = env.get_type("E").unwrap();
        assert!(find_method(&env, e, "values", &[]).is_some());
        assert!(find_method(&env, e, "valueOf", &[None]).is_some());
        assert!(find_method(&env, e, "hashCode", &[]).is_some());
    }
}
