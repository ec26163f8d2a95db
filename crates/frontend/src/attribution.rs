//! Body attribution: binds every name, field access, message send and
//! allocation inside method bodies, initializers and field initializers.

use crate::ast::{NodeId, NodeKind};
use crate::binding::{Binding, DeclRef, LocalBinding, LocalId, MethodId, ProblemReason, TypeId, TypeSig};
use crate::compiler::UnitContext;
use crate::constant::{Constant, PrimitiveType};
use crate::problem::ProblemId;
use crate::scope::{
    find_constructor, find_field, find_method, has_unknown_members, source_types, NamedType,
    Scope, UnitResolver,
};
use crate::CompileFault;

/// Kinds that open a nested local scope.
const SCOPED_KINDS: &[&str] = &[
    "ForStatement",
    "ForeachStatement",
    "CatchClause",
    "LambdaExpression",
    "TryWithResourcesStatement",
    "SwitchBlock",
    "SwitchBlockStatementGroup",
];

/// Parameters of these are never reported as unused.
const ARGUMENT_HOLDERS: &[&str] = &["CatchClause", "LambdaExpression"];

pub(crate) fn attribute(cx: &mut UnitContext<'_>) -> Result<(), CompileFault> {
    for (node, ty) in source_types(cx.tree) {
        let Some(decl) = cx.tree.type_decl(node).cloned() else {
            continue;
        };
        let resolver = UnitResolver::new(
            &mut *cx.env,
            cx.names,
            cx.factory,
            &mut *cx.tree,
            &mut *cx.problems,
        );
        let mut attributor = Attributor::new(resolver, ty);
        for field in &decl.fields {
            let initializer = attributor
                .r
                .tree
                .kind(*field)
                .and_then(NodeKind::variable)
                .and_then(|v| v.initializer);
            if let Some(initializer) = initializer {
                attributor.visit(initializer);
            }
        }
        for initializer in &decl.initializers {
            attributor.visit(*initializer);
        }
        for method in &decl.methods {
            if let Some(Binding::Method(id)) = attributor.r.tree.binding(*method) {
                attributor.method(*method, id);
            }
        }
    }
    Ok(())
}

struct Attributor<'a> {
    r: UnitResolver<'a>,
    scope: Scope,
    method: Option<MethodId>,
    locals: Vec<Vec<(String, LocalId)>>,
}

impl<'a> Attributor<'a> {
    fn new(r: UnitResolver<'a>, ty: TypeId) -> Self {
        Self {
            r,
            scope: Scope::in_type(ty),
            method: None,
            locals: vec![Vec::new()],
        }
    }

    fn current_type(&self) -> Option<TypeId> {
        self.scope.current_type
    }

    fn push(&mut self) {
        self.locals.push(Vec::new());
    }

    fn pop(&mut self) {
        self.locals.pop();
    }

    fn define(&mut self, name: String, local: LocalId) {
        if let Some(frame) = self.locals.last_mut() {
            frame.push((name, local));
        }
    }

    fn find_local(&self, name: &str) -> Option<LocalId> {
        self.locals
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    fn method(&mut self, node: NodeId, id: MethodId) {
        let Some(decl) = self.r.tree.method_decl(node).cloned() else {
            return;
        };
        self.scope.method_type_params = decl.type_parameters.clone();
        self.method = Some(id);
        self.push();
        for parameter in &decl.parameters {
            if let Some(Binding::Local(local)) = self.r.tree.binding(*parameter) {
                if let Some(binding) = self.r.env.local(local) {
                    let name = binding.name.clone();
                    self.define(name, local);
                }
            }
        }
        if let Some(body) = decl.body {
            self.visit(body);
        }
        self.pop();
        self.method = None;
        self.scope.method_type_params.clear();
    }

    /// Attributes `id` and returns the static type of the expression, when
    /// it is an expression whose type is known.
    fn visit(&mut self, id: NodeId) -> Option<TypeSig> {
        let kind = self.r.tree.kind(id)?.clone();
        match kind {
            NodeKind::Block { statements } => {
                self.push();
                for statement in statements {
                    self.visit(statement);
                }
                self.pop();
                None
            }
            NodeKind::LocalDeclaration(_) => {
                self.local(id);
                None
            }
            NodeKind::Other { kind, children } => {
                if kind == "AnonymousClassBody" {
                    return None;
                }
                let scoped = SCOPED_KINDS.contains(&kind.as_str());
                if scoped {
                    self.push();
                }
                for child in children {
                    self.visit(child);
                }
                if scoped {
                    self.pop();
                }
                None
            }
            NodeKind::TypeDeclaration(_)
            | NodeKind::MethodDeclaration(_)
            | NodeKind::FieldDeclaration(_)
            | NodeKind::Argument(_) => None,
            NodeKind::Annotation { .. } => {
                let scope = self.scope.clone();
                self.r.build_annotation(&scope, id);
                None
            }
            NodeKind::SingleNameReference { name } => self.name(id, &name, true),
            NodeKind::QualifiedNameReference { tokens } => self.qualified_name(id, &tokens),
            NodeKind::FieldReference { receiver, name } => {
                let receiver = self.visit(receiver);
                self.field_access(id, receiver, &name)
            }
            NodeKind::MessageSend {
                receiver,
                selector,
                arguments,
            } => self.message_send(id, receiver, &selector, &arguments),
            NodeKind::Allocation {
                type_ref,
                arguments,
                anonymous_body,
            } => self.allocation(id, type_ref, &arguments, anonymous_body.is_some()),
            NodeKind::ExplicitConstructorCall {
                is_super,
                arguments,
            } => {
                self.constructor_call(id, is_super, &arguments);
                None
            }
            NodeKind::ThisReference { is_super } => {
                let current = self.current_type()?;
                let target = if is_super {
                    self.r.env.type_binding(current)?.superclass?
                } else {
                    current
                };
                self.r.tree.bind(id, Binding::Type(target));
                Some(TypeSig::class(target))
            }
            NodeKind::TypeReference { .. } => {
                let scope = self.scope.clone();
                Some(self.r.resolve_type_ref(&scope, id))
            }
            NodeKind::Literal { value } => value.map(|c| self.constant_type(&c)),
            NodeKind::ArrayInitializer { elements } => {
                for element in elements {
                    self.visit(element);
                }
                None
            }
            NodeKind::ClassLiteral { type_ref } => {
                let scope = self.scope.clone();
                self.r.resolve_type_ref(&scope, type_ref);
                self.r.env.get_type("java.lang.Class").map(TypeSig::class)
            }
            NodeKind::Expression { operator, operands } => self.operator(&operator, &operands),
        }
    }

    fn constant_type(&self, constant: &Constant) -> TypeSig {
        let primitive = match constant {
            Constant::Boolean(_) => PrimitiveType::Boolean,
            Constant::Byte(_) => PrimitiveType::Byte,
            Constant::Char(_) => PrimitiveType::Char,
            Constant::Short(_) => PrimitiveType::Short,
            Constant::Int(_) => PrimitiveType::Int,
            Constant::Long(_) => PrimitiveType::Long,
            Constant::Float(_) => PrimitiveType::Float,
            Constant::Double(_) => PrimitiveType::Double,
            Constant::String(_) => {
                return self
                    .r
                    .env
                    .string()
                    .map(TypeSig::class)
                    .unwrap_or_else(|| TypeSig::Unresolved("String".to_string()))
            }
        };
        TypeSig::Primitive(primitive)
    }

    fn local(&mut self, id: NodeId) {
        let Some(var) = self.r.tree.kind(id).and_then(NodeKind::variable).cloned() else {
            return;
        };
        let initialized = var.initializer.and_then(|init| self.visit(init));
        let scope = self.scope.clone();
        let ty = match var.type_ref {
            Some(reference) => self.r.resolve_type_ref(&scope, reference),
            None => initialized.unwrap_or_else(|| TypeSig::Unresolved(String::new())),
        };
        let annotations = var
            .annotations
            .iter()
            .filter_map(|a| self.r.build_annotation(&scope, *a))
            .collect();
        let is_argument = self
            .r
            .tree
            .parent(id)
            .and_then(|p| self.r.tree.kind(p))
            .map_or(false, |k| ARGUMENT_HOLDERS.contains(&k.name()));
        let local = match self.r.tree.binding(id) {
            Some(Binding::Local(local)) => local,
            _ => self.r.env.add_local(LocalBinding {
                name: var.name.clone(),
                ty,
                modifiers: var.modifiers,
                is_argument,
                declaring_method: self.method,
                annotations,
                declaration: DeclRef {
                    file: self.r.tree.path.clone(),
                    node: id,
                },
                used: false,
            }),
        };
        self.r.tree.bind(id, Binding::Local(local));
        self.define(var.name, local);
    }

    /// Whether failures against `ty` can be reported: its whole hierarchy
    /// must come from source or the platform.
    fn reportable(&self, ty: Option<TypeId>) -> bool {
        ty.map_or(true, |t| !has_unknown_members(self.r.env, t))
    }

    /// Whether the enclosing types all have known hierarchies.
    fn context_reportable(&self) -> bool {
        let mut current = self.current_type();
        while let Some(t) = current {
            if has_unknown_members(self.r.env, t) {
                return false;
            }
            current = self.r.env.type_binding(t).and_then(|b| b.enclosing);
        }
        true
    }

    fn fail(&mut self, id: NodeId, problem: Option<(ProblemId, Vec<String>)>) -> Option<TypeSig> {
        self.r.tree.bind(id, Binding::Problem(ProblemReason::NotFound));
        if let Some((problem, arguments)) = problem {
            self.r.report(problem, id, arguments);
        }
        None
    }

    fn name(&mut self, id: NodeId, name: &str, mark_used: bool) -> Option<TypeSig> {
        if let Some(local) = self.find_local(name) {
            self.r.tree.bind(id, Binding::Local(local));
            let binding = self.r.env.local_mut(local)?;
            if mark_used {
                binding.used = true;
            }
            return Some(binding.ty.clone());
        }
        let scope = self.scope.clone();
        if let Some(field) = self.r.resolve_field_name(&scope, name) {
            self.r.tree.bind(id, Binding::Field(field));
            return self.r.env.field(field).map(|f| f.ty.clone());
        }
        if let Some(NamedType::Type(ty)) = self.r.resolve_type_name(&scope, name) {
            self.r.tree.bind(id, Binding::Type(ty));
            return Some(TypeSig::class(ty));
        }
        let problem = self
            .context_reportable()
            .then(|| (ProblemId::UNDEFINED_NAME, vec![name.to_string()]));
        self.fail(id, problem)
    }

    fn qualified_name(&mut self, id: NodeId, tokens: &[String]) -> Option<TypeSig> {
        let first = tokens.first()?;
        let scope = self.scope.clone();
        let head = if let Some(local) = self.find_local(first) {
            let binding = self.r.env.local_mut(local)?;
            binding.used = true;
            Some((Binding::Local(local), binding.ty.clone(), 1))
        } else if let Some(field) = self.r.resolve_field_name(&scope, first) {
            self.r
                .env
                .field(field)
                .map(|f| (Binding::Field(field), f.ty.clone(), 1))
        } else {
            (1..tokens.len()).find_map(|split| {
                match self.r.resolve_type_name(&scope, &tokens[..split].join(".")) {
                    Some(NamedType::Type(ty)) => Some((Binding::Type(ty), TypeSig::class(ty), split)),
                    _ => None,
                }
            })
        };
        let Some((mut binding, mut ty, consumed)) = head else {
            let problem = self
                .context_reportable()
                .then(|| (ProblemId::UNDEFINED_NAME, vec![tokens.join(".")]));
            return self.fail(id, problem);
        };
        for token in &tokens[consumed..] {
            if matches!(ty, TypeSig::Array(_)) && token == "length" {
                ty = TypeSig::Primitive(PrimitiveType::Int);
                continue;
            }
            let owner = ty.class_id();
            let field = owner.and_then(|o| find_field(self.r.env, o, token));
            match (field, binding) {
                (Some(field), _) => {
                    binding = Binding::Field(field);
                    ty = self.r.env.field(field)?.ty.clone();
                }
                (None, Binding::Type(outer)) => {
                    let member = crate::scope::find_member_type(self.r.env, outer, token);
                    let Some(member) = member else {
                        return self.undefined_field(id, owner, token);
                    };
                    binding = Binding::Type(member);
                    ty = TypeSig::class(member);
                }
                (None, _) => return self.undefined_field(id, owner, token),
            }
        }
        self.r.tree.bind(id, binding);
        Some(ty)
    }

    fn undefined_field(&mut self, id: NodeId, owner: Option<TypeId>, name: &str) -> Option<TypeSig> {
        let problem = (owner.is_some() && self.reportable(owner))
            .then(|| (ProblemId::UNDEFINED_FIELD, vec![name.to_string()]));
        self.fail(id, problem)
    }

    fn field_access(&mut self, id: NodeId, receiver: Option<TypeSig>, name: &str) -> Option<TypeSig> {
        let receiver = receiver?;
        if matches!(receiver, TypeSig::Array(_)) && name == "length" {
            return Some(TypeSig::Primitive(PrimitiveType::Int));
        }
        let owner = receiver.class_id();
        match owner.and_then(|o| find_field(self.r.env, o, name)) {
            Some(field) => {
                self.r.tree.bind(id, Binding::Field(field));
                self.r.env.field(field).map(|f| f.ty.clone())
            }
            None => self.undefined_field(id, owner, name),
        }
    }

    fn arguments(&mut self, arguments: &[NodeId]) -> Vec<Option<TypeSig>> {
        arguments.iter().map(|a| self.visit(*a)).collect()
    }

    fn describe_call(&self, selector: &str, arguments: &[Option<TypeSig>]) -> String {
        let types: Vec<String> = arguments
            .iter()
            .map(|a| a.as_ref().map_or_else(|| "?".to_string(), |t| t.readable(self.r.env)))
            .collect();
        format!("{selector}({})", types.join(", "))
    }

    fn return_type(&self, method: MethodId) -> Option<TypeSig> {
        let ty = self.r.env.method(method)?.return_type.clone();
        match ty {
            TypeSig::Variable { bound: None, .. } => self.r.env.object().map(TypeSig::class),
            TypeSig::Void => None,
            other => Some(other),
        }
    }

    fn message_send(
        &mut self,
        id: NodeId,
        receiver: Option<NodeId>,
        selector: &str,
        arguments: &[NodeId],
    ) -> Option<TypeSig> {
        let target = match receiver {
            Some(receiver) => {
                let ty = self.visit(receiver);
                match ty {
                    Some(TypeSig::Array(_)) => self.r.env.object(),
                    Some(ty) => ty.class_id(),
                    None => {
                        self.arguments(arguments);
                        return self.fail(id, None);
                    }
                }
            }
            None => None,
        };
        let argument_types = self.arguments(arguments);
        let found = match (receiver, target) {
            (Some(_), Some(target)) => find_method(self.r.env, target, selector, &argument_types),
            (Some(_), None) => None,
            (None, _) => {
                let mut current = self.current_type();
                let mut found = None;
                while let Some(t) = current {
                    found = find_method(self.r.env, t, selector, &argument_types);
                    if found.is_some() {
                        break;
                    }
                    current = self.r.env.type_binding(t).and_then(|b| b.enclosing);
                }
                found
            }
        };
        match found {
            Some(method) => {
                self.r.tree.bind(id, Binding::Method(method));
                self.return_type(method)
            }
            None => {
                let reportable = match receiver {
                    Some(_) => target.is_some() && self.reportable(target),
                    None => self.context_reportable(),
                };
                let owner = target.or(self.current_type());
                let problem = reportable.then(|| {
                    let owner = owner.map(|o| self.r.env.qualified_name(o)).unwrap_or_default();
                    (
                        ProblemId::UNDEFINED_METHOD,
                        vec![self.describe_call(selector, &argument_types), owner],
                    )
                });
                self.fail(id, problem)
            }
        }
    }

    fn allocation(
        &mut self,
        id: NodeId,
        type_ref: NodeId,
        arguments: &[NodeId],
        anonymous: bool,
    ) -> Option<TypeSig> {
        let scope = self.scope.clone();
        let ty = self.r.resolve_type_ref(&scope, type_ref);
        let argument_types = self.arguments(arguments);
        let Some(target) = ty.class_id() else {
            return Some(ty);
        };
        let Some(binding) = self.r.env.type_binding(target) else {
            return Some(ty);
        };
        if binding.is_interface() {
            // Anonymous implementations of interfaces have no constructor to bind.
            return Some(ty);
        }
        match find_constructor(self.r.env, target, &argument_types) {
            Some(ctor) => self.r.tree.bind(id, Binding::Method(ctor)),
            None => {
                let problem = (!anonymous && self.reportable(Some(target))).then(|| {
                    let simple = self
                        .r
                        .env
                        .type_binding(target)
                        .map(|b| b.simple_name.clone())
                        .unwrap_or_default();
                    (
                        ProblemId::UNDEFINED_CONSTRUCTOR,
                        vec![self.describe_call(&simple, &argument_types)],
                    )
                });
                self.fail(id, problem);
            }
        }
        Some(ty)
    }

    fn constructor_call(&mut self, id: NodeId, is_super: bool, arguments: &[NodeId]) {
        let argument_types = self.arguments(arguments);
        let Some(current) = self.current_type() else {
            return;
        };
        let target = if is_super {
            self.r.env.type_binding(current).and_then(|b| b.superclass)
        } else {
            Some(current)
        };
        let Some(target) = target else {
            return;
        };
        match find_constructor(self.r.env, target, &argument_types) {
            Some(ctor) => self.r.tree.bind(id, Binding::Method(ctor)),
            None => {
                let problem = self.reportable(Some(target)).then(|| {
                    let simple = self
                        .r
                        .env
                        .type_binding(target)
                        .map(|b| b.simple_name.clone())
                        .unwrap_or_default();
                    (
                        ProblemId::UNDEFINED_CONSTRUCTOR,
                        vec![self.describe_call(&simple, &argument_types)],
                    )
                });
                self.fail(id, problem);
            }
        }
    }

    fn boolean(&self) -> Option<TypeSig> {
        Some(TypeSig::Primitive(PrimitiveType::Boolean))
    }

    fn operator(&mut self, operator: &str, operands: &[NodeId]) -> Option<TypeSig> {
        match (operator, operands) {
            ("cast", [ty, value]) => {
                let ty = self.visit(*ty);
                self.visit(*value);
                ty
            }
            ("()", [inner]) => self.visit(*inner),
            ("?:", [condition, then, otherwise]) => {
                self.visit(*condition);
                let then = self.visit(*then);
                let otherwise = self.visit(*otherwise);
                then.or(otherwise)
            }
            ("instanceof", _) => {
                for operand in operands {
                    self.visit(*operand);
                }
                self.boolean()
            }
            ("=", [target, value]) => {
                let ty = match self.r.tree.kind(*target).cloned() {
                    Some(NodeKind::SingleNameReference { name }) => self.name(*target, &name, false),
                    _ => self.visit(*target),
                };
                self.visit(*value);
                ty
            }
            (op, [target, value]) if op.len() > 1 && op.ends_with('=') && !is_comparison(op) => {
                let ty = self.visit(*target);
                self.visit(*value);
                ty
            }
            (op, [left, right]) => {
                let left = self.visit(*left);
                let right = self.visit(*right);
                if is_comparison(op) || op == "&&" || op == "||" {
                    return self.boolean();
                }
                let string = self.r.env.string();
                let is_string =
                    |t: &Option<TypeSig>| string.is_some() && t.as_ref().and_then(TypeSig::class_id) == string;
                if op == "+" && (is_string(&left) || is_string(&right)) {
                    return string.map(TypeSig::class);
                }
                let left = left.as_ref().and_then(TypeSig::primitive);
                let right = right.as_ref().and_then(TypeSig::primitive);
                match (left, right) {
                    (Some(PrimitiveType::Boolean), Some(PrimitiveType::Boolean)) => self.boolean(),
                    (Some(l), Some(_)) if matches!(op, "<<" | ">>" | ">>>") => {
                        Some(TypeSig::Primitive(promote(l, l)))
                    }
                    (Some(l), Some(r)) => Some(TypeSig::Primitive(promote(l, r))),
                    _ => None,
                }
            }
            ("!", [operand]) => {
                self.visit(*operand);
                self.boolean()
            }
            (_, [operand]) => {
                let ty = self.visit(*operand);
                match ty.as_ref().and_then(TypeSig::primitive) {
                    Some(p) => Some(TypeSig::Primitive(promote(p, PrimitiveType::Byte))),
                    None => ty,
                }
            }
            _ => {
                for operand in operands {
                    self.visit(*operand);
                }
                None
            }
        }
    }
}

fn is_comparison(op: &str) -> bool {
    matches!(op, "==" | "!=" | "<" | ">" | "<=" | ">=")
}

/// Binary numeric promotion.
fn promote(left: PrimitiveType, right: PrimitiveType) -> PrimitiveType {
    use PrimitiveType::*;
    if left == Double || right == Double {
        Double
    } else if left == Float || right == Float {
        Float
    } else if left == Long || right == Long {
        Long
    } else {
        Int
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{compile_sources, compile_with};

    fn binding_of(result: &crate::UnitResult, name: &str, kind: &str) -> Option<Binding> {
        let tree = result.tree.as_ref()?;
        tree.iter()
            .find(|(_, n)| n.kind.name() == kind && n.kind.declared_name() == Some(name))
            .and_then(|(id, _)| tree.binding(id))
    }

    #[test]
    fn binds_locals_fields_and_methods() {
        let (results, env) = compile_sources(&[(
            "p/A.java",
            "package p; class A { int count; int size() { return count; } void run() { int x = size(); count = x; this.count++; } }",
        )]);
        let a = &results[0];
        assert!(a.problems.is_empty(), "{:?}", a.problems);
        let Some(Binding::Method(size)) = binding_of(a, "size", "MessageSend") else {
            panic!("size() not bound");
        };
        assert_eq!(env.method(size).unwrap().selector, "size");
        assert!(matches!(binding_of(a, "count", "SingleNameReference"), Some(Binding::Field(_))));
        assert!(matches!(binding_of(a, "x", "SingleNameReference"), Some(Binding::Local(_))));
        assert!(matches!(binding_of(a, "count", "FieldReference"), Some(Binding::Field(_))));
    }

    #[test]
    fn inherited_and_platform_methods_resolve() {
        let (results, _) = compile_sources(&[
            ("p/Base.java", "package p; class Base { void work(String s) {} }"),
            (
                "p/Sub.java",
                "package p; class Sub extends Base { void go() { work(\"a\"); toString(); \"x\".length(); new Sub(); } }",
            ),
        ]);
        assert!(results[1].problems.is_empty(), "{:?}", results[1].problems);
        assert!(matches!(binding_of(&results[1], "work", "MessageSend"), Some(Binding::Method(_))));
        assert!(matches!(binding_of(&results[1], "length", "MessageSend"), Some(Binding::Method(_))));
    }

    #[test]
    fn undefined_references_are_reported() {
        let (results, _) = compile_sources(&[(
            "A.java",
            "class A { void go() { missing(); int y = nothing; new A(1); } }",
        )]);
        let ids: Vec<ProblemId> = results[0].problems.iter().map(|p| p.id).collect();
        assert!(ids.contains(&ProblemId::UNDEFINED_METHOD));
        assert!(ids.contains(&ProblemId::UNDEFINED_NAME));
        assert!(ids.contains(&ProblemId::UNDEFINED_CONSTRUCTOR));
        assert!(matches!(
            binding_of(&results[0], "missing", "MessageSend"),
            Some(Binding::Problem(ProblemReason::NotFound))
        ));
    }

    #[test]
    fn unknown_classpath_hierarchies_are_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/Base.class"), b"\xca\xfe\xba\xbe").unwrap();
        let names = crate::NameEnvironment::new(&[dir.path().to_path_buf()]);
        let (results, _) = compile_with(
            names,
            &[(
                "A.java",
                "import lib.Base; class A extends Base { void go() { inherited(); } }",
            )],
        );
        assert!(results[0].problems.is_empty(), "{:?}", results[0].problems);
        let ids: Vec<ProblemId> = results[0].problems.iter().map(|p| p.id).collect();
        assert!(!ids.contains(&ProblemId::UNDEFINED_METHOD));
    }

    #[test]
    fn lambda_and_catch_parameters_are_arguments() {
        let (results, env) = compile_sources(&[(
            "A.java",
            "class A { void go() { Runnable r = () -> {}; r.run(); try { go(); } catch (RuntimeException e) {} } }",
        )]);
        let Some(Binding::Local(e)) = binding_of(&results[0], "e", "LocalDeclaration") else {
            panic!("catch parameter not bound");
        };
        assert!(env.local(e).unwrap().is_argument);
        let Some(Binding::Local(r)) = binding_of(&results[0], "r", "LocalDeclaration") else {
            panic!("local not bound");
        };
        assert!(env.local(r).unwrap().used);
    }
}
