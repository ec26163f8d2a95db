//! Entry point for symbol queries.

use std::fmt;
use std::path::Path;

use frontend::{Binding, CompilationUnit, LookupEnvironment, NodeId, NodeKind, TypeId, TypeSig};
use ir::{AstNode, FileAst};

use crate::external::ExternalAnnotationRepository;
use crate::locator::locate;
use crate::result::CompilationResult;
use crate::symbol::{
    ResolvedAnnotation, ResolvedClass, ResolvedField, ResolvedMethod, ResolvedPackage,
    ResolvedSymbol, ResolvedVariable,
};

/// Turns native nodes and bindings into resolved symbols. Cheap to copy;
/// every symbol it hands out borrows the same environment.
#[derive(Clone, Copy)]
pub struct Resolver<'env> {
    pub(crate) result: &'env CompilationResult,
    pub(crate) env: &'env LookupEnvironment,
    pub(crate) external: Option<&'env dyn ExternalAnnotationRepository>,
}

impl fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("types", &self.env.type_count())
            .field("external", &self.external.is_some())
            .finish()
    }
}

impl<'env> Resolver<'env> {
    /// `None` once the result has been disposed or the pass was aborted.
    pub fn new(result: &'env CompilationResult) -> Option<Self> {
        Some(Self {
            result,
            env: result.env()?,
            external: None,
        })
    }

    pub fn with_external(mut self, external: &'env dyn ExternalAnnotationRepository) -> Self {
        self.external = Some(external);
        self
    }

    pub fn env(&self) -> &'env LookupEnvironment {
        self.env
    }

    /// Symbol for a native node of `unit`.
    pub fn resolve(&self, unit: &CompilationUnit, node: NodeId) -> Option<ResolvedSymbol<'env>> {
        match unit.kind(node)? {
            NodeKind::SingleNameReference { .. }
            | NodeKind::QualifiedNameReference { .. }
            | NodeKind::FieldReference { .. }
            | NodeKind::TypeReference { .. }
            | NodeKind::MessageSend { .. }
            | NodeKind::Allocation { .. }
            | NodeKind::ExplicitConstructorCall { .. }
            | NodeKind::TypeDeclaration(_)
            | NodeKind::Annotation { .. }
            | NodeKind::MethodDeclaration(_)
            | NodeKind::FieldDeclaration(_)
            | NodeKind::Argument(_)
            | NodeKind::LocalDeclaration(_) => self.resolve_binding(unit.binding(node)?),
            NodeKind::Block { .. }
            | NodeKind::ThisReference { .. }
            | NodeKind::Literal { .. }
            | NodeKind::ArrayInitializer { .. }
            | NodeKind::ClassLiteral { .. }
            | NodeKind::Expression { .. }
            | NodeKind::Other { .. } => None,
        }
    }

    /// Problem bindings and methods of unknown declaring types resolve to
    /// nothing.
    pub fn resolve_binding(&self, binding: Binding) -> Option<ResolvedSymbol<'env>> {
        let env = self.env;
        let symbol = match binding {
            Binding::Type(id) => {
                env.type_binding(id)?;
                ResolvedSymbol::Class(ResolvedClass::new(*self, id))
            }
            Binding::Method(id) => {
                env.method(id)?.declaring?;
                ResolvedSymbol::Method(ResolvedMethod::new(*self, id))
            }
            Binding::Field(id) => {
                env.field(id)?;
                ResolvedSymbol::Field(ResolvedField::new(*self, id))
            }
            Binding::Local(id) => {
                env.local(id)?;
                ResolvedSymbol::Variable(ResolvedVariable::new(*self, id))
            }
            Binding::Package(id) => {
                env.package_binding(id)?;
                ResolvedSymbol::Package(ResolvedPackage::new(*self, id))
            }
            Binding::Annotation(id) => {
                env.annotation(id)?;
                ResolvedSymbol::Annotation(ResolvedAnnotation::native(*self, id))
            }
            Binding::Problem(_) => return None,
        };
        Some(symbol)
    }

    /// Locates the native node behind a generic node, then resolves it.
    pub fn resolve_generic(&self, ast: &FileAst, node: &AstNode) -> Option<ResolvedSymbol<'env>> {
        let unit = self.result.tree(Path::new(&ast.file_path))?;
        let native = locate(ast, node, unit)?;
        self.resolve(unit, native)
    }

    pub fn find_class(&self, qualified: &str) -> Option<ResolvedClass<'env>> {
        self.env
            .get_type(qualified)
            .map(|id| ResolvedClass::new(*self, id))
    }

    /// Static type of an expression or declaration, when it is a class.
    pub fn type_of(&self, unit: &CompilationUnit, node: NodeId) -> Option<ResolvedClass<'env>> {
        let id = self.type_id_of(unit, node)?;
        self.env.type_binding(id)?;
        Some(ResolvedClass::new(*self, id))
    }

    fn type_id_of(&self, unit: &CompilationUnit, node: NodeId) -> Option<TypeId> {
        let env = self.env;
        match unit.kind(node)? {
            NodeKind::TypeDeclaration(_) | NodeKind::TypeReference { .. } => match unit.binding(node)? {
                Binding::Type(id) => Some(id),
                _ => None,
            },
            NodeKind::Allocation { type_ref, .. } => self.type_id_of(unit, *type_ref),
            NodeKind::Literal { value } => match value {
                Some(frontend::Constant::String(_)) => env.string(),
                _ => None,
            },
            NodeKind::ThisReference { is_super } => {
                let mut current = unit.parent(node);
                while let Some(id) = current {
                    if let (Some(NodeKind::TypeDeclaration(_)), Some(Binding::Type(ty))) =
                        (unit.kind(id), unit.binding(id))
                    {
                        return if *is_super {
                            env.type_binding(ty)?.superclass
                        } else {
                            Some(ty)
                        };
                    }
                    current = unit.parent(id);
                }
                None
            }
            NodeKind::ClassLiteral { .. } => env.get_type("java.lang.Class"),
            NodeKind::Expression { operator, operands } => match (operator.as_str(), operands.as_slice()) {
                ("cast", [ty, _]) | ("()", [ty]) => self.type_id_of(unit, *ty),
                ("?:", [_, then, _]) => self.type_id_of(unit, *then),
                ("+", [left, right]) => {
                    let string = env.string();
                    let left = self.type_id_of(unit, *left);
                    let right = self.type_id_of(unit, *right);
                    (left == string || right == string).then_some(string).flatten()
                }
                _ => None,
            },
            _ => {
                let sig = match unit.binding(node)? {
                    Binding::Local(id) => env.local(id)?.ty.clone(),
                    Binding::Field(id) => env.field(id)?.ty.clone(),
                    Binding::Method(id) => {
                        let method = env.method(id)?;
                        if method.is_constructor {
                            return method.declaring;
                        }
                        method.return_type.clone()
                    }
                    Binding::Type(id) => TypeSig::class(id),
                    _ => return None,
                };
                sig.class_id()
            }
        }
    }
}
