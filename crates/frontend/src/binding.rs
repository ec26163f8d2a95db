//! Binding graph records.
//!
//! All bindings are owned by the [`LookupEnvironment`] arenas and addressed
//! by typed ids, so the graph can be cyclic without shared ownership.

use std::path::PathBuf;

use crate::ast::{Modifiers, NodeId, TypeKind};
use crate::constant::{Constant, PrimitiveType};
use crate::lookup::LookupEnvironment;

macro_rules! arena_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);

            impl $name {
                pub fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

arena_id!(TypeId, MethodId, FieldId, LocalId, PackageId, AnnotationId);

/// Why a lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemReason {
    NotFound,
    Ambiguous,
    NotVisible,
}

/// What a node resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Type(TypeId),
    Method(MethodId),
    Field(FieldId),
    Local(LocalId),
    Package(PackageId),
    Annotation(AnnotationId),
    Problem(ProblemReason),
}

impl Binding {
    pub fn is_problem(self) -> bool {
        matches!(self, Binding::Problem(_))
    }
}

/// Location of a declaration in a source unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclRef {
    pub file: PathBuf,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeOrigin {
    Source(DeclRef),
    /// Found on the classpath; members are not known.
    Binary { location: PathBuf },
    Platform,
}

#[derive(Debug, Clone)]
pub struct TypeBinding {
    pub simple_name: String,
    pub package: PackageId,
    pub enclosing: Option<TypeId>,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub type_parameters: Vec<String>,
    pub superclass: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    /// Type arguments given to direct supertypes, e.g. `[String]` for
    /// `extends A<String>`. Raw and non-generic supertypes have no entry.
    pub supertype_arguments: Vec<(TypeId, Vec<TypeSig>)>,
    pub methods: Vec<MethodId>,
    pub fields: Vec<FieldId>,
    pub member_types: Vec<TypeId>,
    pub annotations: Vec<AnnotationId>,
    pub origin: TypeOrigin,
    /// Display name as the front-end prints it, e.g. `p.Outer.Inner<T>`.
    /// Binary member types only carry `package.Simple`.
    pub readable_name: String,
}

impl TypeBinding {
    pub fn is_interface(&self) -> bool {
        self.kind.is_interface()
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.origin, TypeOrigin::Binary { .. })
    }

    /// Members are fully known (source or platform types).
    pub fn has_members(&self) -> bool {
        !self.is_binary()
    }

    pub fn declaration(&self) -> Option<&DeclRef> {
        match &self.origin {
            TypeOrigin::Source(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn arguments_of(&self, supertype: TypeId) -> &[TypeSig] {
        self.supertype_arguments
            .iter()
            .find(|(t, _)| *t == supertype)
            .map_or(&[], |(_, args)| args.as_slice())
    }
}

/// Type variables of a supertype bound to the arguments they receive from a
/// subtype, e.g. `T -> java.lang.String` for `B extends A<String>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution(Vec<(String, TypeSig)>);

impl Substitution {
    pub fn new(bindings: Vec<(String, TypeSig)>) -> Self {
        Self(bindings)
    }

    pub fn get(&self, variable: &str) -> Option<&TypeSig> {
        self.0.iter().find(|(v, _)| v == variable).map(|(_, sig)| sig)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Same bindings minus the variables in `shadowed`.
    fn without(&self, shadowed: &[String]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(v, _)| !shadowed.contains(v))
                .cloned()
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct MethodBinding {
    pub selector: String,
    /// Unknown for methods synthesized against problem types.
    pub declaring: Option<TypeId>,
    pub is_constructor: bool,
    pub modifiers: Modifiers,
    pub type_parameters: Vec<String>,
    pub parameters: Vec<TypeSig>,
    pub parameter_names: Vec<String>,
    pub is_varargs: bool,
    pub return_type: TypeSig,
    pub annotations: Vec<AnnotationId>,
    pub parameter_annotations: Vec<Vec<AnnotationId>>,
    pub declaration: Option<DeclRef>,
    pub default_value: Option<ElementValue>,
}

impl MethodBinding {
    pub fn is_private(&self) -> bool {
        self.modifiers.is_private()
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    /// Whether `count` arguments can be passed.
    pub fn accepts_arity(&self, count: usize) -> bool {
        if self.is_varargs {
            count + 1 >= self.parameters.len()
        } else {
            count == self.parameters.len()
        }
    }

    /// Erased parameter types, used for override and masking checks.
    pub fn erased_parameters(&self, env: &LookupEnvironment) -> Vec<String> {
        self.parameters.iter().map(|p| p.erasure(env)).collect()
    }

    /// Erased parameter types once the declaring type's variables are
    /// replaced through `substitution`. The method's own type parameters
    /// shadow class variables of the same name.
    pub fn erased_parameters_in(
        &self,
        substitution: &Substitution,
        env: &LookupEnvironment,
    ) -> Vec<String> {
        if substitution.is_empty() {
            return self.erased_parameters(env);
        }
        let substitution = substitution.without(&self.type_parameters);
        self.parameters
            .iter()
            .map(|p| p.substitute(&substitution).erasure(env))
            .collect()
    }

    pub fn has_same_erasure(&self, other: &MethodBinding, env: &LookupEnvironment) -> bool {
        self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.erasure(env) == b.erasure(env))
    }
}

#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub name: String,
    pub declaring: TypeId,
    pub modifiers: Modifiers,
    pub ty: TypeSig,
    pub constant: Option<Constant>,
    pub annotations: Vec<AnnotationId>,
    pub declaration: Option<DeclRef>,
    pub is_enum_constant: bool,
}

#[derive(Debug, Clone)]
pub struct LocalBinding {
    pub name: String,
    pub ty: TypeSig,
    pub modifiers: Modifiers,
    pub is_argument: bool,
    pub declaring_method: Option<MethodId>,
    pub annotations: Vec<AnnotationId>,
    pub declaration: DeclRef,
    pub used: bool,
}

#[derive(Debug, Clone)]
pub struct PackageBinding {
    pub name: String,
    pub annotations: Vec<AnnotationId>,
    pub declaration: Option<DeclRef>,
}

#[derive(Debug, Clone)]
pub struct AnnotationBinding {
    pub annotation_type: TypeId,
    pub pairs: Vec<(String, ElementValue)>,
    /// The annotation node this binding was built from.
    pub declaration: Option<DeclRef>,
}

/// Value of an annotation element after folding.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Constant(Constant),
    Type(TypeSig),
    /// Enum constants and non-constant field references.
    Field(FieldId),
    Annotation(AnnotationId),
    Array(Vec<ElementValue>),
    Unresolved,
}

/// A type as written in a declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSig {
    Primitive(PrimitiveType),
    Void,
    Class { id: TypeId, args: Vec<TypeSig> },
    Variable { name: String, bound: Option<TypeId> },
    Array(Box<TypeSig>),
    /// Name that could not be resolved.
    Unresolved(String),
}

impl TypeSig {
    pub fn class(id: TypeId) -> Self {
        TypeSig::Class { id, args: Vec::new() }
    }

    pub fn class_id(&self) -> Option<TypeId> {
        match self {
            TypeSig::Class { id, .. } => Some(*id),
            TypeSig::Variable { bound, .. } => *bound,
            _ => None,
        }
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self {
            TypeSig::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn array_of(self, dimensions: u8) -> Self {
        (0..dimensions).fold(self, |acc, _| TypeSig::Array(Box::new(acc)))
    }

    /// Replaces the variables bound in `substitution`, at any depth.
    pub fn substitute(&self, substitution: &Substitution) -> TypeSig {
        match self {
            TypeSig::Variable { name, .. } => match substitution.get(name) {
                Some(sig) => sig.clone(),
                None => self.clone(),
            },
            TypeSig::Class { id, args } => TypeSig::Class {
                id: *id,
                args: args.iter().map(|a| a.substitute(substitution)).collect(),
            },
            TypeSig::Array(inner) => TypeSig::Array(Box::new(inner.substitute(substitution))),
            other => other.clone(),
        }
    }

    /// Erased, fully qualified form: type arguments dropped, type variables
    /// replaced by their bound.
    pub fn erasure(&self, env: &LookupEnvironment) -> String {
        match self {
            TypeSig::Primitive(p) => p.keyword().to_string(),
            TypeSig::Void => "void".to_string(),
            TypeSig::Class { id, .. } => env.qualified_name(*id),
            TypeSig::Variable { bound, .. } => bound
                .map(|b| env.qualified_name(b))
                .unwrap_or_else(|| "java.lang.Object".to_string()),
            TypeSig::Array(inner) => format!("{}[]", inner.erasure(env)),
            TypeSig::Unresolved(name) => name.clone(),
        }
    }

    /// Readable form keeping type arguments and variables.
    pub fn readable(&self, env: &LookupEnvironment) -> String {
        match self {
            TypeSig::Class { id, args } if !args.is_empty() => {
                let args: Vec<String> = args.iter().map(|a| a.readable(env)).collect();
                format!("{}<{}>", env.qualified_name(*id), args.join(","))
            }
            TypeSig::Variable { name, .. } => name.clone(),
            TypeSig::Array(inner) => format!("{}[]", inner.readable(env)),
            other => other.erasure(env),
        }
    }
}
