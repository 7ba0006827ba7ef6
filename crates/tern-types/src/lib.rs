//! Type system for tern
//!
//! Defines the source-level types the backend sees after type-checking,
//! the nullability-stripped "pass-types" used when comparing signatures,
//! and method signatures as recorded for override analysis.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Who declares a type formal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormalOwner {
    /// Declared by a class or interface (e.g., T in `interface I<T>`)
    Type(String),
    /// Declared by a generic method (e.g., M in `f<M>(x: M)`)
    Method(String),
}

impl FormalOwner {
    pub fn name(&self) -> &str {
        match self {
            FormalOwner::Type(name) | FormalOwner::Method(name) => name,
        }
    }
}

/// A generic type parameter together with its declaring owner
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeFormal {
    pub name: String,
    pub owner: FormalOwner,
}

impl TypeFormal {
    /// Formal declared by a class or interface.
    pub fn of_type(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: FormalOwner::Type(owner.into()),
        }
    }

    /// Formal declared by a generic method.
    pub fn of_method(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: FormalOwner::Method(owner.into()),
        }
    }

    /// `Owner.Name`, the key used in substitution maps and configuration.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.owner.name(), self.name)
    }
}

/// Core type representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// No value
    Void,
    Bool,
    /// 32-bit integer (a value type in the target)
    Int,
    /// 64-bit float (a value type in the target)
    Float,
    String,
    /// The universal top type, used by identity and runtime-type tests
    Any,
    /// Reference to a named class or interface
    Named(String),
    /// Type parameter reference
    Param(TypeFormal),
    /// Generic instantiation (e.g., List<Int>)
    Generic { base: String, type_args: Vec<Type> },
    Array(Box<Type>),
    /// Nullable wrapper (e.g., Int? or T?)
    Nullable(Box<Type>),
}

impl Type {
    pub fn param(formal: TypeFormal) -> Self {
        Type::Param(formal)
    }

    pub fn nullable(inner: Type) -> Self {
        match inner {
            Type::Nullable(_) => inner,
            other => Type::Nullable(Box::new(other)),
        }
    }

    /// Types the target stores unboxed. Their nullable form is a distinct
    /// native type (`int?`), which is why generic code cannot treat `T?`
    /// uniformly across value and reference instantiations.
    pub fn is_value_type(&self) -> bool {
        matches!(self, Type::Bool | Type::Int | Type::Float)
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::Nullable(_) | Type::Any)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "Void"),
            Type::Bool => write!(f, "Bool"),
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::String => write!(f, "String"),
            Type::Any => write!(f, "Any"),
            Type::Named(name) => write!(f, "{}", name),
            Type::Param(formal) => write!(f, "{}", formal.name),
            Type::Generic { base, type_args } => {
                write!(f, "{}<", base)?;
                for (i, arg) in type_args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            Type::Array(elem) => write!(f, "Array<{}>", elem),
            Type::Nullable(inner) => write!(f, "{}?", inner),
        }
    }
}

/// A type with its outer nullability split off.
///
/// Nullability is handled as a separate wrapping concern by the backend,
/// so signatures are compared on pass-types rather than on raw types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassType {
    pub ty: Type,
    pub nullable: bool,
}

impl PassType {
    pub fn new(ty: Type, nullable: bool) -> Self {
        Self { ty, nullable }
    }

    /// Split a type into its pass-type form.
    pub fn of(ty: &Type) -> Self {
        match ty {
            Type::Nullable(inner) => Self {
                ty: (**inner).clone(),
                nullable: true,
            },
            other => Self {
                ty: other.clone(),
                nullable: false,
            },
        }
    }

    pub fn non_nullable(&self) -> Self {
        Self {
            ty: self.ty.clone(),
            nullable: false,
        }
    }

    /// The type formal this pass-type refers to directly, if any.
    pub fn type_formal(&self) -> Option<&TypeFormal> {
        match &self.ty {
            Type::Param(formal) => Some(formal),
            _ => None,
        }
    }

    /// Rebuild the full type, nullability included.
    pub fn to_type(&self) -> Type {
        if self.nullable {
            Type::nullable(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }

    /// Substitute formals, keeping nullability from either side.
    pub fn substitute(&self, substitutions: &HashMap<String, Type>) -> Self {
        let replaced = PassType::of(&substitute_type(&self.ty, substitutions));
        Self {
            ty: replaced.ty,
            nullable: self.nullable || replaced.nullable,
        }
    }
}

impl fmt::Display for PassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}?", self.ty)
        } else {
            write!(f, "{}", self.ty)
        }
    }
}

/// A method signature as seen by override analysis.
///
/// `params[0]` is the implicit receiver; value parameters start at index 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<PassType>,
    pub ret: PassType,
}

impl Signature {
    pub fn new(params: Vec<PassType>, ret: PassType) -> Self {
        Self { params, ret }
    }

    /// Number of value parameters, receiver excluded.
    pub fn arity(&self) -> usize {
        self.params.len().saturating_sub(1)
    }
}

/// Substitute type formals with concrete types.
///
/// Keys are qualified formal names (`Owner.T`).
pub fn substitute_type(ty: &Type, substitutions: &HashMap<String, Type>) -> Type {
    match ty {
        Type::Param(formal) => substitutions
            .get(&formal.qualified())
            .cloned()
            .unwrap_or_else(|| ty.clone()),
        Type::Array(elem) => Type::Array(Box::new(substitute_type(elem, substitutions))),
        Type::Nullable(inner) => Type::nullable(substitute_type(inner, substitutions)),
        Type::Generic { base, type_args } => Type::Generic {
            base: base.clone(),
            type_args: type_args
                .iter()
                .map(|t| substitute_type(t, substitutions))
                .collect(),
        },
        _ => ty.clone(),
    }
}
