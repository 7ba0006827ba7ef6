//! Type-translation service
//!
//! Maps source types to target types. The passes only see it through
//! [`TypeTranslator`], so a translator for another target can be swapped in.

use tern_ast::TargetType;
use tern_types::{PassType, Type};

pub trait TypeTranslator {
    /// Split off outer nullability.
    fn pass_type_of(&self, ty: &Type) -> PassType;

    /// Whether the pass-type is a nullable use of a type formal, the case
    /// that needs `Optional<T>` because `T?` is not uniform in the target.
    fn is_optional_type_argument(&self, pass: &PassType) -> bool;

    fn translate(&self, pass: &PassType) -> TargetType;
}

/// Translator for the C#-like target.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeTranslator;

impl DefaultTypeTranslator {
    fn translate_type(&self, ty: &Type) -> TargetType {
        match ty {
            Type::Void => TargetType::Void,
            Type::Bool => TargetType::Bool,
            Type::Int => TargetType::Int,
            Type::Float => TargetType::Float,
            Type::String => TargetType::String,
            Type::Any => TargetType::Object,
            Type::Named(name) => TargetType::Class(name.clone()),
            Type::Param(formal) => TargetType::Param(formal.name.clone()),
            Type::Generic { base, type_args } => TargetType::Generic {
                base: base.clone(),
                args: type_args.iter().map(|t| self.translate_type(t)).collect(),
            },
            Type::Array(elem) => TargetType::Array(Box::new(self.translate_type(elem))),
            Type::Nullable(_) => self.translate(&self.pass_type_of(ty)),
        }
    }
}

impl TypeTranslator for DefaultTypeTranslator {
    fn pass_type_of(&self, ty: &Type) -> PassType {
        PassType::of(ty)
    }

    fn is_optional_type_argument(&self, pass: &PassType) -> bool {
        pass.nullable && pass.type_formal().is_some()
    }

    fn translate(&self, pass: &PassType) -> TargetType {
        let base = self.translate_type(&pass.ty);
        if !pass.nullable {
            return base;
        }
        if self.is_optional_type_argument(pass) {
            TargetType::optional(base)
        } else if pass.ty.is_value_type() {
            TargetType::Nullable(Box::new(base))
        } else {
            // Reference types are nullable already
            base
        }
    }
}
