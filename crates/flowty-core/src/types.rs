use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate narrowing type. Compared by equality only; the engine never
/// widens or checks assignability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Named(String),
    Array(Box<Type>),
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(name.into())
    }

    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(element) => Some(element),
            Type::Named(_) => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Named(name) => write!(f, "{}", name),
            Type::Array(element) => write!(f, "{}[]", element),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Type::named("java.lang.String").to_string(), "java.lang.String");
        assert_eq!(Type::array(Type::named("Item")).to_string(), "Item[]");
        assert_eq!(
            Type::array(Type::array(Type::named("byte"))).to_string(),
            "byte[][]"
        );
    }

    #[test]
    fn test_equality_is_exact() {
        assert_eq!(Type::named("A"), Type::named("A"));
        assert_ne!(Type::named("A"), Type::named("B"));
        assert_ne!(Type::named("A"), Type::array(Type::named("A")));
    }
}
