use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A syntax node naming a value that narrowing can track.
///
/// The offset records where the expression appears in its source and is used
/// only to order results; two occurrences of `obj.field` at different
/// offsets are the same subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Ident(String),
    Field { base: Box<Expr>, name: String },
    Index { base: Box<Expr>, index: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Literal(String),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Self {
            kind: ExprKind::Ident(name.into()),
            offset: 0,
        }
    }

    pub fn field(base: Expr, name: impl Into<String>) -> Self {
        let offset = base.offset;
        Self {
            kind: ExprKind::Field {
                base: Box::new(base),
                name: name.into(),
            },
            offset,
        }
    }

    pub fn index(base: Expr, index: Expr) -> Self {
        let offset = base.offset;
        Self {
            kind: ExprKind::Index {
                base: Box::new(base),
                index: Box::new(index),
            },
            offset,
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        let offset = callee.offset;
        Self {
            kind: ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            offset,
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            kind: ExprKind::Literal(text.into()),
            offset: 0,
        }
    }

    pub fn at(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Ident(name) => write!(f, "{}", name),
            ExprKind::Field { base, name } => write!(f, "{}.{}", base, name),
            ExprKind::Index { base, index } => write!(f, "{}[{}]", base, index),
            ExprKind::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            ExprKind::Literal(text) => write!(f, "{}", text),
        }
    }
}

/// True when two expressions have the same shape and text.
///
/// Offsets are ignored: re-parsing the same source produces fresh nodes at
/// fresh positions, and they must keep acting as the same map key.
pub fn equivalent(a: &Expr, b: &Expr) -> bool {
    match (&a.kind, &b.kind) {
        (ExprKind::Ident(x), ExprKind::Ident(y)) => x == y,
        (
            ExprKind::Field { base: ab, name: an },
            ExprKind::Field { base: bb, name: bn },
        ) => an == bn && equivalent(ab, bb),
        (
            ExprKind::Index { base: ab, index: ai },
            ExprKind::Index { base: bb, index: bi },
        ) => equivalent(ab, bb) && equivalent(ai, bi),
        (
            ExprKind::Call { callee: ac, args: aa },
            ExprKind::Call { callee: bc, args: ba },
        ) => {
            aa.len() == ba.len()
                && equivalent(ac, bc)
                && aa.iter().zip(ba.iter()).all(|(x, y)| equivalent(x, y))
        }
        (ExprKind::Literal(x), ExprKind::Literal(y)) => x == y,
        _ => false,
    }
}

/// Hashes the root node's syntactic category only.
///
/// Equivalent expressions always hash equal; unrelated expressions of the
/// same category collide and are told apart by the full comparison.
pub fn structural_hash(expr: &Expr) -> u64 {
    let mut hasher = DefaultHasher::new();
    std::mem::discriminant(&expr.kind).hash(&mut hasher);
    hasher.finish()
}

/// Shared handle to an expression, keyed by structural equivalence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectExpr(Arc<Expr>);

impl SubjectExpr {
    pub fn new(expr: Expr) -> Self {
        Self(Arc::new(expr))
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }

    pub fn offset(&self) -> u32 {
        self.0.offset
    }
}

impl From<Expr> for SubjectExpr {
    fn from(expr: Expr) -> Self {
        Self::new(expr)
    }
}

impl PartialEq for SubjectExpr {
    fn eq(&self, other: &Self) -> bool {
        equivalent(&self.0, &other.0)
    }
}

impl Eq for SubjectExpr {}

impl Hash for SubjectExpr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        structural_hash(&self.0).hash(state);
    }
}

impl fmt::Display for SubjectExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
