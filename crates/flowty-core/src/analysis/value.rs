use crate::expr::SubjectExpr;
use crate::types::Type;

/// The outcome of an instance test, waiting on the stack for a branch to
/// consume it. Only the non-negated form installs a fact when applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeTest {
    pub subject: SubjectExpr,
    pub candidate: Type,
    pub negated: bool,
}

/// An immutable value on the interpreter's operand stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymValue {
    /// Result of a computation the interpreter does not track.
    Unknown,
    /// A boolean constant; contradicting it makes a path infeasible.
    Bool(bool),
    /// An operand whose source expression is tracked as a narrowing subject.
    Expr(SubjectExpr),
    /// A type pushed as the right-hand operand of an instance test.
    TypeToken(Type),
    TypeTest(TypeTest),
}

impl SymValue {
    pub fn negated(self) -> SymValue {
        match self {
            SymValue::TypeTest(test) => SymValue::TypeTest(TypeTest {
                negated: !test.negated,
                ..test
            }),
            SymValue::Bool(value) => SymValue::Bool(!value),
            _ => SymValue::Unknown,
        }
    }

    /// The value this condition becomes when a branch fixes its outcome:
    /// unchanged for `true`, negated for `false`.
    pub fn asserted(self, outcome: bool) -> SymValue {
        if outcome {
            self
        } else {
            self.negated()
        }
    }
}
