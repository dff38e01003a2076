use crate::expr::{equivalent, Expr, SubjectExpr};
use crate::types::Type;
use crate::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct InstrIndex(pub u32);

impl InstrIndex {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn next(self) -> InstrIndex {
        InstrIndex(self.0 + 1)
    }
}

impl fmt::Display for InstrIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Push { expr: SubjectExpr },
    PushType { ty: Type },
    PushBool { value: bool },
    InstanceOf,
    Not,
    Cast { expr: SubjectExpr, ty: Type },
    Dup,
    Pop,
    Goto { target: InstrIndex },
    CondGoto { target: InstrIndex, jump_if: bool },
    Finish,
}

impl Instruction {
    pub fn successors(&self, at: InstrIndex) -> Vec<InstrIndex> {
        match self {
            Instruction::Goto { target } => vec![*target],
            Instruction::CondGoto { target, .. } => vec![*target, at.next()],
            Instruction::Finish => Vec::new(),
            _ => vec![at.next()],
        }
    }

    pub fn falls_through(&self) -> bool {
        !matches!(self, Instruction::Goto { .. } | Instruction::Finish)
    }

    pub fn branch_target(&self) -> Option<InstrIndex> {
        match self {
            Instruction::Goto { target } | Instruction::CondGoto { target, .. } => Some(*target),
            _ => None,
        }
    }
}

/// An immutable instruction array with explicit successor edges.
///
/// Shape problems (targets out of range, execution falling off the end) are
/// builder bugs and are rejected here, so the interpreter never has to
/// second-guess an edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowGraph {
    name: String,
    instructions: Vec<Instruction>,
}

impl FlowGraph {
    pub fn new(name: impl Into<String>, instructions: Vec<Instruction>) -> Result<Self> {
        let name = name.into();
        if instructions.is_empty() {
            return Err(FlowError::MalformedFlow(format!("flow `{}` is empty", name)));
        }

        let len = instructions.len();
        for (i, instruction) in instructions.iter().enumerate() {
            if let Some(target) = instruction.branch_target() {
                if target.index() >= len {
                    return Err(FlowError::MalformedFlow(format!(
                        "flow `{}`: instruction {} targets {} but the flow has {} instructions",
                        name, i, target, len
                    )));
                }
            }
            if instruction.falls_through() && i + 1 >= len {
                return Err(FlowError::MalformedFlow(format!(
                    "flow `{}`: instruction {} falls off the end of the flow",
                    name, i
                )));
            }
        }

        Ok(Self { name, instructions })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn contains(&self, at: InstrIndex) -> bool {
        at.index() < self.instructions.len()
    }

    /// Panics when `at` is out of range; the runner only ever follows edges
    /// that were validated at construction.
    pub fn instruction(&self, at: InstrIndex) -> &Instruction {
        &self.instructions[at.index()]
    }

    pub fn get(&self, at: InstrIndex) -> Option<&Instruction> {
        self.instructions.get(at.index())
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn successors(&self, at: InstrIndex) -> Vec<InstrIndex> {
        self.instruction(at).successors(at)
    }

    /// Indices of `Push` instructions whose expression is equivalent to
    /// `expr`, in instruction order.
    pub fn find_usages(&self, expr: &Expr) -> Vec<InstrIndex> {
        self.instructions
            .iter()
            .enumerate()
            .filter_map(|(i, instruction)| match instruction {
                Instruction::Push { expr: pushed } if equivalent(pushed.expr(), expr) => {
                    Some(InstrIndex(i as u32))
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range_target() {
        let result = FlowGraph::new(
            "bad",
            vec![
                Instruction::Goto {
                    target: InstrIndex(9),
                },
                Instruction::Finish,
            ],
        );
        assert!(matches!(result, Err(FlowError::MalformedFlow(_))));
    }

    #[test]
    fn test_rejects_fall_off_the_end() {
        let result = FlowGraph::new(
            "bad",
            vec![Instruction::Push {
                expr: Expr::ident("x").into(),
            }],
        );
        assert!(matches!(result, Err(FlowError::MalformedFlow(_))));
    }

    #[test]
    fn test_successors() {
        let flow = FlowGraph::new(
            "f",
            vec![
                Instruction::PushBool { value: true },
                Instruction::CondGoto {
                    target: InstrIndex(3),
                    jump_if: false,
                },
                Instruction::Goto {
                    target: InstrIndex(3),
                },
                Instruction::Finish,
            ],
        )
        .unwrap();

        assert_eq!(flow.successors(InstrIndex(0)), vec![InstrIndex(1)]);
        assert_eq!(
            flow.successors(InstrIndex(1)),
            vec![InstrIndex(3), InstrIndex(2)]
        );
        assert_eq!(flow.successors(InstrIndex(2)), vec![InstrIndex(3)]);
        assert!(flow.successors(InstrIndex(3)).is_empty());
    }

    #[test]
    fn test_find_usages_is_structural() {
        let flow = FlowGraph::new(
            "f",
            vec![
                Instruction::Push {
                    expr: Expr::ident("x").at(3).into(),
                },
                Instruction::Pop,
                Instruction::Push {
                    expr: Expr::ident("x").at(17).into(),
                },
                Instruction::Pop,
                Instruction::Finish,
            ],
        )
        .unwrap();

        let usages = flow.find_usages(&Expr::ident("x"));
        assert_eq!(usages, vec![InstrIndex(0), InstrIndex(2)]);
    }
}
