use crate::expr::SubjectExpr;
use crate::flow::{FlowGraph, InstrIndex, Instruction};
use crate::types::Type;
use crate::{FlowError, Result};

/// Forward reference to a position bound later with [`FlowBuilder::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Assembles an instruction array for a [`FlowGraph`].
///
/// Branch targets are labels so flows can be written top to bottom; `build`
/// patches them and hands validation to `FlowGraph::new`.
pub struct FlowBuilder {
    name: String,
    instructions: Vec<Instruction>,
    bound: Vec<Option<InstrIndex>>,
    pending: Vec<(usize, Label)>,
}

impl FlowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
            bound: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn next_index(&self) -> InstrIndex {
        InstrIndex(self.instructions.len() as u32)
    }

    fn emit(&mut self, instruction: Instruction) -> InstrIndex {
        let at = self.next_index();
        self.instructions.push(instruction);
        at
    }

    pub fn push(&mut self, expr: impl Into<SubjectExpr>) -> InstrIndex {
        self.emit(Instruction::Push { expr: expr.into() })
    }

    pub fn push_type(&mut self, ty: Type) -> InstrIndex {
        self.emit(Instruction::PushType { ty })
    }

    pub fn push_bool(&mut self, value: bool) -> InstrIndex {
        self.emit(Instruction::PushBool { value })
    }

    pub fn instance_of(&mut self) -> InstrIndex {
        self.emit(Instruction::InstanceOf)
    }

    pub fn not(&mut self) -> InstrIndex {
        self.emit(Instruction::Not)
    }

    pub fn cast(&mut self, expr: impl Into<SubjectExpr>, ty: Type) -> InstrIndex {
        self.emit(Instruction::Cast {
            expr: expr.into(),
            ty,
        })
    }

    pub fn dup(&mut self) -> InstrIndex {
        self.emit(Instruction::Dup)
    }

    pub fn pop(&mut self) -> InstrIndex {
        self.emit(Instruction::Pop)
    }

    pub fn finish(&mut self) -> InstrIndex {
        self.emit(Instruction::Finish)
    }

    pub fn new_label(&mut self) -> Label {
        self.bound.push(None);
        Label(self.bound.len() - 1)
    }

    /// Binds `label` to the position of the next emitted instruction.
    pub fn bind(&mut self, label: Label) {
        self.bound[label.0] = Some(self.next_index());
    }

    pub fn goto(&mut self, label: Label) -> InstrIndex {
        let at = self.emit(Instruction::Goto {
            target: InstrIndex(u32::MAX),
        });
        self.pending.push((at.index(), label));
        at
    }

    /// Pops the condition; jumps to `label` when it is true, falls through
    /// otherwise.
    pub fn goto_if_true(&mut self, label: Label) -> InstrIndex {
        self.cond_goto(label, true)
    }

    /// Pops the condition; jumps to `label` when it is false, falls through
    /// otherwise. This is the shape an `if` statement lowers to.
    pub fn goto_if_false(&mut self, label: Label) -> InstrIndex {
        self.cond_goto(label, false)
    }

    fn cond_goto(&mut self, label: Label, jump_if: bool) -> InstrIndex {
        let at = self.emit(Instruction::CondGoto {
            target: InstrIndex(u32::MAX),
            jump_if,
        });
        self.pending.push((at.index(), label));
        at
    }

    /// Emits the three-instruction test sequence `push expr; push_type ty;
    /// instanceof`, leaving the test value on the stack.
    pub fn instanceof_test(&mut self, expr: impl Into<SubjectExpr>, ty: Type) -> InstrIndex {
        let at = self.push(expr);
        self.push_type(ty);
        self.instance_of();
        at
    }

    pub fn build(mut self) -> Result<FlowGraph> {
        for (slot, label) in std::mem::take(&mut self.pending) {
            let target = self.bound[label.0].ok_or_else(|| {
                FlowError::UnboundLabel(format!(
                    "flow `{}`: label for instruction {} was never bound",
                    self.name, slot
                ))
            })?;
            match &mut self.instructions[slot] {
                Instruction::Goto { target: t } | Instruction::CondGoto { target: t, .. } => {
                    *t = target;
                }
                other => {
                    return Err(FlowError::BuilderError(format!(
                        "instruction {} is not a branch: {:?}",
                        slot, other
                    )))
                }
            }
        }
        FlowGraph::new(self.name, self.instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    #[test]
    fn test_labels_patch_forward_references() {
        let mut b = FlowBuilder::new("f");
        let done = b.new_label();
        b.push_bool(true);
        b.goto_if_false(done);
        b.push(Expr::ident("x"));
        b.pop();
        b.bind(done);
        b.finish();

        let flow = b.build().unwrap();
        assert_eq!(
            *flow.instruction(InstrIndex(1)),
            Instruction::CondGoto {
                target: InstrIndex(4),
                jump_if: false,
            }
        );
    }

    #[test]
    fn test_unbound_label_is_an_error() {
        let mut b = FlowBuilder::new("f");
        let nowhere = b.new_label();
        b.goto(nowhere);
        b.finish();
        assert!(matches!(b.build(), Err(FlowError::UnboundLabel(_))));
    }
}
