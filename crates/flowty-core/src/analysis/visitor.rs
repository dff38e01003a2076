use crate::analysis::state::MemoryState;
use crate::analysis::value::{SymValue, TypeTest};
use crate::expr::SubjectExpr;
use crate::flow::{FlowGraph, InstrIndex, Instruction};
use crate::types::Type;

pub type Successors = Vec<(InstrIndex, MemoryState)>;

/// Per-instruction hooks for the runner. Every method defaults to the
/// generic semantics in [`semantics`]; an override that still wants correct
/// stack behavior delegates there and layers its observation on top.
pub trait FlowVisitor {
    fn visit_instruction(
        &mut self,
        at: InstrIndex,
        instruction: &Instruction,
        state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        match instruction {
            Instruction::Push { expr } => self.visit_push(at, expr, state, flow),
            Instruction::PushType { ty } => self.visit_push_type(at, ty, state, flow),
            Instruction::PushBool { value } => self.visit_push_bool(at, *value, state, flow),
            Instruction::InstanceOf => self.visit_instance_of(at, state, flow),
            Instruction::Not => self.visit_not(at, state, flow),
            Instruction::Cast { expr, ty } => self.visit_cast(at, expr, ty, state, flow),
            Instruction::Dup => self.visit_dup(at, state, flow),
            Instruction::Pop => self.visit_pop(at, state, flow),
            Instruction::Goto { target } => self.visit_goto(at, *target, state, flow),
            Instruction::CondGoto { target, jump_if } => {
                self.visit_cond_goto(at, *target, *jump_if, state, flow)
            }
            Instruction::Finish => self.visit_finish(at, state, flow),
        }
    }

    fn visit_push(
        &mut self,
        at: InstrIndex,
        expr: &SubjectExpr,
        state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        semantics::push(at, expr, state, flow)
    }

    fn visit_push_type(
        &mut self,
        at: InstrIndex,
        ty: &Type,
        state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        semantics::push_type(at, ty, state, flow)
    }

    fn visit_push_bool(
        &mut self,
        at: InstrIndex,
        value: bool,
        state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        semantics::push_bool(at, value, state, flow)
    }

    fn visit_instance_of(
        &mut self,
        at: InstrIndex,
        state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        semantics::instance_of(at, state, flow)
    }

    fn visit_not(&mut self, at: InstrIndex, state: MemoryState, flow: &FlowGraph) -> Successors {
        semantics::not(at, state, flow)
    }

    fn visit_cast(
        &mut self,
        at: InstrIndex,
        expr: &SubjectExpr,
        ty: &Type,
        state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        semantics::cast(at, expr, ty, state, flow)
    }

    fn visit_dup(&mut self, at: InstrIndex, state: MemoryState, flow: &FlowGraph) -> Successors {
        semantics::dup(at, state, flow)
    }

    fn visit_pop(&mut self, at: InstrIndex, state: MemoryState, flow: &FlowGraph) -> Successors {
        semantics::pop(at, state, flow)
    }

    fn visit_goto(
        &mut self,
        at: InstrIndex,
        target: InstrIndex,
        state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        semantics::goto(at, target, state, flow)
    }

    fn visit_cond_goto(
        &mut self,
        at: InstrIndex,
        target: InstrIndex,
        jump_if: bool,
        state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        semantics::cond_goto(at, target, jump_if, state, flow)
    }

    fn visit_finish(&mut self, _at: InstrIndex, _state: MemoryState, _flow: &FlowGraph) -> Successors {
        Vec::new()
    }
}

/// Generic instruction semantics, shared by every visitor.
pub mod semantics {
    use super::*;

    fn advance(at: InstrIndex, state: MemoryState, flow: &FlowGraph) -> Successors {
        let mut successors = flow.successors(at);
        let mut out = Vec::with_capacity(successors.len());
        if let Some(last) = successors.pop() {
            for next in successors {
                out.push((next, state.clone()));
            }
            out.push((last, state));
        }
        out
    }

    pub fn push(
        at: InstrIndex,
        expr: &SubjectExpr,
        mut state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        state.push(SymValue::Expr(expr.clone()));
        advance(at, state, flow)
    }

    pub fn push_type(
        at: InstrIndex,
        ty: &Type,
        mut state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        state.push(SymValue::TypeToken(ty.clone()));
        advance(at, state, flow)
    }

    pub fn push_bool(
        at: InstrIndex,
        value: bool,
        mut state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        state.push(SymValue::Bool(value));
        advance(at, state, flow)
    }

    /// Pops the type token and the tested operand; pushes the pending test
    /// when both are tracked, an unknown boolean otherwise.
    pub fn instance_of(at: InstrIndex, mut state: MemoryState, flow: &FlowGraph) -> Successors {
        let ty = state.pop();
        let subject = state.pop();
        let value = match (subject, ty) {
            (SymValue::Expr(subject), SymValue::TypeToken(candidate)) => {
                SymValue::TypeTest(TypeTest {
                    subject,
                    candidate,
                    negated: false,
                })
            }
            _ => SymValue::Unknown,
        };
        state.push(value);
        advance(at, state, flow)
    }

    pub fn not(at: InstrIndex, mut state: MemoryState, flow: &FlowGraph) -> Successors {
        let value = state.pop();
        state.push(value.negated());
        advance(at, state, flow)
    }

    pub fn cast(
        at: InstrIndex,
        expr: &SubjectExpr,
        ty: &Type,
        mut state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        state.set_expression_type(expr.clone(), ty.clone());
        advance(at, state, flow)
    }

    pub fn dup(at: InstrIndex, mut state: MemoryState, flow: &FlowGraph) -> Successors {
        let value = state.pop();
        state.push(value.clone());
        state.push(value);
        advance(at, state, flow)
    }

    pub fn pop(at: InstrIndex, mut state: MemoryState, flow: &FlowGraph) -> Successors {
        state.pop();
        advance(at, state, flow)
    }

    pub fn goto(
        _at: InstrIndex,
        target: InstrIndex,
        state: MemoryState,
        _flow: &FlowGraph,
    ) -> Successors {
        vec![(target, state)]
    }

    /// Pops the condition and forks. Each fork assumes one outcome of the
    /// condition; a fork whose assumption is infeasible is dropped.
    pub fn cond_goto(
        at: InstrIndex,
        target: InstrIndex,
        jump_if: bool,
        mut state: MemoryState,
        _flow: &FlowGraph,
    ) -> Successors {
        let condition = state.pop();
        let mut out = Vec::new();

        let mut jump = state.clone();
        if jump.apply_condition(&condition.clone().asserted(jump_if)) {
            out.push((target, jump));
        }

        if state.apply_condition(&condition.asserted(!jump_if)) {
            out.push((at.next(), state));
        }

        out
    }
}
