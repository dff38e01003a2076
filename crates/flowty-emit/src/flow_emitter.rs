use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
use flowty_core::{FlowGraph, Instruction};
use std::io::Write;

pub fn instruction_text(instruction: &Instruction) -> String {
    match instruction {
        Instruction::Push { expr } => format!("push {}", expr),
        Instruction::PushType { ty } => format!("push_type {}", ty),
        Instruction::PushBool { value } => format!("push_bool {}", value),
        Instruction::InstanceOf => "instanceof".to_string(),
        Instruction::Not => "not".to_string(),
        Instruction::Cast { expr, ty } => format!("cast {} as {}", expr, ty),
        Instruction::Dup => "dup".to_string(),
        Instruction::Pop => "pop".to_string(),
        Instruction::Goto { target } => format!("goto {}", target),
        Instruction::CondGoto {
            target,
            jump_if: true,
        } => format!("iftrue {}", target),
        Instruction::CondGoto {
            target,
            jump_if: false,
        } => format!("iffalse {}", target),
        Instruction::Finish => "finish".to_string(),
    }
}

/// Emits the canonical text form of a flow. Branch targets are numeric, so
/// the output re-parses to an equivalent graph without a label pass.
pub struct FlowEmitter {
    annotate_indices: bool,
}

impl FlowEmitter {
    pub fn new() -> Self {
        Self {
            annotate_indices: false,
        }
    }

    /// Appends each instruction's index as a trailing comment.
    pub fn with_indices(mut self) -> Self {
        self.annotate_indices = true;
        self
    }
}

impl Default for FlowEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter for FlowEmitter {
    type Item = FlowGraph;

    fn emit<W: Write>(
        &self,
        flow: &FlowGraph,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        EmitHelper::write_line(writer, context, &format!("flow {} {{", flow.name()))?;
        context.indent();

        for (index, instruction) in flow.instructions().iter().enumerate() {
            let mut line = instruction_text(instruction);
            if self.annotate_indices {
                line = format!("{:<23} // {}", line, index);
            }
            EmitHelper::write_line(writer, context, &line)?;
        }

        context.dedent();
        EmitHelper::write_line(writer, context, "}")?;
        Ok(())
    }
}
