use crate::analysis::state::MemoryState;
use crate::analysis::visitor::FlowVisitor;
use crate::flow::{FlowGraph, InstrIndex};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Hard bound on processed (instruction, state) pairs before a run gives up.
pub const DEFAULT_STEP_LIMIT: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    Failed,
    /// The step budget ran out. Carries no information about the analyzed
    /// code; callers must treat it exactly like `Failed`.
    TooComplex,
}

/// Cooperative cancellation shared with the caller; checked once per
/// worklist iteration, which is the only boundary a run can stop at.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Worklist-driven symbolic executor over one flow graph.
///
/// Forked states are deduplicated per instruction by structural state
/// equality; that pruning, plus the step budget, is what bounds exploration
/// of branchy or looping flows.
pub struct FlowRunner<'a> {
    flow: &'a FlowGraph,
    step_limit: usize,
    cancel: Option<CancelToken>,
}

impl<'a> FlowRunner<'a> {
    pub fn new(flow: &'a FlowGraph) -> Self {
        Self {
            flow,
            step_limit: DEFAULT_STEP_LIMIT,
            cancel: None,
        }
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn run(&self, start: InstrIndex, visitor: &mut dyn FlowVisitor) -> RunStatus {
        if !self.flow.contains(start) {
            tracing::debug!(
                flow = self.flow.name(),
                start = start.index(),
                "start index outside the flow"
            );
            return RunStatus::Failed;
        }

        let mut worklist: VecDeque<(InstrIndex, MemoryState)> = VecDeque::new();
        let mut visited: HashSet<(InstrIndex, MemoryState)> = HashSet::new();

        let seed = (start, MemoryState::new());
        visited.insert(seed.clone());
        worklist.push_back(seed);

        let mut steps = 0usize;
        while let Some((at, state)) = worklist.pop_front() {
            if let Some(cancel) = &self.cancel {
                if cancel.is_cancelled() {
                    tracing::debug!(flow = self.flow.name(), "run cancelled");
                    return RunStatus::Failed;
                }
            }

            steps += 1;
            if steps > self.step_limit {
                tracing::debug!(
                    flow = self.flow.name(),
                    step_limit = self.step_limit,
                    "step budget exhausted"
                );
                return RunStatus::TooComplex;
            }

            let instruction = self.flow.instruction(at);
            for successor in visitor.visit_instruction(at, instruction, state, self.flow) {
                if !visited.contains(&successor) {
                    visited.insert(successor.clone());
                    worklist.push_back(successor);
                }
            }
        }

        RunStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::visitor::Successors;
    use crate::builder::FlowBuilder;
    use crate::expr::Expr;

    struct PushCounter {
        visits: usize,
    }

    impl FlowVisitor for PushCounter {
        fn visit_push(
            &mut self,
            at: InstrIndex,
            expr: &crate::expr::SubjectExpr,
            state: MemoryState,
            flow: &FlowGraph,
        ) -> Successors {
            self.visits += 1;
            crate::analysis::visitor::semantics::push(at, expr, state, flow)
        }
    }

    struct Passthrough;
    impl FlowVisitor for Passthrough {}

    fn straight_line() -> FlowGraph {
        let mut b = FlowBuilder::new("straight");
        b.push(Expr::ident("x"));
        b.pop();
        b.finish();
        b.build().unwrap()
    }

    #[test]
    fn test_drains_to_ok() {
        let flow = straight_line();
        let mut visitor = PushCounter { visits: 0 };
        let status = FlowRunner::new(&flow).run(InstrIndex(0), &mut visitor);
        assert_eq!(status, RunStatus::Ok);
        assert_eq!(visitor.visits, 1);
    }

    #[test]
    fn test_out_of_range_start_fails() {
        let flow = straight_line();
        let mut visitor = Passthrough;
        let status = FlowRunner::new(&flow).run(InstrIndex(99), &mut visitor);
        assert_eq!(status, RunStatus::Failed);
    }

    #[test]
    fn test_state_pruning_terminates_a_stable_loop() {
        // The loop body never changes the state, so the second trip around
        // hits the visited set and the run drains normally.
        let mut b = FlowBuilder::new("stable_loop");
        let header = b.new_label();
        b.bind(header);
        b.push_bool(true);
        b.pop();
        b.goto(header);
        let flow = b.build().unwrap();

        let mut visitor = Passthrough;
        let status = FlowRunner::new(&flow).run(InstrIndex(0), &mut visitor);
        assert_eq!(status, RunStatus::Ok);
    }

    #[test]
    fn test_growing_loop_hits_the_step_budget() {
        // Each trip leaves one more value on the stack, so no two states at
        // the header are ever equal and only the budget stops the run.
        let mut b = FlowBuilder::new("growing_loop");
        let header = b.new_label();
        b.bind(header);
        b.push(Expr::ident("x"));
        b.goto(header);
        let flow = b.build().unwrap();

        let mut visitor = Passthrough;
        let status = FlowRunner::new(&flow)
            .with_step_limit(64)
            .run(InstrIndex(0), &mut visitor);
        assert_eq!(status, RunStatus::TooComplex);
    }

    #[test]
    fn test_cancellation_stops_the_run() {
        let flow = straight_line();
        let token = CancelToken::new();
        token.cancel();

        let mut visitor = Passthrough;
        let status = FlowRunner::new(&flow)
            .with_cancel_token(token)
            .run(InstrIndex(0), &mut visitor);
        assert_eq!(status, RunStatus::Failed);
    }
}
