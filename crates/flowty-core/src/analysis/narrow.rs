use crate::analysis::runner::{CancelToken, FlowRunner, RunStatus};
use crate::analysis::state::{MemoryState, TypeFacts};
use crate::analysis::visitor::{semantics, FlowVisitor, Successors};
use crate::expr::SubjectExpr;
use crate::flow::{FlowGraph, InstrIndex, Instruction};
use crate::types::Type;

/// Facts that held on every explored path through the queried occurrence,
/// ordered by the subject's source offset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NarrowedTypes {
    entries: Vec<(SubjectExpr, Type)>,
}

impl NarrowedTypes {
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_facts(facts: TypeFacts) -> Self {
        let mut entries: Vec<(SubjectExpr, Type)> = facts
            .iter()
            .map(|(subject, ty)| (subject.clone(), ty.clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| {
            a.offset()
                .cmp(&b.offset())
                .then_with(|| a.to_string().cmp(&b.to_string()))
        });
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, subject: &SubjectExpr) -> Option<&Type> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == subject)
            .map(|(_, ty)| ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubjectExpr, &Type)> {
        self.entries.iter().map(|(subject, ty)| (subject, ty))
    }
}

/// Watches one `Push` instruction and keeps the running intersection of the
/// fact maps seen there. Types must match exactly to survive; a path that
/// disagrees, or that never established the fact, removes the entry.
pub struct NarrowingCollector {
    usage: InstrIndex,
    accumulated: Option<TypeFacts>,
}

impl NarrowingCollector {
    pub fn new(usage: InstrIndex) -> Self {
        Self {
            usage,
            accumulated: None,
        }
    }

    fn record(&mut self, observed: &TypeFacts) {
        match &mut self.accumulated {
            None => self.accumulated = Some(observed.clone()),
            Some(accumulated) => {
                accumulated.retain(|subject, ty| observed.get(subject) == Some(ty));
            }
        }
    }

    /// `None` when the occurrence was never reached.
    pub fn into_narrowed_types(self) -> Option<NarrowedTypes> {
        self.accumulated.map(NarrowedTypes::from_facts)
    }
}

impl FlowVisitor for NarrowingCollector {
    fn visit_push(
        &mut self,
        at: InstrIndex,
        expr: &SubjectExpr,
        state: MemoryState,
        flow: &FlowGraph,
    ) -> Successors {
        let facts = state.facts().clone();
        let out = semantics::push(at, expr, state, flow);
        if at == self.usage {
            self.record(&facts);
        }
        out
    }
}

/// One narrowing question: which facts hold at `usage` on every path from
/// `start`? Failures of any kind produce an empty answer, never an error.
pub struct NarrowingQuery<'a> {
    flow: &'a FlowGraph,
    start: InstrIndex,
    step_limit: Option<usize>,
    cancel: Option<CancelToken>,
}

impl<'a> NarrowingQuery<'a> {
    pub fn new(flow: &'a FlowGraph) -> Self {
        Self {
            flow,
            start: InstrIndex(0),
            step_limit: None,
            cancel: None,
        }
    }

    pub fn starting_at(mut self, start: InstrIndex) -> Self {
        self.start = start;
        self
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = Some(step_limit);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn run(&self, usage: InstrIndex) -> NarrowedTypes {
        match self.flow.get(usage) {
            Some(Instruction::Push { .. }) => {}
            _ => {
                tracing::debug!(
                    flow = self.flow.name(),
                    usage = usage.index(),
                    "queried occurrence is not a push instruction"
                );
                return NarrowedTypes::empty();
            }
        }

        let mut runner = FlowRunner::new(self.flow);
        if let Some(step_limit) = self.step_limit {
            runner = runner.with_step_limit(step_limit);
        }
        if let Some(cancel) = &self.cancel {
            runner = runner.with_cancel_token(cancel.clone());
        }

        let mut collector = NarrowingCollector::new(usage);
        let status = runner.run(self.start, &mut collector);
        if status != RunStatus::Ok {
            tracing::debug!(
                flow = self.flow.name(),
                usage = usage.index(),
                ?status,
                "narrowing run did not complete; reporting no facts"
            );
            return NarrowedTypes::empty();
        }

        collector
            .into_narrowed_types()
            .unwrap_or_else(NarrowedTypes::empty)
    }
}

/// Convenience wrapper over [`NarrowingQuery`] with default limits.
pub fn narrowed_types_at(flow: &FlowGraph, start: InstrIndex, usage: InstrIndex) -> NarrowedTypes {
    NarrowingQuery::new(flow).starting_at(start).run(usage)
}
