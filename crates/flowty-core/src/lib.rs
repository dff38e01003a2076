/*! Core flow graphs and the type-narrowing engine.
 *
 * Narrowing answers one question: at a given expression occurrence, which
 * type facts hold on every execution path that can reach it? This crate
 * provides the instruction-level flow graphs, the symbolic interpreter that
 * walks them, and the collector that intersects the facts per path.
 */

pub mod analysis;
pub mod builder;
pub mod expr;
pub mod flow;
pub mod persist;
pub mod types;

pub use analysis::cache::{CacheKey, CacheStatistics, NarrowingCache};
pub use analysis::narrow::{narrowed_types_at, NarrowedTypes, NarrowingCollector, NarrowingQuery};
pub use analysis::runner::{CancelToken, FlowRunner, RunStatus, DEFAULT_STEP_LIMIT};
pub use analysis::state::{MemoryState, TypeFacts};
pub use analysis::value::{SymValue, TypeTest};
pub use analysis::visitor::{FlowVisitor, Successors};
pub use builder::{FlowBuilder, Label};
pub use expr::{equivalent, structural_hash, Expr, ExprKind, SubjectExpr};
pub use flow::{FlowGraph, InstrIndex, Instruction};
pub use types::Type;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("malformed flow graph: {0}")]
    MalformedFlow(String),
    #[error("unbound label: {0}")]
    UnboundLabel(String),
    #[error("builder error: {0}")]
    BuilderError(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests;
