/*! Symbolic execution of flow graphs and per-path fact intersection.
 *
 * The interpreter never computes values; it tracks just enough to answer a
 * type question: which instance tests and casts are guaranteed to have
 * happened on every path into an expression occurrence.
 */

pub mod cache;
pub mod narrow;
pub mod runner;
pub mod state;
pub mod value;
pub mod visitor;

pub use cache::{CacheKey, CacheStatistics, NarrowingCache};
pub use narrow::{narrowed_types_at, NarrowedTypes, NarrowingCollector, NarrowingQuery};
pub use runner::{CancelToken, FlowRunner, RunStatus, DEFAULT_STEP_LIMIT};
pub use state::{MemoryState, TypeFacts};
pub use value::{SymValue, TypeTest};
pub use visitor::{semantics, FlowVisitor, Successors};
