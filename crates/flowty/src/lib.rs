/*! Unified interface for flow-sensitive type narrowing.
 *
 * Single import for everything you need: building or parsing flow graphs,
 * running narrowing queries, and emitting flows and reports.
 */

pub use flowty_core as core;
pub use flowty_emit as emit;
pub use flowty_parser as parser;

pub use flowty_core::{
    narrowed_types_at, CancelToken, Expr, ExprKind, FlowBuilder, FlowGraph, FlowRunner,
    InstrIndex, Instruction, MemoryState, NarrowedTypes, NarrowingCache, NarrowingQuery,
    RunStatus, SubjectExpr, SymValue, Type, TypeFacts,
};

pub use flowty_emit::{FlowEmitter, NarrowingReport};

pub use flowty_parser::{parse, parse_expr, parse_flow, parse_path};
