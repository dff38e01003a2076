/*! Turn flow graphs and narrowing answers back into readable text.
 *
 * The emitted flow format round-trips through the parser, so a dumped flow
 * is also a regression test waiting to happen. Reports come in two shapes:
 * colored text for people, JSON for tooling.
 */

pub mod emitter;
pub mod flow_emitter;
pub mod report;

pub use emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
pub use flow_emitter::{instruction_text, FlowEmitter};
pub use report::NarrowingReport;
