//! Presentation of batch progress.
//!
//! Reporters observe workers and the orchestrator; they have no say in
//! control flow, so swapping [`ConsoleReporter`] for [`NullReporter`] never
//! changes a batch's exit code.

mod console;
mod traits;

pub use console::{ConsoleReporter, SummaryFormat};
pub use traits::{NullReporter, Reporter};
