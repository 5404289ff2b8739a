pub mod aggregate;
pub mod batch;
pub mod brownian;
pub mod dla;
pub mod generic;
pub mod pipeline;
pub mod state;
pub mod tunable_cc;
pub mod tunable_pc;

pub use aggregate::{Aggregate, RunDiagnostics};
pub use batch::{ParametricStudy, StudySummary, run_batch, summarize};
pub use pipeline::simulate;
