pub mod backward_pass;
pub mod forward_pass;

pub use backward_pass::{BackwardPass, CriticalPathReport, TaskFloat};
pub use forward_pass::{ForwardPass, ForwardPassOutcome};
