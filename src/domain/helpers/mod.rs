pub mod deadline;
pub mod fake;
mod macros;
