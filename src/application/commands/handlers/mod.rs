//! Command Handlers 实现

mod pipeline_coordinator;

pub use pipeline_coordinator::*;
