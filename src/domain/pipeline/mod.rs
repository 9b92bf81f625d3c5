//! Pipeline Context - 流水线运行上下文
//!
//! 职责:
//! - 阶段状态机与状态事件
//! - 终态运行结果

mod result;
mod status;

pub use result::{PipelineResult, StageMarkers, StageOutcome};
pub use status::{PipelineStatus, StatusEvent};
