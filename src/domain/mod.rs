//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Pipeline Context: 阶段状态与运行结果
//! - Frames Context: 帧采样清单
//! - Detection Context: 检测结果集

pub mod detection;
pub mod frames;
pub mod pipeline;
