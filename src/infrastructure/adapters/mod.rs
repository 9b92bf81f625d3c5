//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod analyzer;
pub mod annotator;
pub mod extractor;
pub mod llm;
pub mod process;
pub mod refiner;
pub mod transcoder;

pub use analyzer::*;
pub use annotator::*;
pub use extractor::*;
pub use llm::*;
pub use process::ToolCommand;
pub use refiner::*;
pub use transcoder::*;
