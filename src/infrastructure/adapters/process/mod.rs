//! Process Adapter - 外部进程公共设施

mod progress;
mod result_line;
mod tool_runner;

#[cfg(test)]
pub(crate) mod test_tools;

pub use progress::parse_progress_line;
pub use result_line::find_result_path;
pub use tool_runner::{run_tool, ToolCommand, ToolOutput};
