//! Tool-using answer generation.
//!
//! The model answers course questions by calling tools that search lesson content or
//! fetch a course outline. [`AIGenerator`] drives the exchange for a bounded number
//! of rounds; [`ToolManager`] dispatches calls and remembers what each tool cited.

mod generator;
mod outline_tool;
mod search_tool;
mod tools;

pub use generator::AIGenerator;
pub use outline_tool::CourseOutlineTool;
pub use search_tool::CourseSearchTool;
pub use tools::{Source, Tool, ToolManager, ToolOutput};
