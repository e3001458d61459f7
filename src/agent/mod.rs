pub mod agent_loop;
pub mod clone_repository;
pub mod definition;
pub mod logging;
pub mod system_prompt;
pub mod tools;

pub use clone_repository::{CloneRepositoryTool, CloneRequest, CloneResult};
pub use definition::AgentConfig;
pub use tools::{ToolKind, Toolbox};
