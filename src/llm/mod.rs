pub mod openai;
pub mod prompt;
pub mod provider;
pub mod types;

pub use openai::OpenAiChatModel;
pub use prompt::build_system_prompt;
pub use provider::ChatModel;
pub use types::{Message, Role, ToolCall, ToolSpec};
