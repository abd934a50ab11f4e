pub mod cloud;
pub mod gemini;

pub use cloud::{AnthropicProvider, OpenAIProvider, ORCHESTRATION_PREAMBLE};
pub use gemini::{split_session, GeminiProvider, SessionSplit};
