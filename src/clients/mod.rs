pub mod llm_client;

pub use llm_client::{strip_code_fence, LlmClient, TextGenerator};
