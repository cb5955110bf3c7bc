pub mod ai_service;
pub mod openai; // OpenAI chat-completions client

pub use ai_service::ModelService;
pub use openai::OpenAiService;
