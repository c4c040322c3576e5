// Generative content providers

pub mod openai;
pub mod provider;

pub use openai::OpenAIGenerator;
pub use provider::*;
