//! Concrete inference gateway implementations.

mod openai;

pub use openai::OpenAiProvider;
