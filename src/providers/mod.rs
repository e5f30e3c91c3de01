//! HTTP clients for the external embedding and chat services.

pub mod openai;

pub use openai::{OpenAiChat, OpenAiEmbedder};
