//! Providers module - completion endpoints
//!
//! This module defines the `LLMProvider` trait and the OpenAI-compatible
//! implementation used by the CLI.
//!
//! # Example
//!
//! ```rust,ignore
//! use taskpilot::providers::{ChatOptions, LLMProvider, OpenAIProvider};
//! use taskpilot::session::Message;
//!
//! async fn example() {
//!     let provider = OpenAIProvider::new("your-api-key");
//!     let messages = vec![Message::user("Hello!")];
//!     let options = ChatOptions::new().with_max_tokens(1000);
//!
//!     let response = provider.chat(messages, None, options).await.unwrap();
//!     println!("Response: {}", response.content);
//! }
//! ```

pub mod openai;
mod types;

pub use openai::OpenAIProvider;
pub use types::{ChatOptions, LLMProvider, LLMResponse, Usage};
