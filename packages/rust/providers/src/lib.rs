//! External-service clients for companyscout.
//!
//! Two boundaries, both expressed as traits so core logic can be tested with
//! in-crate mocks:
//! - [`CompletionProvider`] — an OpenAI-compatible chat completion endpoint,
//!   blocking and streaming modes
//! - [`SearchProvider`] — a Tavily-style web-search endpoint
//!
//! Credentials are required at construction; a missing key fails immediately,
//! before any pipeline stage runs.

pub mod completion;
pub mod search;

pub use completion::{CompletionProvider, OpenAiCompatClient, Prompt};
pub use search::{
    SearchDepth, SearchParams, SearchProvider, SearchResult, SearchTopic, TavilyClient,
};
