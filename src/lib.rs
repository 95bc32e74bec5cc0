//! RAG relay - streaming retrieval-augmented chat
//!
//! Retrieves context from a search index, assembles a prompt, streams a
//! generation oracle's output and relays it to consumers as server-sent
//! events. The [`consumer`] module is the matching client side.

pub mod api;
pub mod config;
pub mod consumer;
pub mod framing;
pub mod llm;
pub mod prompt;
pub mod relay;
pub mod retrieval;
pub mod wire;

#[cfg(test)]
pub mod testing;
