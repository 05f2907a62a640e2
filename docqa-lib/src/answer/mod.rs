//! Grounded answer generation
//!
//! Retrieved chunks are labelled as numbered excerpts and sent, together with
//! the user's question, to an external chat model instructed to answer from
//! the excerpts alone.
//!
//! # Usage
//!
//! ```ignore
//! use docqa_lib::answer::{AnswerComposer, ChatCompletionsClient};
//!
//! let client = ChatCompletionsClient::from_config(&config.generation)?;
//! let composer = AnswerComposer::new(client);
//! let answer = composer.answer("What is the dosage?", &passages)?;
//! ```

use tracing::debug;

use crate::Result;

/// Instruction given to the model as the system message.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful document assistant. \
Answer the question based ONLY on the provided document excerpts. \
If the information is not in the excerpts, say so clearly.";

/// A fully rendered chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System message constraining the model to the excerpts
    pub system: String,
    /// User message holding the excerpts and the question
    pub user: String,
}

/// Render the numbered excerpt block, preserving retrieval order.
pub fn format_excerpts<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("Document excerpt {}:\n{}", i + 1, chunk.as_ref()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the grounding prompt for `query` over `chunks`.
pub fn build_prompt<S: AsRef<str>>(query: &str, chunks: &[S]) -> Prompt {
    let excerpts = format_excerpts(chunks);
    Prompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user: format!(
            "Document excerpts:\n{excerpts}\n\n\
             Question: {query}\n\n\
             Provide a clear and accurate answer strictly based on the excerpts above."
        ),
    }
}

/// Trait for text generation services
pub trait Generator: Send + Sync {
    /// Send the prompt and return the model's reply verbatim.
    ///
    /// Blocks until the service responds. Failures are returned as
    /// [`Error::Generation`](crate::Error::Generation) and never retried.
    fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

/// Turns a question and its retrieved chunks into an answer.
pub struct AnswerComposer<G: Generator> {
    generator: G,
}

impl<G: Generator> AnswerComposer<G> {
    #[must_use]
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Answer `query` using only `chunks` as context.
    pub fn answer<S: AsRef<str>>(&self, query: &str, chunks: &[S]) -> Result<String> {
        let prompt = build_prompt(query, chunks);
        debug!(
            excerpts = chunks.len(),
            model = self.generator.model_name(),
            "requesting answer"
        );
        self.generator.generate(&prompt)
    }

    /// Returns a reference to the generator.
    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }
}

mod chat;

pub use chat::*;
