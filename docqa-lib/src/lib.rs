//! docqa - question answering over a single document
//!
//! # Architecture
//!
//! ```text
//! Document -> Chunker -> Embedder -> FlatIndex  (KnowledgeBase)
//!                                        |
//! Query -> Embedder -> search <----------+
//!                         |
//!                     top-k chunks -> AnswerComposer -> answer
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docqa_lib::{
//!     answer::{AnswerComposer, ChatCompletionsClient},
//!     config::Config,
//!     embed::FastEmbedder,
//!     retrieve::Retriever,
//! };
//!
//! let config = Config::load(Config::default_dir()?)?;
//! let mut retriever = Retriever::new(FastEmbedder::new(), config.chunking.chunker()?);
//!
//! // Index a document
//! retriever.process(&document)?;
//!
//! // Retrieve and answer
//! let passages = retriever.retrieve("What is the recommended dose?", config.retrieval.top_k)?;
//! let texts: Vec<&str> = passages.iter().map(|p| p.content.as_str()).collect();
//! let composer = AnswerComposer::new(ChatCompletionsClient::from_config(&config.generation)?);
//! let answer = composer.answer("What is the recommended dose?", &texts)?;
//! ```

pub mod answer;
pub mod chunk;
pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod retrieve;

pub use error::{Error, ErrorKind, Result};
