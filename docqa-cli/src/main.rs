//! docqa CLI - ask questions about a text document
//!
//! # Commands
//!
//! ```bash
//! # Chunk a document and show results
//! docqa chunk --size 500 --overlap 50 leaflet.txt
//!
//! # Embed text and show vector stats
//! docqa embed "What are the side effects?"
//!
//! # Index a file and show the nearest chunks
//! docqa search leaflet.txt "side effects" -k 3
//!
//! # Index a file and answer one question (needs GROQ_API_KEY)
//! docqa ask leaflet.txt "What are the side effects?"
//!
//! # Interactive session
//! docqa chat leaflet.txt
//! ```

mod session;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docqa_lib::{
    ErrorKind,
    answer::{AnswerComposer, ChatCompletionsClient},
    chunk::{Chunker, ChunkMetadata},
    config::{API_KEY_ENV, Config},
    embed::{Embedder, FastEmbedder},
    retrieve::{Retrieved, Retriever},
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::session::{PREVIEW_CHARS, Role, Session, preview};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Answer questions about a document with retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/docqa/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy, Default)]
struct ChunkArgs {
    /// Words per chunk
    #[arg(long)]
    size: Option<usize>,

    /// Words shared by consecutive chunks
    #[arg(long)]
    overlap: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk a document into overlapping word windows
    Chunk {
        /// Input text file
        input: PathBuf,

        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Embed text and show vector info
    Embed {
        /// Text to embed
        text: String,
    },

    /// Index a file and show the chunks nearest to a query
    Search {
        /// Input text file
        input: PathBuf,

        /// Query to search for
        query: String,

        /// Number of results to return
        #[arg(short)]
        k: Option<usize>,

        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Index a file and answer a single question
    Ask {
        /// Input text file
        input: PathBuf,

        /// Question about the document
        question: String,

        /// Number of chunks given to the model
        #[arg(short)]
        k: Option<usize>,

        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Interactive question answering over a document
    Chat {
        /// Text file to load at startup (or use /load later)
        input: Option<PathBuf>,

        /// Number of chunks given to the model
        #[arg(short)]
        k: Option<usize>,

        #[command(flatten)]
        chunking: ChunkArgs,
    },
}

fn load_config(path: Option<&Path>, chunking: ChunkArgs, k: Option<usize>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_file(path)?,
        None => Config::load(Config::default_dir()?)?,
    };

    if let Some(size) = chunking.size {
        config.chunking.size = size;
    }
    if let Some(overlap) = chunking.overlap {
        config.chunking.overlap = overlap;
    }
    if let Some(k) = k {
        config.retrieval.top_k = k;
    }

    config.validate().context("invalid settings")?;
    debug!(
        size = config.chunking.size,
        overlap = config.chunking.overlap,
        top_k = config.retrieval.top_k,
        model = %config.generation.model,
        "resolved settings"
    );
    Ok(config)
}

fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

fn new_embedder() -> Result<FastEmbedder> {
    println!("Loading embedding model (first run downloads ~90MB)...");
    let embedder = FastEmbedder::new();
    embedder.load()?;
    Ok(embedder)
}

/// Render a library error for the user, leading with what went wrong.
fn describe(err: &anyhow::Error) -> String {
    let Some(err) = err.downcast_ref::<docqa_lib::Error>() else {
        return format!("{err:#}");
    };

    let hint = match err.kind() {
        ErrorKind::InvalidConfiguration => "check your settings",
        ErrorKind::EmbeddingFailure => "the embedding model could not be used",
        ErrorKind::EmptyCorpus | ErrorKind::EmptyIndex => "the document has no text to search",
        ErrorKind::InvalidArgument => "invalid request",
        ErrorKind::IndexCorpusMismatch => "the loaded document is inconsistent, reload it",
        ErrorKind::GenerationFailure => "the language model service failed",
    };
    format!("{err} ({hint})")
}

fn print_sources(results: &[Retrieved]) {
    println!("\n--- Sources ---");
    for (i, result) in results.iter().enumerate() {
        println!(
            "Chunk {} (position {}, distance {:.4}):",
            i + 1,
            result.position,
            result.distance
        );
        println!("{}\n", preview(&result.content, PREVIEW_CHARS));
    }
}

fn answer<E: Embedder>(
    retriever: &Retriever<E>,
    composer: &AnswerComposer<ChatCompletionsClient>,
    question: &str,
    k: usize,
) -> Result<(String, Vec<Retrieved>)> {
    let results = retriever.retrieve(question, k)?;
    let texts: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
    let reply = composer.answer(question, &texts)?;
    Ok((reply, results))
}

fn process_document<E: Embedder>(retriever: &mut Retriever<E>, path: &Path) -> Result<()> {
    let text = read_document(path)?;
    println!("Extracted {} characters from '{}'", text.chars().count(), path.display());

    let count = retriever.process(&text)?;
    println!("Created {count} chunks");
    if count == 0 {
        println!("Warning: the document contains no words; questions cannot be answered.");
    } else {
        println!("Document loaded and ready. Ask a question.");
    }
    Ok(())
}

fn run_chat(
    mut retriever: Retriever<FastEmbedder>,
    composer: AnswerComposer<ChatCompletionsClient>,
    input: Option<PathBuf>,
    k: usize,
) -> Result<()> {
    let mut session = Session::new();

    if !composer.generator().has_api_key() {
        println!("Warning: {API_KEY_ENV} is not set; questions will fail until it is.");
    }
    if let Some(path) = input {
        if let Err(e) = process_document(&mut retriever, &path) {
            eprintln!("Error processing document: {}", describe(&e));
        }
    }
    println!("Commands: /load <file>, /clear, /history, /quit\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("/quit" | "/exit", _) => break,
            ("/clear", _) => {
                retriever.clear();
                session.clear();
                println!("Document and history cleared.");
            }
            ("/history", _) => {
                if session.is_empty() {
                    println!("No messages yet.");
                }
                for message in session.messages() {
                    println!("[{}] {}", message.role, message.content);
                    if message.role == Role::Assistant && !message.sources.is_empty() {
                        println!("  ({} source chunks)", message.sources.len());
                    }
                }
            }
            ("/load", "") => println!("Usage: /load <file>"),
            ("/load", path) => {
                if let Err(e) = process_document(&mut retriever, Path::new(path)) {
                    eprintln!("Error processing document: {}", describe(&e));
                }
            }
            _ if !retriever.is_loaded() => {
                println!("Please load a document with /load <file> to start chatting.");
            }
            _ => {
                session.push_user(line);
                match answer(&retriever, &composer, line, k) {
                    Ok((reply, results)) => {
                        println!("\n{reply}");
                        print_sources(&results);
                        let sources = results.into_iter().map(|r| r.content).collect();
                        session.push_assistant(reply, sources);
                    }
                    Err(e) => eprintln!("Error generating response: {}", describe(&e)),
                }
            }
        }
    }

    Ok(())
}

fn new_composer(config: &Config) -> Result<AnswerComposer<ChatCompletionsClient>> {
    let client = ChatCompletionsClient::from_config(&config.generation)?;
    Ok(AnswerComposer::new(client))
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Chunk { input, chunking } => {
            let config = load_config(config_path, chunking, None)?;
            let text = read_document(&input)?;
            let chunker = config.chunking.chunker()?;
            let chunks = chunker.chunk(&text, ChunkMetadata::default());

            println!(
                "Chunked '{}' into {} chunks ({} words, {} overlap):\n",
                input.display(),
                chunks.len(),
                chunker.size(),
                chunker.overlap()
            );
            for (i, chunk) in chunks.iter().enumerate() {
                println!(
                    "--- Chunk {} ({} words from word {}, id: {}) ---",
                    i + 1,
                    chunk.metadata.word_count,
                    chunk.metadata.word_offset,
                    &chunk.id[..8]
                );
                println!("{}\n", preview(&chunk.content, 200));
            }
        }

        Commands::Embed { text } => {
            let embedder = new_embedder()?;
            let embedding = embedder.embed_query(&text)?;

            println!("\nEmbedding stats ({}):", embedder.model_name());
            println!("  Dimensions: {}", embedding.len());
            println!("  First 5 values: {:?}", &embedding[..embedding.len().min(5)]);
            println!("  Min: {:.4}", embedding.iter().copied().fold(f32::INFINITY, f32::min));
            println!("  Max: {:.4}", embedding.iter().copied().fold(f32::NEG_INFINITY, f32::max));
            let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            println!("  L2 norm: {norm:.4}");
        }

        Commands::Search {
            input,
            query,
            k,
            chunking,
        } => {
            let config = load_config(config_path, chunking, k)?;
            let mut retriever = Retriever::new(new_embedder()?, config.chunking.chunker()?);
            process_document(&mut retriever, &input)?;

            let k = config.retrieval.top_k;
            println!("\nSearching: '{query}' (k={k})");
            let results = retriever.retrieve(&query, k)?;

            println!("\n=== Results ===\n");
            for (i, result) in results.iter().enumerate() {
                println!(
                    "#{} (distance: {:.4}, chunk {})",
                    i + 1,
                    result.distance,
                    result.position
                );
                println!("---");
                println!("{}\n", preview(&result.content, PREVIEW_CHARS));
            }
        }

        Commands::Ask {
            input,
            question,
            k,
            chunking,
        } => {
            let config = load_config(config_path, chunking, k)?;
            let composer = new_composer(&config)?;
            let mut retriever = Retriever::new(new_embedder()?, config.chunking.chunker()?);
            process_document(&mut retriever, &input)?;

            let k = config.retrieval.top_k;
            let (reply, results) = answer(&retriever, &composer, &question, k)?;
            println!("\n{reply}");
            print_sources(&results);
        }

        Commands::Chat { input, k, chunking } => {
            let config = load_config(config_path, chunking, k)?;
            let composer = new_composer(&config)?;
            let retriever = Retriever::new(new_embedder()?, config.chunking.chunker()?);
            run_chat(retriever, composer, input, config.retrieval.top_k)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", describe(&e));
            ExitCode::FAILURE
        }
    }
}
