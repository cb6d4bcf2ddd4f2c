//! Pensum - Course Materials Assistant
//!
//! A local-first tool that indexes course documents and answers questions
//! about them. The model is given search and outline tools and may call them
//! for a bounded number of rounds before it has to answer.
//!
//! # Overview
//!
//! Pensum allows you to:
//! - Parse course documents into lessons and sentence-aligned chunks
//! - Store course catalogs and chunk embeddings in SQLite or in memory
//! - Ask questions and get answers with lesson-level sources
//! - Serve the assistant over HTTP for a web frontend
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `course` - Course, lesson and chunk types
//! - `ingest` - Document parsing and chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Course catalog and chunk storage
//! - `search` - Course-aware semantic search
//! - `agent` - Tools, tool registry and the bounded tool-calling loop
//! - `session` - Conversation history
//! - `rag` - The assistant facade tying it together
//!
//! # Example
//!
//! ```rust,no_run
//! use pensum::config::Settings;
//! use pensum::rag::RagSystem;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let rag = RagSystem::new(settings)?;
//!
//!     rag.add_course_folder(std::path::Path::new("docs"), false).await?;
//!     let response = rag.query("What does lesson 2 of the MCP course cover?", None).await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod course;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod openai;
pub mod rag;
pub mod search;
pub mod session;
pub mod vector_store;

pub use error::{PensumError, Result};
