//! Podkast - Documents to Interactive Podcasts
//!
//! A service that turns uploaded documents into a synthesized two-host
//! podcast, and lets listeners interrupt playback to ask questions that are
//! answered from the same documents and the in-progress dialogue.
//!
//! # Overview
//!
//! Podkast allows you to:
//! - Upload documents and index their content for semantic search
//! - Generate a host/guest dialogue podcast from selected documents
//! - Poll generation progress while the pipeline runs asynchronously
//! - Interrupt playback with a question and resume where you left off
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `document` - Upload ingestion and indexing
//! - `extract` - Document text extraction abstraction
//! - `chunking` - Text chunking for indexing
//! - `embedding` - Embedding generation
//! - `chunk_store` - Document chunk storage and similarity search
//! - `script` - Dialogue script generation and the script artifact format
//! - `tts` - Speech synthesis abstraction
//! - `audio` - Audio segment concatenation
//! - `job` - Podcast job state and the keyed job registry
//! - `store` - Persistent podcast/question metadata
//! - `generator` - The asynchronous generation pipeline
//! - `qa` - Question answering context and answers
//! - `playback` - The interruption/resume playback protocol
//! - `api` - HTTP API surface
//!
//! # Example
//!
//! ```rust,no_run
//! use podkast::config::Settings;
//! use podkast::generator::PodcastGenerator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let generator = Arc::new(PodcastGenerator::new(settings)?);
//!
//!     let job_id = generator
//!         .submit(&["doc_1".to_string()], "Neural networks", 3)
//!         .await?;
//!     let job = generator.status(&job_id).await?;
//!     println!("{}: {:?}", job_id, job.status);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod audio;
pub mod chunk_store;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generator;
pub mod job;
pub mod openai;
pub mod playback;
pub mod qa;
pub mod script;
pub mod store;
pub mod tts;

pub use error::{PodkastError, Result};
