//! # seqsearch
//!
//! Chunked storage and parallel pattern search for large nucleotide
//! sequences.
//!
//! A sequence is fetched once from an external provider, split into
//! fixed-size chunks and stored durably. Searches fan a regex out over the
//! chunks in parallel, then combine the per-chunk matches into one result
//! with global positions, memoized for an hour per `(sequence, pattern)`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌─────────────┐
//! │ Entrez   │──▶│ SequenceLoader│──▶│ ChunkStore  │
//! │ (FASTA)  │   │ parse + split │   │ SQLite      │
//! └──────────┘   └──────────────┘   └──────┬──────┘
//!                                          │ ordered chunks
//!                                          ▼
//!  submit ──▶ JobOrchestrator ──▶ WorkerPool: map × N ──▶ barrier ──▶ reduce
//!                  │                                                  │
//!                  └───────────── poll / await ◀── ResultCache ◀──────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Pipeline error kinds |
//! | [`models`] | Core data types |
//! | [`chunk`] | Fixed-size chunk splitting and offsets |
//! | [`store`] | Chunk storage trait, SQLite and in-memory backends |
//! | [`fetch`] | Sequence provider and loader |
//! | [`mapreduce`] | Per-chunk matching and result grouping |
//! | [`pool`] | Bounded worker pool with a join barrier |
//! | [`cache`] | TTL result cache |
//! | [`jobs`] | Search job orchestration |
//! | [`server`] | HTTP API |
//! | [`search_cmd`] | CLI search and load commands |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod app;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod jobs;
pub mod mapreduce;
pub mod migrate;
pub mod models;
pub mod pool;
pub mod search_cmd;
pub mod server;
pub mod store;
