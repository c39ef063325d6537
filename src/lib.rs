//! # coursevec
//!
//! Semantic search over per-school course catalogs.
//!
//! coursevec ingests scraped course CSVs into a shared catalog table,
//! generates one embedding vector per course, and serves free-text queries
//! ranked by cosine similarity, optionally scoped to one school, via a
//! CLI and a small HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌───────────────┐
//! │ Course CSV │──▶│  Catalog   │──▶│    SQLite      │
//! │ per school │   │   Loader   │   │ courses table  │
//! └────────────┘   └────────────┘   └──────┬────────┘
//!                                          │
//!                  ┌────────────┐   ┌──────▼────────┐
//!                  │ Embedding  │──▶│ course_       │
//!                  │  Indexer   │   │ embeddings    │
//!                  └────────────┘   └──────┬────────┘
//!                                          │
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │
//!                 │ (search) │       │ (/search)│
//!                 └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! coursevec init                    # create the database
//! coursevec load NCSU --yes        # load one school's catalog CSV
//! coursevec embed NCSU --yes       # generate its embeddings
//! coursevec search "graph algorithms" --school NCSU
//! coursevec serve                   # start the HTTP search API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`schema`] | Idempotent schema management |
//! | [`catalog`] | CSV parsing and catalog loading |
//! | [`embedding`] | Embedding service abstraction |
//! | [`indexer`] | Per-course embedding generation |
//! | [`search`] | Similarity search engine |
//! | [`bootstrap`] | Load-then-index orchestration |
//! | [`server`] | HTTP search API |
//! | [`db`] | Database connection |
//! | [`error`] | Error taxonomy |

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod confirm;
pub mod db;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod models;
pub mod progress;
pub mod schema;
pub mod search;
pub mod server;

#[cfg(test)]
pub mod testutil;
