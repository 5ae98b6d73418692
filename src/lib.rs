//! # Comment Pipeline
//!
//! A small orchestration service: on request it fetches a handful of
//! external comments, asks a language model to summarize and classify each
//! one, appends the results to a JSON file, and logs a completion
//! notification.
//!
//! ## Architecture
//!
//! ```text
//! POST /pipeline
//!      │
//!      ▼
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │  Source  │──▶│ Analyzer │──▶│  Store   │──▶│ Notifier │
//! │ HTTP GET │   │ LLM JSON │   │ JSON file│   │ log line │
//! └──────────┘   └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! Every failure degrades into the response instead of aborting the run;
//! the endpoint always answers `200` for a well-formed request.
//!
//! ## Quick Start
//!
//! ```bash
//! export GROQ_API_KEY=...
//! pipeline serve                                  # start HTTP server
//! pipeline run --email ops@example.com --source cli
//! pipeline history                                # show stored records
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Component error kinds |
//! | [`source`] | Upstream comment source |
//! | [`analyzer`] | Language-model analysis |
//! | [`store`] | Flat-file result store |
//! | [`notify`] | Completion notifications |
//! | [`pipeline`] | Orchestration |
//! | [`server`] | HTTP server |

pub mod analyzer;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod server;
pub mod source;
pub mod store;
