//! # rulegen - Canonical ruleset aggregation engine
//!
//! Aggregates network-policy rule lists (ad/tracker domains, region
//! domains, region IP ranges) from multiple remote sources, normalizes
//! their formats, and reduces each task's merged list to a minimal,
//! non-redundant canonical set, optionally compiling it into a binary
//! match-table artifact through an external converter.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        rulegen                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: generate, check, version                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── Tasks, sources, processors, filters, bounds          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Orchestrator (tokio + futures)                             │
//! │    ├── Task pool (max_concurrent_tasks)                     │
//! │    └── Per-task source pool (max_concurrent_downloads)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fetcher (reqwest + rustls)                                 │
//! │    └── Retry with backoff, size limits, bearer credential   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Processors                                                 │
//! │    └── Comment strip, payload extraction, pihole anchoring  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Canonicalizers                                             │
//! │    ├── Domain: suffix-containment dedup (antichain)         │
//! │    └── IpCidr: CIDR collapse (ipnet)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Writer + Converter adapter                                 │
//! │    ├── Atomic canonical text artifacts                      │
//! │    └── External convert-ruleset binary (opaque)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Within a task, source outputs are merged in declaration order no
//!   matter which fetch completes first.
//! - A task's failure (download, processing) never affects its siblings;
//!   outcomes are aggregated in the run summary.
//! - Canonicalization is a pure function of the merged text: re-running
//!   over identical source content yields byte-identical artifacts.
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`convert`] - External converter adapter
//! - [`domain`] - Domain-hierarchy-aware deduplication
//! - [`error`] - Error taxonomy
//! - [`fetcher`] - HTTP client for downloading sources
//! - [`network`] - IP/CIDR network collapse
//! - [`processor`] - Per-line text processors and filters
//! - [`task`] - Task orchestration and run summary
//! - [`utils`] - Formatting helpers
//! - [`writer`] - Atomic artifact persistence

pub mod cli;
pub mod commands;
pub mod config;
pub mod convert;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod network;
pub mod processor;
pub mod task;
pub mod utils;
pub mod writer;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{Error, Result};
pub use task::{Pipeline, RunSummary};
