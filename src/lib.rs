//! # RAYA
//!
//! A personal-assistant answer engine. A question flows through a fixed
//! waterfall of increasingly expensive sources and the first usable answer
//! is cached for next time.
//!
//! ## Architecture
//!
//! ```text
//!  query ──▶ ┌───────┐ hit ──────────────────────────────▶ EngineResult
//!            │ cache │
//!            └───┬───┘ miss
//!                ▼
//!            ┌────────┐  local/hybrid  ┌─────────────┐
//!            │ router │ ─────────────▶ │ local model │
//!            └───┬────┘                └──────┬──────┘
//!                │ cloud                      │ low confidence / hybrid
//!                ▼                            ▼
//!          ┌──────────────────────────────────────────┐
//!          │ pipeline: knowledge, notes, wikipedia,   │
//!          │ web, news, arxiv ▶ select ▶ aggregate    │
//!          └──────────────────┬───────────────────────┘
//!                             │ cloud route, or no text
//!                             ▼
//!                      ┌─────────────┐
//!                      │ cloud model │ ──▶ fallback ▶ cache
//!                      └─────────────┘
//! ```
//!
//! Everything is synchronous: sources run one after another with their own
//! HTTP timeouts, and nothing is retried.
//!
//! ## Quick Start
//!
//! ```bash
//! raya ask "capital of France"
//! raya ask "latest news on Mars" --json
//! raya route "explain my profile"
//! raya chat
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Candidates, attempt records, `EngineResult` |
//! | [`traits`] | `SourceAdapter` seam and `SourceError` |
//! | [`cache`] | JSON file answer cache |
//! | [`router`] | Local/cloud/hybrid routing |
//! | [`pipeline`] | Ordered, gated lookup stages |
//! | [`rank`] | Candidate scoring and selection |
//! | [`aggregate`] | Display formatting of the answer |
//! | [`orchestrator`] | The waterfall |
//! | [`backend`] | Ollama and OpenAI backends |
//! | [`chat`] | Interactive loop |

pub mod aggregate;
pub mod backend;
pub mod cache;
pub mod chat;
pub mod config;
pub mod feed;
pub mod http;
pub mod intent;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod rank;
pub mod router;
pub mod source_knowledge;
pub mod source_news;
pub mod source_notes;
pub mod source_research;
pub mod source_web;
pub mod source_wikipedia;
pub mod sources;
pub mod text;
pub mod traits;
