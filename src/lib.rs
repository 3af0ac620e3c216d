//! trendsmith - LLM-backed content generation for TikTok creators
//!
//! Five features (niche search, trend analysis, hashtag sets, content ideas,
//! titles/bios) share one pipeline: build a prompt, make a single oracle call,
//! recover JSON from the free-form answer, and normalize it into a stable
//! schema. Served over HTTP with axum, or run one-shot from the CLI.

pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod util;
