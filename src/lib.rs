//! # Browserdeck
//!
//! Control-panel core for a remote browser-automation service: launch an
//! agent task, watch its progress stream, stop it cooperatively, and run
//! single or batched page extractions.
//!
//! ## Architecture
//!
//! - **agent**: run lifecycle — launcher, shared run state, streaming
//!   watcher, and the UI dispatch bridge
//! - **client**: HTTP control calls and the WebSocket stream channel
//!   behind trait seams
//! - **scrape**: single-page extraction and the sequential batch runner
//! - **config**: TOML configuration with environment override for the
//!   API key
//! - **validate**: URL validation for targets handed to the remote
//!   browser

pub mod agent;
pub mod client;
pub mod config;
pub mod error;
pub mod scrape;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::DeckConfig;
pub use error::{Error, Result};
