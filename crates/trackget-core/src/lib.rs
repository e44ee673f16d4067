//! trackget-core — the terminal-free core of the trackget downloader.
//!
//! Everything here is driven by the TUI crate but testable without it:
//! URL validation, the lookup client with its retry policy, the session
//! state machine, the bounded history logs, and the file-save helper.

pub mod api;
pub mod config;
pub mod download;
pub mod history;
pub mod platform;
pub mod session;
pub mod validate;
