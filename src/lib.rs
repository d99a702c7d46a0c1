//! TabChat Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod backends;
pub mod config;
pub mod error;
pub mod services;
/// Per-tab conversation session lifecycle
///
/// Handles the message log, the active-tab state machine, and the
/// session registry.
pub mod session;
pub mod websocket;
