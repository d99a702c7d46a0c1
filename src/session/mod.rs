//! Session module
//!
//! Owns per-tab conversation session lifecycle: the message log, the
//! active-tab state machine, and the session registry.

pub mod controller;
pub mod log;
pub mod manager;

pub use controller::{SessionController, TabId, TabInputs, TabSwitch};
pub use log::{MessageLog, Role, Turn, GREETING};
pub use manager::{SessionHandle, SessionManager};
