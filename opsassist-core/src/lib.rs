//! opsassist-core
//!
//! Domain logic shared by the operations assistant backends: the static
//! action catalog, the parameter form engine, prompt templating, the
//! persisted recent-actions store, canned mock responses, and the chat
//! session state machine. The HTTP/WebSocket wrappers live in
//! `opsassist-chat-backend` and `opsassist-gateway`; this crate stays
//! transport-free so the same logic can be driven from tests.

pub mod actions;
pub mod config;
pub mod form;
pub mod format;
pub mod mock;
pub mod recents;
pub mod session;
pub mod template;
