//! Headless interaction and state-sync core for the channel messaging surface.
//!
//! The crate owns the composer state machine, the send-then-invalidate cache
//! protocol, and the channel selector. Rendering, routing and transport are
//! collaborators reached through narrow traits.
#![deny(unsafe_code)]

pub mod app;
/// Chat components and their event contracts.
pub mod chat;
pub mod routing;
/// Settings persistence.
pub mod settings;
