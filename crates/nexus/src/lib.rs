//! Storage backends and business services for the nexus conversational
//! assistant.
//!
//! The transport layer (API gateway, WebSocket plumbing) and the model
//! inference backend live outside this crate; what lives here is everything
//! between them — configuration-driven table resolution, the repository
//! access layer with its two-tier query strategy, and the thin business
//! services on top.

pub mod services;
pub mod storage;
pub mod telemetry;
