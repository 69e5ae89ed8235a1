//! Core domain model, configuration resolution, and storage contracts for
//! the nexus conversational backend.
//!
//! This crate is free of any AWS or runtime dependency: everything in it is
//! a pure type or a pure function of captured inputs, so the storage and
//! service crates can be tested entirely against local backends.

pub mod chat;
pub mod config;
pub mod prompt;
pub mod storage;
