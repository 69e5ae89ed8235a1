//! Storage backend implementations.
//!
//! Concrete implementations of the repository traits defined in
//! `nexus_core::storage`, selected via feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): in-memory backend used by the test suite
//! - `dynamodb`: AWS DynamoDB backend using `aws-sdk-dynamodb`

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "dynamodb")]
pub use dynamodb::{DynamoDbConversationRepository, DynamoDbPromptRepository};

#[cfg(feature = "inmemory")]
pub use inmemory::{InMemoryConversationRepository, InMemoryPromptRepository};
