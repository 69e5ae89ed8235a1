//! DynamoDB storage backend implementation.
//!
//! This module provides DynamoDB-based implementations of the repository
//! traits using `aws-sdk-dynamodb`. Each repository learns its table
//! identity from the configuration resolver once, at construction.

mod conversions;
mod error;
mod repository;

pub use repository::{DynamoDbConversationRepository, DynamoDbPromptRepository};
