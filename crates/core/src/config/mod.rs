//! Configuration resolution.
//!
//! Every environment-dependent name the backend needs (table names, function
//! names, API endpoints) is derived from a [`Settings`] value captured once
//! from the process environment. There is no ambient global: components that
//! need a resolved name receive a `Settings` reference at construction.

mod environment;
mod settings;

pub use environment::{Environment, EnvironmentProfile};
pub use settings::{ApiChannel, Settings};
