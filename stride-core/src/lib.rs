//! Stride core library: domain types, configuration, token persistence.
//!
//! - [`types`]: activity ids, listing summaries, sync direction, timestamp parsing
//! - [`config`]: `~/.stride/` layout and `config.yaml`
//! - [`token`]: OAuth token file
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod error;
pub mod token;
pub mod types;

pub use config::{ClientCredentials, StrideConfig};
pub use error::CoreError;
pub use token::StoredToken;
pub use types::{ActivityId, ActivitySummary, Direction};
