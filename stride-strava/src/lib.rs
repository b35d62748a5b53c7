//! # stride-strava
//!
//! The Strava API as an [`ActivitySource`](stride_sync::ActivitySource), plus
//! the OAuth token exchange and refresh it needs.

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{authorization_url, authorize_at, TokenEndpoint};
pub use client::{map_ureq_error, StravaClient};
pub use error::StravaError;
