//! Board game recommendation and search service
//!
//! Scores and ranks board games for a user from their observed
//! interaction history and builds dynamic full-text/category search
//! queries against an Elasticsearch backend. The HTTP surface speaks
//! the same wire format as the gateway that fronts it.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod search;
pub mod services;
