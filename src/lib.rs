//! Comm Assist: message aggregation with summaries, priorities and reply hints.

pub mod auth;
pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod routes;
