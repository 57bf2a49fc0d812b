//! Growth Assist: a conversational command router for small-business growth.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod onboarding;
pub mod profile;
pub mod services;
pub mod store;
pub mod suggestions;
pub mod telemetry;
