//! atelier: cooperating agents that commission creative work and publish
//! vocabulary posts, plus the HTTP API the web backend calls.

pub mod agents;
pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod llm;
pub mod logger;
pub mod models;
pub mod prompt;
pub mod publishing;
pub mod relay;
pub mod runtime;
pub mod storage;
