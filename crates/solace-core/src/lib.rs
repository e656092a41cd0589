//! # solace-core
//!
//! Core types, traits, configuration, and error handling for the Solace
//! wellness companion. The shared recommendation trigger and scheduling
//! rules live here so the HTTP intake path and the background poller
//! cannot drift apart.

pub mod config;
pub mod context;
pub mod decode;
pub mod error;
pub mod recommend;
pub mod schedule;
pub mod traits;
pub mod types;

pub use config::shellexpand;
