//! # solace-providers
//!
//! Content generator implementations for Solace.

pub mod openai;
