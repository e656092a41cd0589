//! # solace-channels
//!
//! Outbound delivery integrations for Solace.

pub mod email;
