use crate::{context::GenContext, error::SolaceError};
use async_trait::async_trait;

/// Content generator trait — the LLM behind mood detection, event
/// extraction, and message composition.
///
/// Treated as unreliable and possibly slow: callers must tolerate
/// failures and malformed output (see `decode`).
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable generator name.
    fn name(&self) -> &str;

    /// Send a conversation context and get the raw text response.
    async fn complete(&self, context: &GenContext) -> Result<String, SolaceError>;

    /// Check if the generator is reachable and ready.
    async fn is_available(&self) -> bool;
}

/// Outbound email trait — fire-and-forget delivery.
///
/// Failures are logged by callers and never propagated to users.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Human-readable mailer name.
    fn name(&self) -> &str;

    /// Send one email.
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), SolaceError>;
}
