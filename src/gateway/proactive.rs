//! Proactive nudge generation and email rendering.

use super::prompts;
use solace_core::{
    context::{ContextEntry, GenContext},
    error::SolaceError,
    traits::Generator,
    types::MessageType,
};
use solace_memory::{ConversationTurn, DailyCheckin, User};

/// Generate the text of one proactive nudge over the day's history.
///
/// Errors propagate so the poller can release the claim and retry on
/// the next tick.
pub(crate) async fn generate_nudge(
    generator: &dyn Generator,
    user: &User,
    checkin: &DailyCheckin,
    turns: &[ConversationTurn],
    message_type: MessageType,
    event_title: Option<&str>,
) -> Result<String, SolaceError> {
    let entries: Vec<ContextEntry> = turns
        .iter()
        .map(|t| ContextEntry {
            role: t.role.clone(),
            content: t.message.clone(),
        })
        .collect();

    let ctx = GenContext::new(
        prompts::companion_system(user, Some(checkin)),
        prompts::nudge_instruction(message_type, event_title),
    )
    .with_history(entries);

    let text = generator.complete(&ctx).await?;
    Ok(text.trim().to_string())
}

/// Subject and HTML body for a proactive nudge email.
pub(crate) fn render_email(user: &User, message_type: MessageType, text: &str) -> (String, String) {
    let subject = match message_type {
        MessageType::EventFollowup => format!("How did it go, {}?", user.name),
        MessageType::NightCheckin => "Before the day ends".to_string(),
        _ => format!("Checking in on you, {}", user.name),
    };

    let paragraphs: String = text
        .split("\n\n")
        .map(|p| format!("<p>{}</p>", p.trim().replace('\n', "<br>")))
        .collect();
    let html = format!(
        "<div style=\"font-family: sans-serif; max-width: 480px;\">\
         {paragraphs}\
         <p style=\"color: #888; font-size: 12px;\">— Solace</p>\
         </div>"
    );

    (subject, html)
}
