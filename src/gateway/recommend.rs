//! The once-per-day night recommendation.
//!
//! Reached from two places with identical semantics: the intake path
//! (background spawn after a triggering reply) and the poller (replacing
//! a due night check-in). The partial unique index on recommendation
//! turns makes the delivery at-most-once even if both race.

use super::prompts;
use serde::Deserialize;
use solace_core::{
    context::GenContext,
    decode::decode_json,
    error::SolaceError,
    recommend::{
        normalize_language, recommendation_due, select_categories, tone_guidance, RecCategory,
    },
    traits::{Generator, Mailer},
    types::{AgeBucket, MoodLabel},
};
use solace_memory::{ConversationTurn, DailyCheckin, Store, User};
use tracing::{debug, info, warn};

/// User turns consulted for language and current-mood detection.
const PROFILE_TURN_WINDOW: usize = 5;
/// Context tags kept after detection.
const MAX_CONTEXT_TAGS: usize = 3;

/// Language, current mood, and emotional context detected from the
/// day's recent chat. The check-in mood reflects the morning; the night
/// recommendation keys off how the user sounds now.
#[derive(Debug, Deserialize)]
struct RecProfile {
    #[serde(default)]
    language: String,
    #[serde(default = "default_mood_label")]
    mood_label: String,
    #[serde(default = "default_mood_score")]
    mood_score: i64,
    #[serde(default)]
    context_tags: Vec<String>,
}

fn default_mood_label() -> String {
    "okay".to_string()
}

fn default_mood_score() -> i64 {
    5
}

/// Generator output for the composed recommendation.
#[derive(Debug, Deserialize)]
struct RecPayload {
    message: String,
    #[serde(default)]
    dish: String,
}

/// Compose and deliver the night recommendation for (user, checkin).
///
/// Re-checks the trigger against current history first, and defers to
/// the unique index for the final at-most-once decision.
pub(crate) async fn run_recommendation(
    store: &Store,
    generator: &dyn Generator,
    mailer: &dyn Mailer,
    user: &User,
    checkin: &DailyCheckin,
) -> Result<(), SolaceError> {
    let turns = store.list_turns(&user.id, &checkin.id).await?;
    let kinds: Vec<_> = turns.iter().filter_map(|t| t.kind()).collect();
    if !recommendation_due(&kinds) {
        debug!("recommendation for {} no longer due", user.id);
        return Ok(());
    }

    let profile = detect_profile(generator, &turns).await;
    let language = normalize_language(&profile.language);
    let mood = MoodLabel::parse(&profile.mood_label).unwrap_or(MoodLabel::Okay);
    let score = profile.mood_score.clamp(1, 10);
    let categories = select_categories(score, &profile.context_tags);
    let tone = tone_guidance(AgeBucket::from_age(user.age), mood.energy());

    let instruction = prompts::recommendation_instruction(user, language, tone, &categories);
    let ctx = GenContext::new(prompts::companion_system(user, Some(checkin)), instruction);
    let raw = generator.complete(&ctx).await?;

    // A malformed payload still yields a usable message: the raw text.
    let payload = match decode_json::<RecPayload>(&raw) {
        Ok(p) if !p.message.trim().is_empty() => p,
        _ => RecPayload {
            message: raw.trim().to_string(),
            dish: String::new(),
        },
    };

    let inserted = store
        .try_insert_recommendation_turn(&user.id, &checkin.id, &payload.message)
        .await?;
    if !inserted {
        debug!("recommendation for {} already delivered today", user.id);
        return Ok(());
    }

    let link = delivery_link(user, &categories, &payload.dish);
    let (subject, html) = render_recommendation_email(user, &payload.message, &categories, link);
    if let Err(e) = mailer.send(&user.email, &subject, &html).await {
        warn!("recommendation email to {} failed: {e}", user.email);
    }

    info!(
        "delivered recommendation to {} ({} + {}, {language})",
        user.id,
        categories[0].as_str(),
        categories[1].as_str(),
    );
    Ok(())
}

/// Detect language, current mood, and context tags from the user's own
/// recent words. Any failure falls back to English and okay/5 with no
/// tags.
async fn detect_profile(generator: &dyn Generator, turns: &[ConversationTurn]) -> RecProfile {
    let ctx = GenContext::new(prompts::profile_detection(), profile_transcript(turns));
    match generator.complete(&ctx).await {
        Ok(raw) => match decode_json::<RecProfile>(&raw) {
            Ok(mut profile) => {
                profile.context_tags.truncate(MAX_CONTEXT_TAGS);
                profile
            }
            Err(e) => {
                warn!("profile decode failed, using defaults: {e}");
                RecProfile::default()
            }
        },
        Err(e) => {
            warn!("profile detection failed, using defaults: {e}");
            RecProfile::default()
        }
    }
}

/// The last [`PROFILE_TURN_WINDOW`] user turns, oldest first.
fn profile_transcript(turns: &[ConversationTurn]) -> String {
    let recent: Vec<&str> = turns
        .iter()
        .filter(|t| t.role == "user")
        .map(|t| t.message.as_str())
        .collect();
    let start = recent.len().saturating_sub(PROFILE_TURN_WINDOW);
    recent[start..].join("\n")
}

impl Default for RecProfile {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            mood_label: default_mood_label(),
            mood_score: default_mood_score(),
            context_tags: Vec::new(),
        }
    }
}

/// Food-delivery search link for the recommended dish, scoped to the
/// user's city. Only when food was picked.
fn delivery_link(user: &User, categories: &[RecCategory; 2], dish: &str) -> Option<String> {
    if !categories.iter().any(|c| *c == RecCategory::Food) {
        return None;
    }
    let city = urlencoding::encode(&user.city);
    let q = urlencoding::encode(dish.trim());
    Some(format!(
        "https://food.example.com/search?city={city}&q={q}"
    ))
}

/// Subject and HTML for the recommendation email: message, category
/// badges, and the optional order link.
fn render_recommendation_email(
    user: &User,
    message: &str,
    categories: &[RecCategory; 2],
    link: Option<String>,
) -> (String, String) {
    let subject = format!("A little something for your night, {}", user.name);

    let badges: String = categories
        .iter()
        .map(|c| {
            format!(
                "<span style=\"background: #eee; border-radius: 4px; \
                 padding: 2px 8px; margin-right: 6px; font-size: 12px;\">{}</span>",
                c.as_str()
            )
        })
        .collect();

    let link_html = match link {
        Some(url) => format!("<p><a href=\"{url}\">Order it tonight</a></p>"),
        None => String::new(),
    };

    let body: String = message
        .split("\n\n")
        .map(|p| format!("<p>{}</p>", p.trim().replace('\n', "<br>")))
        .collect();

    let html = format!(
        "<div style=\"font-family: sans-serif; max-width: 480px;\">\
         {body}{link_html}<div>{badges}</div>\
         <p style=\"color: #888; font-size: 12px;\">— Solace</p>\
         </div>"
    );

    (subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, message: &str) -> ConversationTurn {
        ConversationTurn {
            id: "t".into(),
            user_id: "u1".into(),
            checkin_id: "c1".into(),
            role: role.into(),
            message: message.into(),
            message_type: "morning".into(),
            created_at: "2026-03-10 08:00:00.000".into(),
        }
    }

    #[test]
    fn test_profile_transcript_keeps_last_five_user_turns() {
        let mut turns = vec![turn("assistant", "an earlier nudge")];
        for i in 1..=7 {
            turns.push(turn("user", &format!("msg{i}")));
        }
        let transcript = profile_transcript(&turns);
        assert!(!transcript.contains("msg1"));
        assert!(!transcript.contains("msg2"));
        assert!(transcript.contains("msg3"));
        assert!(transcript.contains("msg7"));
        assert!(!transcript.contains("nudge"));
    }

    #[test]
    fn test_profile_transcript_short_history() {
        let turns = vec![turn("user", "just this")];
        assert_eq!(profile_transcript(&turns), "just this");
        assert_eq!(profile_transcript(&[]), "");
    }

    #[test]
    fn test_profile_defaults_on_missing_fields() {
        let profile: RecProfile = serde_json::from_str(r#"{"language":"Spanish"}"#).unwrap();
        assert_eq!(profile.mood_label, "okay");
        assert_eq!(profile.mood_score, 5);
        assert!(profile.context_tags.is_empty());
    }

    fn user() -> User {
        User {
            id: "u1".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            age: 27,
            city: "São Paulo".into(),
            area: "Pinheiros".into(),
            timezone: "America/Sao_Paulo".into(),
        }
    }

    #[test]
    fn test_delivery_link_only_for_food() {
        let link = delivery_link(&user(), &[RecCategory::Song, RecCategory::Food], "pho");
        let url = link.unwrap();
        assert!(url.contains("q=pho"));
        assert!(url.contains("city=S%C3%A3o%20Paulo"));

        assert!(delivery_link(&user(), &[RecCategory::Song, RecCategory::Movie], "pho").is_none());
    }

    #[test]
    fn test_render_email_includes_badges_and_link() {
        let (subject, html) = render_recommendation_email(
            &user(),
            "Try this song and this soup.",
            &[RecCategory::Song, RecCategory::Food],
            Some("https://food.example.com/search?city=x&q=soup".into()),
        );
        assert!(subject.contains("Ana"));
        assert!(html.contains(">song<"));
        assert!(html.contains(">food<"));
        assert!(html.contains("Order it tonight"));
    }

    #[test]
    fn test_render_email_no_link() {
        let (_, html) = render_recommendation_email(
            &user(),
            "Try this song and this movie.",
            &[RecCategory::Song, RecCategory::Movie],
            None,
        );
        assert!(!html.contains("Order it tonight"));
    }
}
