//! Chat intake — the user-facing half of the day loop.
//!
//! The first message of a calendar day creates the check-in, extracts
//! events, and seeds the day's proactive schedule. Every later message
//! is a plain conversational turn that may trip the recommendation
//! trigger.

use super::{prompts, recommend};
use crate::api::ApiState;
use serde::Deserialize;
use solace_core::{
    context::{ContextEntry, GenContext},
    decode::decode_json,
    error::SolaceError,
    recommend::recommendation_due,
    schedule,
    types::{MessageType, MoodLabel, TurnRole},
};
use solace_memory::{DailyCheckin, User};
use tracing::{debug, error, warn};

/// Reply used when the generator is down. The check-in state must still
/// advance, so intake never fails on generator errors alone.
const FALLBACK_REPLY: &str =
    "Thank you for telling me. I'm here with you today, and I'll check in again later.";

/// Decoded analysis of the day's first message.
#[derive(Debug, Deserialize)]
struct IntakeAnalysis {
    mood_label: String,
    mood_score: i64,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    title: String,
    event_time: String,
}

/// Handle one inbound chat message, returning the assistant reply.
pub(crate) async fn handle_chat(
    state: &ApiState,
    user: &User,
    message: &str,
) -> Result<String, SolaceError> {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    match state.store.find_checkin_by_date(&user.id, &today).await? {
        Some(checkin) => follow_up_message(state, user, &checkin, message).await,
        None => first_message(state, user, message, &today).await,
    }
}

/// First message of the day: detect mood and events, open the check-in,
/// seed the proactive schedule.
async fn first_message(
    state: &ApiState,
    user: &User,
    message: &str,
    today: &str,
) -> Result<String, SolaceError> {
    let analysis = analyze(state, message, today).await;
    let mood = MoodLabel::parse(&analysis.mood_label).unwrap_or(MoodLabel::Okay);
    let score = analysis.mood_score.clamp(1, 10);

    let (checkin, created) = state
        .store
        .get_or_create_checkin(&user.id, today, mood, score, message)
        .await?;

    // Lost the first-message race: someone else opened the day.
    if !created {
        return follow_up_message(state, user, &checkin, message).await;
    }

    state
        .store
        .insert_turn(&user.id, &checkin.id, TurnRole::User, message, MessageType::Morning)
        .await?;

    let reply = reply_to(state, user, &checkin, &[], message).await;
    state
        .store
        .insert_turn(
            &user.id,
            &checkin.id,
            TurnRole::Assistant,
            &reply,
            MessageType::Morning,
        )
        .await?;

    seed_schedule(state, user, &checkin, &analysis.events).await?;

    Ok(reply)
}

/// Any message after the day's first: append turns, re-check the trigger.
async fn follow_up_message(
    state: &ApiState,
    user: &User,
    checkin: &DailyCheckin,
    message: &str,
) -> Result<String, SolaceError> {
    let history = state.store.list_turns(&user.id, &checkin.id).await?;

    state
        .store
        .insert_turn(&user.id, &checkin.id, TurnRole::User, message, MessageType::Morning)
        .await?;

    let reply = reply_to(state, user, checkin, &history, message).await;
    state
        .store
        .insert_turn(
            &user.id,
            &checkin.id,
            TurnRole::Assistant,
            &reply,
            MessageType::Morning,
        )
        .await?;

    // The user turn just appended may complete the trigger. The
    // recommendation runs in the background; the reply never waits on it.
    let turns = state.store.list_turns(&user.id, &checkin.id).await?;
    let kinds: Vec<_> = turns.iter().filter_map(|t| t.kind()).collect();
    if recommendation_due(&kinds) {
        let store = state.store.clone();
        let generator = state.generator.clone();
        let mailer = state.mailer.clone();
        let user = user.clone();
        let checkin = checkin.clone();
        tokio::spawn(async move {
            if let Err(e) =
                recommend::run_recommendation(&store, generator.as_ref(), mailer.as_ref(), &user, &checkin)
                    .await
            {
                error!("recommendation for {} failed: {e}", user.id);
            }
        });
    }

    Ok(reply)
}

/// Run the mood/event analysis, falling back to neutral defaults when
/// the generator fails or returns garbage.
async fn analyze(state: &ApiState, message: &str, today: &str) -> IntakeAnalysis {
    let ctx = GenContext::new(prompts::intake_analysis(today), message);
    match state.generator.complete(&ctx).await {
        Ok(raw) => match decode_json::<IntakeAnalysis>(&raw) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("intake analysis decode failed, using defaults: {e}");
                neutral_analysis()
            }
        },
        Err(e) => {
            warn!("intake analysis generation failed, using defaults: {e}");
            neutral_analysis()
        }
    }
}

fn neutral_analysis() -> IntakeAnalysis {
    IntakeAnalysis {
        mood_label: "okay".to_string(),
        mood_score: 5,
        events: Vec::new(),
    }
}

/// Generate the conversational reply, falling back to a static line on
/// generator failure.
async fn reply_to(
    state: &ApiState,
    user: &User,
    checkin: &DailyCheckin,
    history: &[solace_memory::ConversationTurn],
    message: &str,
) -> String {
    let entries: Vec<ContextEntry> = history
        .iter()
        .map(|t| ContextEntry {
            role: t.role.clone(),
            content: t.message.clone(),
        })
        .collect();
    let ctx = GenContext::new(prompts::companion_system(user, Some(checkin)), message)
        .with_history(entries);

    match state.generator.complete(&ctx).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("reply generation failed for {}: {e}", user.id);
            FALLBACK_REPLY.to_string()
        }
    }
}

/// Seed the day's proactive slots: one follow-up per extracted event,
/// plus the evening and night check-ins.
async fn seed_schedule(
    state: &ApiState,
    user: &User,
    checkin: &DailyCheckin,
    events: &[RawEvent],
) -> Result<(), SolaceError> {
    let is_fast = state.fast_mode;
    let now = schedule::now_local();

    for event in events {
        let Some(event_time) = schedule::parse_event_time(&event.event_time) else {
            warn!(
                "dropping event '{}' with unparseable time '{}'",
                event.title, event.event_time
            );
            continue;
        };

        let follow_up_at = schedule::followup_for(event_time, is_fast, now);
        let event_id = state
            .store
            .insert_event(
                &user.id,
                &checkin.id,
                &event.title,
                schedule::to_utc(event_time),
                schedule::to_utc(follow_up_at),
            )
            .await?;
        state
            .store
            .insert_scheduled(
                &user.id,
                Some(&event_id),
                schedule::to_utc(follow_up_at),
                MessageType::EventFollowup,
                is_fast,
            )
            .await?;
        debug!("seeded follow-up for '{}' at {follow_up_at}", event.title);
    }

    for slot in [MessageType::EveningCheckin, MessageType::NightCheckin] {
        let when = schedule::seeded_for(slot, is_fast, now);
        state
            .store
            .insert_scheduled(&user.id, None, schedule::to_utc(when), slot, is_fast)
            .await?;
    }

    Ok(())
}
