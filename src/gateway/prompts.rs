//! System prompts and generator instructions.

use solace_core::recommend::RecCategory;
use solace_core::types::MessageType;
use solace_memory::{DailyCheckin, User};

/// Companion persona used for every conversational reply.
pub(crate) fn companion_system(user: &User, checkin: Option<&DailyCheckin>) -> String {
    let mut prompt = format!(
        "You are Solace, a warm and attentive wellness companion for {name}, \
         {age}, living in {city}. You check in on them through the day. \
         Keep replies short (2-4 sentences), caring, and concrete. Never \
         lecture, never diagnose, never mention being an assistant.",
        name = user.name,
        age = user.age,
        city = user.city,
    );
    if let Some(c) = checkin {
        prompt.push_str(&format!(
            "\n\nToday {name} reported feeling {mood} ({score}/10). \
             Their first message was: \"{raw}\"",
            name = user.name,
            mood = c.mood_label,
            score = c.mood_score,
            raw = c.raw_message,
        ));
    }
    prompt.push_str(&format!(
        "\n\nCurrent time: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M")
    ));
    prompt
}

/// Analysis instruction for the day's first message: mood plus any
/// calendar events, as strict JSON.
pub(crate) fn intake_analysis(today: &str) -> String {
    format!(
        "Analyze the user's message. Today is {today}. Respond with ONLY a \
         JSON object, no prose:\n\
         {{\"mood_label\": \"happy|okay|anxious|sad|stressed|angry\", \
         \"mood_score\": 1-10, \
         \"events\": [{{\"title\": \"...\", \"event_time\": \"YYYY-MM-DD HH:MM\"}}]}}\n\
         List an event only when the message names a concrete upcoming \
         activity with an inferable time. Otherwise use an empty array."
    )
}

/// Instruction for one proactive nudge.
pub(crate) fn nudge_instruction(message_type: MessageType, event_title: Option<&str>) -> String {
    match message_type {
        MessageType::EventFollowup => {
            let title = event_title.unwrap_or("their plans earlier today");
            format!(
                "Write a short follow-up asking how {title} went. \
                 One or two sentences, genuinely curious, no advice."
            )
        }
        MessageType::NightCheckin => "Write a short good-night check-in. Ask how they are \
             feeling as the day winds down. One or two sentences, calm and gentle."
            .to_string(),
        _ => "Write a short evening check-in asking how their day has been \
             since this morning. One or two sentences, warm and unhurried."
            .to_string(),
    }
}

/// Instruction for the personalized night recommendation.
pub(crate) fn recommendation_instruction(
    user: &User,
    language: &str,
    tone: &str,
    categories: &[RecCategory; 2],
) -> String {
    let wants_food = categories.iter().any(|c| *c == RecCategory::Food);
    let mut prompt = format!(
        "Compose a night message for {name} in {language}. Tone: {tone}. \
         Recommend exactly one {a} and one {b}, picked for their mood and \
         locally plausible for {city}. Keep it under 80 words.",
        name = user.name,
        a = categories[0].as_str(),
        b = categories[1].as_str(),
        city = user.city,
    );
    prompt.push_str(
        "\n\nRespond with ONLY a JSON object, no prose:\n\
         {\"message\": \"the full message text\", \"dish\": \"\"}",
    );
    if wants_food {
        prompt.push_str("\nPut the recommended dish name alone in \"dish\".");
    }
    prompt
}

/// Instruction for language, current mood, and context detection over
/// the user's recent messages.
pub(crate) fn profile_detection() -> String {
    "Read the user's recent messages. Respond with ONLY a JSON object, no prose:\n\
     {\"language\": \"the language the user writes in\", \
     \"mood_label\": \"happy|okay|anxious|sad|stressed|angry\", \
     \"mood_score\": 1-10, \
     \"context_tags\": [\"up to 3 short lowercase tags for emotional \
     context, e.g. breakup, grief, exam stress\"]}"
        .to_string()
}
