//! Shared recommendation contract.
//!
//! Both the HTTP intake path and the background poller evaluate the same
//! trigger predicate and category rule from here. Keeping a single
//! implementation is what guarantees the two entry points agree.

use crate::types::{AgeBucket, MessageType, MoodEnergy, TurnRole};

/// Replies required after the first proactive nudge before a
/// recommendation replaces the next scheduled step.
pub const REPLY_THRESHOLD: usize = 2;

/// Context tags that steer mid-range moods toward comfort picks.
pub const HEAVY_CONTEXT: [&str; 6] = [
    "breakup",
    "grief",
    "loss",
    "lonely",
    "depressed",
    "family fight",
];

/// Languages the recommendation can be composed in. Anything else
/// normalizes to English.
pub const LANGUAGES: [&str; 8] = [
    "English",
    "Spanish",
    "Portuguese",
    "French",
    "German",
    "Hindi",
    "Japanese",
    "Arabic",
];

/// Recommendation categories. Exactly two are always picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecCategory {
    Song,
    Food,
    Movie,
}

impl RecCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Song => "song",
            Self::Food => "food",
            Self::Movie => "movie",
        }
    }
}

/// The recommendation trigger predicate.
///
/// Over the day's ordered turn history:
/// - fails closed if a night_recommendation turn already exists
///   (at-most-once per day);
/// - finds the first assistant turn with a proactive message type; if
///   none exists, returns false;
/// - triggers iff at least [`REPLY_THRESHOLD`] user turns follow it.
pub fn recommendation_due(turns: &[(TurnRole, MessageType)]) -> bool {
    if turns
        .iter()
        .any(|(_, t)| *t == MessageType::NightRecommendation)
    {
        return false;
    }

    let first_nudge = turns
        .iter()
        .position(|(role, t)| *role == TurnRole::Assistant && t.is_proactive());

    match first_nudge {
        Some(idx) => {
            let replies = turns[idx + 1..]
                .iter()
                .filter(|(role, _)| *role == TurnRole::User)
                .count();
            replies >= REPLY_THRESHOLD
        }
        None => false,
    }
}

/// Pick exactly two categories from (mood_score, context_tags).
///
/// Low scores exclude movies (too demanding); mid scores keep food in
/// the mix only when a heavy context tag is present.
pub fn select_categories(mood_score: i64, context_tags: &[String]) -> [RecCategory; 2] {
    if mood_score <= 4 {
        return [RecCategory::Song, RecCategory::Food];
    }
    if mood_score <= 7 {
        if has_heavy_context(context_tags) {
            return [RecCategory::Song, RecCategory::Food];
        }
        return [RecCategory::Song, RecCategory::Movie];
    }
    [RecCategory::Song, RecCategory::Movie]
}

fn has_heavy_context(tags: &[String]) -> bool {
    tags.iter().any(|tag| {
        let tag = tag.to_lowercase();
        HEAVY_CONTEXT.iter().any(|heavy| tag.contains(heavy))
    })
}

/// Normalize a detected language against the closed set; defaults to
/// English on anything unrecognized.
pub fn normalize_language(raw: &str) -> &'static str {
    let raw = raw.trim();
    LANGUAGES
        .iter()
        .find(|l| l.eq_ignore_ascii_case(raw))
        .copied()
        .unwrap_or("English")
}

/// Fixed tone lookup on age bucket × mood energy.
///
/// Returned strings are woven into the generator's system prompt; they
/// select register, not content.
pub fn tone_guidance(bucket: AgeBucket, energy: MoodEnergy) -> &'static str {
    match (bucket, energy) {
        (AgeBucket::Teen, MoodEnergy::Low) => "casual, validating, no lectures, short sentences",
        (AgeBucket::Teen, MoodEnergy::Mid) => "casual and playful, light slang is fine",
        (AgeBucket::Teen, MoodEnergy::High) => "upbeat and hype, match their excitement",
        (AgeBucket::YoungAdult, MoodEnergy::Low) => "warm and steady, like a close friend checking in",
        (AgeBucket::YoungAdult, MoodEnergy::Mid) => "friendly and curious, conversational",
        (AgeBucket::YoungAdult, MoodEnergy::High) => "energetic and celebratory",
        (AgeBucket::Adult, MoodEnergy::Low) => "calm, respectful, no toxic positivity",
        (AgeBucket::Adult, MoodEnergy::Mid) => "grounded and practical, gently encouraging",
        (AgeBucket::Adult, MoodEnergy::High) => "warm and genuinely pleased for them",
        (AgeBucket::Senior, MoodEnergy::Low) => "gentle, patient, unhurried",
        (AgeBucket::Senior, MoodEnergy::Mid) => "courteous and warm, plain language",
        (AgeBucket::Senior, MoodEnergy::High) => "cheerful and appreciative",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageType as MT, TurnRole as R};

    #[test]
    fn test_trigger_fires_after_two_replies() {
        let turns = vec![
            (R::User, MT::Morning),
            (R::Assistant, MT::Morning),
            (R::Assistant, MT::EveningCheckin),
            (R::User, MT::Morning),
            (R::User, MT::Morning),
        ];
        assert!(recommendation_due(&turns));
    }

    #[test]
    fn test_trigger_needs_two_replies() {
        let turns = vec![
            (R::Assistant, MT::EveningCheckin),
            (R::User, MT::Morning),
        ];
        assert!(!recommendation_due(&turns));
    }

    #[test]
    fn test_trigger_counts_only_replies_after_first_nudge() {
        // Two user turns before the nudge must not count.
        let turns = vec![
            (R::User, MT::Morning),
            (R::User, MT::Morning),
            (R::Assistant, MT::EventFollowup),
            (R::User, MT::Morning),
        ];
        assert!(!recommendation_due(&turns));
    }

    #[test]
    fn test_trigger_false_without_proactive_turn() {
        let turns = vec![
            (R::User, MT::Morning),
            (R::Assistant, MT::Morning),
            (R::User, MT::Morning),
            (R::User, MT::Morning),
        ];
        assert!(!recommendation_due(&turns));
    }

    #[test]
    fn test_trigger_fails_closed_after_recommendation() {
        // Regardless of reply counts, a prior recommendation blocks it.
        let turns = vec![
            (R::Assistant, MT::EveningCheckin),
            (R::User, MT::Morning),
            (R::User, MT::Morning),
            (R::Assistant, MT::NightRecommendation),
            (R::User, MT::Morning),
            (R::User, MT::Morning),
        ];
        assert!(!recommendation_due(&turns));
    }

    #[test]
    fn test_trigger_empty_history() {
        assert!(!recommendation_due(&[]));
    }

    #[test]
    fn test_categories_low_score() {
        assert_eq!(
            select_categories(3, &[]),
            [RecCategory::Song, RecCategory::Food]
        );
    }

    #[test]
    fn test_categories_mid_score_heavy_context() {
        let tags = vec!["Breakup".to_string()];
        assert_eq!(
            select_categories(6, &tags),
            [RecCategory::Song, RecCategory::Food]
        );
    }

    #[test]
    fn test_categories_mid_score_no_context() {
        assert_eq!(
            select_categories(6, &[]),
            [RecCategory::Song, RecCategory::Movie]
        );
    }

    #[test]
    fn test_categories_high_score() {
        assert_eq!(
            select_categories(9, &[]),
            [RecCategory::Song, RecCategory::Movie]
        );
    }

    #[test]
    fn test_categories_always_exactly_two() {
        for score in 1..=10 {
            let picks = select_categories(score, &["grief".to_string()]);
            assert_ne!(picks[0], picks[1]);
        }
    }

    #[test]
    fn test_heavy_context_is_case_insensitive_substring() {
        let tags = vec!["big family FIGHT yesterday".to_string()];
        assert_eq!(
            select_categories(5, &tags),
            [RecCategory::Song, RecCategory::Food]
        );
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("spanish"), "Spanish");
        assert_eq!(normalize_language(" Hindi "), "Hindi");
        assert_eq!(normalize_language("Klingon"), "English");
        assert_eq!(normalize_language(""), "English");
    }
}
