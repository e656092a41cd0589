//! Scheduling rules: when each proactive slot fires.
//!
//! All rules are pure functions over naive local time; the storage
//! boundary converts to UTC with [`to_utc`]. Fast/demo mode compresses
//! every wall-clock delay into seconds.

use crate::types::MessageType;
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Local hour the evening check-in targets.
pub const EVENING_HOUR: u32 = 19;
/// Local hour the night check-in targets.
pub const NIGHT_HOUR: u32 = 22;
/// Chained stages in fast mode fire this many seconds out.
pub const FAST_CHAIN_DELAY_SECS: i64 = 10;
/// Production offset for event follow-ups and any chained type without
/// a wall-clock target.
pub const FOLLOWUP_OFFSET_HOURS: i64 = 2;

/// Fast-mode seed offsets for the day's independently seeded slots.
pub fn fast_seed_offset(message_type: MessageType) -> Duration {
    match message_type {
        MessageType::EventFollowup => Duration::seconds(30),
        MessageType::EveningCheckin => Duration::seconds(60),
        MessageType::NightCheckin => Duration::seconds(110),
        _ => Duration::seconds(30),
    }
}

/// Next occurrence of `hour:00` at or after `now`, rolling to the next
/// day if that hour has already passed today.
pub fn next_occurrence(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default();
    let today = now.date().and_time(time);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// When a seeded slot fires (intake path: the three daily slots).
pub fn seeded_for(message_type: MessageType, is_fast: bool, now: NaiveDateTime) -> NaiveDateTime {
    if is_fast {
        return now + fast_seed_offset(message_type);
    }
    match message_type {
        MessageType::EveningCheckin => next_occurrence(now, EVENING_HOUR),
        MessageType::NightCheckin => next_occurrence(now, NIGHT_HOUR),
        _ => now + Duration::hours(FOLLOWUP_OFFSET_HOURS),
    }
}

/// When a chained successor stage fires (scheduler path).
pub fn chained_for(next: MessageType, is_fast: bool, now: NaiveDateTime) -> NaiveDateTime {
    if is_fast {
        return now + Duration::seconds(FAST_CHAIN_DELAY_SECS);
    }
    match next {
        MessageType::EveningCheckin => next_occurrence(now, EVENING_HOUR),
        MessageType::NightCheckin => next_occurrence(now, NIGHT_HOUR),
        _ => now + Duration::hours(FOLLOWUP_OFFSET_HOURS),
    }
}

/// When an event follow-up fires: event time + 2h, or a short fixed
/// offset from now in fast mode.
pub fn followup_for(event_time: NaiveDateTime, is_fast: bool, now: NaiveDateTime) -> NaiveDateTime {
    if is_fast {
        now + fast_seed_offset(MessageType::EventFollowup)
    } else {
        event_time + Duration::hours(FOLLOWUP_OFFSET_HOURS)
    }
}

/// Parse an event timestamp as emitted by the generator.
///
/// Accepts ISO-ish local timestamps with or without seconds or a `T`
/// separator. Unparseable values mean the event is dropped (logged at
/// the call site).
pub fn parse_event_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim().trim_end_matches('Z');
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
}

/// Resolve a naive local timestamp to UTC for storage.
///
/// DST gaps resolve an hour forward; ambiguous times take the earlier
/// instant.
pub fn to_utc(local: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => match Local.from_local_datetime(&(local + Duration::hours(1))) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            LocalResult::None => Utc::now(),
        },
    }
}

/// Current wall-clock time in naive local space.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}
