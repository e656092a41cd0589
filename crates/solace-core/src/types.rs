use serde::{Deserialize, Serialize};

/// Mood label detected from the first message of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Happy,
    Okay,
    Anxious,
    Sad,
    Stressed,
    Angry,
}

impl MoodLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Okay => "okay",
            Self::Anxious => "anxious",
            Self::Sad => "sad",
            Self::Stressed => "stressed",
            Self::Angry => "angry",
        }
    }

    /// Parse a label, tolerating case. Unknown labels map to `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "happy" => Some(Self::Happy),
            "okay" => Some(Self::Okay),
            "anxious" => Some(Self::Anxious),
            "sad" => Some(Self::Sad),
            "stressed" => Some(Self::Stressed),
            "angry" => Some(Self::Angry),
            _ => None,
        }
    }

    /// Energy level driving tone selection for generated messages.
    pub fn energy(&self) -> MoodEnergy {
        match self {
            Self::Happy => MoodEnergy::High,
            Self::Okay | Self::Angry => MoodEnergy::Mid,
            Self::Anxious | Self::Sad | Self::Stressed => MoodEnergy::Low,
        }
    }
}

/// Coarse energy bucket derived from the mood label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodEnergy {
    Low,
    Mid,
    High,
}

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// Tag on every conversation turn and scheduled message.
///
/// Drives both UI grouping and the scheduler's trigger detection, so it
/// must be set correctly at insert time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Ordinary daytime chat turns (the day's opening conversation).
    Morning,
    /// Follow-up after an extracted calendar event.
    EventFollowup,
    /// The 19:00 check-in.
    EveningCheckin,
    /// The 22:00 check-in.
    NightCheckin,
    /// The once-per-day personalized recommendation.
    NightRecommendation,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::EventFollowup => "event_followup",
            Self::EveningCheckin => "evening_checkin",
            Self::NightCheckin => "night_checkin",
            Self::NightRecommendation => "night_recommendation",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "morning" => Some(Self::Morning),
            "event_followup" => Some(Self::EventFollowup),
            "evening_checkin" => Some(Self::EveningCheckin),
            "night_checkin" => Some(Self::NightCheckin),
            "night_recommendation" => Some(Self::NightRecommendation),
            _ => None,
        }
    }

    /// Whether this is an assistant-initiated nudge type.
    pub fn is_proactive(&self) -> bool {
        matches!(
            self,
            Self::EventFollowup | Self::EveningCheckin | Self::NightCheckin
        )
    }

    /// Fixed daily chain: event_followup → evening_checkin → night_checkin.
    /// night_checkin terminates the chain.
    pub fn next_in_chain(&self) -> Option<MessageType> {
        match self {
            Self::EventFollowup => Some(Self::EveningCheckin),
            Self::EveningCheckin => Some(Self::NightCheckin),
            _ => None,
        }
    }
}

/// Lifecycle of a scheduled message row.
///
/// pending → processing is the atomic claim; sent and skipped are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    Pending,
    Processing,
    Sent,
    Skipped,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::Skipped => "skipped",
        }
    }
}

/// Age bucket for tone selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBucket {
    Teen,
    YoungAdult,
    Adult,
    Senior,
}

impl AgeBucket {
    pub fn from_age(age: i64) -> Self {
        match age {
            a if a < 18 => Self::Teen,
            a if a <= 35 => Self::YoungAdult,
            a if a <= 60 => Self::Adult,
            _ => Self::Senior,
        }
    }
}
