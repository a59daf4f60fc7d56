use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostVisibility {
    Public,
    Followers,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplyPolicy {
    Everyone,
    Followers,
    MentionedOnly,
    Nobody,
}

/// Time window filter for feed and profile listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostTimeRange {
    LastHour,
    Today,
    LastWeek,
    LastMonth,
    LastYear,
}

impl PostTimeRange {
    pub const ALL: [PostTimeRange; 5] = [
        PostTimeRange::LastHour,
        PostTimeRange::Today,
        PostTimeRange::LastWeek,
        PostTimeRange::LastMonth,
        PostTimeRange::LastYear,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PostTimeRange::LastHour => "Last hour",
            PostTimeRange::Today => "Today",
            PostTimeRange::LastWeek => "Last week",
            PostTimeRange::LastMonth => "Last month",
            PostTimeRange::LastYear => "Last year",
        }
    }

    /// Wire value used in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            PostTimeRange::LastHour => "LAST_HOUR",
            PostTimeRange::Today => "TODAY",
            PostTimeRange::LastWeek => "LAST_WEEK",
            PostTimeRange::LastMonth => "LAST_MONTH",
            PostTimeRange::LastYear => "LAST_YEAR",
        }
    }
}

impl std::str::FromStr for PostTimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        PostTimeRange::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| format!("unknown time range: {s}"))
    }
}

/// What happened in a notification. Closed set: every consumer matches
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Like,
    Reply,
    Follow,
    Repost,
    Quote,
    Mention,
}
