//! Activity log business logic - Classifying and recording 時報 messages.
//!
//! Three grammars, tried in order:
//!
//! * `HH:MM <本文>わず` - already done at the given clock time
//! * `<本文>なう` - happening right now
//! * `HH:MM <本文>うぃる` - planned for the given clock time
//!
//! Clock times are read in the household's local timezone. A わず time later
//! than the message's send time must mean yesterday; an うぃる time earlier
//! than the send time must mean tomorrow. A message that ends in わず or
//! うぃる but has no usable clock time is reported as confused rather than
//! silently dropped.

use crate::{
    core::{clock, parser},
    entities::{Activity, activity},
    errors::Result,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use sea_orm::{QueryOrder, Set, prelude::*};

lazy_static! {
    static ref DONE_RE: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^(\d{1,2}):(\d{2})\s*(.+?)わず$").unwrap()
    };
    static ref DOING_RE: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^(.+?)なう$").unwrap()
    };
    static ref TODO_RE: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^(\d{1,2}):(\d{2})\s*(.+?)うぃる$").unwrap()
    };
}

/// Lifecycle of a logged activity, stored as a string in the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    /// わず - finished
    Done,
    /// なう - in progress
    Doing,
    /// うぃる - planned
    Todo,
}

impl ActivityStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            ActivityStatus::Done => "done",
            ActivityStatus::Doing => "doing",
            ActivityStatus::Todo => "todo",
        }
    }

    /// Keyword shown back to users.
    pub const fn keyword(self) -> &'static str {
        match self {
            ActivityStatus::Done => "わず",
            ActivityStatus::Doing => "なう",
            ActivityStatus::Todo => "うぃる",
        }
    }

    pub fn parse(value: &str) -> Option<ActivityStatus> {
        match value {
            "done" => Some(ActivityStatus::Done),
            "doing" => Some(ActivityStatus::Doing),
            "todo" => Some(ActivityStatus::Todo),
            _ => None,
        }
    }
}

/// An activity line that matched a grammar, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedActivity {
    pub content: String,
    pub status: ActivityStatus,
    /// When the activity happened, in UTC.
    pub activity_time: DateTime<Utc>,
}

/// Outcome of running a message through the activity grammars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A grammar matched and the time was resolvable.
    Activity(ParsedActivity),
    /// Looks like an activity (わず/うぃる ending) but the clock time is
    /// missing or impossible.
    Confused,
    /// Not an activity message at all.
    NoMatch,
}

/// Classifies one message. `sent_at` is the Discord timestamp of the message;
/// clock times in the text are interpreted in `offset`'s local time.
pub fn classify(text: &str, sent_at: DateTime<Utc>, offset: FixedOffset) -> Classification {
    let text = parser::normalize_digits(text.trim());
    let sent_local = sent_at.with_timezone(&offset).naive_local();

    if let Some(caps) = DONE_RE.captures(&text) {
        let Some(time) = clock_time(&caps[1], &caps[2]) else {
            return Classification::Confused;
        };
        let mut candidate = sent_local.date().and_time(time);
        // A finished activity can't be in the future relative to the send
        if candidate > sent_local {
            candidate -= Duration::days(1);
        }
        return Classification::Activity(ParsedActivity {
            content: caps[3].to_string(),
            status: ActivityStatus::Done,
            activity_time: clock::to_utc(candidate, offset),
        });
    }

    if let Some(caps) = DOING_RE.captures(&text) {
        return Classification::Activity(ParsedActivity {
            content: caps[1].to_string(),
            status: ActivityStatus::Doing,
            activity_time: sent_at,
        });
    }

    if let Some(caps) = TODO_RE.captures(&text) {
        let Some(time) = clock_time(&caps[1], &caps[2]) else {
            return Classification::Confused;
        };
        let mut candidate = sent_local.date().and_time(time);
        // A planned activity can't be in the past relative to the send
        if candidate < sent_local {
            candidate += Duration::days(1);
        }
        return Classification::Activity(ParsedActivity {
            content: caps[3].to_string(),
            status: ActivityStatus::Todo,
            activity_time: clock::to_utc(candidate, offset),
        });
    }

    if text.ends_with("わず") || text.ends_with("うぃる") {
        return Classification::Confused;
    }

    Classification::NoMatch
}

fn clock_time(hours: &str, minutes: &str) -> Option<NaiveTime> {
    let h: u32 = hours.parse().ok()?;
    let m: u32 = minutes.parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}

/// A classified activity together with its Discord provenance, ready to store.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub message_id: String,
    pub parsed: ParsedActivity,
}

/// Stores an activity. Returns `None` when the source message was already
/// recorded, so channel re-scans are idempotent.
pub async fn record<C>(db: &C, new: NewActivity) -> Result<Option<activity::Model>>
where
    C: ConnectionTrait,
{
    let already = Activity::find()
        .filter(activity::Column::MessageId.eq(new.message_id.as_str()))
        .one(db)
        .await?;
    if already.is_some() {
        return Ok(None);
    }

    let row = activity::ActiveModel {
        user_id: Set(new.user_id),
        channel_id: Set(new.channel_id),
        guild_id: Set(new.guild_id),
        content: Set(new.parsed.content),
        activity_time: Set(new.parsed.activity_time),
        status: Set(new.parsed.status.as_str().to_string()),
        message_id: Set(new.message_id),
        ..Default::default()
    };
    Ok(Some(row.insert(db).await?))
}

/// All activities whose time falls in `[from, to)`, oldest first.
pub async fn list_between(
    db: &DatabaseConnection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<activity::Model>> {
    Activity::find()
        .filter(activity::Column::ActivityTime.gte(from))
        .filter(activity::Column::ActivityTime.lt(to))
        .order_by_asc(activity::Column::ActivityTime)
        .order_by_asc(activity::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
