//! Leaderboard models
//!
//! A `Leaderboard` is one ranking season. `UserLeaderboard` rows hold each
//! participant's score for a season.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Deletable, DeletionPolicy};

/// A ranking season
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    pub id: i64,
    pub season_name: Option<String>,
    pub season_number: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Deletable for Leaderboard {
    const DELETION_POLICY: DeletionPolicy = DeletionPolicy::Hard;
}

/// Season phase relative to "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonStatus {
    Upcoming,
    Active,
    Ended,
}

impl Leaderboard {
    /// Phase and whole days remaining until the next boundary.
    ///
    /// Seasons without both dates are reported as upcoming with zero days.
    pub fn status_at(&self, now: DateTime<Utc>) -> (SeasonStatus, i64) {
        match (self.start_date, self.end_date) {
            (Some(start), Some(_)) if now < start => {
                (SeasonStatus::Upcoming, (start - now).num_days())
            }
            (Some(_), Some(end)) if now <= end => (SeasonStatus::Active, (end - now).num_days()),
            (Some(_), Some(_)) => (SeasonStatus::Ended, 0),
            _ => (SeasonStatus::Upcoming, 0),
        }
    }
}

/// A season with its derived display fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardSummary {
    pub leaderboard: Leaderboard,
    pub total_participants: i64,
    pub status: SeasonStatus,
    pub days_remaining: i64,
}

impl LeaderboardSummary {
    pub fn new(leaderboard: Leaderboard, total_participants: i64, now: DateTime<Utc>) -> Self {
        let (status, days_remaining) = leaderboard.status_at(now);
        Self {
            leaderboard,
            total_participants,
            status,
            days_remaining,
        }
    }
}

/// What a season housekeeping run changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRollover {
    /// Seasons deactivated because their end date passed
    pub ended: u64,
    /// Season started because its window contains now
    pub activated: Option<i64>,
}

/// A participant's score in one season
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLeaderboard {
    pub id: i64,
    pub user_id: i64,
    pub leaderboard_id: i64,
    pub score: i32,
}

/// One line of a season ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: i64,
    pub user_id: i64,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeaderboardInput {
    #[serde(default)]
    pub season_name: Option<String>,
    pub season_number: i32,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLeaderboardInput {
    #[serde(default, with = "crate::models::double_option")]
    pub season_name: Option<Option<String>>,
    pub season_number: Option<i32>,
    #[serde(default, with = "crate::models::double_option")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, with = "crate::models::double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn season(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Leaderboard {
        Leaderboard {
            id: 1,
            season_name: None,
            season_number: 1,
            start_date: start,
            end_date: end,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_status_phases() {
        let now = Utc::now();

        let upcoming = season(Some(now + Duration::days(3)), Some(now + Duration::days(10)));
        assert_eq!(upcoming.status_at(now), (SeasonStatus::Upcoming, 3));

        let active = season(Some(now - Duration::days(1)), Some(now + Duration::days(5)));
        assert_eq!(active.status_at(now), (SeasonStatus::Active, 5));

        let ended = season(Some(now - Duration::days(10)), Some(now - Duration::days(1)));
        assert_eq!(ended.status_at(now), (SeasonStatus::Ended, 0));

        let open = season(None, Some(now + Duration::days(1)));
        assert_eq!(open.status_at(now), (SeasonStatus::Upcoming, 0));
    }
}
