use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use shared::RawCounters;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PlatformAccountRecord {
    pub id: i32,
    pub user_id: i32,
    pub platform: String,
    pub username: String,
    pub profile_url: String,
    pub last_synced: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PlatformStatRecord {
    pub platform: String,
    pub repos: i32,
    pub contributions: i32,
    pub solved: i32,
    pub score: i32,
    pub rating: i32,
    pub contests: i32,
    pub xp: i32,
    pub updated_at: NaiveDateTime,
}

impl PlatformStatRecord {
    pub fn counters(&self) -> RawCounters {
        RawCounters {
            repos: self.repos.max(0) as u32,
            contributions: self.contributions.max(0) as u32,
            solved: self.solved.max(0) as u32,
            score: self.score.max(0) as u32,
            rating: self.rating.max(0) as u32,
            contests: self.contests.max(0) as u32,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserStatsRecord {
    pub total_xp: i32,
    pub level: i32,
    pub last_updated: NaiveDateTime,
}

#[derive(Debug, Clone, Default, sqlx::FromRow, Serialize, Deserialize)]
pub struct StreakRecord {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_active_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DailyActivityRecord {
    pub activity_date: NaiveDate,
    pub commits: i32,
    pub problems_solved: i32,
    pub xp: i32,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LeaderboardRecord {
    pub login: String,
    pub full_name: Option<String>,
    pub total_xp: i32,
    pub level: i32,
    pub place: i64,
    pub computed_at: NaiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: i32,
    pub title: String,
    pub subject: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub estimated_hours: Option<f32>,
    pub difficulty: i32,
    pub completed: bool,
    pub notes: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct StudySessionRecord {
    pub id: i32,
    pub session_date: NaiveDate,
    pub minutes: i32,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Statistics {
    pub users: i64,
    pub linked_accounts: i64,
    pub total_xp: i64,
    pub completed_tasks: i64,
}

/// Full per-user view assembled from several tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i32,
    pub login: String,
    pub full_name: Option<String>,
    pub total_xp: i32,
    pub level: i32,
    pub last_updated: Option<NaiveDateTime>,
    pub platform_stats: Vec<PlatformStatRecord>,
    pub streak: StreakRecord,
}
