use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rocket::{
    http::{ContentType, Status},
    response::{self, Responder},
    Request, Response,
};
use serde::{Deserialize, Serialize};
use shared::Platform;
use studytrack_server::{
    api::ConnectorError,
    db::types::{
        DailyActivityRecord, LeaderboardRecord, PlatformAccountRecord, PlatformStatRecord,
        Statistics, StreakRecord, StudySessionRecord, TaskRecord, UserRecord,
    },
    sync::{SyncError, SyncOutcome},
};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, Default, ToSchema)]
#[aliases(PaginatedLeaderboardResponse = PaginatedResponse<LeaderboardResponse>)]
pub struct PaginatedResponse<T: Serialize> {
    pub records: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
    pub limit: u64,
    pub total_records: u64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(records: Vec<T>, page: u64, limit: u64, total_records: u64) -> Self {
        let extra_page = if total_records % limit == 0 { 0 } else { 1 };
        let total_pages = (total_records / limit) + extra_page;
        Self {
            records,
            page,
            total_pages,
            limit,
            total_records,
        }
    }
}

/// JSON error body with the right status code. Actionable kinds keep their
/// message; transport and storage failures collapse into generic ones.
#[derive(Debug)]
pub struct ApiError {
    status: Status,
    message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: Status::NotFound,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: Status::BadRequest,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: Status::BadGateway,
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self {
            status: Status::InternalServerError,
            message: "internal error".to_string(),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::NotLinked { platform } => {
                Self::not_found(format!("no {platform} account linked; link one first"))
            }
            SyncError::Connector(ConnectorError::EntityNotFound { platform }) => {
                Self::not_found(format!("that username does not exist on {platform}"))
            }
            SyncError::Connector(ConnectorError::Transport { platform, .. }) => {
                Self::bad_gateway(format!("{platform} is unreachable, try again later"))
            }
            SyncError::Storage(_) => Self::internal(),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'static> {
        let body = serde_json::json!({ "error": self.message }).to_string();
        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(body.len(), std::io::Cursor::new(body))
            .ok()
    }
}

pub fn parse_platform(slug: &str) -> Result<Platform, ApiError> {
    Platform::from_str(slug)
        .map_err(|_| ApiError::not_found(format!("unknown platform '{slug}'")))
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct LinkAccountRequest {
    pub username: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PlatformAccountResponse {
    pub platform: String,
    pub username: String,
    pub profile_url: String,
    pub last_synced: Option<NaiveDateTime>,
}

impl From<PlatformAccountRecord> for PlatformAccountResponse {
    fn from(record: PlatformAccountRecord) -> Self {
        Self {
            platform: record.platform,
            username: record.username,
            profile_url: record.profile_url,
            last_synced: record.last_synced,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    pub platform: String,
    pub username: String,
    pub repos: u32,
    pub contributions: u32,
    pub solved: u32,
    pub score: u32,
    pub rating: u32,
    pub contests: u32,
    pub xp: u32,
    pub total_xp: u32,
    pub level: u32,
}

impl From<SyncOutcome> for SyncResponse {
    fn from(outcome: SyncOutcome) -> Self {
        Self {
            platform: outcome.platform.to_string(),
            username: outcome.username,
            repos: outcome.counters.repos,
            contributions: outcome.counters.contributions,
            solved: outcome.counters.solved,
            score: outcome.counters.score,
            rating: outcome.counters.rating,
            contests: outcome.counters.contests,
            xp: outcome.xp,
            total_xp: outcome.total_xp,
            level: outcome.level,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PlatformStatsResponse {
    pub platform: String,
    pub repos: u32,
    pub contributions: u32,
    pub solved: u32,
    pub score: u32,
    pub rating: u32,
    pub contests: u32,
    pub xp: u32,
    pub updated_at: NaiveDateTime,
}

impl From<PlatformStatRecord> for PlatformStatsResponse {
    fn from(record: PlatformStatRecord) -> Self {
        let counters = record.counters();
        Self {
            platform: record.platform,
            repos: counters.repos,
            contributions: counters.contributions,
            solved: counters.solved,
            score: counters.score,
            rating: counters.rating,
            contests: counters.contests,
            xp: record.xp.max(0) as u32,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Default, ToSchema)]
pub struct StreakResponse {
    pub current: u32,
    pub longest: u32,
    pub last_active: Option<NaiveDate>,
}

impl From<StreakRecord> for StreakResponse {
    fn from(record: StreakRecord) -> Self {
        Self {
            current: record.current_streak.max(0) as u32,
            longest: record.longest_streak.max(0) as u32,
            last_active: record.last_active_date,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UserProfile {
    pub login: String,
    pub name: Option<String>,
    pub total_xp: u32,
    pub level: u32,
    pub last_updated: Option<NaiveDateTime>,
    pub platforms: Vec<PlatformStatsResponse>,
    pub streak: StreakResponse,
}

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            login: record.login,
            name: record.full_name,
            total_xp: record.total_xp.max(0) as u32,
            level: record.level.max(1) as u32,
            last_updated: record.last_updated,
            platforms: record.platform_stats.into_iter().map(Into::into).collect(),
            streak: record.streak.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ActivityDayResponse {
    pub date: NaiveDate,
    pub commits: u32,
    pub problems_solved: u32,
    pub xp: u32,
}

impl From<DailyActivityRecord> for ActivityDayResponse {
    fn from(record: DailyActivityRecord) -> Self {
        Self {
            date: record.activity_date,
            commits: record.commits.max(0) as u32,
            problems_solved: record.problems_solved.max(0) as u32,
            xp: record.xp.max(0) as u32,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub login: String,
    pub name: Option<String>,
    pub total_xp: u32,
    pub level: u32,
    pub place: u64,
    pub computed_at: NaiveDateTime,
}

impl From<LeaderboardRecord> for LeaderboardResponse {
    fn from(record: LeaderboardRecord) -> Self {
        Self {
            login: record.login,
            name: record.full_name,
            total_xp: record.total_xp.max(0) as u32,
            level: record.level.max(1) as u32,
            place: record.place.max(0) as u64,
            computed_at: record.computed_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct StatisticsResponse {
    pub users: u64,
    pub linked_accounts: u64,
    pub total_xp: u64,
    pub completed_tasks: u64,
}

impl From<Statistics> for StatisticsResponse {
    fn from(record: Statistics) -> Self {
        Self {
            users: record.users.max(0) as u64,
            linked_accounts: record.linked_accounts.max(0) as u64,
            total_xp: record.total_xp.max(0) as u64,
            completed_tasks: record.completed_tasks.max(0) as u64,
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct NewTaskRequest {
    pub title: String,
    pub subject: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub estimated_hours: Option<f32>,
    #[serde(default = "default_difficulty")]
    pub difficulty: i32,
    #[serde(default)]
    pub notes: String,
}

fn default_difficulty() -> i32 {
    3
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct TaskResponse {
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

impl From<TaskRecord> for TaskResponse {
    fn from(record: TaskRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            subject: record.subject,
            deadline: record.deadline,
            estimated_hours: record.estimated_hours,
            difficulty: record.difficulty,
            completed: record.completed,
            notes: record.notes,
            created_at: record.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct CompleteTaskResponse {
    pub task: TaskResponse,
    pub newly_completed: bool,
    pub streak: StreakResponse,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct LogSessionRequest {
    pub date: Option<NaiveDate>,
    pub minutes: i32,
    pub subject: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: i32,
    pub date: NaiveDate,
    pub minutes: i32,
    pub subject: Option<String>,
    pub streak: StreakResponse,
}

impl SessionResponse {
    pub fn new(record: StudySessionRecord, streak: StreakRecord) -> Self {
        Self {
            id: record.id,
            date: record.session_date,
            minutes: record.minutes,
            subject: record.subject,
            streak: streak.into(),
        }
    }
}
