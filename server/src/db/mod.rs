use async_trait::async_trait;
use chrono::NaiveDate;
use rocket::{
    fairing::{self, AdHoc},
    Build, Rocket,
};
use rocket_db_pools::Database;
use shared::{Platform, RawCounters, StreakState, XpWeights};
use sqlx::PgPool;

pub mod types;

use types::{
    DailyActivityRecord, LeaderboardRecord, PlatformAccountRecord, PlatformStatRecord, Statistics,
    StreakRecord, StudySessionRecord, TaskRecord, UserRecord, UserStatsRecord,
};

use crate::sync::SyncStore;

#[derive(Database, Clone, Debug)]
#[database("studytrack")]
pub struct DB(PgPool);

/// Fields accepted when creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub subject: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub estimated_hours: Option<f32>,
    pub difficulty: i32,
    pub notes: String,
}

/// Result of marking a task completed.
#[derive(Debug, Clone)]
pub struct CompletedTask {
    pub task: TaskRecord,
    pub login: String,
    pub newly_completed: bool,
}

impl DB {
    pub async fn upsert_user(&self, login: &str, full_name: Option<&str>) -> anyhow::Result<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (login, full_name)
            VALUES ($1, $2)
            ON CONFLICT (login)
            DO UPDATE SET full_name = COALESCE(EXCLUDED.full_name, users.full_name)
            RETURNING id
            "#,
        )
        .bind(login)
        .bind(full_name)
        .fetch_one(&self.0)
        .await?;

        Ok(id)
    }

    pub async fn user_id(&self, login: &str) -> anyhow::Result<Option<i32>> {
        let id = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE login = $1")
            .bind(login)
            .fetch_optional(&self.0)
            .await?;

        Ok(id)
    }

    pub async fn link_account(
        &self,
        login: &str,
        platform: Platform,
        username: &str,
    ) -> anyhow::Result<PlatformAccountRecord> {
        let user_id = self.upsert_user(login, None).await?;
        let account = sqlx::query_as::<_, PlatformAccountRecord>(
            r#"
            INSERT INTO platform_accounts (user_id, platform, username, profile_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, platform)
            DO UPDATE SET username = EXCLUDED.username, profile_url = EXCLUDED.profile_url
            RETURNING id, user_id, platform, username, profile_url, last_synced
            "#,
        )
        .bind(user_id)
        .bind(platform.to_string())
        .bind(username)
        .bind(platform.profile_url(username))
        .fetch_one(&self.0)
        .await?;

        Ok(account)
    }

    pub async fn disconnect_account(&self, login: &str, platform: Platform) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM platform_accounts
            WHERE platform = $2
              AND user_id = (SELECT id FROM users WHERE login = $1)
            "#,
        )
        .bind(login)
        .bind(platform.to_string())
        .execute(&self.0)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_platform_account(
        &self,
        login: &str,
        platform: Platform,
    ) -> anyhow::Result<Option<PlatformAccountRecord>> {
        let account = sqlx::query_as::<_, PlatformAccountRecord>(
            r#"
            SELECT pa.id, pa.user_id, pa.platform, pa.username, pa.profile_url, pa.last_synced
            FROM platform_accounts pa
            JOIN users u ON u.id = pa.user_id
            WHERE u.login = $1 AND pa.platform = $2
            "#,
        )
        .bind(login)
        .bind(platform.to_string())
        .fetch_optional(&self.0)
        .await?;

        Ok(account)
    }

    /// Persist one successful sync in a single transaction: overwrite the
    /// platform's counters and XP subtotal, recompute the total from a fresh
    /// sum of all subtotals, derive the level, stamp everything, and record
    /// the daily snapshot. Nothing here reads an in-memory total, so two
    /// concurrent syncs for different platforms cannot lose each other's
    /// subtotal.
    pub async fn apply_platform_sync(
        &self,
        account: &PlatformAccountRecord,
        counters: &RawCounters,
        xp: u32,
        weights: &XpWeights,
        day: NaiveDate,
    ) -> anyhow::Result<UserStatsRecord> {
        let mut tx = self.0.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO platform_stats
                (user_id, platform, repos, contributions, solved, score, rating, contests, xp, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            ON CONFLICT (user_id, platform)
            DO UPDATE SET
                repos = EXCLUDED.repos,
                contributions = EXCLUDED.contributions,
                solved = EXCLUDED.solved,
                score = EXCLUDED.score,
                rating = EXCLUDED.rating,
                contests = EXCLUDED.contests,
                xp = EXCLUDED.xp,
                updated_at = now()
            "#,
        )
        .bind(account.user_id)
        .bind(&account.platform)
        .bind(counters.repos as i32)
        .bind(counters.contributions as i32)
        .bind(counters.solved as i32)
        .bind(counters.score as i32)
        .bind(counters.rating as i32)
        .bind(counters.contests as i32)
        .bind(xp as i32)
        .execute(tx.as_mut())
        .await?;

        // Take the user row lock before summing. A concurrent sync for the
        // same user's other platform either commits first or waits here, so
        // the statement below always reads every committed subtotal.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(account.user_id)
            .execute(tx.as_mut())
            .await?;

        let total_xp = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(xp), 0)::BIGINT FROM platform_stats WHERE user_id = $1",
        )
        .bind(account.user_id)
        .fetch_one(tx.as_mut())
        .await?;

        let total_xp = total_xp.clamp(0, i64::from(i32::MAX));
        let level = weights.level_for_xp(total_xp as u32);

        let stats = sqlx::query_as::<_, UserStatsRecord>(
            r#"
            INSERT INTO user_stats (user_id, total_xp, level, last_updated)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (user_id)
            DO UPDATE SET total_xp = EXCLUDED.total_xp, level = EXCLUDED.level, last_updated = now()
            RETURNING total_xp, level, last_updated
            "#,
        )
        .bind(account.user_id)
        .bind(total_xp as i32)
        .bind(level as i32)
        .fetch_one(tx.as_mut())
        .await?;

        sqlx::query(
            r#"
            INSERT INTO daily_activity (account_id, activity_date, commits, problems_solved, xp)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (account_id, activity_date)
            DO UPDATE SET
                commits = EXCLUDED.commits,
                problems_solved = EXCLUDED.problems_solved,
                xp = EXCLUDED.xp
            "#,
        )
        .bind(account.id)
        .bind(day)
        .bind(counters.contributions as i32)
        .bind(counters.solved as i32)
        .bind(xp as i32)
        .execute(tx.as_mut())
        .await?;

        sqlx::query("UPDATE platform_accounts SET last_synced = now() WHERE id = $1")
            .bind(account.id)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;

        Ok(stats)
    }

    /// Advance the study streak for a qualifying activity on `day`.
    ///
    /// The row is locked for the duration of the transition so two
    /// same-moment events cannot double-increment. Returns `None` for an
    /// unknown user.
    pub async fn record_activity(
        &self,
        login: &str,
        day: NaiveDate,
    ) -> anyhow::Result<Option<StreakRecord>> {
        let Some(user_id) = self.user_id(login).await? else {
            return Ok(None);
        };

        let mut tx = self.0.begin().await?;
        let record = advance_streak(&mut tx, user_id, day).await?;
        tx.commit().await?;

        Ok(Some(record))
    }

    pub async fn get_user(&self, login: &str) -> anyhow::Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, (i32, String, Option<String>)>(
            "SELECT id, login, full_name FROM users WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&self.0)
        .await?;

        let Some((id, login, full_name)) = user else {
            return Ok(None);
        };

        let stats = sqlx::query_as::<_, UserStatsRecord>(
            "SELECT total_xp, level, last_updated FROM user_stats WHERE user_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.0)
        .await?;

        let platform_stats = sqlx::query_as::<_, PlatformStatRecord>(
            r#"
            SELECT platform, repos, contributions, solved, score, rating, contests, xp, updated_at
            FROM platform_stats
            WHERE user_id = $1
            ORDER BY platform
            "#,
        )
        .bind(id)
        .fetch_all(&self.0)
        .await?;

        let streak = sqlx::query_as::<_, StreakRecord>(
            r#"
            SELECT current_streak, longest_streak, last_active_date
            FROM study_streaks
            WHERE user_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.0)
        .await?
        .unwrap_or_default();

        Ok(Some(UserRecord {
            id,
            login,
            full_name,
            total_xp: stats.as_ref().map(|s| s.total_xp).unwrap_or_default(),
            level: stats.as_ref().map(|s| s.level).unwrap_or(1),
            last_updated: stats.map(|s| s.last_updated),
            platform_stats,
            streak,
        }))
    }

    pub async fn get_daily_activity(
        &self,
        login: &str,
        days: i32,
    ) -> anyhow::Result<Vec<DailyActivityRecord>> {
        let records = sqlx::query_as::<_, DailyActivityRecord>(
            r#"
            SELECT da.activity_date,
                   COALESCE(SUM(da.commits), 0)::INT AS commits,
                   COALESCE(SUM(da.problems_solved), 0)::INT AS problems_solved,
                   COALESCE(SUM(da.xp), 0)::INT AS xp
            FROM daily_activity da
            JOIN platform_accounts pa ON pa.id = da.account_id
            JOIN users u ON u.id = pa.user_id
            WHERE u.login = $1
              AND da.activity_date >= CURRENT_DATE - $2
            GROUP BY da.activity_date
            ORDER BY da.activity_date
            "#,
        )
        .bind(login)
        .bind(days)
        .fetch_all(&self.0)
        .await?;

        Ok(records)
    }

    pub async fn get_leaderboard(
        &self,
        page: i64,
        limit: i64,
    ) -> anyhow::Result<(Vec<LeaderboardRecord>, i64)> {
        let records = sqlx::query_as::<_, LeaderboardRecord>(
            r#"
            SELECT u.login,
                   u.full_name,
                   us.total_xp,
                   us.level,
                   RANK() OVER (ORDER BY us.total_xp DESC, u.login ASC) AS place,
                   now()::TIMESTAMP AS computed_at
            FROM user_stats us
            JOIN users u ON u.id = us.user_id
            ORDER BY us.total_xp DESC, u.login ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(page * limit)
        .fetch_all(&self.0)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_stats")
            .fetch_one(&self.0)
            .await?;

        Ok((records, total))
    }

    pub async fn create_task(
        &self,
        login: &str,
        task: &NewTask,
    ) -> anyhow::Result<Option<TaskRecord>> {
        let Some(user_id) = self.user_id(login).await? else {
            return Ok(None);
        };

        let record = sqlx::query_as::<_, TaskRecord>(
            r#"
            INSERT INTO tasks (user_id, title, subject, deadline, estimated_hours, difficulty, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, title, subject, deadline, estimated_hours, difficulty, completed, notes, created_at
            "#,
        )
        .bind(user_id)
        .bind(&task.title)
        .bind(&task.subject)
        .bind(task.deadline)
        .bind(task.estimated_hours)
        .bind(task.difficulty)
        .bind(&task.notes)
        .fetch_one(&self.0)
        .await?;

        Ok(Some(record))
    }

    pub async fn list_tasks(&self, login: &str) -> anyhow::Result<Vec<TaskRecord>> {
        let records = sqlx::query_as::<_, TaskRecord>(
            r#"
            SELECT t.id, t.title, t.subject, t.deadline, t.estimated_hours, t.difficulty,
                   t.completed, t.notes, t.created_at
            FROM tasks t
            JOIN users u ON u.id = t.user_id
            WHERE u.login = $1
            ORDER BY t.deadline ASC NULLS LAST, t.id ASC
            "#,
        )
        .bind(login)
        .fetch_all(&self.0)
        .await?;

        Ok(records)
    }

    /// Mark a task completed. Completing an already-completed task is a
    /// no-op so it does not feed the streak twice.
    pub async fn complete_task(&self, task_id: i32) -> anyhow::Result<Option<CompletedTask>> {
        let mut tx = self.0.begin().await?;

        let row = sqlx::query_as::<_, (String, bool)>(
            r#"
            SELECT u.login, t.completed
            FROM tasks t
            JOIN users u ON u.id = t.user_id
            WHERE t.id = $1
            FOR UPDATE OF t
            "#,
        )
        .bind(task_id)
        .fetch_optional(tx.as_mut())
        .await?;

        let Some((login, already_completed)) = row else {
            return Ok(None);
        };

        let task = sqlx::query_as::<_, TaskRecord>(
            r#"
            UPDATE tasks SET completed = TRUE
            WHERE id = $1
            RETURNING id, title, subject, deadline, estimated_hours, difficulty, completed, notes, created_at
            "#,
        )
        .bind(task_id)
        .fetch_one(tx.as_mut())
        .await?;

        tx.commit().await?;

        Ok(Some(CompletedTask {
            task,
            login,
            newly_completed: !already_completed,
        }))
    }

    /// Persist a study session and advance the streak in one transaction;
    /// either both land or neither does.
    pub async fn log_session(
        &self,
        login: &str,
        day: NaiveDate,
        minutes: i32,
        subject: Option<&str>,
    ) -> anyhow::Result<Option<(StudySessionRecord, StreakRecord)>> {
        let Some(user_id) = self.user_id(login).await? else {
            return Ok(None);
        };

        let mut tx = self.0.begin().await?;

        let record = sqlx::query_as::<_, StudySessionRecord>(
            r#"
            INSERT INTO study_sessions (user_id, session_date, minutes, subject)
            VALUES ($1, $2, $3, $4)
            RETURNING id, session_date, minutes, subject
            "#,
        )
        .bind(user_id)
        .bind(day)
        .bind(minutes)
        .bind(subject)
        .fetch_one(tx.as_mut())
        .await?;

        let streak = advance_streak(&mut tx, user_id, day).await?;

        tx.commit().await?;

        Ok(Some((record, streak)))
    }

    pub async fn statistics(&self) -> anyhow::Result<Statistics> {
        let stats = sqlx::query_as::<_, Statistics>(
            r#"
            SELECT (SELECT COUNT(*) FROM users) AS users,
                   (SELECT COUNT(*) FROM platform_accounts) AS linked_accounts,
                   (SELECT COALESCE(SUM(total_xp), 0) FROM user_stats)::BIGINT AS total_xp,
                   (SELECT COUNT(*) FROM tasks WHERE completed) AS completed_tasks
            "#,
        )
        .fetch_one(&self.0)
        .await?;

        Ok(stats)
    }
}

#[async_trait]
impl SyncStore for DB {
    async fn platform_account(
        &self,
        login: &str,
        platform: Platform,
    ) -> anyhow::Result<Option<PlatformAccountRecord>> {
        self.get_platform_account(login, platform).await
    }

    async fn apply_sync(
        &self,
        account: &PlatformAccountRecord,
        counters: &RawCounters,
        xp: u32,
        weights: &XpWeights,
        day: NaiveDate,
    ) -> anyhow::Result<UserStatsRecord> {
        self.apply_platform_sync(account, counters, xp, weights, day)
            .await
    }
}

/// Run the shared streak transition against the locked `study_streaks` row
/// inside the caller's transaction.
async fn advance_streak(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: i32,
    day: NaiveDate,
) -> anyhow::Result<StreakRecord> {
    let existing = sqlx::query_as::<_, StreakRecord>(
        r#"
        SELECT current_streak, longest_streak, last_active_date
        FROM study_streaks
        WHERE user_id = $1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(tx.as_mut())
    .await?
    .unwrap_or_default();

    let mut state = StreakState {
        current: existing.current_streak.max(0) as u32,
        longest: existing.longest_streak.max(0) as u32,
        last_active: existing.last_active_date,
    };
    state.record_activity(day);

    let record = sqlx::query_as::<_, StreakRecord>(
        r#"
        INSERT INTO study_streaks (user_id, current_streak, longest_streak, last_active_date)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id)
        DO UPDATE SET
            current_streak = EXCLUDED.current_streak,
            longest_streak = EXCLUDED.longest_streak,
            last_active_date = EXCLUDED.last_active_date
        RETURNING current_streak, longest_streak, last_active_date
        "#,
    )
    .bind(user_id)
    .bind(state.current as i32)
    .bind(state.longest as i32)
    .bind(state.last_active)
    .fetch_one(tx.as_mut())
    .await?;

    Ok(record)
}

async fn run_migrations(rocket: Rocket<Build>) -> fairing::Result {
    match DB::fetch(&rocket) {
        Some(db) => match sqlx::migrate!("./migrations").run(&**db).await {
            Ok(_) => Ok(rocket),
            Err(e) => {
                rocket::error!("Failed to initialize SQLx database: {}", e);
                Err(rocket)
            }
        },
        None => Err(rocket),
    }
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("SQLx Stage", |rocket| async {
        rocket
            .attach(DB::init())
            .attach(AdHoc::try_on_ignite("SQLx Migrations", run_migrations))
    })
}
