use rocket::{serde::json::Json, State};
use studytrack_server::db::DB;

use super::types::{ApiError, LeaderboardResponse, PaginatedResponse, StatisticsResponse};

#[utoipa::path(context_path = "/api", responses(
    (status = 200, description = "Get the XP leaderboard", body = PaginatedLeaderboardResponse)
))]
#[get("/leaderboard?<page>&<limit>")]
async fn get_leaderboard(
    page: Option<u64>,
    limit: Option<u64>,
    db: &State<DB>,
) -> Result<Json<PaginatedResponse<LeaderboardResponse>>, ApiError> {
    let page = page.unwrap_or(0);
    let limit = limit.unwrap_or(50).clamp(1, 100);

    let (records, total) = db
        .get_leaderboard(page as i64, limit as i64)
        .await
        .map_err(|e| {
            rocket::error!("Failed to get leaderboard: {e}");
            ApiError::internal()
        })?;

    Ok(Json(PaginatedResponse::new(
        records.into_iter().map(Into::into).collect(),
        page + 1,
        limit,
        total.max(0) as u64,
    )))
}

#[utoipa::path(context_path = "/api", responses(
    (status = 200, description = "Get global statistics", body = StatisticsResponse)
))]
#[get("/statistics")]
async fn get_statistics(db: &State<DB>) -> Result<Json<StatisticsResponse>, ApiError> {
    let stats = db.statistics().await.map_err(|e| {
        rocket::error!("Failed to get statistics: {e}");
        ApiError::internal()
    })?;

    Ok(Json(stats.into()))
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing leaderboard entrypoints", |rocket| async {
        rocket.mount("/api", rocket::routes![get_leaderboard, get_statistics])
    })
}
