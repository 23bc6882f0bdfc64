use rocket::{serde::json::Json, State};
use studytrack_server::db::DB;

use super::types::{ActivityDayResponse, ApiError, UserProfile};

#[utoipa::path(context_path = "/api/users", responses(
    (status = 200, description = "Get a user's stats, per-platform subtotals and streak", body = UserProfile)
))]
#[get("/<login>")]
async fn get_user(login: &str, db: &State<DB>) -> Result<Json<UserProfile>, ApiError> {
    let user = db
        .get_user(login)
        .await
        .map_err(|e| {
            rocket::error!("Failed to get user {login}: {e}");
            ApiError::internal()
        })?
        .ok_or_else(|| ApiError::not_found(format!("unknown user '{login}'")))?;

    Ok(Json(user.into()))
}

#[get("/<login>/activity?<days>")]
async fn get_activity(
    login: &str,
    days: Option<i32>,
    db: &State<DB>,
) -> Result<Json<Vec<ActivityDayResponse>>, ApiError> {
    let days = days.unwrap_or(365).clamp(1, 3650);
    let records = db.get_daily_activity(login, days).await.map_err(|e| {
        rocket::error!("Failed to get daily activity for {login}: {e}");
        ApiError::internal()
    })?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing user entrypoints", |rocket| async {
        rocket.mount("/api/users", rocket::routes![get_user, get_activity])
    })
}
