use rocket::{http::Status, serde::json::Json, State};
use shared::XpWeights;
use studytrack_server::{
    api::Connectors,
    db::DB,
    sync::{self, SyncError},
};

use super::types::{
    parse_platform, ApiError, LinkAccountRequest, PlatformAccountResponse, SyncResponse,
};

#[post("/<login>/<platform>", data = "<request>")]
async fn link_account(
    login: &str,
    platform: &str,
    request: Json<LinkAccountRequest>,
    db: &State<DB>,
) -> Result<Json<PlatformAccountResponse>, ApiError> {
    let platform = parse_platform(platform)?;
    let username = request.username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("username must not be empty"));
    }

    let account = db.link_account(login, platform, username).await.map_err(|e| {
        rocket::error!("Failed to link {platform} account for {login}: {e}");
        ApiError::internal()
    })?;

    Ok(Json(account.into()))
}

#[delete("/<login>/<platform>")]
async fn disconnect_account(
    login: &str,
    platform: &str,
    db: &State<DB>,
) -> Result<Status, ApiError> {
    let platform = parse_platform(platform)?;

    let removed = db.disconnect_account(login, platform).await.map_err(|e| {
        rocket::error!("Failed to disconnect {platform} account for {login}: {e}");
        ApiError::internal()
    })?;

    if removed {
        Ok(Status::NoContent)
    } else {
        Err(ApiError::not_found(format!(
            "no {platform} account linked; link one first"
        )))
    }
}

#[utoipa::path(context_path = "/api/platforms", responses(
    (status = 200, description = "Sync one linked platform account", body = SyncResponse)
))]
#[post("/<login>/<platform>/sync")]
async fn sync_account(
    login: &str,
    platform: &str,
    db: &State<DB>,
    connectors: &State<Connectors>,
    weights: &State<XpWeights>,
) -> Result<Json<SyncResponse>, ApiError> {
    let platform = parse_platform(platform)?;
    let today = chrono::Utc::now().date_naive();

    let outcome = sync::sync_platform(
        db.inner(),
        connectors.get(platform),
        login,
        platform,
        weights.inner(),
        today,
    )
    .await
    .map_err(|e| {
        match &e {
            SyncError::NotLinked { .. } => {}
            SyncError::Connector(inner) => {
                rocket::warn!("Sync of {platform} for {login} failed: {inner}")
            }
            SyncError::Storage(inner) => {
                rocket::error!("Failed to persist {platform} sync for {login}: {inner}")
            }
        }
        ApiError::from(e)
    })?;

    Ok(Json(outcome.into()))
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing platform entrypoints", |rocket| async {
        rocket.mount(
            "/api/platforms",
            rocket::routes![link_account, disconnect_account, sync_account],
        )
    })
}
