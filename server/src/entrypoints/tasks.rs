use rocket::{serde::json::Json, State};
use studytrack_server::db::{NewTask, DB};

use super::types::{
    ApiError, CompleteTaskResponse, LogSessionRequest, NewTaskRequest, SessionResponse,
    TaskResponse,
};

#[post("/users/<login>/tasks", data = "<request>")]
async fn create_task(
    login: &str,
    request: Json<NewTaskRequest>,
    db: &State<DB>,
) -> Result<Json<TaskResponse>, ApiError> {
    let request = request.into_inner();
    if request.title.trim().is_empty() {
        return Err(ApiError::bad_request("task title must not be empty"));
    }
    if !(1..=5).contains(&request.difficulty) {
        return Err(ApiError::bad_request("difficulty must be between 1 and 5"));
    }

    let task = NewTask {
        title: request.title,
        subject: request.subject,
        deadline: request.deadline,
        estimated_hours: request.estimated_hours,
        difficulty: request.difficulty,
        notes: request.notes,
    };

    let record = db
        .create_task(login, &task)
        .await
        .map_err(|e| {
            rocket::error!("Failed to create task for {login}: {e}");
            ApiError::internal()
        })?
        .ok_or_else(|| ApiError::not_found(format!("unknown user '{login}'")))?;

    Ok(Json(record.into()))
}

#[get("/users/<login>/tasks")]
async fn list_tasks(login: &str, db: &State<DB>) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let records = db.list_tasks(login).await.map_err(|e| {
        rocket::error!("Failed to list tasks for {login}: {e}");
        ApiError::internal()
    })?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Completing a task is a qualifying activity: the first completion of the
/// day advances the streak through the same shared path session logging
/// uses.
#[post("/tasks/<id>/complete")]
async fn complete_task(id: i32, db: &State<DB>) -> Result<Json<CompleteTaskResponse>, ApiError> {
    let completed = db
        .complete_task(id)
        .await
        .map_err(|e| {
            rocket::error!("Failed to complete task {id}: {e}");
            ApiError::internal()
        })?
        .ok_or_else(|| ApiError::not_found(format!("unknown task {id}")))?;

    let today = chrono::Utc::now().date_naive();
    let streak = if completed.newly_completed {
        db.record_activity(&completed.login, today)
            .await
            .map_err(|e| {
                rocket::error!("Failed to record activity for {}: {e}", completed.login);
                ApiError::internal()
            })?
            .unwrap_or_default()
    } else {
        db.get_user(&completed.login)
            .await
            .map_err(|e| {
                rocket::error!("Failed to get user {}: {e}", completed.login);
                ApiError::internal()
            })?
            .map(|user| user.streak)
            .unwrap_or_default()
    };

    Ok(Json(CompleteTaskResponse {
        task: completed.task.into(),
        newly_completed: completed.newly_completed,
        streak: streak.into(),
    }))
}

#[post("/users/<login>/sessions", data = "<request>")]
async fn log_session(
    login: &str,
    request: Json<LogSessionRequest>,
    db: &State<DB>,
) -> Result<Json<SessionResponse>, ApiError> {
    let request = request.into_inner();
    if request.minutes <= 0 {
        return Err(ApiError::bad_request("minutes must be positive"));
    }

    let today = chrono::Utc::now().date_naive();
    let day = request.date.unwrap_or(today);
    if day > today {
        return Err(ApiError::bad_request("session date must not be in the future"));
    }

    let (session, streak) = db
        .log_session(login, day, request.minutes, request.subject.as_deref())
        .await
        .map_err(|e| {
            rocket::error!("Failed to log study session for {login}: {e}");
            ApiError::internal()
        })?
        .ok_or_else(|| ApiError::not_found(format!("unknown user '{login}'")))?;

    Ok(Json(SessionResponse::new(session, streak)))
}

pub fn stage() -> rocket::fairing::AdHoc {
    rocket::fairing::AdHoc::on_ignite("Installing task entrypoints", |rocket| async {
        rocket.mount(
            "/api",
            rocket::routes![create_task, list_tasks, complete_task, log_session],
        )
    })
}
