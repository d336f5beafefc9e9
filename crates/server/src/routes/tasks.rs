use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    app::AppState,
    db::models::{Comment, Role, Task},
    error::{AppError, Result},
    middleware::auth::{require_admin, SessionUser},
    routes::comments::CommentResponse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_task))
        .route("/:id", get(task_detail))
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to_email: String,
    /// Submitted as free text and coerced to an integer.
    pub project_id: String,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub project_id: Option<i64>,
    pub assigned_to_email: Option<String>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            project_id: task.project_id,
            assigned_to_email: task.assigned_to_email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
}

#[derive(Debug, Serialize)]
pub struct TaskDetailResponse {
    pub task: TaskResponse,
    pub comments: Vec<CommentResponse>,
}

async fn create_task(
    State(state): State<AppState>,
    user: SessionUser,
    Json(body): Json<CreateTaskRequest>,
) -> Result<Json<TaskResponse>> {
    require_admin(&user)?;

    if body.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }

    let project_id: i64 = body
        .project_id
        .trim()
        .parse()
        .map_err(|_| AppError::Validation("Project id must be an integer".to_string()))?;

    let mut tx = state.db.pool.begin().await?;

    // The assignee must exist; the project id is not checked here and a
    // bad one surfaces as a foreign-key error from the insert.
    let assignee = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE email = ?")
        .bind(&body.assigned_to_email)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignee does not exist".to_string()))?;

    let result = sqlx::query(
        "INSERT INTO tasks (title, description, project_id, assigned_to_email) VALUES (?, ?, ?, ?)",
    )
    .bind(&body.title)
    .bind(&body.description)
    .bind(project_id)
    .bind(&assignee)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(TaskResponse {
        id: result.last_insert_rowid(),
        title: body.title,
        description: body.description,
        status: "Pending".to_string(),
        project_id: Some(project_id),
        assigned_to_email: Some(assignee),
    }))
}

/// Role-filtered task listing: admins see every task, members only the
/// tasks assigned to their own email.
pub async fn dashboard(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Json<TaskListResponse>> {
    let tasks = match user.role {
        Role::Admin => {
            sqlx::query_as::<_, Task>(
                "SELECT id, title, description, status, project_id, assigned_to_email FROM tasks",
            )
            .fetch_all(&state.db.pool)
            .await?
        }
        Role::Member => {
            sqlx::query_as::<_, Task>(
                "SELECT id, title, description, status, project_id, assigned_to_email FROM tasks WHERE assigned_to_email = ?",
            )
            .bind(&user.email)
            .fetch_all(&state.db.pool)
            .await?
        }
    };

    Ok(Json(TaskListResponse {
        tasks: tasks.into_iter().map(TaskResponse::from).collect(),
    }))
}

async fn task_detail(
    State(state): State<AppState>,
    _user: SessionUser,
    Path(id): Path<i64>,
) -> Result<Json<TaskDetailResponse>> {
    let task = sqlx::query_as::<_, Task>(
        "SELECT id, title, description, status, project_id, assigned_to_email FROM tasks WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    let comments = sqlx::query_as::<_, Comment>(
        "SELECT id, content, user_email, task_id, timestamp FROM comments WHERE task_id = ?",
    )
    .bind(id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(TaskDetailResponse {
        task: task.into(),
        comments: comments.into_iter().map(CommentResponse::from).collect(),
    }))
}
