use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    app::AppState,
    db::models::Comment,
    error::{AppError, Result},
    middleware::auth::SessionUser,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/comments", post(create_comment))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub user_email: String,
    pub task_id: i64,
    pub timestamp: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            user_email: comment.user_email,
            task_id: comment.task_id,
            timestamp: comment.timestamp.to_rfc3339(),
        }
    }
}

/// Any authenticated user may comment on any task. The author email comes
/// from the session and is not re-checked against the users table.
async fn create_comment(
    State(state): State<AppState>,
    user: SessionUser,
    Path(task_id): Path<i64>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<Json<CommentResponse>> {
    if body.content.trim().is_empty() {
        return Err(AppError::Validation("Comment content is required".to_string()));
    }

    let mut tx = state.db.pool.begin().await?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks WHERE id = ?")
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        return Err(AppError::NotFound("Task not found".to_string()));
    }

    let timestamp = Utc::now();
    let result =
        sqlx::query("INSERT INTO comments (content, user_email, task_id, timestamp) VALUES (?, ?, ?, ?)")
            .bind(&body.content)
            .bind(&user.email)
            .bind(task_id)
            .bind(timestamp)
            .execute(&mut *tx)
            .await?;

    tx.commit().await?;

    Ok(Json(CommentResponse {
        id: result.last_insert_rowid(),
        content: body.content,
        user_email: user.email,
        task_id,
        timestamp: timestamp.to_rfc3339(),
    }))
}
