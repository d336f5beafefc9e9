use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    app::AppState,
    db::models::Project,
    error::{AppError, Result},
    middleware::auth::{require_admin, SessionUser},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_project))
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            title: project.title,
            description: project.description,
            created_at: project.created_at.to_rfc3339(),
        }
    }
}

async fn create_project(
    State(state): State<AppState>,
    user: SessionUser,
    Json(body): Json<CreateProjectRequest>,
) -> Result<Json<ProjectResponse>> {
    require_admin(&user)?;

    if body.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }

    // Titles are not unique; every submission creates a new project.
    let created_at = Utc::now();
    let mut tx = state.db.pool.begin().await?;
    let result = sqlx::query("INSERT INTO projects (title, description, created_at) VALUES (?, ?, ?)")
        .bind(&body.title)
        .bind(&body.description)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let project = Project {
        id: result.last_insert_rowid(),
        title: body.title,
        description: body.description,
        created_at,
    };

    Ok(Json(project.into()))
}
