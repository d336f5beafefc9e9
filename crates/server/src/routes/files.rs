use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::{
    app::AppState,
    db::models::StoredFile,
    error::{AppError, Result},
    middleware::auth::SessionUser,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/upload", post(upload_file))
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: i64,
    pub filename: String,
    pub task_id: i64,
}

impl From<StoredFile> for FileResponse {
    fn from(file: StoredFile) -> Self {
        Self {
            id: file.id,
            filename: file.filename,
            task_id: file.task_id,
        }
    }
}

/// Attaches one uploaded file to a task. The filename is stored as the
/// client sent it and a same-named upload overwrites the previous blob;
/// the task id is not checked, so the metadata row may dangle.
async fn upload_file(
    State(state): State<AppState>,
    _user: SessionUser,
    Path(task_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<FileResponse>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        let filename = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file {filename}: {e}")))?;

        upload = Some((filename, data));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::Validation("A file field is required".to_string()))?;

    let mut tx = state.db.pool.begin().await?;
    let result = sqlx::query("INSERT INTO files (filename, task_id) VALUES (?, ?)")
        .bind(&filename)
        .bind(task_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    state.blobs.save(&filename, &data).await?;

    let file = StoredFile {
        id: result.last_insert_rowid(),
        filename,
        task_id,
    };

    Ok(Json(file.into()))
}

/// Serves raw blob bytes by client-supplied filename. Public by design.
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse> {
    let bytes = state.blobs.read(&filename).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}
