//! GET /files/:key - serve stored uploads.

use axum::{
    extract::{Extension, Path},
    http::header,
    response::IntoResponse,
};

use crate::server::app::AppState;
use crate::server::routes::ApiError;

pub async fn file_handler(
    Extension(state): Extension<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.files.get(&key).await?;
    let mime = mime_guess::from_path(&key).first_or_octet_stream();

    Ok((
        [
            (header::CONTENT_TYPE, mime.essence_str().to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        bytes,
    ))
}
