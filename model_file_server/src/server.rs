use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{
        Path, State,
        path::ErrorKind as PathErrorKind,
        rejection::PathRejection,
    },
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::{catalog::ModelCatalog, error::ServiceError};

pub const STATUS_MESSAGE: &str = "Model Server Running";

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ModelCatalog>,
}

#[derive(Serialize)]
struct StatusResponse {
    message: &'static str,
}

pub fn build_router(catalog: Arc<ModelCatalog>) -> Router {
    let state = AppState { catalog };

    Router::new()
        .route("/", get(status))
        .route("/download/:filename", get(download))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: STATUS_MESSAGE,
    })
}

async fn download(
    State(state): State<AppState>,
    uri: Uri,
    filename: Result<Path<String>, PathRejection>,
) -> Result<Response, ServiceError> {
    let filename = match filename {
        Ok(Path(filename)) => filename,
        Err(rejection) => {
            let err = rejected_filename(&uri, rejection);
            warn!(error = %err, path = %uri.path(), "rejected download path");
            return Err(err);
        }
    };

    let artifact = state.catalog.open(&filename).await.map_err(|err| {
        match &err {
            ServiceError::NotAllowed(name) => warn!(%name, "rejected download of unlisted file"),
            ServiceError::Missing(name) => warn!(
                %name,
                dir = %state.catalog.base_dir().display(),
                "allow-listed file missing on disk"
            ),
            other => error!(%filename, error = %other, "failed to open artifact"),
        }
        err
    })?;

    debug!(
        name = %artifact.name,
        size_bytes = artifact.size_bytes,
        path = %artifact.path.display(),
        "streaming artifact"
    );

    // Dropping the body on client disconnect closes the file.
    let body = Body::from_stream(ReaderStream::new(artifact.file));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, artifact.size_bytes.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&artifact.name)),
        ],
        body,
    )
        .into_response())
}

/// A segment that does not decode to UTF-8 can never match an allow-listed
/// name, so it gets the same 404 as any other unlisted name.
fn rejected_filename(uri: &Uri, rejection: PathRejection) -> ServiceError {
    match &rejection {
        PathRejection::FailedToDeserializePathParams(inner)
            if matches!(inner.kind(), PathErrorKind::InvalidUtf8InPathParam { .. }) =>
        {
            let raw = uri.path().rsplit('/').next().unwrap_or_default();
            let decoded = urlencoding::decode_binary(raw.as_bytes());
            ServiceError::NotAllowed(String::from_utf8_lossy(&decoded).into_owned())
        }
        _ => ServiceError::BadRequest(rejection.body_text()),
    }
}

/// Non-ASCII names use the RFC 5987 `filename*` form.
fn content_disposition(filename: &str) -> String {
    if filename.is_ascii() {
        let safe_filename = filename.replace('"', "'");
        format!("attachment; filename=\"{safe_filename}\"")
    } else {
        format!(
            "attachment; filename*=utf-8''{}",
            urlencoding::encode(filename)
        )
    }
}
