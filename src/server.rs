use crate::errors::{InvalidInputError, NotFoundError, PayloadTooLargeError};
use crate::state::AppState;
use crate::tools::{
    self, BulkReplaceParams, CellContextParams, FetchResultParams, SearchParams,
    SearchUploadedParams,
};
use crate::uploads::UploadedFile;
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
/// Headroom above the upload limit for multipart framing and form fields.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = match state.config().max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(
            usize::try_from(limit.saturating_add(MULTIPART_OVERHEAD_BYTES)).unwrap_or(usize::MAX),
        ),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/api/search", post(search_handler))
        .route("/api/search-files", post(search_files_handler))
        .route("/api/get-cell-details", post(cell_details_handler))
        .route("/api/search-replace", post(search_replace_handler))
        .route("/api/download-results", get(download_handler))
        .route("/api/browse-folder", post(browse_folder_handler))
        .route("/api/health", get(health_handler))
        .layer(body_limit)
        .with_state(state)
}

/// Failure of a request, rendered as `{success: false, error, ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// The operation ran and failed; status comes from the error's type.
    Operation(anyhow::Error),
    /// The request never reached an operation (malformed body, body too large, ...).
    Rejected { status: StatusCode, message: String },
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::Operation(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(error: axum::extract::multipart::MultipartError) -> Self {
        ApiError::Rejected {
            status: error.status(),
            message: error.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Rejected { status, message } => (status, error_body(message, None)),
            ApiError::Operation(error) => classify(error),
        };
        (status, Json(Value::Object(body))).into_response()
    }
}

fn error_body(message: String, suggestion: Option<&str>) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(false));
    body.insert("error".to_string(), Value::String(message));
    if let Some(suggestion) = suggestion {
        body.insert("suggestion".to_string(), Value::String(suggestion.to_string()));
    }
    body
}

fn classify(error: anyhow::Error) -> (StatusCode, Map<String, Value>) {
    if let Some(invalid) = error.downcast_ref::<InvalidInputError>() {
        let mut body = error_body(invalid.message().to_string(), invalid.suggestion());
        body.insert(
            "operation".to_string(),
            Value::String(invalid.operation().to_string()),
        );
        if let Some(field) = invalid.field() {
            body.insert("field".to_string(), Value::String(field.to_string()));
        }
        return (StatusCode::BAD_REQUEST, body);
    }

    if let Some(too_large) = error.downcast_ref::<PayloadTooLargeError>() {
        let mut body = error_body(
            too_large.to_string(),
            Some("upload fewer or smaller files"),
        );
        body.insert("limit_bytes".to_string(), json!(too_large.limit));
        return (StatusCode::PAYLOAD_TOO_LARGE, body);
    }

    if let Some(not_found) = error.downcast_ref::<NotFoundError>() {
        let mut body = error_body(not_found.message().to_string(), not_found.suggestion());
        for (key, value) in not_found.details() {
            body.entry(key.clone()).or_insert_with(|| value.clone());
        }
        return (StatusCode::NOT_FOUND, body);
    }

    tracing::error!("request failed: {error:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_body(format!("{error:#}"), None),
    )
}

/// Serialize `value` and mark it as a success payload.
fn success<T: Serialize>(value: &T) -> Result<Json<Value>, ApiError> {
    let mut body = match serde_json::to_value(value).map_err(anyhow::Error::from)? {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    body.insert("success".to_string(), Value::Bool(true));
    Ok(Json(Value::Object(body)))
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchParams>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(params) = payload?;
    let response = tools::search(state, params).await?;
    success(&response)
}

async fn search_files_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut keywords_raw: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "keywords" {
            keywords_raw = Some(field.text().await?);
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        files.push(UploadedFile::new(file_name, bytes.to_vec()));
    }

    let keywords = parse_keywords_field(keywords_raw.as_deref())?;
    let response = tools::search_uploaded(state, SearchUploadedParams { files, keywords }).await?;
    success(&response)
}

/// The `keywords` form field holds a JSON array of strings.
fn parse_keywords_field(raw: Option<&str>) -> anyhow::Result<Vec<String>> {
    let raw = raw.unwrap_or("[]");
    serde_json::from_str::<Vec<String>>(raw).map_err(|e| {
        InvalidInputError::new("search_uploaded", format!("keywords must be a JSON array of strings: {e}"))
            .with_field("keywords")
            .into()
    })
}

async fn cell_details_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CellContextParams>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(params) = payload?;
    let response = tools::get_cell_context(state, params).await?;
    success(&response)
}

async fn search_replace_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BulkReplaceParams>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(params) = payload?;
    let response = tools::bulk_search_replace(state, params).await?;
    success(&response)
}

async fn download_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FetchResultParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query?;
    let artifact = tools::fetch_result_artifact(state, params).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        artifact.file_name.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}

async fn browse_folder_handler(State(state): State<Arc<AppState>>) -> Json<tools::DefaultFolderResponse> {
    Json(tools::default_search_folder(&state))
}

async fn health_handler() -> Json<crate::model::HealthResponse> {
    Json(tools::health())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn keywords_field_must_be_a_json_array() {
        assert_eq!(
            parse_keywords_field(Some(r#"["a","b"]"#)).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        let err = parse_keywords_field(Some("a,b")).unwrap_err();
        assert_matches!(err.downcast_ref::<InvalidInputError>(), Some(_));
        assert!(parse_keywords_field(None).unwrap().is_empty());
    }

    #[test]
    fn invalid_input_reports_field_and_operation() {
        let error: anyhow::Error = InvalidInputError::new("search", "no keywords given")
            .with_field("keywords")
            .into();
        let (status, body) = classify(error);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["operation"], "search");
        assert_eq!(body["field"], "keywords");
        assert_eq!(body["error"], "no keywords given");
    }

    #[test]
    fn not_found_details_are_flattened() {
        let error: anyhow::Error = NotFoundError::new("gone")
            .with_detail("available_files", vec!["a.xlsx"])
            .into();
        let (status, body) = classify(error);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["available_files"][0], "a.xlsx");
    }

    #[test]
    fn unexpected_errors_are_internal() {
        let (status, body) = classify(anyhow::anyhow!("disk on fire"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "disk on fire");
    }
}
