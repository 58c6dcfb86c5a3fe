//! File and folder handlers for Web API.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::UploadRequest;
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, ListQuery, NodeResponse, RenameRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Generate a safe Content-Disposition header value for inline display.
///
/// Control characters (including CR and LF) are dropped, and double quotes
/// and backslashes are replaced, so the name cannot inject headers. Non-ASCII
/// names additionally get an RFC 5987 `filename*` parameter.
pub fn content_disposition_header(filename: &str) -> String {
    let needs_encoding = !filename.is_ascii()
        || filename
            .chars()
            .any(|c| c.is_control() || c == '"' || c == '\\');

    if !needs_encoding {
        return format!("inline; filename=\"{}\"", filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("Upload exceeds the size limit");
    }
    tracing::debug!("Failed to read multipart field: {}", e);
    ApiError::bad_request("Invalid multipart data")
}

fn parse_parent_id(raw: &str) -> Result<Option<i64>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| ApiError::bad_request("parent_id must be an integer"))
}

/// POST /api/folders - Create a folder.
#[utoipa::path(
    post,
    path = "/api/folders",
    tag = "folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = NodeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Parent belongs to another owner"),
        (status = 404, description = "Parent folder not found"),
        (status = 409, description = "Folder already exists"),
        (status = 422, description = "Validation error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<NodeResponse>>), ApiError> {
    let folder = state
        .files
        .create_folder(auth.owner_id(), &req.name, req.parent_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(NodeResponse::from(folder))),
    ))
}

/// POST /api/files - Upload a file.
///
/// Request body: multipart/form-data with a "file" field and an optional
/// "parent_id" field.
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 201, description = "File uploaded", body = NodeResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Parent belongs to another owner"),
        (status = 404, description = "Parent folder not found"),
        (status = 413, description = "File too large")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<NodeResponse>>), ApiError> {
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;
    let mut parent_id: Option<i64> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                content_type = field.content_type().map(|s| s.to_string());
                content = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
            }
            "parent_id" => {
                let raw = field.text().await.map_err(multipart_error)?;
                parent_id = parse_parent_id(&raw)?;
            }
            _ => {}
        }
    }

    let content = content.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let filename = filename.ok_or_else(|| ApiError::bad_request("File name is required"))?;

    let mut request = UploadRequest::new(filename, content).with_parent(parent_id);
    if let Some(ct) = content_type {
        request = request.with_content_type(ct);
    }

    let file = state.files.upload_file(auth.owner_id(), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(NodeResponse::from(file))),
    ))
}

/// GET /api/nodes - List the children of a folder (root when no parent_id).
#[utoipa::path(
    get,
    path = "/api/nodes",
    tag = "nodes",
    params(
        ("parent_id" = Option<i64>, Query, description = "Folder to list; omit for the root")
    ),
    responses(
        (status = 200, description = "Direct children", body = Vec<NodeResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Folder belongs to another owner"),
        (status = 404, description = "Folder not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_children(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<NodeResponse>>>, ApiError> {
    let nodes = state
        .files
        .list_children(auth.owner_id(), query.parent_id)
        .await?;

    Ok(Json(ApiResponse::new(
        nodes.into_iter().map(NodeResponse::from).collect(),
    )))
}

/// GET /api/nodes/all - List every node of the caller.
#[utoipa::path(
    get,
    path = "/api/nodes/all",
    tag = "nodes",
    responses(
        (status = 200, description = "All nodes owned by the caller", body = Vec<NodeResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_all(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<NodeResponse>>>, ApiError> {
    let nodes = state.files.list_all(auth.owner_id()).await?;

    Ok(Json(ApiResponse::new(
        nodes.into_iter().map(NodeResponse::from).collect(),
    )))
}

/// GET /api/nodes/:id - Get node metadata.
#[utoipa::path(
    get,
    path = "/api/nodes/{id}",
    tag = "nodes",
    params(
        ("id" = i64, Path, description = "Node ID")
    ),
    responses(
        (status = 200, description = "Node metadata", body = NodeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Node belongs to another owner"),
        (status = 404, description = "Node not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_node(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(node_id): Path<i64>,
) -> Result<Json<ApiResponse<NodeResponse>>, ApiError> {
    let node = state.files.get_node(auth.owner_id(), node_id).await?;

    Ok(Json(ApiResponse::new(NodeResponse::from(node))))
}

/// PATCH /api/nodes/:id - Rename a node.
#[utoipa::path(
    patch,
    path = "/api/nodes/{id}",
    tag = "nodes",
    params(
        ("id" = i64, Path, description = "Node ID")
    ),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Node renamed", body = NodeResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Node belongs to another owner"),
        (status = 404, description = "Node not found"),
        (status = 409, description = "A sibling folder already has that name"),
        (status = 422, description = "Validation error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn rename_node(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(node_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RenameRequest>,
) -> Result<Json<ApiResponse<NodeResponse>>, ApiError> {
    let node = state
        .files
        .rename(auth.owner_id(), node_id, &req.new_name)
        .await?;

    Ok(Json(ApiResponse::new(NodeResponse::from(node))))
}

/// DELETE /api/nodes/:id - Delete a file or an empty folder.
#[utoipa::path(
    delete,
    path = "/api/nodes/{id}",
    tag = "nodes",
    params(
        ("id" = i64, Path, description = "Node ID")
    ),
    responses(
        (status = 204, description = "Node deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Node belongs to another owner"),
        (status = 404, description = "Node not found"),
        (status = 409, description = "Folder is not empty")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_node(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(node_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.files.delete(auth.owner_id(), node_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/nodes/:id/content - Stream a file's bytes for inline display.
#[utoipa::path(
    get,
    path = "/api/nodes/{id}/content",
    tag = "nodes",
    params(
        ("id" = i64, Path, description = "File node ID")
    ),
    responses(
        (status = 200, description = "File content with its recorded content type"),
        (status = 400, description = "Node is a folder"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Node belongs to another owner"),
        (status = 404, description = "File or content not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn fetch_content(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(node_id): Path<i64>,
) -> Result<Response, ApiError> {
    let file = state.files.fetch_content(auth.owner_id(), node_id).await?;

    let content_type = file.content_type().into_owned();
    let disposition = content_disposition_header(file.name());
    let content_length = file.content.len();

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, content_length)
        .body(Body::from(file.content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}
