use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, Query, State},
    Json,
};
use contracts::shared::api_response::ApiResponse;
use contracts::system::auth::{
    TokenClaims, PERM_IMPORTS_EXECUTE, PERM_IMPORTS_HISTORY, PERM_IMPORTS_ROLLBACK,
};
use contracts::usecases::u501_file_import::{
    ColumnMappingRequest, ConfirmImportRequest, DeactivateResponse, ImportPreviewResponse,
    ImportResultDto, ImportSessionDto, ImportStatusResponse, ImportTemplate, TemplatesQuery,
    UndoResponse, UploadQuery,
};

use crate::routes::AppState;
use crate::system::auth::extractor::CurrentUser;
use crate::usecases::u501_file_import::{ImportError, ImportResult};

type ApiResult<T> = ImportResult<Json<ApiResponse<T>>>;

fn require(claims: &TokenClaims, permission: &str) -> ImportResult<()> {
    if claims.has_permission(permission) {
        Ok(())
    } else {
        Err(ImportError::forbidden(format!("Missing permission: {}", permission)))
    }
}

/// GET /api/imports/templates?entityType=
pub async fn list_templates(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Query(query): Query<TemplatesQuery>,
) -> ApiResult<Vec<ImportTemplate>> {
    require(&claims, PERM_IMPORTS_EXECUTE)?;
    let items = state
        .import
        .list_templates(query.entity_type.as_deref(), &claims)?;
    Ok(Json(ApiResponse::ok(items)))
}

/// GET /api/imports/templates/:id
pub async fn get_template(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(id): Path<i32>,
) -> ApiResult<ImportTemplate> {
    require(&claims, PERM_IMPORTS_EXECUTE)?;
    let template = state.import.get_template(id, &claims)?;
    Ok(Json(ApiResponse::ok(template)))
}

/// POST /api/imports/upload?templateId= (multipart, поле `file`)
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> ApiResult<ImportPreviewResponse> {
    require(&claims, PERM_IMPORTS_EXECUTE)?;

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImportError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ImportError::bad_request(format!("Failed to read upload: {}", e)))?;
        file = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) = file.ok_or_else(|| ImportError::bad_request("No file uploaded"))?;
    if bytes.is_empty() {
        return Err(ImportError::bad_request("Uploaded file is empty"));
    }

    let preview = state
        .import
        .upload(&file_name, &bytes, query.template_id, &claims)
        .await?;
    Ok(Json(ApiResponse::ok(preview)))
}

/// POST /api/imports/:upload_id/mappings
pub async fn configure_mappings(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(upload_id): Path<String>,
    request: Result<Json<ColumnMappingRequest>, JsonRejection>,
) -> ApiResult<ImportStatusResponse> {
    require(&claims, PERM_IMPORTS_EXECUTE)?;
    let Json(request) = request.map_err(|e| ImportError::bad_request(e.body_text()))?;
    let status = state.import.configure_mappings(&upload_id, request).await?;
    let message = if status.errors.is_empty() {
        "Mappings saved".to_string()
    } else {
        format!("Mappings saved with {} validation issue(s)", status.errors.len())
    };
    Ok(Json(ApiResponse::ok_with_message(status, message)))
}

/// POST /api/imports/:upload_id/confirm
pub async fn confirm(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(upload_id): Path<String>,
    request: Option<Json<ConfirmImportRequest>>,
) -> ApiResult<ImportResultDto> {
    require(&claims, PERM_IMPORTS_EXECUTE)?;
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let result = state.import.confirm(&upload_id, request).await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/imports/:upload_id/status
pub async fn status(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(upload_id): Path<String>,
) -> ApiResult<ImportStatusResponse> {
    require(&claims, PERM_IMPORTS_EXECUTE)?;
    Ok(Json(ApiResponse::ok(state.import.status(&upload_id).await?)))
}

/// DELETE /api/imports/:upload_id
pub async fn delete_by_upload(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(upload_id): Path<String>,
) -> ApiResult<DeactivateResponse> {
    require(&claims, PERM_IMPORTS_ROLLBACK)?;
    let result = state.import.delete_by_upload(&upload_id).await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/imports/sessions
pub async fn sessions(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> ApiResult<Vec<ImportSessionDto>> {
    require(&claims, PERM_IMPORTS_HISTORY)?;
    Ok(Json(ApiResponse::ok(state.import.sessions().await?)))
}

/// GET /api/imports/history
pub async fn history(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> ApiResult<Vec<ImportSessionDto>> {
    require(&claims, PERM_IMPORTS_HISTORY)?;
    Ok(Json(ApiResponse::ok(state.import.history().await?)))
}

/// DELETE /api/imports/:upload_id/undo (принимает также числовой id сессии)
pub async fn undo(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
    Path(key): Path<String>,
) -> ApiResult<UndoResponse> {
    require(&claims, PERM_IMPORTS_ROLLBACK)?;
    let result = state.import.undo(&key).await?;
    Ok(Json(ApiResponse::ok_with_message(result, "Import undone")))
}
