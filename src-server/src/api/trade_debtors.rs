//! Trade debtor account management endpoints.
//!
//! All write endpoints accept multipart forms so structured payloads and
//! document uploads arrive in one request. Files are stored before the
//! payload is validated; any failure after that point triggers best-effort
//! cleanup of the files stored for this request.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use debtorbook_core::constants::MIN_SEARCH_TERM_LEN;
use debtorbook_core::errors::{Error as CoreError, ValidationError};
use debtorbook_core::storage::FileStorage;
use debtorbook_core::trade_debtors::{
    attach_create_uploads, attach_update_uploads, classify_uploads, normalize_structured_fields,
    unclassified_upload_keys, DebtorStatus, DocumentDirectives, ListFilters, NewTradeDebtor,
    ParseMode, SortOrder, TradeDebtorUpdate, UploadTarget,
};

use crate::auth::AdminIdentity;
use crate::error::ApiResult;
use crate::main_lib::AppState;
use crate::models::{
    BulkItemResult, BulkResponse, CreateResponse, DataResponse, FilesManagement,
    HardDeleteResponse, ListResponse, UpdateResponse,
};
use crate::uploads::read_multipart;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trade-debtors", get(list_trade_debtors).post(create_trade_debtor))
        .route("/trade-debtors/active", get(get_active_trade_debtors))
        .route("/trade-debtors/search", get(search_trade_debtors))
        .route("/trade-debtors/statistics", get(get_statistics))
        .route("/trade-debtors/bulk/status", post(bulk_update_status))
        .route("/trade-debtors/bulk/delete", post(bulk_soft_delete))
        .route(
            "/trade-debtors/{id}",
            get(get_trade_debtor)
                .put(update_trade_debtor)
                .patch(update_trade_debtor)
                .delete(soft_delete_trade_debtor),
        )
        .route("/trade-debtors/{id}/hard", delete(hard_delete_trade_debtor))
        .route("/trade-debtors/{id}/toggle-status", patch(toggle_trade_debtor_status))
}

/// Rejects blank path ids so downstream lookups never see an empty key.
fn require_id(id: &str) -> ApiResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CoreError::Validation(ValidationError::MissingId).into());
    }
    Ok(id)
}

/// Deletes the files stored for a failed request. Cleanup is best effort;
/// the original error is what the client sees.
async fn cleanup_uploads(storage: &dyn FileStorage, keys: &[String]) {
    if keys.is_empty() {
        return;
    }
    let outcome = storage.delete_many(keys).await;
    if !outcome.failed.is_empty() {
        tracing::warn!(
            "Failed to clean up {} of {} uploaded file(s) after request failure",
            outcome.failed.len(),
            keys.len()
        );
    }
}

async fn create_trade_debtor(
    State(state): State<Arc<AppState>>,
    AdminIdentity(actor): AdminIdentity,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let intake = read_multipart(multipart, state.storage.as_ref()).await?;
    let uploaded_keys = intake.stored_keys();
    let stray_keys = unclassified_upload_keys(&intake.files);

    let result: ApiResult<_> = async {
        let mut intake = intake;
        // Directives are client-only fields; strip them before JSON
        // parsing so strict mode never chokes on them.
        let directives = DocumentDirectives::extract(&mut intake.fields);
        normalize_structured_fields(&mut intake.fields, ParseMode::Strict)?;
        let mut new_debtor = NewTradeDebtor::from_fields(intake.fields)?;
        let buckets = classify_uploads(&intake.files, UploadTarget::Create);
        let summary = attach_create_uploads(&mut new_debtor, buckets);
        new_debtor.directives = directives;
        let created = state.debtor_service.create(new_debtor, &actor).await?;
        Ok((created, summary))
    }
    .await;

    match result {
        Ok((created, summary)) => {
            // Uploads no bucket accepted never attach to the entity;
            // drop them so they cannot pile up in storage.
            cleanup_uploads(state.storage.as_ref(), &stray_keys).await;
            Ok((
                StatusCode::CREATED,
                Json(CreateResponse {
                    success: true,
                    message: "Trade debtor created".to_string(),
                    data: created,
                    uploaded_files: summary,
                }),
            ))
        }
        Err(err) => {
            cleanup_uploads(state.storage.as_ref(), &uploaded_keys).await;
            Err(err)
        }
    }
}

async fn update_trade_debtor(
    State(state): State<Arc<AppState>>,
    AdminIdentity(actor): AdminIdentity,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let id = require_id(&id)?.to_string();
    let intake = read_multipart(multipart, state.storage.as_ref()).await?;
    let uploaded_keys = intake.stored_keys();
    let stray_keys = unclassified_upload_keys(&intake.files);

    let result: ApiResult<_> = async {
        let mut intake = intake;
        let directives = DocumentDirectives::extract(&mut intake.fields);
        // Update parsing is lenient: a text field that is not valid JSON
        // stays a plain string instead of failing the request.
        normalize_structured_fields(&mut intake.fields, ParseMode::Lenient)?;
        let mut update = TradeDebtorUpdate::from_fields(intake.fields)?;
        let buckets = classify_uploads(&intake.files, UploadTarget::Update);
        let summary = attach_update_uploads(&mut update, buckets);
        update.directives = directives.clone();
        let updated = state.debtor_service.update(&id, update, &actor).await?;
        Ok((updated, summary, directives))
    }
    .await;

    match result {
        Ok((updated, summary, directives)) => {
            cleanup_uploads(state.storage.as_ref(), &stray_keys).await;
            Ok(Json(UpdateResponse {
                success: true,
                message: "Trade debtor updated".to_string(),
                data: updated,
                files_uploaded: (summary.total > 0).then_some(summary),
                files_management: (!directives.is_noop())
                    .then(|| FilesManagement::from(&directives)),
            }))
        }
        Err(err) => {
            cleanup_uploads(state.storage.as_ref(), &uploaded_keys).await;
            Err(err)
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
    status: Option<String>,
    classification: Option<String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
}

impl ListQuery {
    fn into_filters(self) -> ApiResult<ListFilters> {
        let mut filters = ListFilters::default();
        if let Some(page) = self.page {
            filters.page = page.max(1);
        }
        if let Some(limit) = self.limit {
            filters.limit = limit.clamp(1, 100);
        }
        filters.search = self.search.filter(|s| !s.trim().is_empty());
        if let Some(status) = self.status.filter(|s| !s.trim().is_empty()) {
            filters.status = Some(DebtorStatus::parse(&status)?);
        }
        filters.classification = self.classification.filter(|s| !s.trim().is_empty());
        if let Some(sort_by) = self.sort_by.filter(|s| !s.trim().is_empty()) {
            filters.sort_by = sort_by;
        }
        match self.sort_order.as_deref() {
            Some("asc") => filters.sort_order = SortOrder::Asc,
            Some("desc") | None => filters.sort_order = SortOrder::Desc,
            Some(_) => {}
        }
        Ok(filters)
    }
}

async fn list_trade_debtors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let filters = query.into_filters()?;
    let page = state.debtor_service.list(&filters)?;
    Ok(Json(ListResponse {
        success: true,
        message: "Trade debtors retrieved".to_string(),
        data: page.items,
        pagination: page.pagination,
    }))
}

async fn get_active_trade_debtors(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let debtors = state.debtor_service.get_active()?;
    Ok(Json(DataResponse::ok("Active trade debtors retrieved", debtors)))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search_trade_debtors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let term = query.q.unwrap_or_default();
    let term = term.trim();
    // Characters, not bytes; a single multi-byte character is still too
    // short a term.
    if term.chars().count() < MIN_SEARCH_TERM_LEN {
        return Err(
            CoreError::Validation(ValidationError::InvalidSearchTerm(MIN_SEARCH_TERM_LEN)).into(),
        );
    }
    let matches = state.debtor_service.search(term)?;
    Ok(Json(DataResponse::ok("Search results retrieved", matches)))
}

async fn get_statistics(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let stats = state.debtor_service.statistics()?;
    Ok(Json(DataResponse::ok("Statistics retrieved", stats)))
}

async fn get_trade_debtor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = require_id(&id)?;
    let debtor = state.debtor_service.get_by_id(id)?;
    Ok(Json(DataResponse::ok("Trade debtor retrieved", debtor)))
}

async fn soft_delete_trade_debtor(
    State(state): State<Arc<AppState>>,
    AdminIdentity(actor): AdminIdentity,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = require_id(&id)?;
    let debtor = state.debtor_service.soft_delete(id, &actor).await?;
    Ok(Json(DataResponse::ok("Trade debtor deleted", debtor)))
}

async fn hard_delete_trade_debtor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = require_id(&id)?;
    let outcome = state.debtor_service.hard_delete(id).await?;
    Ok(Json(HardDeleteResponse::from_outcome(outcome)))
}

async fn toggle_trade_debtor_status(
    State(state): State<Arc<AppState>>,
    AdminIdentity(actor): AdminIdentity,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = require_id(&id)?;
    let debtor = state.debtor_service.toggle_status(id, &actor).await?;
    Ok(Json(DataResponse::ok(
        format!("Trade debtor status set to {}", debtor.status.as_str()),
        debtor,
    )))
}

#[derive(Deserialize)]
struct BulkStatusBody {
    ids: Option<Vec<String>>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct BulkDeleteBody {
    ids: Option<Vec<String>>,
}

fn require_ids(ids: Option<Vec<String>>) -> ApiResult<Vec<String>> {
    let ids: Vec<String> = ids
        .unwrap_or_default()
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(CoreError::Validation(ValidationError::MissingIds).into());
    }
    Ok(ids)
}

/// Bulk endpoints validate the request as a whole, then apply per-id and
/// answer 200 with individual outcomes.
async fn bulk_update_status(
    State(state): State<Arc<AppState>>,
    AdminIdentity(actor): AdminIdentity,
    Json(body): Json<BulkStatusBody>,
) -> ApiResult<impl IntoResponse> {
    let ids = require_ids(body.ids)?;
    let status = body
        .status
        .ok_or(CoreError::Validation(ValidationError::InvalidStatus))
        .and_then(|s| DebtorStatus::parse(&s))?;

    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        match state.debtor_service.set_status(&id, status, &actor).await {
            Ok(debtor) => results.push(BulkItemResult {
                id,
                success: true,
                data: Some(debtor),
                error: None,
            }),
            Err(e) => results.push(BulkItemResult {
                id,
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }
    Ok(Json(BulkResponse::new("Bulk status update processed", results)))
}

async fn bulk_soft_delete(
    State(state): State<Arc<AppState>>,
    AdminIdentity(actor): AdminIdentity,
    Json(body): Json<BulkDeleteBody>,
) -> ApiResult<impl IntoResponse> {
    let ids = require_ids(body.ids)?;

    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        match state.debtor_service.soft_delete(&id, &actor).await {
            Ok(debtor) => results.push(BulkItemResult {
                id,
                success: true,
                data: Some(debtor),
                error: None,
            }),
            Err(e) => results.push(BulkItemResult {
                id,
                success: false,
                data: None,
                error: Some(e.to_string()),
            }),
        }
    }
    Ok(Json(BulkResponse::new("Bulk delete processed", results)))
}
