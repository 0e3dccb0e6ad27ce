use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use dialer_core::models::{Lead, LeadFilter, LeadStatus};

use crate::{
    error::{ApiError, ApiResult},
    response::{created, success},
    routes::AppState,
};

/// 线索创建请求
#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub notes: Option<String>,
}

/// 线索查询参数
#[derive(Debug, Deserialize)]
pub struct LeadQueryParams {
    pub status: Option<String>,
    pub assigned_agent: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 创建线索
pub async fn create_lead(
    State(state): State<AppState>,
    Json(request): Json<CreateLeadRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("线索姓名不能为空".to_string()));
    }
    if request.phone.trim().is_empty() {
        return Err(ApiError::BadRequest("线索电话不能为空".to_string()));
    }

    let lead = Lead::new(
        request.name,
        request.phone,
        request.email,
        request.notes.unwrap_or_default(),
    );
    let lead = state.lead_repo.create(&lead).await?;
    Ok(created(lead))
}

/// 查询线索列表
pub async fn list_leads(
    State(state): State<AppState>,
    Query(params): Query<LeadQueryParams>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let status = params
        .status
        .map(|s| s.parse::<LeadStatus>())
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let filter = LeadFilter {
        status,
        assigned_agent: params.assigned_agent,
        limit: Some(params.limit.unwrap_or(50).clamp(1, 200)),
        offset: Some(params.offset.unwrap_or(0).max(0)),
    };
    let leads = state.lead_repo.list(&filter).await?;
    Ok(success(leads))
}

/// 获取单个线索
pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let lead = state
        .lead_repo
        .get_by_id(id)
        .await?
        .ok_or(dialer_core::DialerError::LeadNotFound { id })?;
    Ok(success(lead))
}

/// 删除线索
pub async fn delete_lead(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    state.lead_repo.delete(id).await?;
    Ok(success(serde_json::json!({ "deleted": id })))
}

/// 线索的通话历史，按追加顺序返回
pub async fn get_lead_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    // 先确认线索存在，空历史与不存在的线索要区分开
    state
        .lead_repo
        .get_by_id(id)
        .await?
        .ok_or(dialer_core::DialerError::LeadNotFound { id })?;

    let history = state.lead_repo.get_history(id).await?;
    Ok(success(history))
}
