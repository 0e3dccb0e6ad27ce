use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use dialer_core::models::{CallOutcome, CallQuality, MeetingDetails};
use dialer_dispatcher::EndCallRequest;

use crate::{
    error::ApiResult,
    response::{success, PaginatedResponse},
    routes::AppState,
};

/// 开始通话请求
#[derive(Debug, Deserialize)]
pub struct StartCallRequest {
    pub lead_id: i64,
    pub agent_id: i64,
}

/// 结束通话请求
///
/// `call_id` 缺省时结束该坐席当前唯一的进行中通话。
/// 未知的outcome在反序列化阶段即被拒绝，不会产生任何写入。
#[derive(Debug, Deserialize)]
pub struct EndCallApiRequest {
    pub call_id: Option<i64>,
    pub agent_id: i64,
    pub outcome: CallOutcome,
    pub notes: Option<String>,
    pub recording_url: Option<String>,
    pub quality: Option<CallQuality>,
    pub meeting_details: Option<MeetingDetails>,
}

/// 通话记录查询参数
#[derive(Debug, Deserialize)]
pub struct CallHistoryParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// 开始通话
pub async fn start_call(
    State(state): State<AppState>,
    Json(request): Json<StartCallRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let call = state
        .call_controller
        .start_call(request.lead_id, request.agent_id)
        .await?;
    Ok(success(call))
}

/// 结束通话
pub async fn end_call(
    State(state): State<AppState>,
    Json(request): Json<EndCallApiRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let call = state
        .call_controller
        .end_call(EndCallRequest {
            call_id: request.call_id,
            agent_id: request.agent_id,
            outcome: request.outcome,
            notes: request.notes,
            recording_url: request.recording_url,
            quality: request.quality,
            meeting_details: request.meeting_details,
        })
        .await?;
    Ok(success(call))
}

/// 坐席当前进行中的通话
pub async fn active_call(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let call = state.call_controller.active_call(agent_id).await?;
    Ok(success(call))
}

/// 坐席的通话记录，按开始时间倒序分页
pub async fn call_history(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
    Query(params): Query<CallHistoryParams>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(20);

    let (calls, total) = state
        .call_controller
        .call_history(agent_id, page, page_size)
        .await?;

    Ok(success(PaginatedResponse::new(calls, total, page, page_size)))
}
