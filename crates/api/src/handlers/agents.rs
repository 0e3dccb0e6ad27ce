use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use dialer_core::models::Agent;

use crate::{
    error::{ApiError, ApiResult},
    response::{created, success},
    routes::AppState,
};

/// 坐席注册请求
#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    pub name: String,
    pub email: String,
}

/// 注册坐席
pub async fn register_agent(
    State(state): State<AppState>,
    Json(request): Json<RegisterAgentRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("坐席姓名不能为空".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(ApiError::BadRequest("坐席邮箱不能为空".to_string()));
    }

    let agent = Agent::new(request.name, request.email);
    let agent = state.agent_repo.create(&agent).await?;
    Ok(created(agent))
}

/// 获取所有坐席
pub async fn list_agents(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let agents = state.agent_repo.list().await?;
    Ok(success(agents))
}

/// 获取单个坐席
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let agent = state
        .agent_repo
        .get_by_id(id)
        .await?
        .ok_or(dialer_core::DialerError::AgentNotFound { id })?;
    Ok(success(agent))
}

/// 停用坐席（软删除），停用后不再参与分配
pub async fn deactivate_agent(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let mut agent = state
        .agent_repo
        .get_by_id(id)
        .await?
        .ok_or(dialer_core::DialerError::AgentNotFound { id })?;

    agent.is_active = false;
    state.agent_repo.update(&agent).await?;
    Ok(success(agent))
}
