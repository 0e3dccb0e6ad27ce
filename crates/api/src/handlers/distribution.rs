use axum::extract::{Path, State};

use crate::{error::ApiResult, response::success, routes::AppState};

/// 手动触发一个分配批次
///
/// 返回的结果列表是本批次的完整审计：空列表表示队列为空。
pub async fn run_distribution(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let results = state.distributor.distribute_leads().await?;
    Ok(success(results))
}

/// 分配统计：线索按状态计数、坐席可用情况
pub async fn distribution_stats(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let stats = state.distributor.distribution_stats().await?;
    Ok(success(stats))
}

/// 获取坐席当前的线索，没有时按需领取一个
pub async fn agent_lead(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let lead = state.distributor.get_lead_for_agent(agent_id).await?;
    Ok(success(lead))
}
