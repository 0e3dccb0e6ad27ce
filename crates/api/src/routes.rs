use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use dialer_core::config::ApiConfig;
use dialer_core::traits::{AgentRepository, LeadRepository};
use dialer_dispatcher::{CallController, LeadDistributor};

use crate::handlers::{
    agents::{deactivate_agent, get_agent, list_agents, register_agent},
    calls::{active_call, call_history, end_call, start_call},
    distribution::{agent_lead, distribution_stats, run_distribution},
    health::health_check,
    leads::{create_lead, delete_lead, get_lead, get_lead_history, list_leads},
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub distributor: Arc<LeadDistributor>,
    pub call_controller: Arc<CallController>,
    pub lead_repo: Arc<dyn LeadRepository>,
    pub agent_repo: Arc<dyn AgentRepository>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 分配API
        .route("/api/distribution/run", post(run_distribution))
        .route("/api/distribution/stats", get(distribution_stats))
        // 线索管理API
        .route("/api/leads", get(list_leads).post(create_lead))
        .route("/api/leads/{id}", get(get_lead))
        .route("/api/leads/{id}/delete", post(delete_lead))
        .route("/api/leads/{id}/history", get(get_lead_history))
        // 坐席管理API
        .route("/api/agents", get(list_agents).post(register_agent))
        .route("/api/agents/{id}", get(get_agent))
        .route("/api/agents/{id}/deactivate", post(deactivate_agent))
        .route("/api/agents/{id}/lead", get(agent_lead))
        .route("/api/agents/{id}/calls", get(call_history))
        .route("/api/agents/{id}/calls/active", get(active_call))
        // 通话API
        .route("/api/calls/start", post(start_call))
        .route("/api/calls/end", post(end_call))
        .with_state(state)
}

/// 创建带中间件的API应用
pub fn create_app(state: AppState, config: &ApiConfig) -> Router {
    let mut app = create_routes(state)
        .layer(axum::middleware::from_fn(crate::middleware::request_logging))
        .layer(crate::middleware::trace_layer());

    if config.cors_enabled {
        app = app.layer(crate::middleware::cors_layer());
    }

    app
}
