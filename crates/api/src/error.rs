use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dialer_core::DialerError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("分配引擎错误: {0}")]
    Dialer(#[from] DialerError),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("未找到资源")]
    NotFound,

    #[error("内部服务器错误: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type, suggestions) = match &self {
            ApiError::Dialer(DialerError::LeadNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("线索 ID {id} 不存在"),
                "LEAD_NOT_FOUND".to_string(),
                vec![
                    "请检查线索ID是否正确".to_string(),
                    "使用 GET /api/leads 查看所有线索".to_string(),
                ],
            ),
            ApiError::Dialer(DialerError::AgentNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("坐席 ID {id} 不存在"),
                "AGENT_NOT_FOUND".to_string(),
                vec![
                    "请检查坐席ID是否正确".to_string(),
                    "使用 GET /api/agents 查看所有坐席".to_string(),
                ],
            ),
            ApiError::Dialer(DialerError::CallNotFound { id }) => (
                StatusCode::NOT_FOUND,
                format!("通话 ID {id} 不存在"),
                "CALL_NOT_FOUND".to_string(),
                vec!["请检查通话ID是否正确".to_string()],
            ),
            ApiError::Dialer(DialerError::NoActiveCall { agent_id }) => (
                StatusCode::NOT_FOUND,
                format!("坐席 {agent_id} 没有进行中的通话"),
                "NO_ACTIVE_CALL".to_string(),
                vec!["请先调用 POST /api/calls/start 开始通话".to_string()],
            ),
            ApiError::Dialer(DialerError::Forbidden(msg)) => (
                StatusCode::FORBIDDEN,
                format!("无权访问: {msg}"),
                "FORBIDDEN".to_string(),
                vec!["线索或通话未分配给该坐席".to_string()],
            ),
            ApiError::Dialer(DialerError::LeadUnavailable { id }) => (
                StatusCode::CONFLICT,
                format!("线索 {id} 已被其他坐席占用"),
                "LEAD_UNAVAILABLE".to_string(),
                vec![
                    "该线索刚被并发请求认领".to_string(),
                    "可重试整个操作获取下一个线索".to_string(),
                ],
            ),
            ApiError::Dialer(DialerError::AgentUnavailable { id }) => (
                StatusCode::CONFLICT,
                format!("坐席 {id} 当前不可接受分配"),
                "AGENT_UNAVAILABLE".to_string(),
                vec![
                    "坐席可能刚被并发请求占用或已停用".to_string(),
                    "可重试整个操作".to_string(),
                ],
            ),
            ApiError::Dialer(DialerError::CallInProgress { lead_id, agent_id }) => (
                StatusCode::CONFLICT,
                format!("线索 {lead_id} 与坐席 {agent_id} 之间已有进行中的通话"),
                "CALL_IN_PROGRESS".to_string(),
                vec!["请先结束当前通话".to_string()],
            ),
            ApiError::Dialer(DialerError::CallAlreadyClosed { id }) => (
                StatusCode::CONFLICT,
                format!("通话 {id} 已经结束"),
                "CALL_ALREADY_CLOSED".to_string(),
                vec!["结束通话是一次性操作，重复请求不会再次生效".to_string()],
            ),
            ApiError::Dialer(DialerError::InvalidOutcome(msg)) => (
                StatusCode::BAD_REQUEST,
                format!("无效的通话结果: {msg}"),
                "INVALID_OUTCOME".to_string(),
                vec![
                    "有效值: NO_ANSWER, NOT_INTERESTED, MEETING_SCHEDULED, COMPLETED, CALL_RECORDED"
                        .to_string(),
                ],
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                format!("请求参数错误: {msg}"),
                "BAD_REQUEST".to_string(),
                vec!["请检查请求格式和参数".to_string()],
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "请求的资源不存在".to_string(),
                "NOT_FOUND".to_string(),
                vec!["请检查请求URL是否正确".to_string()],
            ),
            ApiError::Serialization(err) => (
                StatusCode::BAD_REQUEST,
                "请求数据格式错误".to_string(),
                "SERIALIZATION_ERROR".to_string(),
                vec![
                    "请检查JSON格式是否正确".to_string(),
                    format!("详细错误: {err}"),
                ],
            ),
            ApiError::Dialer(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR".to_string(),
                vec![
                    "系统遇到内部错误，请稍后重试".to_string(),
                    "查看 GET /health 检查系统状态".to_string(),
                ],
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR".to_string(),
                vec![format!("错误详情: {msg}")],
            ),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_not_found_maps_to_404() {
        let error = ApiError::Dialer(DialerError::LeadNotFound { id: 123 });
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_forbidden_maps_to_403() {
        let error = ApiError::Dialer(DialerError::Forbidden("测试".to_string()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_race_losses_map_to_409() {
        for error in [
            DialerError::LeadUnavailable { id: 1 },
            DialerError::AgentUnavailable { id: 1 },
            DialerError::CallInProgress {
                lead_id: 1,
                agent_id: 2,
            },
            DialerError::CallAlreadyClosed { id: 1 },
        ] {
            let response = ApiError::Dialer(error).into_response();
            assert_eq!(response.status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn test_invalid_outcome_maps_to_400() {
        let error = ApiError::Dialer(DialerError::InvalidOutcome("BUSY".to_string()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_errors_map_to_500() {
        let error = ApiError::Dialer(DialerError::Internal("boom".to_string()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let error = ApiError::Internal("boom".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_dialer_error_conversion() {
        let dialer_error = DialerError::AgentNotFound { id: 7 };
        let api_error: ApiError = dialer_error.into();
        match api_error {
            ApiError::Dialer(DialerError::AgentNotFound { id }) => assert_eq!(id, 7),
            _ => panic!("Expected DialerError::AgentNotFound"),
        }
    }
}
