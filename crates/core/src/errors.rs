use thiserror::Error;

/// 分配引擎错误类型定义
#[derive(Debug, Error)]
pub enum DialerError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),

    #[error("线索未找到: {id}")]
    LeadNotFound { id: i64 },

    #[error("坐席未找到: {id}")]
    AgentNotFound { id: i64 },

    #[error("通话未找到: {id}")]
    CallNotFound { id: i64 },

    #[error("线索 {id} 已被其他坐席占用")]
    LeadUnavailable { id: i64 },

    #[error("坐席 {id} 当前不可接受分配")]
    AgentUnavailable { id: i64 },

    #[error("无权访问: {0}")]
    Forbidden(String),

    #[error("线索 {lead_id} 与坐席 {agent_id} 之间已有进行中的通话")]
    CallInProgress { lead_id: i64, agent_id: i64 },

    #[error("通话 {id} 已经结束")]
    CallAlreadyClosed { id: i64 },

    #[error("坐席 {agent_id} 没有进行中的通话")]
    NoActiveCall { agent_id: i64 },

    #[error("无效的通话结果: {0}")]
    InvalidOutcome(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type DialerResult<T> = std::result::Result<T, DialerError>;
