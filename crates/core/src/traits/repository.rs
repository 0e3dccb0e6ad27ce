//! 数据仓储层接口定义
//!
//! 此模块定义了实体存储的核心抽象接口，包括：
//! - 线索仓储接口 (LeadRepository)
//! - 坐席仓储接口 (AgentRepository)
//! - 通话仓储接口 (CallRepository)
//! - 复合原子更新接口 (AssignmentStore)
//!
//! ## 设计原则
//!
//! ### 接口隔离
//! 每个仓储接口职责单一，只负责特定实体的数据操作。跨越
//! 线索与坐席两个实体的写入（认领分配、结束通话）不拆分到
//! 单实体接口中，而是集中在 `AssignmentStore`，由实现方保证
//! 以单个事务（或等价的条件更新）落盘，部分写入在任何时刻
//! 都不可被观察到。
//!
//! ### 无状态调用方
//! 分配引擎与通话生命周期控制器自身不缓存任何实体状态，
//! 每次决策都从存储读取最新数据。存储是唯一的共享可变资源。
//!
//! ### 异步设计
//! 所有操作都是异步的，返回 `DialerResult<T>` 统一错误处理，
//! 并要求实现 `Send + Sync` 以便在并发请求处理器间共享。
//!
//! ### 抽象解耦
//! 接口与具体实现分离：
//! - SQLite 实现（dialer-infrastructure，嵌入式）
//! - 内存实现（dialer-testing-utils，测试用）

use crate::models::{
    Agent, Call, CallHistoryRecord, Lead, LeadFilter, LeadStatus,
};
use crate::DialerResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 线索仓储接口
///
/// 负责线索的增删改查、可分配队列查询以及通话历史的追加读取。
/// 通话历史只追加、按写入顺序返回，任何实现都不得重排或修改
/// 既有记录。
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// 创建新线索，返回包含数据库生成ID的实例
    async fn create(&self, lead: &Lead) -> DialerResult<Lead>;

    /// 根据ID获取线索，未找到时返回 `None`
    async fn get_by_id(&self, id: i64) -> DialerResult<Option<Lead>>;

    /// 更新线索的完整字段
    ///
    /// 仅用于单实体写入（如管理面编辑）。涉及坐席占用关系的
    /// 状态变更必须走 `AssignmentStore`。
    async fn update(&self, lead: &Lead) -> DialerResult<()>;

    /// 删除线索
    async fn delete(&self, id: i64) -> DialerResult<()>;

    /// 按过滤条件查询线索列表
    async fn list(&self, filter: &LeadFilter) -> DialerResult<Vec<Lead>>;

    /// 获取当前可分配的线索，按创建时间升序（先进先出）
    ///
    /// 可分配 = 状态为New 且 （next_eligible_time 为空 或 已过期）。
    /// 这是分配批次的核心查询。
    async fn get_eligible(
        &self,
        now: DateTime<Utc>,
        limit: Option<i64>,
    ) -> DialerResult<Vec<Lead>>;

    /// 获取线索的通话历史，按追加顺序返回
    async fn get_history(&self, lead_id: i64) -> DialerResult<Vec<CallHistoryRecord>>;

    /// 按状态统计线索数量
    async fn count_by_status(&self) -> DialerResult<Vec<LeadStatusCount>>;
}

/// 坐席仓储接口
///
/// 负责坐席的注册、查询与空闲坐席选取。可用性字段只存在于
/// 存储中，调用方不得在进程内缓存。
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// 注册新坐席
    async fn create(&self, agent: &Agent) -> DialerResult<Agent>;

    /// 根据ID获取坐席
    async fn get_by_id(&self, id: i64) -> DialerResult<Option<Agent>>;

    /// 更新坐席的完整字段
    ///
    /// 与 `LeadRepository::update` 同理，占用关系的变更不走此方法。
    async fn update(&self, agent: &Agent) -> DialerResult<()>;

    /// 获取所有坐席
    async fn list(&self) -> DialerResult<Vec<Agent>>;

    /// 选取一个空闲坐席
    ///
    /// 在活跃且可用的坐席中选取最久未活动的一个（公平轮转的
    /// 简单启发式），last_activity_at 相同时按ID升序稳定决胜。
    /// 没有空闲坐席时返回 `None`。
    async fn find_idle_agent(&self) -> DialerResult<Option<Agent>>;

    /// 统计坐席可用情况
    async fn count_availability(&self) -> DialerResult<AgentAvailabilitySummary>;
}

/// 通话仓储接口
#[async_trait]
pub trait CallRepository: Send + Sync {
    /// 创建通话记录（状态为InProgress）
    async fn create(&self, call: &Call) -> DialerResult<Call>;

    /// 根据ID获取通话
    async fn get_by_id(&self, id: i64) -> DialerResult<Option<Call>>;

    /// 获取坐席当前进行中的通话
    ///
    /// 每个坐席同一时刻最多一个进行中的通话，由
    /// `CallController::start_call` 的幂等保护保证。
    async fn get_in_progress_by_agent(&self, agent_id: i64) -> DialerResult<Option<Call>>;

    /// 获取（线索, 坐席）对当前进行中的通话
    async fn get_in_progress_for_pair(
        &self,
        lead_id: i64,
        agent_id: i64,
    ) -> DialerResult<Option<Call>>;

    /// 分页获取坐席的通话记录，按开始时间倒序
    async fn list_by_agent(
        &self,
        agent_id: i64,
        limit: i64,
        offset: i64,
    ) -> DialerResult<Vec<Call>>;

    /// 统计坐席的通话总数
    async fn count_by_agent(&self, agent_id: i64) -> DialerResult<i64>;
}

/// 复合原子更新接口
///
/// 分配与释放各自同时改写线索与坐席两个实体，原实现按先后
/// 两次独立保存留下了竞态窗口；此接口要求实现方以单个事务
/// 或带条件的比较更新落盘，两个实体要么同时更新、要么都不
/// 更新。
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// 原子认领：把线索分配给坐席
    ///
    /// 实现必须以条件更新保证互斥：线索侧要求状态为New且未被
    /// 持有，坐席侧要求活跃且可用；任一条件不满足则整体回滚，
    /// 分别映射为 [`DialerError::LeadUnavailable`] /
    /// [`DialerError::AgentUnavailable`]。两个并发调用争夺同一
    /// 空闲坐席时，恰好一个成功。
    ///
    /// 成功时的副作用：线索 → Assigned、assigned_agent、
    /// last_call_attempt=now、清除next_eligible_time；坐席 →
    /// 不可用、current_lead、last_activity_at=now。
    ///
    /// [`DialerError::LeadUnavailable`]: crate::DialerError::LeadUnavailable
    /// [`DialerError::AgentUnavailable`]: crate::DialerError::AgentUnavailable
    async fn assign_lead_to_agent(
        &self,
        lead_id: i64,
        agent_id: i64,
        now: DateTime<Utc>,
    ) -> DialerResult<(Lead, Agent)>;

    /// 原子收尾：通话关闭 + 线索状态迁移 + 历史追加 + 坐席释放
    ///
    /// 通话行的更新以 `status = IN_PROGRESS` 为条件，零行命中
    /// 返回 [`DialerError::CallAlreadyClosed`] 并回滚全部写入，
    /// 因此重复的结束请求不会重复累计坐席统计。
    ///
    /// [`DialerError::CallAlreadyClosed`]: crate::DialerError::CallAlreadyClosed
    async fn complete_call(
        &self,
        completion: &CallCompletion,
    ) -> DialerResult<(Call, Lead, Agent)>;
}

/// 结束通话时需要原子落盘的全部写入
///
/// 由通话生命周期控制器在内存中计算完成（通话终态、线索迁移、
/// 统计增量），存储实现只负责按原样持久化。
#[derive(Debug, Clone)]
pub struct CallCompletion {
    /// 已在内存中调用过 `Call::finish` 的通话
    pub call: Call,
    /// 已应用重排策略迁移的线索
    pub lead: Lead,
    pub agent_id: i64,
    /// 坐席统计增量（total_calls恒加一）
    pub stats: CallStatsDelta,
    /// 追加到线索历史的记录
    pub history: CallHistoryRecord,
    /// 坐席释放时刻，写入last_activity_at
    pub released_at: DateTime<Utc>,
}

/// 坐席统计增量
#[derive(Debug, Clone, Copy, Default)]
pub struct CallStatsDelta {
    pub successful: bool,
    pub meeting_scheduled: bool,
}

/// 按状态统计的线索数量
#[derive(Debug, Clone, serde::Serialize)]
pub struct LeadStatusCount {
    pub status: LeadStatus,
    pub count: i64,
}

/// 坐席可用性统计
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct AgentAvailabilitySummary {
    pub available: i64,
    pub busy: i64,
    pub inactive: i64,
}

impl AgentAvailabilitySummary {
    pub fn total(&self) -> i64 {
        self.available + self.busy + self.inactive
    }
}
