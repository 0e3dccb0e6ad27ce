use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use dialer_core::models::{Agent, Lead};
use dialer_core::traits::{AgentRepository, AssignmentStore, LeadRepository};
use dialer_core::{DialerError, DialerResult};

/// 一次成功分配的结果：更新后的线索与坐席
#[derive(Debug, Clone)]
pub struct AssignmentPair {
    pub lead: Lead,
    pub agent: Agent,
}

/// 分配引擎
///
/// 把单个线索分配给单个坐席，保证一线索一坐席的互斥约束。
/// 引擎自身不持有任何状态，每次调用都从存储读取最新数据；
/// 互斥由存储的复合原子更新保证，引擎里的前置检查只用于
/// 尽早返回精确的错误。
pub struct AssignmentEngine {
    lead_repo: Arc<dyn LeadRepository>,
    agent_repo: Arc<dyn AgentRepository>,
    store: Arc<dyn AssignmentStore>,
}

impl AssignmentEngine {
    pub fn new(
        lead_repo: Arc<dyn LeadRepository>,
        agent_repo: Arc<dyn AgentRepository>,
        store: Arc<dyn AssignmentStore>,
    ) -> Self {
        Self {
            lead_repo,
            agent_repo,
            store,
        }
    }

    /// 把线索分配给坐席
    ///
    /// 前置条件：线索存在、状态为New、未被持有且冷却已过；
    /// 坐席存在、活跃且可用。线索与坐席的更新作为一个原子单元
    /// 落盘，输掉竞争的调用者收到 `LeadUnavailable` /
    /// `AgentUnavailable`，不会破坏赢家的状态。
    pub async fn assign_lead_to_agent(
        &self,
        lead_id: i64,
        agent_id: i64,
    ) -> DialerResult<AssignmentPair> {
        let now = Utc::now();

        let lead = self
            .lead_repo
            .get_by_id(lead_id)
            .await?
            .ok_or(DialerError::LeadNotFound { id: lead_id })?;
        let agent = self
            .agent_repo
            .get_by_id(agent_id)
            .await?
            .ok_or(DialerError::AgentNotFound { id: agent_id })?;

        if lead.is_held() || !lead.is_eligible(now) {
            debug!("线索 {} 当前不可分配，状态: {:?}", lead_id, lead.status);
            return Err(DialerError::LeadUnavailable { id: lead_id });
        }
        if !agent.is_idle() {
            debug!("坐席 {} 当前不可接受分配", agent_id);
            return Err(DialerError::AgentUnavailable { id: agent_id });
        }

        // 预检通过后仍可能输掉竞争，以存储侧的条件更新为准
        let (lead, agent) = self
            .store
            .assign_lead_to_agent(lead_id, agent_id, now)
            .await?;

        info!(
            "{} 已分配给 {}",
            lead.entity_description(),
            agent.entity_description()
        );

        Ok(AssignmentPair { lead, agent })
    }

    /// 选取一个空闲坐席：活跃且可用者中最久未活动的一个
    ///
    /// 这是一个简单的公平启发式而非优先级队列，并列时按ID
    /// 升序稳定决胜。
    pub async fn find_idle_agent(&self) -> DialerResult<Option<Agent>> {
        let agent = self.agent_repo.find_idle_agent().await?;

        match &agent {
            Some(agent) => debug!("选中空闲坐席: {}", agent.id),
            None => debug!("没有空闲坐席"),
        }

        Ok(agent)
    }
}
