use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use dialer_core::models::Lead;
use dialer_core::traits::{
    AgentAvailabilitySummary, AgentRepository, LeadRepository, LeadStatusCount,
};
use dialer_core::{DialerError, DialerResult};

use crate::assignment::AssignmentEngine;

/// 批次中单个线索的分配结果
///
/// 批次结果列表是一份完整的审计记录：每个参与批次的线索都有
/// 一条结果，失败的也带明确原因，调用者无需翻日志就能区分
/// “队列为空”和“有线索但没有坐席”。
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentResult {
    pub lead_id: i64,
    pub agent_id: Option<i64>,
    pub outcome: AssignmentOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AssignmentOutcome {
    /// 分配成功
    #[serde(rename = "ASSIGNED")]
    Assigned,
    /// 坐席池已空，本批次内不再重试
    #[serde(rename = "NO_AVAILABLE_AGENTS")]
    NoAvailableAgents,
    /// 单个线索分配失败（通常是输掉竞争），批次继续
    #[serde(rename = "SKIPPED")]
    Skipped { reason: String },
}

/// 分配统计：线索按状态计数 + 坐席可用情况
#[derive(Debug, Clone, Serialize)]
pub struct DistributionStats {
    pub leads: Vec<LeadStatusCount>,
    pub agents: AgentAvailabilitySummary,
}

/// 批量分配协调器
///
/// 反复从队列取出可分配线索并调用分配引擎，直到队列或坐席池
/// 耗尽。批次整体不是原子的：每对线索/坐席独立提交，中途崩溃
/// 只会留下未处理的尾部，不会留下损坏的配对。
pub struct LeadDistributor {
    engine: Arc<AssignmentEngine>,
    lead_repo: Arc<dyn LeadRepository>,
    agent_repo: Arc<dyn AgentRepository>,
}

impl LeadDistributor {
    pub fn new(
        engine: Arc<AssignmentEngine>,
        lead_repo: Arc<dyn LeadRepository>,
        agent_repo: Arc<dyn AgentRepository>,
    ) -> Self {
        Self {
            engine,
            lead_repo,
            agent_repo,
        }
    }

    /// 执行一个分配批次
    ///
    /// 可分配线索按创建时间先进先出处理。第一次发现坐席池为空
    /// 之后，剩余线索直接记为 `NoAvailableAgents`，同一批次内
    /// 不再查询坐席池。单个线索的失败（包括输掉竞争）只记录
    /// 原因，不会中止批次。
    pub async fn distribute_leads(&self) -> DialerResult<Vec<AssignmentResult>> {
        let now = Utc::now();
        let eligible = self.lead_repo.get_eligible(now, None).await?;

        if eligible.is_empty() {
            debug!("没有待分配的线索");
            return Ok(Vec::new());
        }

        info!("开始批量分配，待分配线索 {} 个", eligible.len());

        let mut results = Vec::with_capacity(eligible.len());
        let mut pool_exhausted = false;

        for lead in eligible {
            if pool_exhausted {
                results.push(AssignmentResult {
                    lead_id: lead.id,
                    agent_id: None,
                    outcome: AssignmentOutcome::NoAvailableAgents,
                });
                continue;
            }

            let agent = match self.engine.find_idle_agent().await? {
                Some(agent) => agent,
                None => {
                    pool_exhausted = true;
                    results.push(AssignmentResult {
                        lead_id: lead.id,
                        agent_id: None,
                        outcome: AssignmentOutcome::NoAvailableAgents,
                    });
                    continue;
                }
            };

            match self.engine.assign_lead_to_agent(lead.id, agent.id).await {
                Ok(pair) => {
                    results.push(AssignmentResult {
                        lead_id: pair.lead.id,
                        agent_id: Some(pair.agent.id),
                        outcome: AssignmentOutcome::Assigned,
                    });
                }
                Err(e) => {
                    // 输掉竞争或单条数据异常都不中止批次，原因记入结果
                    warn!("线索 {} 分配失败: {}", lead.id, e);
                    results.push(AssignmentResult {
                        lead_id: lead.id,
                        agent_id: Some(agent.id),
                        outcome: AssignmentOutcome::Skipped {
                            reason: e.to_string(),
                        },
                    });
                }
            }
        }

        let assigned = results
            .iter()
            .filter(|r| r.outcome == AssignmentOutcome::Assigned)
            .count();
        info!(
            "本次批量分配完成，成功 {} 个，未分配 {} 个",
            assigned,
            results.len() - assigned
        );

        Ok(results)
    }

    /// 获取坐席当前的线索，没有时按需分配一个
    ///
    /// 坐席已持有线索时直接返回；否则取队列中最早创建的可分配
    /// 线索，通过与批量路径完全相同的原子分配原语认领。队列为空
    /// 返回 `None`；输掉竞争的错误原样上抛，由调用者决定是否
    /// 重试整个操作。
    pub async fn get_lead_for_agent(&self, agent_id: i64) -> DialerResult<Option<Lead>> {
        let agent = self
            .agent_repo
            .get_by_id(agent_id)
            .await?
            .ok_or(DialerError::AgentNotFound { id: agent_id })?;

        if let Some(lead_id) = agent.current_lead {
            let lead = self.lead_repo.get_by_id(lead_id).await?.ok_or_else(|| {
                DialerError::Internal(format!(
                    "坐席 {agent_id} 持有的线索 {lead_id} 不存在"
                ))
            })?;
            return Ok(Some(lead));
        }

        let now = Utc::now();
        let candidates = self.lead_repo.get_eligible(now, Some(1)).await?;
        let lead = match candidates.into_iter().next() {
            Some(lead) => lead,
            None => {
                debug!("队列为空，坐席 {} 暂无线索可领", agent_id);
                return Ok(None);
            }
        };

        let pair = self.engine.assign_lead_to_agent(lead.id, agent_id).await?;
        Ok(Some(pair.lead))
    }

    /// 分配统计（只读聚合）
    pub async fn distribution_stats(&self) -> DialerResult<DistributionStats> {
        let leads = self.lead_repo.count_by_status().await?;
        let agents = self.agent_repo.count_availability().await?;

        Ok(DistributionStats { leads, agents })
    }
}
