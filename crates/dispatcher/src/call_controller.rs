use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use dialer_core::models::{
    Call, CallHistoryRecord, CallOutcome, CallQuality, MeetingDetails,
};
use dialer_core::traits::{
    AgentRepository, AssignmentStore, CallCompletion, CallRepository, CallStatsDelta,
    LeadRepository,
};
use dialer_core::{DialerError, DialerResult};

use crate::requeue::RequeuePolicy;

/// 结束通话请求
///
/// `call_id` 缺省时按坐席当前唯一的进行中通话定位。
#[derive(Debug, Clone)]
pub struct EndCallRequest {
    pub call_id: Option<i64>,
    pub agent_id: i64,
    pub outcome: CallOutcome,
    pub notes: Option<String>,
    pub recording_url: Option<String>,
    pub quality: Option<CallQuality>,
    pub meeting_details: Option<MeetingDetails>,
}

/// 通话生命周期控制器
///
/// 负责开启与关闭通话会话：校验坐席对线索的持有关系，在通话
/// 结束时驱动线索状态迁移（见 [`RequeuePolicy`]）并释放坐席。
/// 控制器不跨调用保存任何状态，所有决策基于存储中的最新数据。
pub struct CallController {
    lead_repo: Arc<dyn LeadRepository>,
    agent_repo: Arc<dyn AgentRepository>,
    call_repo: Arc<dyn CallRepository>,
    store: Arc<dyn AssignmentStore>,
    policy: RequeuePolicy,
}

impl CallController {
    pub fn new(
        lead_repo: Arc<dyn LeadRepository>,
        agent_repo: Arc<dyn AgentRepository>,
        call_repo: Arc<dyn CallRepository>,
        store: Arc<dyn AssignmentStore>,
        policy: RequeuePolicy,
    ) -> Self {
        Self {
            lead_repo,
            agent_repo,
            call_repo,
            store,
            policy,
        }
    }

    /// 开始通话
    ///
    /// 要求线索当前分配给该坐席（否则 `Forbidden`），且该坐席
    /// 没有进行中的通话（否则 `CallInProgress`，用于挡住重复的
    /// 开始请求）。成功时创建InProgress通话并把线索置为Calling。
    pub async fn start_call(&self, lead_id: i64, agent_id: i64) -> DialerResult<Call> {
        let mut lead = self
            .lead_repo
            .get_by_id(lead_id)
            .await?
            .ok_or(DialerError::LeadNotFound { id: lead_id })?;
        let _agent = self
            .agent_repo
            .get_by_id(agent_id)
            .await?
            .ok_or(DialerError::AgentNotFound { id: agent_id })?;

        if lead.assigned_agent != Some(agent_id) {
            return Err(DialerError::Forbidden(format!(
                "线索 {lead_id} 未分配给坐席 {agent_id}"
            )));
        }

        // 同一（线索, 坐席）对的重复开始请求直接拒绝
        if self
            .call_repo
            .get_in_progress_for_pair(lead_id, agent_id)
            .await?
            .is_some()
        {
            return Err(DialerError::CallInProgress { lead_id, agent_id });
        }
        // 坐席同一时刻最多一个进行中的通话
        if let Some(active) = self.call_repo.get_in_progress_by_agent(agent_id).await? {
            debug!(
                "坐席 {} 已有进行中的通话 {}，拒绝重复开始",
                agent_id, active.id
            );
            return Err(DialerError::CallInProgress {
                lead_id: active.lead_id,
                agent_id,
            });
        }

        let now = Utc::now();
        let call = self.call_repo.create(&Call::new(lead_id, agent_id, now)).await?;

        lead.status = dialer_core::models::LeadStatus::Calling;
        lead.last_call_attempt = Some(now);
        lead.updated_at = now;
        self.lead_repo.update(&lead).await?;

        info!("坐席 {} 开始与线索 {} 通话，通话ID: {}", agent_id, lead_id, call.id);

        Ok(call)
    }

    /// 结束通话
    ///
    /// 结束是一次性迁移：定位进行中的通话、校验归属，计算时长
    /// 与终态，向线索追加历史记录，按重排策略迁移线索状态并
    /// 释放坐席。全部写入由存储作为一个原子单元落盘，重复的
    /// 结束请求在存储侧撞上 `CallAlreadyClosed`，坐席统计不会
    /// 被重复累计。
    pub async fn end_call(&self, request: EndCallRequest) -> DialerResult<Call> {
        let mut call = match request.call_id {
            Some(id) => self
                .call_repo
                .get_by_id(id)
                .await?
                .ok_or(DialerError::CallNotFound { id })?,
            None => self
                .call_repo
                .get_in_progress_by_agent(request.agent_id)
                .await?
                .ok_or(DialerError::NoActiveCall {
                    agent_id: request.agent_id,
                })?,
        };

        if call.agent_id != request.agent_id {
            return Err(DialerError::Forbidden(format!(
                "通话 {} 不属于坐席 {}",
                call.id, request.agent_id
            )));
        }
        if !call.is_in_progress() {
            return Err(DialerError::CallAlreadyClosed { id: call.id });
        }

        let mut lead = self
            .lead_repo
            .get_by_id(call.lead_id)
            .await?
            .ok_or(DialerError::LeadNotFound { id: call.lead_id })?;
        let _agent = self
            .agent_repo
            .get_by_id(request.agent_id)
            .await?
            .ok_or(DialerError::AgentNotFound {
                id: request.agent_id,
            })?;

        let now = Utc::now();
        let notes = request.notes.unwrap_or_default();

        call.finish(request.outcome, now);
        call.notes = notes.clone();
        call.recording_url = request.recording_url.clone();
        call.quality = request.quality;
        call.meeting_details = request.meeting_details.clone();

        let transition = self.policy.decide(request.outcome, lead.retry_count, now);
        lead.status = transition.status;
        lead.retry_count = transition.retry_count;
        lead.next_eligible_time = transition.next_eligible_time;
        lead.assigned_agent = None;
        lead.updated_at = now;
        if request.outcome == CallOutcome::MeetingScheduled {
            lead.meeting_details = request.meeting_details.clone();
        }

        let completion = CallCompletion {
            call,
            lead,
            agent_id: request.agent_id,
            stats: CallStatsDelta {
                successful: request.outcome.counts_as_successful(),
                meeting_scheduled: request.outcome.counts_as_meeting(),
            },
            history: CallHistoryRecord {
                agent_id: request.agent_id,
                recorded_at: now,
                outcome: request.outcome,
                notes,
                recording_url: request.recording_url,
            },
            released_at: now,
        };

        let (call, lead, _agent) = self.store.complete_call(&completion).await?;

        info!(
            "{} 已结束，结果: {:?}，线索 {} 迁移为 {:?}",
            call.entity_description(),
            request.outcome,
            lead.id,
            lead.status
        );

        Ok(call)
    }

    /// 坐席当前进行中的通话
    pub async fn active_call(&self, agent_id: i64) -> DialerResult<Option<Call>> {
        self.call_repo.get_in_progress_by_agent(agent_id).await
    }

    /// 坐席的通话记录，按开始时间倒序分页
    pub async fn call_history(
        &self,
        agent_id: i64,
        page: i64,
        page_size: i64,
    ) -> DialerResult<(Vec<Call>, i64)> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);
        let offset = (page - 1) * page_size;

        let calls = self
            .call_repo
            .list_by_agent(agent_id, page_size, offset)
            .await?;
        let total = self.call_repo.count_by_agent(agent_id).await?;

        Ok((calls, total))
    }
}
