use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use dialer_core::models::{Agent, Call, CallStatus, Lead};
use dialer_core::traits::{AssignmentStore, CallCompletion};
use dialer_core::{DialerError, DialerResult};

use crate::database::mapping::MappingHelpers;

/// 复合原子更新的SQLite实现
///
/// 跨线索/坐席两个实体的写入放在同一个事务里，并以带条件的
/// UPDATE做比较更新：条件不满足时rows_affected为0，整个事务
/// 回滚，输掉竞争的一方看不到任何部分写入。
pub struct SqliteAssignmentStore {
    pool: SqlitePool,
}

impl SqliteAssignmentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_lead(&self, id: i64) -> DialerResult<Lead> {
        let row = sqlx::query("SELECT * FROM leads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DialerError::LeadNotFound { id })?;
        MappingHelpers::row_to_lead(&row)
    }

    async fn fetch_agent(&self, id: i64) -> DialerResult<Agent> {
        let row = sqlx::query("SELECT * FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DialerError::AgentNotFound { id })?;
        MappingHelpers::row_to_agent(&row)
    }

    async fn fetch_call(&self, id: i64) -> DialerResult<Call> {
        let row = sqlx::query("SELECT * FROM calls WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DialerError::CallNotFound { id })?;
        MappingHelpers::row_to_call(&row)
    }
}

#[async_trait]
impl AssignmentStore for SqliteAssignmentStore {
    async fn assign_lead_to_agent(
        &self,
        lead_id: i64,
        agent_id: i64,
        now: DateTime<Utc>,
    ) -> DialerResult<(Lead, Agent)> {
        let mut tx = self.pool.begin().await?;

        // 先区分“不存在”与“不可用”，给调用方精确的错误
        let lead_exists = sqlx::query("SELECT id FROM leads WHERE id = ?")
            .bind(lead_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !lead_exists {
            return Err(DialerError::LeadNotFound { id: lead_id });
        }
        let agent_exists = sqlx::query("SELECT id FROM agents WHERE id = ?")
            .bind(agent_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !agent_exists {
            return Err(DialerError::AgentNotFound { id: agent_id });
        }

        // 线索侧认领：状态必须是New、未被持有且冷却已过
        let result = sqlx::query(
            r#"
            UPDATE leads SET
                status = 'ASSIGNED',
                assigned_agent = ?,
                last_call_attempt = ?,
                next_eligible_time = NULL,
                updated_at = ?
            WHERE id = ?
              AND status = 'NEW'
              AND assigned_agent IS NULL
              AND (next_eligible_time IS NULL OR next_eligible_time <= ?)
            "#,
        )
        .bind(agent_id)
        .bind(now)
        .bind(now)
        .bind(lead_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            // 提前返回即回滚
            return Err(DialerError::LeadUnavailable { id: lead_id });
        }

        // 坐席侧认领：必须活跃且可用，否则连同上面的线索更新一起回滚
        let result = sqlx::query(
            r#"
            UPDATE agents SET
                is_available = 0,
                current_lead = ?,
                last_activity_at = ?
            WHERE id = ?
              AND is_active = 1
              AND is_available = 1
            "#,
        )
        .bind(lead_id)
        .bind(now)
        .bind(agent_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DialerError::AgentUnavailable { id: agent_id });
        }

        tx.commit().await?;

        debug!("线索 {} 与坐席 {} 的认领已提交", lead_id, agent_id);

        let lead = self.fetch_lead(lead_id).await?;
        let agent = self.fetch_agent(agent_id).await?;
        Ok((lead, agent))
    }

    async fn complete_call(
        &self,
        completion: &CallCompletion,
    ) -> DialerResult<(Call, Lead, Agent)> {
        let call = &completion.call;
        let lead = &completion.lead;
        let mut tx = self.pool.begin().await?;

        // 区分“通话不存在”与“已经结束”
        let stored_status: Option<CallStatus> =
            sqlx::query("SELECT status FROM calls WHERE id = ?")
                .bind(call.id)
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.try_get("status"))
                .transpose()?;
        match stored_status {
            None => return Err(DialerError::CallNotFound { id: call.id }),
            Some(CallStatus::InProgress) => {}
            Some(_) => return Err(DialerError::CallAlreadyClosed { id: call.id }),
        }

        // 通话关闭是一次性迁移，条件更新挡住并发的重复结束
        let call_meeting = MappingHelpers::meeting_details_json(&call.meeting_details)?;
        let result = sqlx::query(
            r#"
            UPDATE calls SET
                status = ?, ended_at = ?, duration_seconds = ?, notes = ?,
                recording_url = ?, quality = ?, meeting_details = ?
            WHERE id = ? AND status = 'IN_PROGRESS'
            "#,
        )
        .bind(call.status)
        .bind(call.ended_at)
        .bind(call.duration_seconds)
        .bind(&call.notes)
        .bind(&call.recording_url)
        .bind(call.quality)
        .bind(call_meeting)
        .bind(call.id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DialerError::CallAlreadyClosed { id: call.id });
        }

        // 线索状态迁移（重排策略已在调用方算好）
        let lead_meeting = MappingHelpers::meeting_details_json(&lead.meeting_details)?;
        let result = sqlx::query(
            r#"
            UPDATE leads SET
                status = ?, assigned_agent = ?, retry_count = ?, last_call_attempt = ?,
                next_eligible_time = ?, meeting_details = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(lead.status)
        .bind(lead.assigned_agent)
        .bind(lead.retry_count)
        .bind(lead.last_call_attempt)
        .bind(lead.next_eligible_time)
        .bind(lead_meeting)
        .bind(lead.updated_at)
        .bind(lead.id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DialerError::LeadNotFound { id: lead.id });
        }

        // 历史只追加，自增主键保证顺序
        sqlx::query(
            r#"
            INSERT INTO lead_call_history (lead_id, agent_id, recorded_at, outcome, notes, recording_url)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(lead.id)
        .bind(completion.history.agent_id)
        .bind(completion.history.recorded_at)
        .bind(completion.history.outcome)
        .bind(&completion.history.notes)
        .bind(&completion.history.recording_url)
        .execute(&mut *tx)
        .await?;

        // 坐席释放 + 统计累计
        let result = sqlx::query(
            r#"
            UPDATE agents SET
                is_available = 1,
                current_lead = NULL,
                total_calls = total_calls + 1,
                successful_calls = successful_calls + ?,
                meetings_scheduled = meetings_scheduled + ?,
                last_activity_at = ?
            WHERE id = ?
            "#,
        )
        .bind(completion.stats.successful as i64)
        .bind(completion.stats.meeting_scheduled as i64)
        .bind(completion.released_at)
        .bind(completion.agent_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DialerError::AgentNotFound {
                id: completion.agent_id,
            });
        }

        tx.commit().await?;

        debug!(
            "通话 {} 的关闭、线索 {} 的迁移与坐席 {} 的释放已提交",
            call.id, lead.id, completion.agent_id
        );

        let call = self.fetch_call(call.id).await?;
        let lead = self.fetch_lead(lead.id).await?;
        let agent = self.fetch_agent(completion.agent_id).await?;
        Ok((call, lead, agent))
    }
}
