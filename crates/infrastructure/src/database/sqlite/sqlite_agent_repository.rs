use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use dialer_core::models::Agent;
use dialer_core::traits::{AgentAvailabilitySummary, AgentRepository};
use dialer_core::{DialerError, DialerResult};

use crate::database::mapping::MappingHelpers;

pub struct SqliteAgentRepository {
    pool: SqlitePool,
}

impl SqliteAgentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    async fn create(&self, agent: &Agent) -> DialerResult<Agent> {
        let result = sqlx::query(
            r#"
            INSERT INTO agents (
                name, email, is_active, is_available, current_lead,
                total_calls, successful_calls, meetings_scheduled,
                last_activity_at, registered_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&agent.name)
        .bind(&agent.email)
        .bind(agent.is_active)
        .bind(agent.is_available)
        .bind(agent.current_lead)
        .bind(agent.stats.total_calls)
        .bind(agent.stats.successful_calls)
        .bind(agent.stats.meetings_scheduled)
        .bind(agent.last_activity_at)
        .bind(agent.registered_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id).await?.ok_or_else(|| {
            DialerError::DatabaseOperation(format!("注册坐席后读取失败: {id}"))
        })
    }

    async fn get_by_id(&self, id: i64) -> DialerResult<Option<Agent>> {
        let row = sqlx::query("SELECT * FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| MappingHelpers::row_to_agent(&row)).transpose()
    }

    async fn update(&self, agent: &Agent) -> DialerResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE agents SET
                name = ?, email = ?, is_active = ?, is_available = ?, current_lead = ?,
                total_calls = ?, successful_calls = ?, meetings_scheduled = ?,
                last_activity_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&agent.name)
        .bind(&agent.email)
        .bind(agent.is_active)
        .bind(agent.is_available)
        .bind(agent.current_lead)
        .bind(agent.stats.total_calls)
        .bind(agent.stats.successful_calls)
        .bind(agent.stats.meetings_scheduled)
        .bind(agent.last_activity_at)
        .bind(agent.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DialerError::AgentNotFound { id: agent.id });
        }
        Ok(())
    }

    async fn list(&self) -> DialerResult<Vec<Agent>> {
        let rows = sqlx::query("SELECT * FROM agents ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(MappingHelpers::row_to_agent).collect()
    }

    async fn find_idle_agent(&self) -> DialerResult<Option<Agent>> {
        // 最久未活动优先，并列按ID升序稳定决胜
        let row = sqlx::query(
            r#"
            SELECT * FROM agents
            WHERE is_active = 1 AND is_available = 1
            ORDER BY last_activity_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| MappingHelpers::row_to_agent(&row)).transpose()
    }

    async fn count_availability(&self) -> DialerResult<AgentAvailabilitySummary> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN is_active = 1 AND is_available = 1 THEN 1 ELSE 0 END), 0) AS available,
                COALESCE(SUM(CASE WHEN is_active = 1 AND is_available = 0 THEN 1 ELSE 0 END), 0) AS busy,
                COALESCE(SUM(CASE WHEN is_active = 0 THEN 1 ELSE 0 END), 0) AS inactive
            FROM agents
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AgentAvailabilitySummary {
            available: row.try_get("available")?,
            busy: row.try_get("busy")?,
            inactive: row.try_get("inactive")?,
        })
    }
}
