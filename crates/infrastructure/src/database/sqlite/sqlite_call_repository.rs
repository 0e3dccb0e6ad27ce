use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use dialer_core::models::Call;
use dialer_core::traits::CallRepository;
use dialer_core::{DialerError, DialerResult};

use crate::database::mapping::MappingHelpers;

pub struct SqliteCallRepository {
    pool: SqlitePool,
}

impl SqliteCallRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallRepository for SqliteCallRepository {
    async fn create(&self, call: &Call) -> DialerResult<Call> {
        let meeting_details = MappingHelpers::meeting_details_json(&call.meeting_details)?;

        let result = sqlx::query(
            r#"
            INSERT INTO calls (
                lead_id, agent_id, started_at, ended_at, duration_seconds,
                status, notes, recording_url, quality, meeting_details, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(call.lead_id)
        .bind(call.agent_id)
        .bind(call.started_at)
        .bind(call.ended_at)
        .bind(call.duration_seconds)
        .bind(call.status)
        .bind(&call.notes)
        .bind(&call.recording_url)
        .bind(call.quality)
        .bind(meeting_details)
        .bind(call.created_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id).await?.ok_or_else(|| {
            DialerError::DatabaseOperation(format!("创建通话后读取失败: {id}"))
        })
    }

    async fn get_by_id(&self, id: i64) -> DialerResult<Option<Call>> {
        let row = sqlx::query("SELECT * FROM calls WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| MappingHelpers::row_to_call(&row)).transpose()
    }

    async fn get_in_progress_by_agent(&self, agent_id: i64) -> DialerResult<Option<Call>> {
        let row = sqlx::query(
            "SELECT * FROM calls WHERE agent_id = ? AND status = 'IN_PROGRESS' LIMIT 1",
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| MappingHelpers::row_to_call(&row)).transpose()
    }

    async fn get_in_progress_for_pair(
        &self,
        lead_id: i64,
        agent_id: i64,
    ) -> DialerResult<Option<Call>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM calls
            WHERE lead_id = ? AND agent_id = ? AND status = 'IN_PROGRESS'
            LIMIT 1
            "#,
        )
        .bind(lead_id)
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| MappingHelpers::row_to_call(&row)).transpose()
    }

    async fn list_by_agent(
        &self,
        agent_id: i64,
        limit: i64,
        offset: i64,
    ) -> DialerResult<Vec<Call>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM calls
            WHERE agent_id = ?
            ORDER BY started_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(agent_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(MappingHelpers::row_to_call).collect()
    }

    async fn count_by_agent(&self, agent_id: i64) -> DialerResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM calls WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("cnt")?)
    }
}
