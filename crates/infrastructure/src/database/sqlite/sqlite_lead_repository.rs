use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use dialer_core::models::{CallHistoryRecord, Lead, LeadFilter};
use dialer_core::traits::{LeadRepository, LeadStatusCount};
use dialer_core::{DialerError, DialerResult};

use crate::database::mapping::MappingHelpers;

pub struct SqliteLeadRepository {
    pool: SqlitePool,
}

impl SqliteLeadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadRepository for SqliteLeadRepository {
    async fn create(&self, lead: &Lead) -> DialerResult<Lead> {
        let meeting_details = MappingHelpers::meeting_details_json(&lead.meeting_details)?;

        let result = sqlx::query(
            r#"
            INSERT INTO leads (
                name, phone, email, notes, status, assigned_agent, retry_count,
                last_call_attempt, next_eligible_time, meeting_details, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(&lead.email)
        .bind(&lead.notes)
        .bind(lead.status)
        .bind(lead.assigned_agent)
        .bind(lead.retry_count)
        .bind(lead.last_call_attempt)
        .bind(lead.next_eligible_time)
        .bind(meeting_details)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id).await?.ok_or_else(|| {
            DialerError::DatabaseOperation(format!("创建线索后读取失败: {id}"))
        })
    }

    async fn get_by_id(&self, id: i64) -> DialerResult<Option<Lead>> {
        let row = sqlx::query("SELECT * FROM leads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| MappingHelpers::row_to_lead(&row)).transpose()
    }

    async fn update(&self, lead: &Lead) -> DialerResult<()> {
        let meeting_details = MappingHelpers::meeting_details_json(&lead.meeting_details)?;

        let result = sqlx::query(
            r#"
            UPDATE leads SET
                name = ?, phone = ?, email = ?, notes = ?, status = ?, assigned_agent = ?,
                retry_count = ?, last_call_attempt = ?, next_eligible_time = ?,
                meeting_details = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(&lead.email)
        .bind(&lead.notes)
        .bind(lead.status)
        .bind(lead.assigned_agent)
        .bind(lead.retry_count)
        .bind(lead.last_call_attempt)
        .bind(lead.next_eligible_time)
        .bind(meeting_details)
        .bind(lead.updated_at)
        .bind(lead.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DialerError::LeadNotFound { id: lead.id });
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> DialerResult<()> {
        let result = sqlx::query("DELETE FROM leads WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DialerError::LeadNotFound { id });
        }
        Ok(())
    }

    async fn list(&self, filter: &LeadFilter) -> DialerResult<Vec<Lead>> {
        let mut sql = String::from("SELECT * FROM leads WHERE 1 = 1");
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.assigned_agent.is_some() {
            sql.push_str(" AND assigned_agent = ?");
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        } else if filter.offset.is_some() {
            // SQLite的OFFSET必须跟在LIMIT后面
            sql.push_str(" LIMIT -1");
        }
        if filter.offset.is_some() {
            sql.push_str(" OFFSET ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status);
        }
        if let Some(agent_id) = filter.assigned_agent {
            query = query.bind(agent_id);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
        }
        if let Some(offset) = filter.offset {
            query = query.bind(offset);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(MappingHelpers::row_to_lead).collect()
    }

    async fn get_eligible(
        &self,
        now: DateTime<Utc>,
        limit: Option<i64>,
    ) -> DialerResult<Vec<Lead>> {
        // 可分配 = New + 未被持有 + 冷却已过，先进先出
        let mut sql = String::from(
            r#"
            SELECT * FROM leads
            WHERE status = 'NEW'
              AND assigned_agent IS NULL
              AND (next_eligible_time IS NULL OR next_eligible_time <= ?)
            ORDER BY created_at ASC, id ASC
            "#,
        );
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql).bind(now);
        if let Some(limit) = limit {
            query = query.bind(limit);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(MappingHelpers::row_to_lead).collect()
    }

    async fn get_history(&self, lead_id: i64) -> DialerResult<Vec<CallHistoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT agent_id, recorded_at, outcome, notes, recording_url
            FROM lead_call_history
            WHERE lead_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(MappingHelpers::row_to_history_record)
            .collect()
    }

    async fn count_by_status(&self) -> DialerResult<Vec<LeadStatusCount>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS cnt FROM leads GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(LeadStatusCount {
                    status: row.try_get("status")?,
                    count: row.try_get("cnt")?,
                })
            })
            .collect()
    }
}
