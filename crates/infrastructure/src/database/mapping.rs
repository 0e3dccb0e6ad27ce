//! 数据库行与领域实体之间的映射辅助

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use dialer_core::models::{Agent, AgentStats, Call, CallHistoryRecord, Lead, MeetingDetails};
use dialer_core::{DialerError, DialerResult};

pub struct MappingHelpers;

impl MappingHelpers {
    /// 约见详情序列化为JSON文本列
    pub fn meeting_details_json(
        details: &Option<MeetingDetails>,
    ) -> DialerResult<Option<String>> {
        details
            .as_ref()
            .map(|d| {
                serde_json::to_string(d)
                    .map_err(|e| DialerError::Serialization(format!("约见详情序列化失败: {e}")))
            })
            .transpose()
    }

    /// JSON文本列解析为约见详情
    pub fn parse_meeting_details(raw: Option<String>) -> DialerResult<Option<MeetingDetails>> {
        raw.map(|s| {
            serde_json::from_str(&s)
                .map_err(|e| DialerError::Serialization(format!("约见详情解析失败: {e}")))
        })
        .transpose()
    }

    pub fn row_to_lead(row: &SqliteRow) -> DialerResult<Lead> {
        let meeting_details = Self::parse_meeting_details(row.try_get("meeting_details")?)?;

        Ok(Lead {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            notes: row.try_get("notes")?,
            status: row.try_get("status")?,
            assigned_agent: row.try_get("assigned_agent")?,
            retry_count: row.try_get("retry_count")?,
            last_call_attempt: row.try_get("last_call_attempt")?,
            next_eligible_time: row.try_get("next_eligible_time")?,
            meeting_details,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    pub fn row_to_agent(row: &SqliteRow) -> DialerResult<Agent> {
        Ok(Agent {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            is_active: row.try_get("is_active")?,
            is_available: row.try_get("is_available")?,
            current_lead: row.try_get("current_lead")?,
            stats: AgentStats {
                total_calls: row.try_get("total_calls")?,
                successful_calls: row.try_get("successful_calls")?,
                meetings_scheduled: row.try_get("meetings_scheduled")?,
            },
            last_activity_at: row.try_get("last_activity_at")?,
            registered_at: row.try_get("registered_at")?,
        })
    }

    pub fn row_to_call(row: &SqliteRow) -> DialerResult<Call> {
        let meeting_details = Self::parse_meeting_details(row.try_get("meeting_details")?)?;

        Ok(Call {
            id: row.try_get("id")?,
            lead_id: row.try_get("lead_id")?,
            agent_id: row.try_get("agent_id")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
            duration_seconds: row.try_get("duration_seconds")?,
            status: row.try_get("status")?,
            notes: row.try_get("notes")?,
            recording_url: row.try_get("recording_url")?,
            quality: row.try_get("quality")?,
            meeting_details,
            created_at: row.try_get("created_at")?,
        })
    }

    pub fn row_to_history_record(row: &SqliteRow) -> DialerResult<CallHistoryRecord> {
        Ok(CallHistoryRecord {
            agent_id: row.try_get("agent_id")?,
            recorded_at: row.try_get("recorded_at")?,
            outcome: row.try_get("outcome")?,
            notes: row.try_get("notes")?,
            recording_url: row.try_get("recording_url")?,
        })
    }
}
