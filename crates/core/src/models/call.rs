use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 通话会话：一次坐席与线索之间的电话接触
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: i64,
    pub lead_id: i64,
    pub agent_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// 通话时长（秒），结束时计算一次，之后不再重算
    pub duration_seconds: Option<i64>,
    pub status: CallStatus,
    pub notes: String,
    pub recording_url: Option<String>,
    pub quality: Option<CallQuality>,
    pub meeting_details: Option<MeetingDetails>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CallStatus {
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "NO_ANSWER")]
    NoAnswer,
    #[serde(rename = "NOT_INTERESTED")]
    NotInterested,
    #[serde(rename = "MEETING_SCHEDULED")]
    MeetingScheduled,
}
impl sqlx::Type<sqlx::Postgres> for CallStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl sqlx::Type<sqlx::Sqlite> for CallStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CallStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s {
            "IN_PROGRESS" => Ok(CallStatus::InProgress),
            "COMPLETED" => Ok(CallStatus::Completed),
            "NO_ANSWER" => Ok(CallStatus::NoAnswer),
            "NOT_INTERESTED" => Ok(CallStatus::NotInterested),
            "MEETING_SCHEDULED" => Ok(CallStatus::MeetingScheduled),
            _ => Err(format!("Invalid call status: {s}").into()),
        }
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for CallStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        match s {
            "IN_PROGRESS" => Ok(CallStatus::InProgress),
            "COMPLETED" => Ok(CallStatus::Completed),
            "NO_ANSWER" => Ok(CallStatus::NoAnswer),
            "NOT_INTERESTED" => Ok(CallStatus::NotInterested),
            "MEETING_SCHEDULED" => Ok(CallStatus::MeetingScheduled),
            _ => Err(format!("Invalid call status: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for CallStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        let s = match self {
            CallStatus::InProgress => "IN_PROGRESS",
            CallStatus::Completed => "COMPLETED",
            CallStatus::NoAnswer => "NO_ANSWER",
            CallStatus::NotInterested => "NOT_INTERESTED",
            CallStatus::MeetingScheduled => "MEETING_SCHEDULED",
        };
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(s, buf)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for CallStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        let s = match self {
            CallStatus::InProgress => "IN_PROGRESS",
            CallStatus::Completed => "COMPLETED",
            CallStatus::NoAnswer => "NO_ANSWER",
            CallStatus::NotInterested => "NOT_INTERESTED",
            CallStatus::MeetingScheduled => "MEETING_SCHEDULED",
        };
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(s, buf)
    }
}

/// 通话结果，由坐席在结束通话时上报
///
/// 每个结果都对应重排策略表中的一行，新增结果时编译器会强制
/// 补全所有match分支。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CallOutcome {
    #[serde(rename = "NO_ANSWER")]
    NoAnswer,
    #[serde(rename = "NOT_INTERESTED")]
    NotInterested,
    #[serde(rename = "MEETING_SCHEDULED")]
    MeetingScheduled,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "CALL_RECORDED")]
    CallRecorded,
}
impl sqlx::Type<sqlx::Postgres> for CallOutcome {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl sqlx::Type<sqlx::Sqlite> for CallOutcome {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CallOutcome {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        CallOutcome::parse(s).map_err(|e| e.into())
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for CallOutcome {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        CallOutcome::parse(s).map_err(|e| e.into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for CallOutcome {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for CallOutcome {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::NoAnswer => "NO_ANSWER",
            CallOutcome::NotInterested => "NOT_INTERESTED",
            CallOutcome::MeetingScheduled => "MEETING_SCHEDULED",
            CallOutcome::Completed => "COMPLETED",
            CallOutcome::CallRecorded => "CALL_RECORDED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "NO_ANSWER" => Ok(CallOutcome::NoAnswer),
            "NOT_INTERESTED" => Ok(CallOutcome::NotInterested),
            "MEETING_SCHEDULED" => Ok(CallOutcome::MeetingScheduled),
            "COMPLETED" => Ok(CallOutcome::Completed),
            "CALL_RECORDED" => Ok(CallOutcome::CallRecorded),
            _ => Err(format!("Invalid call outcome: {s}")),
        }
    }

    /// 结果对应的通话终态
    pub fn terminal_call_status(&self) -> CallStatus {
        match self {
            CallOutcome::NoAnswer => CallStatus::NoAnswer,
            CallOutcome::NotInterested => CallStatus::NotInterested,
            CallOutcome::MeetingScheduled => CallStatus::MeetingScheduled,
            // 录音完成与正常完成都记为通话完成
            CallOutcome::Completed | CallOutcome::CallRecorded => CallStatus::Completed,
        }
    }

    /// 是否计入坐席的成功通话数
    pub fn counts_as_successful(&self) -> bool {
        matches!(
            self,
            CallOutcome::MeetingScheduled | CallOutcome::CallRecorded
        )
    }

    /// 是否计入坐席的已约见面数
    pub fn counts_as_meeting(&self) -> bool {
        matches!(self, CallOutcome::MeetingScheduled)
    }
}

/// 通话质量评级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallQuality {
    #[serde(rename = "EXCELLENT")]
    Excellent,
    #[serde(rename = "GOOD")]
    Good,
    #[serde(rename = "FAIR")]
    Fair,
    #[serde(rename = "POOR")]
    Poor,
}
impl sqlx::Type<sqlx::Postgres> for CallQuality {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl sqlx::Type<sqlx::Sqlite> for CallQuality {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CallQuality {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        match s {
            "EXCELLENT" => Ok(CallQuality::Excellent),
            "GOOD" => Ok(CallQuality::Good),
            "FAIR" => Ok(CallQuality::Fair),
            "POOR" => Ok(CallQuality::Poor),
            _ => Err(format!("Invalid call quality: {s}").into()),
        }
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for CallQuality {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        match s {
            "EXCELLENT" => Ok(CallQuality::Excellent),
            "GOOD" => Ok(CallQuality::Good),
            "FAIR" => Ok(CallQuality::Fair),
            "POOR" => Ok(CallQuality::Poor),
            _ => Err(format!("Invalid call quality: {s}").into()),
        }
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for CallQuality {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        let s = match self {
            CallQuality::Excellent => "EXCELLENT",
            CallQuality::Good => "GOOD",
            CallQuality::Fair => "FAIR",
            CallQuality::Poor => "POOR",
        };
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(s, buf)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for CallQuality {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        let s = match self {
            CallQuality::Excellent => "EXCELLENT",
            CallQuality::Good => "GOOD",
            CallQuality::Fair => "FAIR",
            CallQuality::Poor => "POOR",
        };
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(s, buf)
    }
}

/// 约见详情，在结果为MeetingScheduled时填写并同步到线索
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeetingDetails {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// 线索通话历史记录，只追加、按写入顺序保存
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallHistoryRecord {
    pub agent_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub outcome: CallOutcome,
    pub notes: String,
    pub recording_url: Option<String>,
}

impl Call {
    pub fn new(lead_id: i64, agent_id: i64, started_at: DateTime<Utc>) -> Self {
        Self {
            id: 0, // 将由数据库生成
            lead_id,
            agent_id,
            started_at,
            ended_at: None,
            duration_seconds: None,
            status: CallStatus::InProgress,
            notes: String::new(),
            recording_url: None,
            quality: None,
            meeting_details: None,
            created_at: started_at,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.status, CallStatus::InProgress)
    }

    /// 结束通话：写入终态、结束时间并计算一次时长
    pub fn finish(&mut self, outcome: CallOutcome, ended_at: DateTime<Utc>) {
        self.status = outcome.terminal_call_status();
        self.ended_at = Some(ended_at);
        self.duration_seconds = Some((ended_at - self.started_at).num_seconds().max(0));
    }

    pub fn entity_description(&self) -> String {
        format!(
            "通话 (ID: {}, 线索ID: {}, 坐席ID: {})",
            self.id, self.lead_id, self.agent_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_finish_computes_duration_once() {
        let start = Utc::now();
        let mut call = Call::new(1, 2, start);
        assert!(call.is_in_progress());

        call.finish(CallOutcome::Completed, start + Duration::seconds(125));

        assert_eq!(call.status, CallStatus::Completed);
        assert_eq!(call.duration_seconds, Some(125));
        assert_eq!(call.ended_at, Some(start + Duration::seconds(125)));
    }

    #[test]
    fn test_call_recorded_maps_to_completed() {
        assert_eq!(
            CallOutcome::CallRecorded.terminal_call_status(),
            CallStatus::Completed
        );
        assert!(CallOutcome::CallRecorded.counts_as_successful());
        assert!(!CallOutcome::CallRecorded.counts_as_meeting());
    }

    #[test]
    fn test_outcome_parse_roundtrip() {
        for outcome in [
            CallOutcome::NoAnswer,
            CallOutcome::NotInterested,
            CallOutcome::MeetingScheduled,
            CallOutcome::Completed,
            CallOutcome::CallRecorded,
        ] {
            assert_eq!(CallOutcome::parse(outcome.as_str()), Ok(outcome));
        }
        assert!(CallOutcome::parse("BUSY").is_err());
    }
}
