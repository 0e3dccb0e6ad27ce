use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::call::MeetingDetails;

/// 销售线索
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub notes: String,
    pub status: LeadStatus,
    /// 当前持有该线索的坐席，同一时刻最多一个
    pub assigned_agent: Option<i64>,
    /// 未接重试次数，只增不减，上限3
    pub retry_count: i32,
    pub last_call_attempt: Option<DateTime<Utc>>,
    /// 未到该时间的线索即使状态为New也不参与分配
    pub next_eligible_time: Option<DateTime<Utc>>,
    pub meeting_details: Option<MeetingDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LeadStatus {
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "ASSIGNED")]
    Assigned,
    #[serde(rename = "CALLING")]
    Calling,
    #[serde(rename = "NO_ANSWER")]
    NoAnswer,
    #[serde(rename = "NOT_INTERESTED")]
    NotInterested,
    #[serde(rename = "MEETING_SCHEDULED")]
    MeetingScheduled,
    #[serde(rename = "COMPLETED")]
    Completed,
}
impl sqlx::Type<sqlx::Postgres> for LeadStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl sqlx::Type<sqlx::Sqlite> for LeadStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for LeadStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        LeadStatus::parse(s).map_err(|e| e.into())
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for LeadStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        LeadStatus::parse(s).map_err(|e| e.into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for LeadStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for LeadStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
    }
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "NEW",
            LeadStatus::Assigned => "ASSIGNED",
            LeadStatus::Calling => "CALLING",
            LeadStatus::NoAnswer => "NO_ANSWER",
            LeadStatus::NotInterested => "NOT_INTERESTED",
            LeadStatus::MeetingScheduled => "MEETING_SCHEDULED",
            LeadStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "NEW" => Ok(LeadStatus::New),
            "ASSIGNED" => Ok(LeadStatus::Assigned),
            "CALLING" => Ok(LeadStatus::Calling),
            "NO_ANSWER" => Ok(LeadStatus::NoAnswer),
            "NOT_INTERESTED" => Ok(LeadStatus::NotInterested),
            "MEETING_SCHEDULED" => Ok(LeadStatus::MeetingScheduled),
            "COMPLETED" => Ok(LeadStatus::Completed),
            _ => Err(format!("Invalid lead status: {s}")),
        }
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::parse(s)
    }
}

/// 线索查询过滤条件
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub assigned_agent: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Lead {
    pub fn new(name: String, phone: String, email: String, notes: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // 将由数据库生成
            name,
            phone,
            email,
            notes,
            status: LeadStatus::New,
            assigned_agent: None,
            retry_count: 0,
            last_call_attempt: None,
            next_eligible_time: None,
            meeting_details: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 线索是否可参与分配：状态为New且冷却时间已过
    ///
    /// 可分配性是状态与时间的合取，单看状态不够。
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, LeadStatus::New)
            && self
                .next_eligible_time
                .map(|t| t <= now)
                .unwrap_or(true)
    }

    pub fn is_held(&self) -> bool {
        self.assigned_agent.is_some()
    }

    pub fn entity_description(&self) -> String {
        format!("线索 '{}' (ID: {}, 电话: {})", self.name, self.id, self.phone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_lead_is_eligible() {
        let lead = Lead::new(
            "王先生".to_string(),
            "+48 600 100 200".to_string(),
            "wang@example.com".to_string(),
            String::new(),
        );
        assert!(lead.is_eligible(Utc::now()));
        assert!(!lead.is_held());
    }

    #[test]
    fn test_future_next_eligible_time_blocks_assignment() {
        let now = Utc::now();
        let mut lead = Lead::new(
            "李女士".to_string(),
            "+48 600 300 400".to_string(),
            "li@example.com".to_string(),
            String::new(),
        );
        lead.next_eligible_time = Some(now + Duration::hours(4));

        assert!(!lead.is_eligible(now));
        // 冷却结束后重新可分配
        assert!(lead.is_eligible(now + Duration::hours(4)));
    }

    #[test]
    fn test_non_new_status_never_eligible() {
        let mut lead = Lead::new(
            "测试".to_string(),
            "123".to_string(),
            "t@example.com".to_string(),
            String::new(),
        );
        lead.status = LeadStatus::Assigned;
        assert!(!lead.is_eligible(Utc::now()));
    }

    #[test]
    fn test_lead_status_parse() {
        assert_eq!(LeadStatus::parse("NEW"), Ok(LeadStatus::New));
        assert_eq!(
            LeadStatus::parse("MEETING_SCHEDULED"),
            Ok(LeadStatus::MeetingScheduled)
        );
        assert!(LeadStatus::parse("new").is_err());
    }
}
