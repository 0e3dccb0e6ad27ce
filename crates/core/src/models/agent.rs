use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 呼叫中心坐席，同一时刻最多持有一个线索
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// 软删除标记，停用的坐席不参与分配
    pub is_active: bool,
    pub is_available: bool,
    /// 当前持有的线索，与线索侧的assigned_agent互为镜像
    pub current_lead: Option<i64>,
    pub stats: AgentStats,
    pub last_activity_at: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
}

/// 坐席统计计数器，只增不减
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentStats {
    pub total_calls: i64,
    pub successful_calls: i64,
    pub meetings_scheduled: i64,
}

impl Agent {
    pub fn new(name: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // 将由数据库生成
            name,
            email,
            is_active: true,
            is_available: true,
            current_lead: None,
            stats: AgentStats::default(),
            last_activity_at: now,
            registered_at: now,
        }
    }

    /// 是否可接受新的线索分配
    pub fn is_idle(&self) -> bool {
        self.is_active && self.is_available
    }

    pub fn holds_lead(&self, lead_id: i64) -> bool {
        self.current_lead == Some(lead_id)
    }

    pub fn entity_description(&self) -> String {
        format!("坐席 '{}' (ID: {})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_is_idle() {
        let agent = Agent::new("张坐席".to_string(), "zhang@example.com".to_string());
        assert!(agent.is_idle());
        assert_eq!(agent.stats, AgentStats::default());
    }

    #[test]
    fn test_inactive_agent_not_idle() {
        let mut agent = Agent::new("停用坐席".to_string(), "off@example.com".to_string());
        agent.is_active = false;
        assert!(!agent.is_idle());
    }

    #[test]
    fn test_busy_agent_not_idle() {
        let mut agent = Agent::new("忙碌坐席".to_string(), "busy@example.com".to_string());
        agent.is_available = false;
        agent.current_lead = Some(7);
        assert!(!agent.is_idle());
        assert!(agent.holds_lead(7));
        assert!(!agent.holds_lead(8));
    }
}
