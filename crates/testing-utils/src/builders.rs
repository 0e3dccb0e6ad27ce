//! Fluent builders for test entities

use chrono::{DateTime, Duration, Utc};

use dialer_core::models::{Agent, Call, CallOutcome, Lead, LeadStatus};

pub struct LeadBuilder {
    lead: Lead,
}

impl LeadBuilder {
    pub fn new() -> Self {
        Self {
            lead: Lead::new(
                "test_lead".to_string(),
                "+48 600 000 000".to_string(),
                "lead@example.com".to_string(),
                String::new(),
            ),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.lead.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.lead.name = name.to_string();
        self
    }

    pub fn with_status(mut self, status: LeadStatus) -> Self {
        self.lead.status = status;
        self
    }

    pub fn with_retry_count(mut self, retry_count: i32) -> Self {
        self.lead.retry_count = retry_count;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.lead.created_at = created_at;
        self
    }

    pub fn with_next_eligible_time(mut self, at: DateTime<Utc>) -> Self {
        self.lead.next_eligible_time = Some(at);
        self
    }

    /// Lead already held by the given agent (status Assigned).
    pub fn assigned_to(mut self, agent_id: i64) -> Self {
        self.lead.status = LeadStatus::Assigned;
        self.lead.assigned_agent = Some(agent_id);
        self
    }

    /// Lead requeued after a missed call: status New with a future cooldown.
    pub fn cooling_down(mut self, until: DateTime<Utc>) -> Self {
        self.lead.status = LeadStatus::New;
        self.lead.retry_count = 1;
        self.lead.next_eligible_time = Some(until);
        self
    }

    pub fn build(self) -> Lead {
        self.lead
    }
}

impl Default for LeadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AgentBuilder {
    agent: Agent,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            agent: Agent::new("test_agent".to_string(), "agent@example.com".to_string()),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.agent.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.agent.name = name.to_string();
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.agent.email = email.to_string();
        self
    }

    pub fn with_last_activity_at(mut self, at: DateTime<Utc>) -> Self {
        self.agent.last_activity_at = at;
        self
    }

    /// Agent currently holding a lead.
    pub fn busy_with(mut self, lead_id: i64) -> Self {
        self.agent.is_available = false;
        self.agent.current_lead = Some(lead_id);
        self
    }

    /// Soft-deleted agent.
    pub fn inactive(mut self) -> Self {
        self.agent.is_active = false;
        self
    }

    pub fn build(self) -> Agent {
        self.agent
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CallBuilder {
    call: Call,
}

impl CallBuilder {
    pub fn new() -> Self {
        Self {
            call: Call::new(1, 1, Utc::now()),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.call.id = id;
        self
    }

    pub fn with_lead_id(mut self, lead_id: i64) -> Self {
        self.call.lead_id = lead_id;
        self
    }

    pub fn with_agent_id(mut self, agent_id: i64) -> Self {
        self.call.agent_id = agent_id;
        self
    }

    pub fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.call.started_at = at;
        self.call.created_at = at;
        self
    }

    /// Call already closed with the given outcome one minute after start.
    pub fn finished(mut self, outcome: CallOutcome) -> Self {
        let ended = self.call.started_at + Duration::minutes(1);
        self.call.finish(outcome, ended);
        self
    }

    pub fn build(self) -> Call {
        self.call
    }
}

impl Default for CallBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialer_core::models::CallStatus;

    #[test]
    fn test_lead_builder_defaults() {
        let lead = LeadBuilder::new().build();
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.retry_count, 0);
        assert!(lead.assigned_agent.is_none());
    }

    #[test]
    fn test_assigned_lead_builder() {
        let lead = LeadBuilder::new().with_id(5).assigned_to(9).build();
        assert_eq!(lead.id, 5);
        assert_eq!(lead.status, LeadStatus::Assigned);
        assert_eq!(lead.assigned_agent, Some(9));
    }

    #[test]
    fn test_finished_call_builder() {
        let call = CallBuilder::new().finished(CallOutcome::Completed).build();
        assert_eq!(call.status, CallStatus::Completed);
        assert_eq!(call.duration_seconds, Some(60));
    }
}
