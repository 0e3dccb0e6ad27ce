//! In-memory store for unit tests
//!
//! `MemoryStore` keeps all entities behind one mutex and implements the
//! repository traits plus `AssignmentStore`, mirroring the conditional-update
//! semantics of the SQLite implementation: a claim that loses the race
//! observes the same `LeadUnavailable` / `AgentUnavailable` /
//! `CallAlreadyClosed` errors and leaves no partial writes behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dialer_core::models::{
    Agent, Call, CallHistoryRecord, CallStatus, Lead, LeadFilter, LeadStatus,
};
use dialer_core::traits::{
    AgentAvailabilitySummary, AgentRepository, AssignmentStore, CallCompletion, CallRepository,
    LeadRepository, LeadStatusCount,
};
use dialer_core::{DialerError, DialerResult};

#[derive(Debug, Default)]
struct StoreInner {
    leads: HashMap<i64, Lead>,
    agents: HashMap<i64, Agent>,
    calls: HashMap<i64, Call>,
    history: HashMap<i64, Vec<CallHistoryRecord>>,
    next_lead_id: i64,
    next_agent_id: i64,
    next_call_id: i64,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                next_lead_id: 1,
                next_agent_id: 1,
                next_call_id: 1,
                ..StoreInner::default()
            })),
        }
    }

    pub fn lead_count(&self) -> usize {
        self.inner.lock().unwrap().leads.len()
    }

    pub fn agent_count(&self) -> usize {
        self.inner.lock().unwrap().agents.len()
    }

    /// Seed a lead keeping the id set by the builder (0 = auto-assign).
    pub fn seed_lead(&self, lead: Lead) -> Lead {
        let mut inner = self.inner.lock().unwrap();
        let mut lead = lead;
        if lead.id == 0 {
            lead.id = inner.next_lead_id;
        }
        inner.next_lead_id = inner.next_lead_id.max(lead.id + 1);
        inner.leads.insert(lead.id, lead.clone());
        lead
    }

    /// Seed an agent keeping the id set by the builder (0 = auto-assign).
    pub fn seed_agent(&self, agent: Agent) -> Agent {
        let mut inner = self.inner.lock().unwrap();
        let mut agent = agent;
        if agent.id == 0 {
            agent.id = inner.next_agent_id;
        }
        inner.next_agent_id = inner.next_agent_id.max(agent.id + 1);
        inner.agents.insert(agent.id, agent.clone());
        agent
    }

    /// Seed a call keeping the id set by the builder (0 = auto-assign).
    pub fn seed_call(&self, call: Call) -> Call {
        let mut inner = self.inner.lock().unwrap();
        let mut call = call;
        if call.id == 0 {
            call.id = inner.next_call_id;
        }
        inner.next_call_id = inner.next_call_id.max(call.id + 1);
        inner.calls.insert(call.id, call.clone());
        call
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LeadRepository for MemoryStore {
    async fn create(&self, lead: &Lead) -> DialerResult<Lead> {
        let mut inner = self.inner.lock().unwrap();
        let mut new_lead = lead.clone();
        new_lead.id = inner.next_lead_id;
        inner.next_lead_id += 1;
        inner.leads.insert(new_lead.id, new_lead.clone());
        Ok(new_lead)
    }

    async fn get_by_id(&self, id: i64) -> DialerResult<Option<Lead>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.leads.get(&id).cloned())
    }

    async fn update(&self, lead: &Lead) -> DialerResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.leads.contains_key(&lead.id) {
            return Err(DialerError::LeadNotFound { id: lead.id });
        }
        inner.leads.insert(lead.id, lead.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> DialerResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .leads
            .remove(&id)
            .map(|_| ())
            .ok_or(DialerError::LeadNotFound { id })
    }

    async fn list(&self, filter: &LeadFilter) -> DialerResult<Vec<Lead>> {
        let inner = self.inner.lock().unwrap();
        let mut leads: Vec<Lead> = inner.leads.values().cloned().collect();

        if let Some(status) = filter.status {
            leads.retain(|l| l.status == status);
        }
        if let Some(agent_id) = filter.assigned_agent {
            leads.retain(|l| l.assigned_agent == Some(agent_id));
        }
        leads.sort_by_key(|l| (l.created_at, l.id));

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let leads: Vec<Lead> = leads.into_iter().skip(offset).collect();
        match filter.limit {
            Some(limit) => Ok(leads.into_iter().take(limit.max(0) as usize).collect()),
            None => Ok(leads),
        }
    }

    async fn get_eligible(
        &self,
        now: DateTime<Utc>,
        limit: Option<i64>,
    ) -> DialerResult<Vec<Lead>> {
        let inner = self.inner.lock().unwrap();
        let mut leads: Vec<Lead> = inner
            .leads
            .values()
            .filter(|l| !l.is_held() && l.is_eligible(now))
            .cloned()
            .collect();
        leads.sort_by_key(|l| (l.created_at, l.id));
        match limit {
            Some(limit) => Ok(leads.into_iter().take(limit.max(0) as usize).collect()),
            None => Ok(leads),
        }
    }

    async fn get_history(&self, lead_id: i64) -> DialerResult<Vec<CallHistoryRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.history.get(&lead_id).cloned().unwrap_or_default())
    }

    async fn count_by_status(&self) -> DialerResult<Vec<LeadStatusCount>> {
        let inner = self.inner.lock().unwrap();
        let mut counts: HashMap<LeadStatus, i64> = HashMap::new();
        for lead in inner.leads.values() {
            *counts.entry(lead.status).or_insert(0) += 1;
        }
        let mut result: Vec<LeadStatusCount> = counts
            .into_iter()
            .map(|(status, count)| LeadStatusCount { status, count })
            .collect();
        result.sort_by_key(|c| c.status.as_str());
        Ok(result)
    }
}

#[async_trait]
impl AgentRepository for MemoryStore {
    async fn create(&self, agent: &Agent) -> DialerResult<Agent> {
        let mut inner = self.inner.lock().unwrap();
        let mut new_agent = agent.clone();
        new_agent.id = inner.next_agent_id;
        inner.next_agent_id += 1;
        inner.agents.insert(new_agent.id, new_agent.clone());
        Ok(new_agent)
    }

    async fn get_by_id(&self, id: i64) -> DialerResult<Option<Agent>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.agents.get(&id).cloned())
    }

    async fn update(&self, agent: &Agent) -> DialerResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.agents.contains_key(&agent.id) {
            return Err(DialerError::AgentNotFound { id: agent.id });
        }
        inner.agents.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn list(&self) -> DialerResult<Vec<Agent>> {
        let inner = self.inner.lock().unwrap();
        let mut agents: Vec<Agent> = inner.agents.values().cloned().collect();
        agents.sort_by_key(|a| a.id);
        Ok(agents)
    }

    async fn find_idle_agent(&self) -> DialerResult<Option<Agent>> {
        let inner = self.inner.lock().unwrap();
        let mut idle: Vec<&Agent> = inner.agents.values().filter(|a| a.is_idle()).collect();
        // 最久未活动优先，并列按ID升序
        idle.sort_by_key(|a| (a.last_activity_at, a.id));
        Ok(idle.first().map(|a| (*a).clone()))
    }

    async fn count_availability(&self) -> DialerResult<AgentAvailabilitySummary> {
        let inner = self.inner.lock().unwrap();
        let mut summary = AgentAvailabilitySummary::default();
        for agent in inner.agents.values() {
            if !agent.is_active {
                summary.inactive += 1;
            } else if agent.is_available {
                summary.available += 1;
            } else {
                summary.busy += 1;
            }
        }
        Ok(summary)
    }
}

#[async_trait]
impl CallRepository for MemoryStore {
    async fn create(&self, call: &Call) -> DialerResult<Call> {
        let mut inner = self.inner.lock().unwrap();
        let mut new_call = call.clone();
        new_call.id = inner.next_call_id;
        inner.next_call_id += 1;
        inner.calls.insert(new_call.id, new_call.clone());
        Ok(new_call)
    }

    async fn get_by_id(&self, id: i64) -> DialerResult<Option<Call>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.calls.get(&id).cloned())
    }

    async fn get_in_progress_by_agent(&self, agent_id: i64) -> DialerResult<Option<Call>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .calls
            .values()
            .find(|c| c.agent_id == agent_id && c.status == CallStatus::InProgress)
            .cloned())
    }

    async fn get_in_progress_for_pair(
        &self,
        lead_id: i64,
        agent_id: i64,
    ) -> DialerResult<Option<Call>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .calls
            .values()
            .find(|c| {
                c.lead_id == lead_id
                    && c.agent_id == agent_id
                    && c.status == CallStatus::InProgress
            })
            .cloned())
    }

    async fn list_by_agent(
        &self,
        agent_id: i64,
        limit: i64,
        offset: i64,
    ) -> DialerResult<Vec<Call>> {
        let inner = self.inner.lock().unwrap();
        let mut calls: Vec<Call> = inner
            .calls
            .values()
            .filter(|c| c.agent_id == agent_id)
            .cloned()
            .collect();
        calls.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(calls
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_by_agent(&self, agent_id: i64) -> DialerResult<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .calls
            .values()
            .filter(|c| c.agent_id == agent_id)
            .count() as i64)
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn assign_lead_to_agent(
        &self,
        lead_id: i64,
        agent_id: i64,
        now: DateTime<Utc>,
    ) -> DialerResult<(Lead, Agent)> {
        let mut inner = self.inner.lock().unwrap();

        // 与SQLite实现相同的条件：整个认领在一个临界区内完成
        {
            let lead = inner
                .leads
                .get(&lead_id)
                .ok_or(DialerError::LeadNotFound { id: lead_id })?;
            if lead.is_held() || !lead.is_eligible(now) {
                return Err(DialerError::LeadUnavailable { id: lead_id });
            }
            let agent = inner
                .agents
                .get(&agent_id)
                .ok_or(DialerError::AgentNotFound { id: agent_id })?;
            if !agent.is_idle() {
                return Err(DialerError::AgentUnavailable { id: agent_id });
            }
        }

        let lead = inner.leads.get_mut(&lead_id).unwrap();
        lead.status = LeadStatus::Assigned;
        lead.assigned_agent = Some(agent_id);
        lead.last_call_attempt = Some(now);
        lead.next_eligible_time = None;
        lead.updated_at = now;
        let lead = lead.clone();

        let agent = inner.agents.get_mut(&agent_id).unwrap();
        agent.is_available = false;
        agent.current_lead = Some(lead_id);
        agent.last_activity_at = now;
        let agent = agent.clone();

        Ok((lead, agent))
    }

    async fn complete_call(
        &self,
        completion: &CallCompletion,
    ) -> DialerResult<(Call, Lead, Agent)> {
        let mut inner = self.inner.lock().unwrap();

        // 以存储中的通话行为准做一次性关闭判定
        {
            let stored = inner
                .calls
                .get(&completion.call.id)
                .ok_or(DialerError::CallNotFound {
                    id: completion.call.id,
                })?;
            if stored.status != CallStatus::InProgress {
                return Err(DialerError::CallAlreadyClosed { id: stored.id });
            }
            if !inner.leads.contains_key(&completion.lead.id) {
                return Err(DialerError::LeadNotFound {
                    id: completion.lead.id,
                });
            }
            if !inner.agents.contains_key(&completion.agent_id) {
                return Err(DialerError::AgentNotFound {
                    id: completion.agent_id,
                });
            }
        }

        inner
            .calls
            .insert(completion.call.id, completion.call.clone());
        inner
            .leads
            .insert(completion.lead.id, completion.lead.clone());
        inner
            .history
            .entry(completion.lead.id)
            .or_default()
            .push(completion.history.clone());

        let agent = inner.agents.get_mut(&completion.agent_id).unwrap();
        agent.is_available = true;
        agent.current_lead = None;
        agent.stats.total_calls += 1;
        if completion.stats.successful {
            agent.stats.successful_calls += 1;
        }
        if completion.stats.meeting_scheduled {
            agent.stats.meetings_scheduled += 1;
        }
        agent.last_activity_at = completion.released_at;
        let agent = agent.clone();

        Ok((
            completion.call.clone(),
            completion.lead.clone(),
            agent,
        ))
    }
}
