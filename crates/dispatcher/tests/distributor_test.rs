use std::sync::Arc;

use chrono::{Duration, Utc};

use dialer_core::models::LeadStatus;
use dialer_core::traits::{AgentRepository, LeadRepository};
use dialer_dispatcher::{AssignmentEngine, AssignmentOutcome, LeadDistributor};
use dialer_testing_utils::{AgentBuilder, LeadBuilder, MemoryStore};

fn distributor(store: &MemoryStore) -> LeadDistributor {
    let engine = Arc::new(AssignmentEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    ));
    LeadDistributor::new(engine, Arc::new(store.clone()), Arc::new(store.clone()))
}

#[tokio::test]
async fn test_distribute_empty_queue_returns_empty_audit() {
    let store = MemoryStore::new();
    store.seed_agent(AgentBuilder::new().build());

    let results = distributor(&store).distribute_leads().await.unwrap();
    // 空列表明确表示“队列为空”，与“有线索但没坐席”可区分
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_distribute_three_leads_one_agent() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let first = store.seed_lead(
        LeadBuilder::new()
            .with_name("oldest")
            .with_created_at(now - Duration::minutes(30))
            .build(),
    );
    store.seed_lead(
        LeadBuilder::new()
            .with_name("middle")
            .with_created_at(now - Duration::minutes(20))
            .build(),
    );
    store.seed_lead(
        LeadBuilder::new()
            .with_name("newest")
            .with_created_at(now - Duration::minutes(10))
            .build(),
    );
    let agent = store.seed_agent(AgentBuilder::new().build());

    let results = distributor(&store).distribute_leads().await.unwrap();

    assert_eq!(results.len(), 3);
    // 先进先出：最老的线索拿到唯一的坐席
    assert_eq!(results[0].lead_id, first.id);
    assert_eq!(results[0].outcome, AssignmentOutcome::Assigned);
    assert_eq!(results[0].agent_id, Some(agent.id));
    assert_eq!(results[1].outcome, AssignmentOutcome::NoAvailableAgents);
    assert_eq!(results[2].outcome, AssignmentOutcome::NoAvailableAgents);
}

#[tokio::test]
async fn test_distribute_pairs_leads_with_all_idle_agents() {
    let store = MemoryStore::new();
    let now = Utc::now();
    for i in 0..3 {
        store.seed_lead(
            LeadBuilder::new()
                .with_created_at(now - Duration::minutes(30 - i))
                .build(),
        );
    }
    store.seed_agent(AgentBuilder::new().with_name("a1").build());
    store.seed_agent(AgentBuilder::new().with_name("a2").build());

    let results = distributor(&store).distribute_leads().await.unwrap();

    let assigned = results
        .iter()
        .filter(|r| r.outcome == AssignmentOutcome::Assigned)
        .count();
    assert_eq!(assigned, 2);
    assert_eq!(
        results
            .iter()
            .filter(|r| r.outcome == AssignmentOutcome::NoAvailableAgents)
            .count(),
        1
    );
    // 两个坐席分到的是不同的线索
    let mut agent_ids: Vec<i64> = results.iter().filter_map(|r| match r.outcome {
        AssignmentOutcome::Assigned => r.agent_id,
        _ => None,
    }).collect();
    agent_ids.sort_unstable();
    agent_ids.dedup();
    assert_eq!(agent_ids.len(), 2);
}

#[tokio::test]
async fn test_cooldown_lead_excluded_until_time_passes() {
    let store = MemoryStore::new();
    let cooldown_until = Utc::now() + Duration::hours(4);
    store.seed_lead(LeadBuilder::new().cooling_down(cooldown_until).build());
    store.seed_agent(AgentBuilder::new().build());

    let distributor = distributor(&store);

    // 冷却中：状态虽为New，批次不包含它
    let results = distributor.distribute_leads().await.unwrap();
    assert!(results.is_empty());

    // 冷却到期后重新可分配
    let eligible = LeadRepository::get_eligible(&store, cooldown_until + Duration::seconds(1), None)
        .await
        .unwrap();
    assert_eq!(eligible.len(), 1);
}

#[tokio::test]
async fn test_get_lead_for_agent_returns_current_lead() {
    let store = MemoryStore::new();
    let agent = store.seed_agent(AgentBuilder::new().build());
    let lead = store.seed_lead(LeadBuilder::new().assigned_to(agent.id).build());
    let mut held_agent = AgentRepository::get_by_id(&store, agent.id)
        .await
        .unwrap()
        .unwrap();
    held_agent.is_available = false;
    held_agent.current_lead = Some(lead.id);
    AgentRepository::update(&store, &held_agent).await.unwrap();

    let found = distributor(&store)
        .get_lead_for_agent(agent.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, lead.id);
}

#[tokio::test]
async fn test_get_lead_for_agent_assigns_on_demand() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let oldest = store.seed_lead(
        LeadBuilder::new()
            .with_created_at(now - Duration::minutes(10))
            .build(),
    );
    store.seed_lead(LeadBuilder::new().with_created_at(now).build());
    let agent = store.seed_agent(AgentBuilder::new().build());

    let found = distributor(&store)
        .get_lead_for_agent(agent.id)
        .await
        .unwrap()
        .unwrap();

    // 按需分配走与批量相同的原语：最老的线索、双向占用
    assert_eq!(found.id, oldest.id);
    assert_eq!(found.assigned_agent, Some(agent.id));
    let agent = AgentRepository::get_by_id(&store, agent.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(agent.current_lead, Some(oldest.id));
    assert!(!agent.is_available);
}

#[tokio::test]
async fn test_get_lead_for_agent_empty_queue() {
    let store = MemoryStore::new();
    let agent = store.seed_agent(AgentBuilder::new().build());

    let found = distributor(&store).get_lead_for_agent(agent.id).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_distribution_stats_counts() {
    let store = MemoryStore::new();
    store.seed_lead(LeadBuilder::new().build());
    store.seed_lead(LeadBuilder::new().build());
    store.seed_lead(
        LeadBuilder::new()
            .with_status(LeadStatus::NotInterested)
            .build(),
    );
    store.seed_agent(AgentBuilder::new().build());
    store.seed_agent(AgentBuilder::new().busy_with(1).build());
    store.seed_agent(AgentBuilder::new().inactive().build());

    let stats = distributor(&store).distribution_stats().await.unwrap();

    let new_count = stats
        .leads
        .iter()
        .find(|c| c.status == LeadStatus::New)
        .map(|c| c.count)
        .unwrap_or(0);
    assert_eq!(new_count, 2);
    assert_eq!(stats.agents.available, 1);
    assert_eq!(stats.agents.busy, 1);
    assert_eq!(stats.agents.inactive, 1);
    assert_eq!(stats.agents.total(), 3);
}
