use std::sync::Arc;

use chrono::{Duration, Utc};

use dialer_core::models::LeadStatus;
use dialer_core::DialerError;
use dialer_dispatcher::AssignmentEngine;
use dialer_testing_utils::{AgentBuilder, LeadBuilder, MemoryStore};

fn engine(store: &MemoryStore) -> AssignmentEngine {
    AssignmentEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    )
}

#[tokio::test]
async fn test_assign_updates_both_sides_atomically() {
    let store = MemoryStore::new();
    let lead = store.seed_lead(LeadBuilder::new().build());
    let agent = store.seed_agent(AgentBuilder::new().build());

    let engine = engine(&store);
    let pair = engine
        .assign_lead_to_agent(lead.id, agent.id)
        .await
        .unwrap();

    assert_eq!(pair.lead.status, LeadStatus::Assigned);
    assert_eq!(pair.lead.assigned_agent, Some(agent.id));
    assert!(pair.lead.last_call_attempt.is_some());
    assert!(pair.lead.next_eligible_time.is_none());

    assert!(!pair.agent.is_available);
    assert_eq!(pair.agent.current_lead, Some(lead.id));
}

#[tokio::test]
async fn test_assign_missing_entities() {
    let store = MemoryStore::new();
    let agent = store.seed_agent(AgentBuilder::new().build());
    let lead = store.seed_lead(LeadBuilder::new().build());

    let engine = engine(&store);

    let err = engine.assign_lead_to_agent(999, agent.id).await.unwrap_err();
    assert!(matches!(err, DialerError::LeadNotFound { id: 999 }));

    let err = engine.assign_lead_to_agent(lead.id, 999).await.unwrap_err();
    assert!(matches!(err, DialerError::AgentNotFound { id: 999 }));
}

#[tokio::test]
async fn test_assign_rejects_busy_agent_and_held_lead() {
    let store = MemoryStore::new();
    let held = store.seed_lead(LeadBuilder::new().assigned_to(42).build());
    let fresh = store.seed_lead(LeadBuilder::new().build());
    let busy = store.seed_agent(AgentBuilder::new().busy_with(held.id).build());
    let idle = store.seed_agent(AgentBuilder::new().build());

    let engine = engine(&store);

    let err = engine
        .assign_lead_to_agent(fresh.id, busy.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DialerError::AgentUnavailable { .. }));

    let err = engine
        .assign_lead_to_agent(held.id, idle.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DialerError::LeadUnavailable { .. }));
}

#[tokio::test]
async fn test_assign_rejects_lead_in_cooldown() {
    let store = MemoryStore::new();
    let cooling = store.seed_lead(
        LeadBuilder::new()
            .cooling_down(Utc::now() + Duration::hours(2))
            .build(),
    );
    let agent = store.seed_agent(AgentBuilder::new().build());

    let engine = engine(&store);
    let err = engine
        .assign_lead_to_agent(cooling.id, agent.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DialerError::LeadUnavailable { .. }));
}

#[tokio::test]
async fn test_concurrent_assigns_for_same_agent_yield_one_winner() {
    let store = MemoryStore::new();
    let lead_a = store.seed_lead(LeadBuilder::new().with_name("lead_a").build());
    let lead_b = store.seed_lead(LeadBuilder::new().with_name("lead_b").build());
    let agent = store.seed_agent(AgentBuilder::new().build());

    let engine = Arc::new(engine(&store));
    let (lead_a_id, lead_b_id, agent_id) = (lead_a.id, lead_b.id, agent.id);

    let e1 = Arc::clone(&engine);
    let e2 = Arc::clone(&engine);
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { e1.assign_lead_to_agent(lead_a_id, agent_id).await }),
        tokio::spawn(async move { e2.assign_lead_to_agent(lead_b_id, agent_id).await }),
    );
    let r1 = r1.unwrap();
    let r2 = r2.unwrap();

    // 恰好一个成功，输家收到AgentUnavailable且不破坏赢家状态
    assert_eq!(r1.is_ok() as u8 + r2.is_ok() as u8, 1);
    let loser = if r1.is_ok() { r2 } else { r1 };
    assert!(matches!(
        loser.unwrap_err(),
        DialerError::AgentUnavailable { .. }
    ));

    let winner_lead_id = dialer_core::traits::AgentRepository::get_by_id(&store, agent_id)
        .await
        .unwrap()
        .unwrap()
        .current_lead
        .unwrap();
    let winner_lead = dialer_core::traits::LeadRepository::get_by_id(&store, winner_lead_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(winner_lead.assigned_agent, Some(agent_id));

    // 输掉的线索保持可分配状态，没有部分写入
    let loser_lead_id = if winner_lead_id == lead_a_id {
        lead_b_id
    } else {
        lead_a_id
    };
    let loser_lead = dialer_core::traits::LeadRepository::get_by_id(&store, loser_lead_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loser_lead.status, LeadStatus::New);
    assert!(loser_lead.assigned_agent.is_none());
}

#[tokio::test]
async fn test_find_idle_agent_prefers_least_recently_active() {
    let store = MemoryStore::new();
    let now = Utc::now();
    store.seed_agent(
        AgentBuilder::new()
            .with_name("recent")
            .with_last_activity_at(now)
            .build(),
    );
    let stale = store.seed_agent(
        AgentBuilder::new()
            .with_name("stale")
            .with_last_activity_at(now - Duration::hours(3))
            .build(),
    );
    store.seed_agent(
        AgentBuilder::new()
            .with_name("inactive")
            .with_last_activity_at(now - Duration::hours(9))
            .inactive()
            .build(),
    );

    let engine = engine(&store);
    let picked = engine.find_idle_agent().await.unwrap().unwrap();
    assert_eq!(picked.id, stale.id);
}

#[tokio::test]
async fn test_find_idle_agent_none_when_pool_empty() {
    let store = MemoryStore::new();
    store.seed_agent(AgentBuilder::new().busy_with(1).build());
    store.seed_agent(AgentBuilder::new().inactive().build());

    let engine = engine(&store);
    assert!(engine.find_idle_agent().await.unwrap().is_none());
}
