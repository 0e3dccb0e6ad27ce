use std::sync::Arc;

use chrono::{Duration, Utc};

use dialer_core::models::{
    Agent, CallOutcome, CallStatus, Lead, LeadStatus, MeetingDetails,
};
use dialer_core::traits::{AgentRepository, CallRepository, LeadRepository};
use dialer_core::DialerError;
use dialer_dispatcher::{CallController, EndCallRequest, RequeuePolicy};
use dialer_testing_utils::{AgentBuilder, LeadBuilder, MemoryStore};

fn controller(store: &MemoryStore) -> CallController {
    CallController::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        RequeuePolicy::default(),
    )
}

/// 构造一对已分配的线索/坐席
fn seed_held_pair(store: &MemoryStore) -> (Lead, Agent) {
    let agent = store.seed_agent(AgentBuilder::new().build());
    let lead = store.seed_lead(LeadBuilder::new().assigned_to(agent.id).build());
    let agent = store.seed_agent(AgentBuilder::new().with_id(agent.id).busy_with(lead.id).build());
    (lead, agent)
}

fn end_request(agent_id: i64, outcome: CallOutcome) -> EndCallRequest {
    EndCallRequest {
        call_id: None,
        agent_id,
        outcome,
        notes: Some("测试备注".to_string()),
        recording_url: None,
        quality: None,
        meeting_details: None,
    }
}

#[tokio::test]
async fn test_start_call_creates_in_progress_call() {
    let store = MemoryStore::new();
    let (lead, agent) = seed_held_pair(&store);

    let call = controller(&store).start_call(lead.id, agent.id).await.unwrap();

    assert_eq!(call.status, CallStatus::InProgress);
    assert_eq!(call.lead_id, lead.id);
    assert_eq!(call.agent_id, agent.id);
    assert!(call.ended_at.is_none());

    let lead = LeadRepository::get_by_id(&store, lead.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.status, LeadStatus::Calling);
    assert!(lead.last_call_attempt.is_some());
}

#[tokio::test]
async fn test_start_call_on_foreign_lead_is_forbidden() {
    let store = MemoryStore::new();
    let (lead, _owner) = seed_held_pair(&store);
    let intruder = store.seed_agent(AgentBuilder::new().with_name("intruder").build());

    let err = controller(&store)
        .start_call(lead.id, intruder.id)
        .await
        .unwrap_err();

    assert!(matches!(err, DialerError::Forbidden(_)));
    // 没有创建任何通话记录
    assert_eq!(
        CallRepository::count_by_agent(&store, intruder.id)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_start_call_twice_is_conflict() {
    let store = MemoryStore::new();
    let (lead, agent) = seed_held_pair(&store);
    let controller = controller(&store);

    controller.start_call(lead.id, agent.id).await.unwrap();
    let err = controller.start_call(lead.id, agent.id).await.unwrap_err();

    assert!(matches!(err, DialerError::CallInProgress { .. }));
    assert_eq!(
        CallRepository::count_by_agent(&store, agent.id).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_end_call_no_answer_requeues_with_cooldown() {
    let store = MemoryStore::new();
    let (lead, agent) = seed_held_pair(&store);
    let controller = controller(&store);

    controller.start_call(lead.id, agent.id).await.unwrap();
    let before = Utc::now();
    let call = controller
        .end_call(end_request(agent.id, CallOutcome::NoAnswer))
        .await
        .unwrap();

    assert_eq!(call.status, CallStatus::NoAnswer);
    assert!(call.duration_seconds.is_some());

    // 线索：回到队列但带4小时冷却
    let lead = LeadRepository::get_by_id(&store, lead.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.status, LeadStatus::New);
    assert_eq!(lead.retry_count, 1);
    let next = lead.next_eligible_time.expect("冷却时间必须写入");
    assert!(next >= before + Duration::hours(4));
    assert!(lead.assigned_agent.is_none());

    // 坐席：释放并计数
    let agent = AgentRepository::get_by_id(&store, agent.id)
        .await
        .unwrap()
        .unwrap();
    assert!(agent.is_available);
    assert!(agent.current_lead.is_none());
    assert_eq!(agent.stats.total_calls, 1);
    assert_eq!(agent.stats.successful_calls, 0);
}

#[tokio::test]
async fn test_end_call_no_answer_third_attempt_terminates_lead() {
    let store = MemoryStore::new();
    let agent = store.seed_agent(AgentBuilder::new().build());
    let lead = store.seed_lead(
        LeadBuilder::new()
            .with_retry_count(2)
            .assigned_to(agent.id)
            .build(),
    );
    store.seed_agent(AgentBuilder::new().with_id(agent.id).busy_with(lead.id).build());
    let controller = controller(&store);

    controller.start_call(lead.id, agent.id).await.unwrap();
    controller
        .end_call(end_request(agent.id, CallOutcome::NoAnswer))
        .await
        .unwrap();

    let lead = LeadRepository::get_by_id(&store, lead.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.status, LeadStatus::NotInterested);
    assert_eq!(lead.retry_count, 3);
    assert!(lead.next_eligible_time.is_none());
}

#[tokio::test]
async fn test_end_call_twice_is_already_closed_and_counts_once() {
    let store = MemoryStore::new();
    let (lead, agent) = seed_held_pair(&store);
    let controller = controller(&store);

    controller.start_call(lead.id, agent.id).await.unwrap();
    let call = controller
        .end_call(end_request(agent.id, CallOutcome::Completed))
        .await
        .unwrap();

    let mut second = end_request(agent.id, CallOutcome::Completed);
    second.call_id = Some(call.id);
    let err = controller.end_call(second).await.unwrap_err();
    assert!(matches!(err, DialerError::CallAlreadyClosed { .. }));

    // 统计只累计一次
    let agent = AgentRepository::get_by_id(&store, agent.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(agent.stats.total_calls, 1);
}

#[tokio::test]
async fn test_end_call_without_id_resolves_active_call() {
    let store = MemoryStore::new();
    let (lead, agent) = seed_held_pair(&store);
    let controller = controller(&store);

    let started = controller.start_call(lead.id, agent.id).await.unwrap();
    let ended = controller
        .end_call(end_request(agent.id, CallOutcome::NotInterested))
        .await
        .unwrap();

    assert_eq!(started.id, ended.id);
    assert!(controller.active_call(agent.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_end_call_without_active_call() {
    let store = MemoryStore::new();
    let agent = store.seed_agent(AgentBuilder::new().build());

    let err = controller(&store)
        .end_call(end_request(agent.id, CallOutcome::Completed))
        .await
        .unwrap_err();
    assert!(matches!(err, DialerError::NoActiveCall { .. }));
}

#[tokio::test]
async fn test_end_call_by_wrong_agent_is_forbidden() {
    let store = MemoryStore::new();
    let (lead, agent) = seed_held_pair(&store);
    let other = store.seed_agent(AgentBuilder::new().with_name("other").build());
    let controller = controller(&store);

    let call = controller.start_call(lead.id, agent.id).await.unwrap();

    let mut request = end_request(other.id, CallOutcome::Completed);
    request.call_id = Some(call.id);
    let err = controller.end_call(request).await.unwrap_err();
    assert!(matches!(err, DialerError::Forbidden(_)));
}

#[tokio::test]
async fn test_meeting_scheduled_copies_details_and_counts() {
    let store = MemoryStore::new();
    let (lead, agent) = seed_held_pair(&store);
    let controller = controller(&store);

    controller.start_call(lead.id, agent.id).await.unwrap();

    let details = MeetingDetails {
        scheduled_at: Some(Utc::now() + Duration::days(2)),
        location: Some("华沙办公室".to_string()),
        notes: Some("带合同".to_string()),
    };
    let mut request = end_request(agent.id, CallOutcome::MeetingScheduled);
    request.meeting_details = Some(details.clone());
    controller.end_call(request).await.unwrap();

    let lead = LeadRepository::get_by_id(&store, lead.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.status, LeadStatus::MeetingScheduled);
    assert_eq!(lead.meeting_details, Some(details));

    let agent = AgentRepository::get_by_id(&store, agent.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(agent.stats.successful_calls, 1);
    assert_eq!(agent.stats.meetings_scheduled, 1);
}

#[tokio::test]
async fn test_call_history_appends_in_completion_order() {
    let store = MemoryStore::new();
    let agent = store.seed_agent(AgentBuilder::new().build());
    let lead = store.seed_lead(LeadBuilder::new().assigned_to(agent.id).build());
    store.seed_agent(AgentBuilder::new().with_id(agent.id).busy_with(lead.id).build());
    let controller = controller(&store);

    // 第一轮：未接，线索回到队列
    controller.start_call(lead.id, agent.id).await.unwrap();
    controller
        .end_call(end_request(agent.id, CallOutcome::NoAnswer))
        .await
        .unwrap();

    // 第二轮：手动重新分配后完成
    let mut lead2 = LeadRepository::get_by_id(&store, lead.id)
        .await
        .unwrap()
        .unwrap();
    lead2.status = LeadStatus::Assigned;
    lead2.assigned_agent = Some(agent.id);
    lead2.next_eligible_time = None;
    LeadRepository::update(&store, &lead2).await.unwrap();
    let mut agent2 = AgentRepository::get_by_id(&store, agent.id)
        .await
        .unwrap()
        .unwrap();
    agent2.is_available = false;
    agent2.current_lead = Some(lead.id);
    AgentRepository::update(&store, &agent2).await.unwrap();

    controller.start_call(lead.id, agent.id).await.unwrap();
    controller
        .end_call(end_request(agent.id, CallOutcome::Completed))
        .await
        .unwrap();

    let history = LeadRepository::get_history(&store, lead.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].outcome, CallOutcome::NoAnswer);
    assert_eq!(history[1].outcome, CallOutcome::Completed);
    assert!(history[0].recorded_at <= history[1].recorded_at);

    // 坐席统计随两次通话累计
    let agent = AgentRepository::get_by_id(&store, agent.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(agent.stats.total_calls, 2);

    let (calls, total) = controller.call_history(agent.id, 1, 10).await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(calls.len(), 2);
    // 倒序：最近的通话在前
    assert!(calls[0].started_at >= calls[1].started_at);
}
