use chrono::{DateTime, Duration, Utc};

use dialer_core::config::CallPolicyConfig;
use dialer_core::models::{CallOutcome, LeadStatus};

/// 重排策略配置
#[derive(Debug, Clone)]
pub struct RequeuePolicy {
    /// 未接重试上限，到达后线索终止为NotInterested
    pub max_retries: i32,
    /// 未接后的冷却时长，冷却期内线索不参与分配
    pub no_answer_cooldown: Duration,
}

impl Default for RequeuePolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            no_answer_cooldown: Duration::hours(4),
        }
    }
}

impl From<&CallPolicyConfig> for RequeuePolicy {
    fn from(config: &CallPolicyConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            no_answer_cooldown: Duration::minutes(config.no_answer_cooldown_minutes),
        }
    }
}

/// 由通话结果确定的线索状态迁移
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadTransition {
    pub status: LeadStatus,
    pub retry_count: i32,
    pub next_eligible_time: Option<DateTime<Utc>>,
}

impl RequeuePolicy {
    /// 结果 → 线索迁移，纯函数
    ///
    /// match对CallOutcome穷尽，新增结果时这里无法编译通过，
    /// 必须显式补一行策略。
    pub fn decide(
        &self,
        outcome: CallOutcome,
        retry_count: i32,
        now: DateTime<Utc>,
    ) -> LeadTransition {
        match outcome {
            CallOutcome::NoAnswer => {
                let attempted = retry_count + 1;
                if attempted >= self.max_retries {
                    // 重试耗尽，线索永久离开队列
                    LeadTransition {
                        status: LeadStatus::NotInterested,
                        retry_count: attempted.min(self.max_retries),
                        next_eligible_time: None,
                    }
                } else {
                    // 回到队列，但冷却期内不参与分配
                    LeadTransition {
                        status: LeadStatus::New,
                        retry_count: attempted,
                        next_eligible_time: Some(now + self.no_answer_cooldown),
                    }
                }
            }
            CallOutcome::NotInterested => LeadTransition {
                status: LeadStatus::NotInterested,
                retry_count,
                next_eligible_time: None,
            },
            CallOutcome::MeetingScheduled => LeadTransition {
                status: LeadStatus::MeetingScheduled,
                retry_count,
                next_eligible_time: None,
            },
            CallOutcome::Completed | CallOutcome::CallRecorded => LeadTransition {
                status: LeadStatus::Completed,
                retry_count,
                next_eligible_time: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_answer_first_attempt_requeues_with_cooldown() {
        let policy = RequeuePolicy::default();
        let now = Utc::now();

        let transition = policy.decide(CallOutcome::NoAnswer, 0, now);

        assert_eq!(transition.status, LeadStatus::New);
        assert_eq!(transition.retry_count, 1);
        assert_eq!(transition.next_eligible_time, Some(now + Duration::hours(4)));
    }

    #[test]
    fn test_no_answer_final_attempt_terminates_lead() {
        let policy = RequeuePolicy::default();
        let now = Utc::now();

        let transition = policy.decide(CallOutcome::NoAnswer, 2, now);

        assert_eq!(transition.status, LeadStatus::NotInterested);
        assert_eq!(transition.retry_count, 3);
        assert_eq!(transition.next_eligible_time, None);
    }

    #[test]
    fn test_retry_count_never_exceeds_cap() {
        let policy = RequeuePolicy::default();
        let now = Utc::now();

        // 即使输入已经在上限，也不会越过3
        let transition = policy.decide(CallOutcome::NoAnswer, 3, now);
        assert_eq!(transition.retry_count, 3);
        assert_eq!(transition.status, LeadStatus::NotInterested);
    }

    #[test]
    fn test_not_interested_clears_cooldown() {
        let policy = RequeuePolicy::default();
        let transition = policy.decide(CallOutcome::NotInterested, 1, Utc::now());

        assert_eq!(transition.status, LeadStatus::NotInterested);
        assert_eq!(transition.retry_count, 1);
        assert_eq!(transition.next_eligible_time, None);
    }

    #[test]
    fn test_meeting_scheduled_keeps_retry_count() {
        let policy = RequeuePolicy::default();
        let transition = policy.decide(CallOutcome::MeetingScheduled, 2, Utc::now());

        assert_eq!(transition.status, LeadStatus::MeetingScheduled);
        assert_eq!(transition.retry_count, 2);
        assert_eq!(transition.next_eligible_time, None);
    }

    #[test]
    fn test_completed_and_call_recorded_both_complete_lead() {
        let policy = RequeuePolicy::default();
        let now = Utc::now();

        for outcome in [CallOutcome::Completed, CallOutcome::CallRecorded] {
            let transition = policy.decide(outcome, 0, now);
            assert_eq!(transition.status, LeadStatus::Completed);
            assert_eq!(transition.next_eligible_time, None);
        }
    }

    #[test]
    fn test_cooldown_from_config() {
        let config = CallPolicyConfig {
            max_retries: 2,
            no_answer_cooldown_minutes: 30,
        };
        let policy = RequeuePolicy::from(&config);
        let now = Utc::now();

        let transition = policy.decide(CallOutcome::NoAnswer, 0, now);
        assert_eq!(
            transition.next_eligible_time,
            Some(now + Duration::minutes(30))
        );

        // max_retries=2时第二次未接即终止
        let transition = policy.decide(CallOutcome::NoAnswer, 1, now);
        assert_eq!(transition.status, LeadStatus::NotInterested);
        assert_eq!(transition.retry_count, 2);
    }
}
