//! 健康状态机
//!
//! 纯决策逻辑：根据当前状态、连续计数和本次探测结果，计算新的状态与计数，
//! 并判断是否需要发送通知。状态只在计数达到阈值时翻转，且一旦离开
//! `UNKNOWN` 就不会回到 `UNKNOWN`。

use crate::health::result::MonitorStatus;
use serde::{Deserialize, Serialize};

/// 状态翻转阈值（进程级配置，对所有监控生效）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPolicy {
    /// 连续失败多少次后判定为 DOWN
    pub failure_threshold: u32,
    /// 连续成功多少次后判定为 UP
    pub success_threshold: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 2,
            success_threshold: 2,
        }
    }
}

/// 单个监控持久化的健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealthState {
    /// 当前状态
    pub status: MonitorStatus,
    /// 连续失败次数
    pub consecutive_failures: u32,
    /// 连续成功次数
    pub consecutive_successes: u32,
}

/// 一次探测应用到状态机后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// 探测前的状态
    pub previous: HealthState,
    /// 探测后的状态
    pub next: HealthState,
}

impl HealthState {
    /// 构造指定状态与计数
    pub fn new(status: MonitorStatus, consecutive_failures: u32, consecutive_successes: u32) -> Self {
        Self {
            status,
            consecutive_failures,
            consecutive_successes,
        }
    }

    /// 应用一次探测结果
    ///
    /// 成功时失败计数清零，失败时成功计数清零，因此处理后两个计数至多一个非零。
    pub fn apply(self, up: bool, policy: &HealthPolicy) -> Transition {
        let mut next = self;

        if up {
            next.consecutive_successes = self.consecutive_successes.saturating_add(1);
            next.consecutive_failures = 0;
            if self.status != MonitorStatus::Up
                && next.consecutive_successes >= policy.success_threshold
            {
                next.status = MonitorStatus::Up;
            }
        } else {
            next.consecutive_failures = self.consecutive_failures.saturating_add(1);
            next.consecutive_successes = 0;
            if self.status != MonitorStatus::Down
                && next.consecutive_failures >= policy.failure_threshold
            {
                next.status = MonitorStatus::Down;
            }
        }

        Transition {
            previous: self,
            next,
        }
    }
}

impl Transition {
    /// 状态是否发生了变化
    pub fn status_changed(&self) -> bool {
        self.previous.status != self.next.status
    }

    /// 是否需要发送通知：状态变化且新状态为 UP 或 DOWN
    pub fn should_notify(&self) -> bool {
        self.status_changed()
            && matches!(self.next.status, MonitorStatus::Up | MonitorStatus::Down)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(failure_threshold: u32, success_threshold: u32) -> HealthPolicy {
        HealthPolicy {
            failure_threshold,
            success_threshold,
        }
    }

    fn run(start: HealthState, probes: &[bool], policy: &HealthPolicy) -> (HealthState, Vec<Transition>) {
        let mut state = start;
        let mut notified = Vec::new();
        for &up in probes {
            let transition = state.apply(up, policy);
            if transition.should_notify() {
                notified.push(transition);
            }
            state = transition.next;
        }
        (state, notified)
    }

    #[test]
    fn test_unknown_to_down_to_up_scenario() {
        let p = policy(2, 2);
        let start = HealthState::default();

        let first = start.apply(false, &p);
        assert_eq!(first.next, HealthState::new(MonitorStatus::Unknown, 1, 0));
        assert!(!first.should_notify());

        let second = first.next.apply(false, &p);
        assert_eq!(second.next, HealthState::new(MonitorStatus::Down, 2, 0));
        assert!(second.should_notify());
        assert_eq!(second.previous.status, MonitorStatus::Unknown);

        let third = second.next.apply(true, &p);
        assert_eq!(third.next, HealthState::new(MonitorStatus::Down, 0, 1));
        assert!(!third.should_notify());

        let fourth = third.next.apply(true, &p);
        assert_eq!(fourth.next, HealthState::new(MonitorStatus::Up, 0, 2));
        assert!(fourth.should_notify());
        assert_eq!(fourth.previous.status, MonitorStatus::Down);
    }

    #[test]
    fn test_single_failure_below_threshold_keeps_up() {
        let p = policy(2, 2);
        let transition = HealthState::new(MonitorStatus::Up, 0, 5).apply(false, &p);

        assert_eq!(transition.next, HealthState::new(MonitorStatus::Up, 1, 0));
        assert!(!transition.should_notify());
    }

    #[test]
    fn test_threshold_of_one_flips_immediately() {
        let p = policy(1, 1);
        let down = HealthState::default().apply(false, &p);
        assert_eq!(down.next.status, MonitorStatus::Down);
        assert!(down.should_notify());

        let up = down.next.apply(true, &p);
        assert_eq!(up.next.status, MonitorStatus::Up);
        assert!(up.should_notify());
    }

    #[test]
    fn test_steady_state_never_notifies() {
        let p = policy(2, 3);
        let (state, notified) = run(HealthState::new(MonitorStatus::Up, 0, 3), &[true; 20], &p);
        assert_eq!(state.status, MonitorStatus::Up);
        assert!(notified.is_empty());

        let (state, notified) = run(HealthState::new(MonitorStatus::Down, 2, 0), &[false; 20], &p);
        assert_eq!(state.status, MonitorStatus::Down);
        assert_eq!(state.consecutive_failures, 22);
        assert!(notified.is_empty());
    }

    #[test]
    fn test_flapping_below_thresholds_stays_unknown() {
        let p = policy(2, 2);
        let probes = [true, false, true, false, true, false, true, false];
        let (state, notified) = run(HealthState::default(), &probes, &p);

        assert_eq!(state.status, MonitorStatus::Unknown);
        assert!(notified.is_empty());
    }

    /// 枚举所有长度不超过10的探测序列，检查滞回、计数互斥和不回退性质
    #[test]
    fn test_hysteresis_properties_over_all_sequences() {
        for (f, s) in [(1, 1), (2, 2), (3, 2), (2, 4)] {
            let p = policy(f, s);
            for len in 0..=10u32 {
                for bits in 0..(1u32 << len) {
                    let probes: Vec<bool> = (0..len).map(|i| bits & (1 << i) != 0).collect();
                    let mut state = HealthState::default();
                    let mut run_failures = 0u32;
                    let mut run_successes = 0u32;

                    for &up in &probes {
                        if up {
                            run_successes += 1;
                            run_failures = 0;
                        } else {
                            run_failures += 1;
                            run_successes = 0;
                        }

                        let transition = state.apply(up, &p);
                        let next = transition.next;

                        assert!(next.consecutive_failures == 0 || next.consecutive_successes == 0);
                        assert_eq!(next.consecutive_failures, run_failures);
                        assert_eq!(next.consecutive_successes, run_successes);

                        if transition.status_changed() {
                            assert!(transition.should_notify());
                            match next.status {
                                MonitorStatus::Down => assert!(run_failures >= f),
                                MonitorStatus::Up => assert!(run_successes >= s),
                                MonitorStatus::Unknown => panic!("状态回退到 UNKNOWN"),
                            }
                        }
                        if state.status != MonitorStatus::Unknown {
                            assert_ne!(next.status, MonitorStatus::Unknown);
                        }

                        state = next;
                    }
                }
            }
        }
    }
}
