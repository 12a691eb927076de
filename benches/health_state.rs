//! 状态机与检测任务编解码基准测试
//!
//! 工作者处理每条消息都会解析任务并应用一次状态机

use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use uptime_vitals::health::{HealthPolicy, HealthState, MonitorStatus};
use uptime_vitals::monitor::{CheckJob, MonitorInput};

/// 状态机基准测试
fn health_state_benchmark(c: &mut Criterion) {
    let policy = HealthPolicy::default();

    c.bench_function("health_state_apply", |b| {
        let state = HealthState::new(MonitorStatus::Up, 1, 0);
        b.iter(|| black_box(state).apply(black_box(false), &policy));
    });

    // 交替的探测结果，模拟抖动的服务
    c.bench_function("health_state_flapping_sequence", |b| {
        let probes = [false, false, true, false, true, true, false, true];
        b.iter(|| {
            let mut state = HealthState::default();
            let mut notifications = 0;
            for up in probes {
                let transition = state.apply(up, &policy);
                if transition.should_notify() {
                    notifications += 1;
                }
                state = transition.next;
            }
            black_box((state, notifications))
        });
    });
}

/// 检测任务编解码基准测试
fn check_job_benchmark(c: &mut Criterion) {
    let monitor = MonitorInput {
        name: "orders-api".to_string(),
        url: "https://orders.internal/health".to_string(),
        check_interval: 60,
        timeout: 5,
        expected_status_code: 200,
        webhook_url: Some("https://hooks.slack.com/services/T000/B000/XXXX".to_string()),
        enabled: true,
    }
    .into_monitor(42, Utc::now());
    let job = CheckJob::for_monitor(&monitor, Utc::now());
    let body = job.to_json().unwrap();

    c.bench_function("check_job_to_json", |b| {
        b.iter(|| black_box(&job).to_json().unwrap());
    });

    c.bench_function("check_job_parse", |b| {
        b.iter(|| CheckJob::parse(black_box(&body)).unwrap());
    });
}

criterion_group!(benches, health_state_benchmark, check_job_benchmark);
criterion_main!(benches);
