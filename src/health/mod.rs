//! 健康检测模块
//!
//! 提供HTTP探测、健康状态机、派发调度器和检测工作者

pub mod checker;
pub mod result;
pub mod scheduler;
pub mod state;
pub mod worker;

// 重新导出主要类型
pub use checker::{HealthChecker, HttpHealthChecker, ProbeTarget};
pub use result::{MonitorStatus, ProbeResult};
pub use scheduler::DispatchScheduler;
pub use state::{HealthPolicy, HealthState, Transition};
pub use worker::{MessageOutcome, Worker};
