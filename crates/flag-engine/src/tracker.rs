//! 曝光事件上报与一次性分桶状态
//!
//! 定义面向外部事件收集器的窄契约 `EventTracker`，以及进程级的
//! `BucketAssignmentState`——用于保证每个实验每个进程生命周期内
//! 至多上报一次分桶曝光事件。

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use serde::Serialize;
use serde_json::Value;

/// 曝光事件的类别与名称（负载键名同为对外契约的一部分）
pub const BUCKETING_EVENT_CATEGORY: &str = "bucketing_events";
pub const BUCKETING_EVENT_NAME: &str = "cs.bucket";

/// 外部事件收集器的窄契约
///
/// 上报是同步调用，实现方不得阻塞；引擎对上报结果不关心，
/// 事件发送与否不影响评估返回值。
pub trait EventTracker: Send + Sync {
    fn track(&self, category: &str, event: &str, payload: Value);
}

/// 丢弃所有事件的收集器，用于服务端渲染或测试
#[derive(Debug, Default)]
pub struct NoopTracker;

impl EventTracker for NoopTracker {
    fn track(&self, _category: &str, _event: &str, _payload: Value) {}
}

/// 分桶曝光负载
///
/// 登录用户携带 `user_id`（36 进制解码后的数值）与 `user_name`；
/// 匿名用户携带 `loid` 与 `loidcreated`。值为 None 的字段序列化时省略。
#[derive(Debug, Clone, Serialize)]
pub struct ExposurePayload {
    pub experiment_id: i64,
    pub experiment_name: String,
    pub variant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loidcreated: Option<DateTime<Utc>>,
}

/// 进程级"已分桶实验"集合
///
/// 由引擎实例显式持有并注入谓词，不做模块级全局状态，
/// 以便测试隔离与多租户使用。仅在进程重启时清空。
#[derive(Debug, Default)]
pub struct BucketAssignmentState {
    seen: DashSet<String>,
}

impl BucketAssignmentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 原子 check-and-set：首次记录该实验时返回 true
    ///
    /// 并发评估同一实验时只有一个调用方拿到 true，
    /// 从而保证每实验至多一次曝光上报。
    pub fn try_record(&self, experiment: &str) -> bool {
        self.seen.insert(experiment.to_string())
    }

    pub fn contains(&self, experiment: &str) -> bool {
        self.seen.contains(experiment)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_try_record_once() {
        let state = BucketAssignmentState::new();

        assert!(state.try_record("exp_a"));
        assert!(!state.try_record("exp_a"));
        assert!(state.try_record("exp_b"));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_concurrent_record_single_winner() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::thread;

        let state = Arc::new(BucketAssignmentState::new());
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                let wins = Arc::clone(&wins);
                thread::spawn(move || {
                    if state.try_record("exp_shared") {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_payload_omits_none_fields() {
        let payload = ExposurePayload {
            experiment_id: 42,
            experiment_name: "exp_a".to_string(),
            variant: "control".to_string(),
            user_id: None,
            user_name: None,
            loid: Some("anon-1".to_string()),
            loidcreated: None,
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["experiment_id"], json!(42));
        assert_eq!(value["loid"], json!("anon-1"));
        assert!(value.get("user_id").is_none());
        assert!(value.get("user_name").is_none());
        assert!(value.get("loidcreated").is_none());
    }
}
