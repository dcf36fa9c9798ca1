//! 开关评估性能基准测试
//!
//! 覆盖字面量、嵌套组合与分桶哈希的热路径。

use criterion::{Criterion, criterion_group, criterion_main};
use flag_engine::{
    BucketAssignmentState, BucketingHasher, EvaluationContext, FlagEngine, Identity, NoopTracker,
    SubredditMeta,
};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

fn build_engine() -> FlagEngine {
    FlagEngine::builder()
        .with_builtins(
            Arc::new(NoopTracker),
            Arc::new(BucketAssignmentState::new()),
        )
        .unwrap()
        .build(&json!({
            "literal": true,
            "smartbanner": {
                "and": [
                    {"allowedPages": ["index", "listing"]},
                    {"disallowNSFW": false},
                    {"allowedDevices": ["ios-iphone", "ios-ipad", "android"]}
                ]
            },
            "nested": {
                "and": [
                    {"loggedIn": false},
                    {"or": [
                        {"urlParam": "mixedview"},
                        {"compact": false},
                        {"allowedPages": ["index"]}
                    ]}
                ]
            },
            "bucketed": {
                "percentageBucket": {"seed": "bench", "percentage": 50}
            }
        }))
        .unwrap()
}

fn bench_context() -> EvaluationContext {
    EvaluationContext::new()
        .with_identity(Identity {
            name: "bench".to_string(),
            id: "1".to_string(),
            logged_out: true,
            ..Identity::default()
        })
        .with_route_name("listing")
        .with_device("android")
        .with_subreddit("aww")
        .with_subreddit_meta("aww", SubredditMeta { over_18: false })
        .with_content_id("t3_bench")
}

/// 开关查询基准
fn bench_is_enabled(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_enabled");

    let engine = build_engine();
    let ctx = bench_context();

    group.bench_function("literal", |b| {
        b.iter(|| engine.is_enabled(black_box("literal"), black_box(&ctx)))
    });

    group.bench_function("smartbanner", |b| {
        b.iter(|| engine.is_enabled(black_box("smartbanner"), black_box(&ctx)))
    });

    group.bench_function("nested_groups", |b| {
        b.iter(|| engine.is_enabled(black_box("nested"), black_box(&ctx)))
    });

    group.bench_function("percentage_bucket", |b| {
        b.iter(|| engine.is_enabled(black_box("bucketed"), black_box(&ctx)))
    });

    group.finish();
}

/// 分桶哈希基准
fn bench_bucketing(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucketing");

    group.bench_function("bucket", |b| {
        b.iter(|| BucketingHasher::bucket(black_box("seed"), black_box("t3_abc123")))
    });

    group.finish();
}

criterion_group!(benches, bench_is_enabled, bench_bucketing);
criterion_main!(benches);
