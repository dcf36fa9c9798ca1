//! 特性开关评估引擎
//!
//! 对每次请求的上下文快照评估布尔"特性开关"，支持：
//! - 声明式规则树（布尔字面量、谓词叶子、任意嵌套的 And/Or 组合）
//! - 可插拔的命名谓词，初始化时注册一次，构建期急切校验
//! - 按序短路求值，靠后的带副作用子节点不会被触达
//! - 基于 SHA-1 的确定性百分比分桶，跨进程、跨语言可复现
//! - 每实验每进程至多一次的分桶曝光上报
//!
//! 评估是同步、无 I/O 的纯内存操作；引擎构建后只读，可并发查询。

pub mod bucketing;
pub mod compiler;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod predicates;
pub mod registry;
pub mod tracker;

pub use bucketing::BucketingHasher;
pub use compiler::FlagCompiler;
pub use context::{
    AnonymousId, EvaluationContext, Identity, RuntimeEnv, SubredditMeta, VariantAssignment,
};
pub use engine::{FlagEngine, FlagEngineBuilder};
pub use error::{FlagError, Result};
pub use evaluator::Evaluator;
pub use model::{FlagTable, RuleNode};
pub use registry::{PredicateFn, PredicateRegistry};
pub use tracker::{
    BUCKETING_EVENT_CATEGORY, BUCKETING_EVENT_NAME, BucketAssignmentState, EventTracker,
    ExposurePayload, NoopTracker,
};
