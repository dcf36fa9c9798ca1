//! 开关引擎门面
//!
//! 组合开关表、谓词注册表与求值器。谓词注册发生在 build 之前，
//! 这样配置中的谓词名可以在构建期被急切校验，而不是等到
//! 某次请求命中未知谓词才失败。

use crate::compiler::FlagCompiler;
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::model::FlagTable;
use crate::predicates::register_builtins;
use crate::registry::PredicateRegistry;
use crate::tracker::{BucketAssignmentState, EventTracker};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// 开关引擎
///
/// 构建完成后完全只读，可跨线程并发查询；唯一的共享可变状态
/// （一次性分桶集合）封装在 `variant` 谓词注入的
/// `BucketAssignmentState` 中。
#[derive(Debug)]
pub struct FlagEngine {
    table: FlagTable,
    registry: PredicateRegistry,
}

impl FlagEngine {
    pub fn builder() -> FlagEngineBuilder {
        FlagEngineBuilder::default()
    }

    /// 查询某个开关对当前上下文是否开启
    #[instrument(level = "debug", skip(self, context))]
    pub fn is_enabled(&self, flag: &str, context: &EvaluationContext) -> Result<bool> {
        let node = self.table.get(flag)?;
        let enabled = Evaluator::new(&self.registry).evaluate(flag, node, context)?;
        debug!(flag, enabled, "开关评估完成");
        Ok(enabled)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.table.contains(flag)
    }

    /// 所有已注册的开关名
    pub fn flag_names(&self) -> Vec<&str> {
        self.table.names()
    }
}

/// 开关引擎构建器
#[derive(Debug, Default)]
pub struct FlagEngineBuilder {
    registry: PredicateRegistry,
}

impl FlagEngineBuilder {
    /// 注册自定义谓词；同名重复注册返回 `DuplicatePredicate`
    pub fn register<F>(mut self, name: impl Into<String>, predicate: F) -> Result<Self>
    where
        F: Fn(&EvaluationContext, &Value) -> Result<bool> + Send + Sync + 'static,
    {
        self.registry.register(name, predicate)?;
        Ok(self)
    }

    /// 注册全部内置谓词，显式注入曝光收集器与一次性分桶状态
    pub fn with_builtins(
        mut self,
        tracker: Arc<dyn EventTracker>,
        state: Arc<BucketAssignmentState>,
    ) -> Result<Self> {
        register_builtins(&mut self.registry, tracker, state)?;
        Ok(self)
    }

    /// 编译配置并构建引擎
    ///
    /// 配置中引用了未注册谓词名时在此处以 `Config` 错误失败。
    pub fn build(self, config: &Value) -> Result<FlagEngine> {
        let table = FlagCompiler::new(&self.registry).compile(config)?;

        info!(
            flags = table.len(),
            predicates = self.registry.len(),
            "开关引擎构建完成"
        );

        Ok(FlagEngine {
            table,
            registry: self.registry,
        })
    }
}
