//! 谓词注册表
//!
//! 谓词是 `(上下文, 参数) -> bool` 的纯函数，在引擎初始化时注册一次，
//! 之后只读。`variant` 这类带协作方的谓词通过显式注入构造闭包，
//! 不允许隐式捕获引擎内部状态。

use crate::context::EvaluationContext;
use crate::error::{FlagError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// 谓词函数签名
pub type PredicateFn = Box<dyn Fn(&EvaluationContext, &Value) -> Result<bool> + Send + Sync>;

/// 谓词名到评估函数的映射
#[derive(Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, PredicateFn>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册谓词；同名重复注册返回 `DuplicatePredicate`
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F) -> Result<()>
    where
        F: Fn(&EvaluationContext, &Value) -> Result<bool> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.predicates.contains_key(&name) {
            return Err(FlagError::DuplicatePredicate(name));
        }
        self.predicates.insert(name, Box::new(predicate));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PredicateFn> {
        self.predicates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// 所有已注册的谓词名（排序后返回，便于日志与诊断）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("predicates", &self.names())
            .finish()
    }
}
