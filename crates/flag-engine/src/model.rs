//! 开关规则领域模型

use crate::error::{FlagError, Result};
use serde_json::Value;
use std::collections::HashMap;

/// 规则节点（布尔字面量、谓词叶子或逻辑组）
///
/// 规则树在构建后不可变，且不含环，可被多线程并发读取。
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    /// 布尔字面量
    Literal(bool),
    /// 谓词叶子：按名称在注册表中查找，参数类型由谓词自行解释
    Predicate { name: String, argument: Value },
    /// 与组：子节点按序求值，全部为 true 才为 true；空组恒为 true
    And(Vec<RuleNode>),
    /// 或组：子节点按序求值，任一为 true 即为 true；空组恒为 false
    Or(Vec<RuleNode>),
}

impl RuleNode {
    pub fn predicate(name: impl Into<String>, argument: impl Into<Value>) -> Self {
        Self::Predicate {
            name: name.into(),
            argument: argument.into(),
        }
    }

    pub fn and(children: Vec<RuleNode>) -> Self {
        Self::And(children)
    }

    pub fn or(children: Vec<RuleNode>) -> Self {
        Self::Or(children)
    }
}

/// 开关表 - 开关名到规则树的映射
///
/// 在进程启动时构建一次，之后只读。查询未注册的开关名属于
/// 调用方编程错误，返回 `UnknownFlag` 而非静默 false。
#[derive(Debug, Clone, Default)]
pub struct FlagTable {
    flags: HashMap<String, RuleNode>,
}

impl FlagTable {
    pub(crate) fn new(flags: HashMap<String, RuleNode>) -> Self {
        Self { flags }
    }

    /// 查找开关对应的规则树
    pub fn get(&self, name: &str) -> Result<&RuleNode> {
        self.flags
            .get(name)
            .ok_or_else(|| FlagError::UnknownFlag(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// 所有已注册的开关名
    pub fn names(&self) -> Vec<&str> {
        self.flags.keys().map(String::as_str).collect()
    }
}
