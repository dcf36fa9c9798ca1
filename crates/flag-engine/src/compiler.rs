//! 开关配置编译器
//!
//! 把嵌套的配置对象解析成内存中的规则树。转换保持键的书写顺序，
//! 并在构建期校验所有引用的谓词名都已注册——未注册的谓词名
//! 必须在这里以 `Config` 错误暴露，绝不允许静默评估为 false。

use crate::error::{FlagError, Result};
use crate::model::{FlagTable, RuleNode};
use crate::registry::PredicateRegistry;
use serde_json::Value;
use std::collections::HashMap;

/// 开关配置编译器
///
/// 配置值的文法（顶层每个键是一个开关名）：
/// - 布尔字面量 -> `Literal`
/// - 键为 `and` / `or` 的条目 -> 对应逻辑组，值为子规则数组
/// - 其余条目 `{谓词名: 参数}` -> 谓词叶子
/// - 含多个条目的对象是对其条目的隐式 `And`（按书写顺序）
pub struct FlagCompiler<'a> {
    registry: &'a PredicateRegistry,
}

impl<'a> FlagCompiler<'a> {
    pub fn new(registry: &'a PredicateRegistry) -> Self {
        Self { registry }
    }

    /// 编译整份配置为开关表
    pub fn compile(&self, config: &Value) -> Result<FlagTable> {
        let entries = config.as_object().ok_or_else(|| {
            FlagError::Config(format!(
                "顶层配置必须是对象, 实际为 {}",
                value_kind(config)
            ))
        })?;

        let mut flags = HashMap::with_capacity(entries.len());
        for (name, rule) in entries {
            let node = self.parse_node(rule, name)?;
            flags.insert(name.clone(), node);
        }

        Ok(FlagTable::new(flags))
    }

    /// 递归解析单个规则值
    fn parse_node(&self, value: &Value, path: &str) -> Result<RuleNode> {
        match value {
            Value::Bool(literal) => Ok(RuleNode::Literal(*literal)),
            Value::Object(entries) => {
                let mut children = Vec::with_capacity(entries.len());
                for (key, sub) in entries {
                    children.push(self.parse_entry(key, sub, path)?);
                }

                // 单条目对象直接展开，避免包一层多余的 And；
                // 多条目对象是隐式 And，子节点保持书写顺序
                if children.len() == 1 {
                    Ok(children.pop().unwrap())
                } else {
                    Ok(RuleNode::And(children))
                }
            }
            other => Err(FlagError::Config(format!(
                "'{}': 规则必须是布尔或对象, 实际为 {}",
                path,
                value_kind(other)
            ))),
        }
    }

    /// 解析对象中的一个条目：组合子或谓词叶子
    fn parse_entry(&self, key: &str, value: &Value, path: &str) -> Result<RuleNode> {
        match key {
            "and" => Ok(RuleNode::And(self.parse_children(value, path, key)?)),
            "or" => Ok(RuleNode::Or(self.parse_children(value, path, key)?)),
            name if self.registry.contains(name) => Ok(RuleNode::Predicate {
                name: name.to_string(),
                argument: value.clone(),
            }),
            name => Err(FlagError::Config(format!(
                "'{path}': 未注册的谓词 '{name}'"
            ))),
        }
    }

    /// 解析组合子的子规则数组
    fn parse_children(&self, value: &Value, path: &str, key: &str) -> Result<Vec<RuleNode>> {
        let items = value.as_array().ok_or_else(|| {
            FlagError::Config(format!(
                "'{}.{}': 组合子需要数组, 实际为 {}",
                path,
                key,
                value_kind(value)
            ))
        })?;

        items
            .iter()
            .enumerate()
            .map(|(i, sub)| self.parse_node(sub, &format!("{path}.{key}[{i}]")))
            .collect()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
