//! 规则求值器
//!
//! 对规则树做按序短路求值：And 遇 false 即停，Or 遇 true 即停。
//! 短路保证靠后的带副作用子节点（如分桶曝光）不会被触达。

use crate::context::EvaluationContext;
use crate::error::{FlagError, Result};
use crate::model::RuleNode;
use crate::registry::PredicateRegistry;
use tracing::trace;

/// 规则求值器
///
/// 无自身状态，只借用注册表；单次调用同步完成，无 I/O。
pub struct Evaluator<'a> {
    registry: &'a PredicateRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a PredicateRegistry) -> Self {
        Self { registry }
    }

    /// 递归求值规则节点
    ///
    /// `flag` 仅用于错误与日志中的诊断信息。
    pub fn evaluate(
        &self,
        flag: &str,
        node: &RuleNode,
        context: &EvaluationContext,
    ) -> Result<bool> {
        match node {
            RuleNode::Literal(literal) => Ok(*literal),

            RuleNode::Predicate { name, argument } => {
                let predicate = self
                    .registry
                    .get(name)
                    .ok_or_else(|| FlagError::UnknownPredicate(name.clone()))?;

                predicate(context, argument).map_err(|source| FlagError::PredicateEvaluation {
                    flag: flag.to_string(),
                    predicate: name.clone(),
                    argument: argument.clone(),
                    source: Box::new(source),
                })
            }

            RuleNode::And(children) => {
                // 空 And 恒为 true
                for (i, child) in children.iter().enumerate() {
                    if !self.evaluate(flag, child, context)? {
                        trace!(flag, child = i, "And 短路");
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            RuleNode::Or(children) => {
                // 空 Or 恒为 false
                for (i, child) in children.iter().enumerate() {
                    if self.evaluate(flag, child, context)? {
                        trace!(flag, child = i, "Or 短路");
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}
