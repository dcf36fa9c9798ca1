//! 开关引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("未注册的开关: {0}")]
    UnknownFlag(String),

    #[error("谓词重复注册: {0}")]
    DuplicatePredicate(String),

    #[error("未注册的谓词: {0}")]
    UnknownPredicate(String),

    #[error("参数类型不匹配: 期望 {expected}, 实际 {actual}")]
    InvalidArgument { expected: String, actual: String },

    #[error("开关 '{flag}' 的谓词 '{predicate}' 评估失败 (参数 {argument}): {source}")]
    PredicateEvaluation {
        flag: String,
        predicate: String,
        argument: serde_json::Value,
        #[source]
        source: Box<FlagError>,
    },

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlagError>;
