//! 评估上下文
//!
//! 调用方在每次请求中提供的只读快照：身份、路由、查询参数、来源页、
//! 设备、社区元数据、退出标记等。引擎在一次评估期间只读取、从不修改。

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// 实验分组结果（来自身份的特性分配表）
#[derive(Debug, Clone, PartialEq)]
pub struct VariantAssignment {
    pub variant: String,
    pub experiment_id: i64,
}

impl VariantAssignment {
    pub fn new(variant: impl Into<String>, experiment_id: i64) -> Self {
        Self {
            variant: variant.into(),
            experiment_id,
        }
    }
}

/// 当前身份
///
/// `logged_out` 为 true 时表示一个带账号数据的匿名会话：
/// 实验分配表仍然可用，但上报曝光事件时使用匿名标识而非用户名。
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// 用户名
    pub name: String,
    /// 用户 ID（36 进制字符串）
    pub id: String,
    /// 是否显式登出
    pub logged_out: bool,
    pub is_employee: bool,
    pub is_admin: bool,
    pub is_beta: bool,
    /// 实验名 -> 分组结果
    pub features: HashMap<String, VariantAssignment>,
}

/// 匿名设备/会话标识
#[derive(Debug, Clone)]
pub struct AnonymousId {
    pub loid: String,
    /// 标识创建时间，用于账号年龄类谓词；可能缺失
    pub created: Option<DateTime<Utc>>,
}

/// 评估发生的运行环境
///
/// 分桶曝光事件只在终端用户环境（Client）上报，服务端渲染不上报。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeEnv {
    Client,
    #[default]
    Server,
}

/// 社区元数据
#[derive(Debug, Clone, Default)]
pub struct SubredditMeta {
    /// 是否标记为成人内容
    pub over_18: bool,
}

/// 一次评估的上下文快照
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    identity: Option<Identity>,
    anonymous: Option<AnonymousId>,
    route_name: Option<String>,
    query_params: HashMap<String, String>,
    referrer: Option<String>,
    history_len: usize,
    device: Option<String>,
    subreddit: Option<String>,
    /// 社区名（小写）-> 元数据
    subreddits: HashMap<String, SubredditMeta>,
    content_id: Option<String>,
    opt_outs: HashSet<String>,
    compact: bool,
    env: RuntimeEnv,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_anonymous(mut self, anonymous: AnonymousId) -> Self {
        self.anonymous = Some(anonymous);
        self
    }

    pub fn with_route_name(mut self, name: impl Into<String>) -> Self {
        self.route_name = Some(name.into());
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_history_len(mut self, len: usize) -> Self {
        self.history_len = len;
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_subreddit(mut self, name: impl Into<String>) -> Self {
        self.subreddit = Some(name.into());
        self
    }

    /// 登记社区元数据；键统一转小写存储
    pub fn with_subreddit_meta(mut self, name: impl Into<String>, meta: SubredditMeta) -> Self {
        self.subreddits.insert(name.into().to_lowercase(), meta);
        self
    }

    pub fn with_content_id(mut self, id: impl Into<String>) -> Self {
        self.content_id = Some(id.into());
        self
    }

    pub fn with_opt_out(mut self, flag: impl Into<String>) -> Self {
        self.opt_outs.insert(flag.into());
        self
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    pub fn with_env(mut self, env: RuntimeEnv) -> Self {
        self.env = env;
        self
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn anonymous(&self) -> Option<&AnonymousId> {
        self.anonymous.as_ref()
    }

    pub fn route_name(&self) -> Option<&str> {
        self.route_name.as_deref()
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn subreddit(&self) -> Option<&str> {
        self.subreddit.as_deref()
    }

    /// 按社区名查找元数据（大小写不敏感）
    pub fn subreddit_meta(&self, name: &str) -> Option<&SubredditMeta> {
        self.subreddits.get(&name.to_lowercase())
    }

    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    pub fn is_opted_out(&self, flag: &str) -> bool {
        self.opt_outs.contains(flag)
    }

    pub fn compact(&self) -> bool {
        self.compact
    }

    pub fn env(&self) -> RuntimeEnv {
        self.env
    }
}
