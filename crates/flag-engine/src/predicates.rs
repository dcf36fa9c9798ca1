//! 内置谓词目录
//!
//! 每个谓词的签名为 `(上下文, 参数) -> bool`。参数类型与"数据缺失时
//! 回退到哪个布尔值"都属于契约的一部分：上下文中缺少可合理视为
//! "未知"的数据时，谓词按文档回退而不是报错；只有参数类型错误
//! 这类配置问题才会返回 Err。

use crate::bucketing::BucketingHasher;
use crate::context::{EvaluationContext, RuntimeEnv};
use crate::error::{FlagError, Result};
use crate::registry::PredicateRegistry;
use crate::tracker::{
    BUCKETING_EVENT_CATEGORY, BUCKETING_EVENT_NAME, BucketAssignmentState, EventTracker,
    ExposurePayload,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// 搜索引擎来源域名允许列表
const SEO_REFERRERS: [&str; 2] = ["google.com", "bing.com"];

/// 查询参数命名空间前缀；`urlParam` 只匹配去掉该前缀后的键
const FEATURE_QUERY_PREFIX: &str = "feature_";

// ---------------------------------------------------------------------------
// 参数解码辅助
// ---------------------------------------------------------------------------

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn invalid_argument(expected: &str, actual: &Value) -> FlagError {
    FlagError::InvalidArgument {
        expected: expected.to_string(),
        actual: type_name(actual).to_string(),
    }
}

fn as_bool(arg: &Value) -> Result<bool> {
    arg.as_bool().ok_or_else(|| invalid_argument("boolean", arg))
}

fn as_str(arg: &Value) -> Result<&str> {
    arg.as_str().ok_or_else(|| invalid_argument("string", arg))
}

fn as_str_list(arg: &Value) -> Result<Vec<&str>> {
    let items = arg
        .as_array()
        .ok_or_else(|| invalid_argument("array of string", arg))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| invalid_argument("array of string", arg))
        })
        .collect()
}

fn as_millis(arg: &Value) -> Result<i64> {
    arg.as_i64()
        .or_else(|| arg.as_f64().map(|v| v as i64))
        .ok_or_else(|| invalid_argument("number (milliseconds)", arg))
}

// ---------------------------------------------------------------------------
// 身份类谓词
// ---------------------------------------------------------------------------

/// `loggedIn` - 当前是否已登录（身份存在且未显式登出），与参数比较
pub fn logged_in(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let want = as_bool(arg)?;
    let logged_in = ctx.identity().is_some_and(|user| !user.logged_out);
    Ok(logged_in == want)
}

/// `users` - 当前用户名是否在给定集合中；身份缺失回退为 false
pub fn users(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let allowed = as_str_list(arg)?;
    Ok(ctx
        .identity()
        .is_some_and(|user| allowed.contains(&user.name.as_str())))
}

/// `employee` - 身份上的员工标记与参数比较；身份缺失回退为 false
pub fn employee(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let want = as_bool(arg)?;
    Ok(ctx.identity().is_some_and(|user| user.is_employee == want))
}

/// `admin` - 身份上的管理员标记与参数比较；身份缺失回退为 false
pub fn admin(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let want = as_bool(arg)?;
    Ok(ctx.identity().is_some_and(|user| user.is_admin == want))
}

/// `beta` - 身份上的 beta 标记与参数比较；身份缺失回退为 false
pub fn beta(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let want = as_bool(arg)?;
    Ok(ctx.identity().is_some_and(|user| user.is_beta == want))
}

// ---------------------------------------------------------------------------
// 页面与环境类谓词
// ---------------------------------------------------------------------------

/// `urlParam` - 规范化查询参数命名空间中是否含有给定键
///
/// 只考察带 `feature_` 前缀的查询参数，匹配时去掉前缀、忽略值。
/// 例如 `?feature_thing=1` 使 `urlParam: "thing"` 为 true。
pub fn url_param(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let wanted = as_str(arg)?;
    Ok(ctx
        .query_params()
        .keys()
        .filter_map(|key| key.strip_prefix(FEATURE_QUERY_PREFIX))
        .any(|stripped| stripped == wanted))
}

/// `compact` - 上下文的紧凑显示模式与参数比较
pub fn compact(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let want = as_bool(arg)?;
    Ok(ctx.compact() == want)
}

/// `subreddit` - 当前社区名与参数比较（大小写不敏感）；无社区回退为 false
pub fn subreddit(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let wanted = as_str(arg)?;
    Ok(ctx
        .subreddit()
        .is_some_and(|name| name.eq_ignore_ascii_case(wanted)))
}

/// `seoReferrer` - 来源页主机名是否命中搜索引擎允许列表，与期望极性比较
///
/// 无来源页或非 HTTP 来源视为"非 SEO"。
pub fn seo_referrer(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let want_seo = as_bool(arg)?;

    let Some(referrer) = ctx.referrer() else {
        return Ok(!want_seo);
    };
    if !referrer.starts_with("http") {
        return Ok(!want_seo);
    }

    let is_seo = Url::parse(referrer)
        .ok()
        .and_then(|parsed| {
            parsed
                .host_str()
                .map(|host| SEO_REFERRERS.iter().any(|seo| host.contains(seo)))
        })
        .unwrap_or(false);

    Ok(is_seo == want_seo)
}

/// `directVisit` - 是否为直接访问（无来源页且导航历史不超过 2 条），
/// 与期望极性比较
pub fn direct_visit(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let want_direct = as_bool(arg)?;
    let is_direct = ctx.referrer().is_none() && ctx.history_len() <= 2;
    Ok(is_direct == want_direct)
}

/// `allowedPages` - 当前路由的规范名是否在给定集合中；无路由回退为 false
pub fn allowed_pages(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let allowed = as_str_list(arg)?;
    Ok(ctx.route_name().is_some_and(|route| allowed.contains(&route)))
}

/// `minAccountAge` - 匿名标识创建至今是否不少于给定毫秒数；
/// 创建时间缺失回退为 false。
///
/// 通常与 `loggedIn: false` 搭配使用，此时才预期存在匿名标识。
pub fn min_account_age(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let min_age = Duration::milliseconds(as_millis(arg)?);

    let Some(created) = ctx.anonymous().and_then(|anon| anon.created) else {
        return Ok(false);
    };

    Ok(Utc::now() - created >= min_age)
}

/// `allowedDevices` - 设备分类是否在给定集合中；设备无法判定回退为 false
pub fn allowed_devices(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let allowed = as_str_list(arg)?;
    Ok(ctx.device().is_some_and(|device| allowed.contains(&device)))
}

/// `notOptedOut` - 给定退出标记未被设置时为 true
pub fn not_opted_out(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let flag = as_str(arg)?;
    Ok(!ctx.is_opted_out(flag))
}

/// `disallowNSFW` - 参数为"允许成人内容"开关
///
/// 参数为 true 时直接放行；否则社区不可解析回退为 false，
/// 可解析时要求社区未标记为成人内容。
pub fn disallow_nsfw(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let allow_nsfw = as_bool(arg)?;

    if allow_nsfw {
        return Ok(true);
    }

    let Some(name) = ctx.subreddit() else {
        return Ok(false);
    };

    match ctx.subreddit_meta(name) {
        Some(meta) => Ok(!meta.over_18),
        None => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// 分桶类谓词
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PercentageBucketArg {
    seed: String,
    percentage: f64,
}

/// `percentageBucket` - 按内容 ID 做确定性百分比分桶
///
/// 参数为 `{seed, percentage}`；内容 ID 不可解析时回退为 false
/// （没有标识就没有定义良好的分桶）。
pub fn percentage_bucket(ctx: &EvaluationContext, arg: &Value) -> Result<bool> {
    let config: PercentageBucketArg = serde_json::from_value(arg.clone())
        .map_err(|_| invalid_argument("object {seed, percentage}", arg))?;

    let Some(content_id) = ctx.content_id() else {
        return Ok(false);
    };

    Ok(BucketingHasher::in_percentage(
        &config.seed,
        content_id,
        config.percentage,
    ))
}

/// 构造 `variant` 谓词
///
/// 参数形如 `"experiment:variant"`。在身份的实验分配表中查找实验：
/// 命中时返回分配的 variant 是否与期望一致，并在终端用户环境下
/// 对该实验做一次性曝光上报；未命中返回 false 且无副作用。
///
/// 曝光上报是本目录中对纯函数契约唯一的例外，通过显式注入
/// 收集器与进程级状态构造，每实验每进程生命周期至多触发一次。
pub fn variant(
    tracker: Arc<dyn EventTracker>,
    state: Arc<BucketAssignmentState>,
) -> impl Fn(&EvaluationContext, &Value) -> Result<bool> + Send + Sync {
    move |ctx, arg| {
        let pair = as_str(arg)?;
        let Some((experiment_name, wanted_variant)) = pair.split_once(':') else {
            return Err(invalid_argument("string \"experiment:variant\"", arg));
        };

        let Some(user) = ctx.identity() else {
            return Ok(false);
        };
        let Some(assignment) = user.features.get(experiment_name) else {
            return Ok(false);
        };

        if ctx.env() == RuntimeEnv::Client && state.try_record(experiment_name) {
            let payload = ExposurePayload {
                experiment_id: assignment.experiment_id,
                experiment_name: experiment_name.to_string(),
                variant: assignment.variant.clone(),
                user_id: (!user.logged_out)
                    .then(|| i64::from_str_radix(&user.id, 36).ok())
                    .flatten(),
                user_name: (!user.logged_out).then(|| user.name.clone()),
                loid: user
                    .logged_out
                    .then(|| ctx.anonymous().map(|anon| anon.loid.clone()))
                    .flatten(),
                loidcreated: user
                    .logged_out
                    .then(|| ctx.anonymous().and_then(|anon| anon.created))
                    .flatten(),
            };
            tracker.track(
                BUCKETING_EVENT_CATEGORY,
                BUCKETING_EVENT_NAME,
                serde_json::to_value(&payload)?,
            );
        }

        Ok(assignment.variant == wanted_variant)
    }
}

/// 注册全部内置谓词
///
/// `variant` 需要的曝光收集器与一次性分桶状态由调用方显式注入。
pub fn register_builtins(
    registry: &mut PredicateRegistry,
    tracker: Arc<dyn EventTracker>,
    state: Arc<BucketAssignmentState>,
) -> Result<()> {
    registry.register("loggedIn", logged_in)?;
    registry.register("users", users)?;
    registry.register("employee", employee)?;
    registry.register("admin", admin)?;
    registry.register("beta", beta)?;
    registry.register("urlParam", url_param)?;
    registry.register("compact", compact)?;
    registry.register("subreddit", subreddit)?;
    registry.register("variant", variant(tracker, state))?;
    registry.register("seoReferrer", seo_referrer)?;
    registry.register("directVisit", direct_visit)?;
    registry.register("allowedPages", allowed_pages)?;
    registry.register("minAccountAge", min_account_age)?;
    registry.register("allowedDevices", allowed_devices)?;
    registry.register("notOptedOut", not_opted_out)?;
    registry.register("disallowNSFW", disallow_nsfw)?;
    registry.register("percentageBucket", percentage_bucket)?;
    Ok(())
}
