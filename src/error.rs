/// 错误类型定义
///
/// 单周期内的失败（求解失败、信标不足）只记录日志、不向外传播；
/// 只有会话启动阶段的失败（信标表、配置）才会返回给调用方。

use thiserror::Error;

/// 配置错误 - 在配置边界处拒绝，不会进入定位流水线
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("参数 {field} 无效: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("无法读取配置文件: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置文件格式错误: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// 信标表加载错误 - 对会话启动是致命的
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("无法读取信标文件: {0}")]
    Io(#[from] std::io::Error),

    #[error("第 {line} 行坐标无法解析: {value:?}")]
    BadCoordinate { line: usize, value: String },

    #[error("第 {line} 行信标 ID 重复: {id}")]
    DuplicateId { line: usize, id: String },

    #[error("已知信标不足: 需要至少 3 个，实际 {0} 个")]
    TooFewBeacons(usize),
}

/// 多边定位求解失败 - 仅影响当前周期
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("距离估计不足: 需要至少 3 个，实际 {0} 个")]
    TooFewRanges(usize),

    #[error("信标几何退化（共线或重合）")]
    DegenerateGeometry,

    #[error("目标函数出现非有限值")]
    NonFinite,

    #[error("线搜索失败（第 {0} 次迭代）")]
    LineSearch(usize),

    #[error("超过最大迭代次数 {0}")]
    MaxIterations(usize),
}

/// 传输层负载解析错误
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("扫描数据格式错误: {0}")]
    Json(#[from] serde_json::Error),
}

/// 流水线句柄错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("定位任务已停止")]
    Closed,

    #[error("扫描队列已满")]
    QueueFull,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 蓝牙扫描错误
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("蓝牙操作失败: {0}")]
    Bluetooth(#[from] btleplug::Error),

    #[error("未找到蓝牙适配器")]
    NoAdapter,
}
