/// 定位算法模块
///
/// 实时定位流水线的纯计算部分：
/// - RSSI 转距离模型
/// - 单信标两级滤波（中值 + 卡尔曼）
/// - 信标子集选择
/// - 非线性最小二乘多边定位
/// - 定位结果与路径记录

pub mod beacon;
pub mod conditioner;
pub mod filters;
pub mod multilateration;
pub mod results;
pub mod rssi_model;
pub mod selector;

pub use beacon::*;
pub use conditioner::*;
pub use filters::*;
pub use multilateration::*;
pub use results::*;
pub use rssi_model::*;
pub use selector::*;
