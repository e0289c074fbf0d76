/// 基于 RSSI 的蓝牙信标室内定位
///
/// 实时定位流水线：单信标信号调理 → 信标选择 → 非线性多边定位 → 频率调度。

pub mod algorithms;
pub mod config;
pub mod error;
pub mod ingress;
pub mod pipeline;
pub mod registry;
pub mod scanner;

pub use config::PipelineConfig;
pub use error::{ConfigError, IngressError, PipelineError, RegistryError, ScanError, SolveError};
pub use pipeline::{PipelineHandle, PipelineOutput, PipelineService, PositionPipeline};
