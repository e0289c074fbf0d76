/// 流水线运行参数
///
/// 所有参数都可在运行时热更新；流水线每处理一批读数只按值读取一次，
/// 不会在一个周期内观察到半更新的配置。

use crate::algorithms::{FilterParams, RSSIModel, SolverOptions};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 中值窗口长度上限
pub const MAX_MEDIAN_WINDOW_SIZE: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 1 米处参考 RSSI (dBm)
    #[serde(default = "default_reference_rssi_at_1m")]
    pub reference_rssi_at_1m: f64,

    /// 路径损耗指数（2.0 = 自由空间，室内通常 2.5-4.0）
    #[serde(default = "default_path_loss_exponent")]
    pub path_loss_exponent: f64,

    /// 中值窗口长度
    #[serde(default = "default_median_window_size")]
    pub median_window_size: usize,

    /// 卡尔曼测量噪声 R
    #[serde(default = "default_kalman_r")]
    pub kalman_r: f64,

    /// 卡尔曼过程噪声 Q
    #[serde(default = "default_kalman_q")]
    pub kalman_q: f64,

    /// 每次定位使用的最强信标数
    #[serde(default = "default_beacon_selection_count")]
    pub beacon_selection_count: usize,

    /// 定位输出频率上限 (Hz)
    #[serde(default = "default_fix_rate_hz")]
    pub fix_rate_hz: f64,

    /// 求解器最大迭代次数
    #[serde(default = "default_solver_max_iterations")]
    pub solver_max_iterations: usize,
}

fn default_reference_rssi_at_1m() -> f64 {
    -59.0
}

fn default_path_loss_exponent() -> f64 {
    2.0
}

fn default_median_window_size() -> usize {
    5
}

fn default_kalman_r() -> f64 {
    4.0
}

fn default_kalman_q() -> f64 {
    0.05
}

fn default_beacon_selection_count() -> usize {
    3
}

fn default_fix_rate_hz() -> f64 {
    1.0
}

fn default_solver_max_iterations() -> usize {
    200
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            reference_rssi_at_1m: default_reference_rssi_at_1m(),
            path_loss_exponent: default_path_loss_exponent(),
            median_window_size: default_median_window_size(),
            kalman_r: default_kalman_r(),
            kalman_q: default_kalman_q(),
            beacon_selection_count: default_beacon_selection_count(),
            fix_rate_hz: default_fix_rate_hz(),
            solver_max_iterations: default_solver_max_iterations(),
        }
    }
}

impl PipelineConfig {
    /// 从 JSON 字符串加载并校验，缺省字段取默认值
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载并校验
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// 配置边界校验，流水线内部假定参数已合法
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rssi_model().validate()?;

        if self.median_window_size < 1 {
            return Err(ConfigError::invalid("median_window_size", "必须至少为 1"));
        }
        if self.median_window_size > MAX_MEDIAN_WINDOW_SIZE {
            return Err(ConfigError::invalid(
                "median_window_size",
                format!(
                    "不能超过 {}，实际 {}",
                    MAX_MEDIAN_WINDOW_SIZE, self.median_window_size
                ),
            ));
        }
        if !(self.kalman_r > 0.0) || !self.kalman_r.is_finite() {
            return Err(ConfigError::invalid(
                "kalman_r",
                format!("必须为正数，实际 {}", self.kalman_r),
            ));
        }
        if !(self.kalman_q >= 0.0) || !self.kalman_q.is_finite() {
            return Err(ConfigError::invalid(
                "kalman_q",
                format!("不能为负，实际 {}", self.kalman_q),
            ));
        }
        if self.beacon_selection_count < 3 {
            return Err(ConfigError::invalid(
                "beacon_selection_count",
                format!("必须至少为 3，实际 {}", self.beacon_selection_count),
            ));
        }
        if !(self.fix_rate_hz > 0.0) || !self.fix_rate_hz.is_finite() {
            return Err(ConfigError::invalid(
                "fix_rate_hz",
                format!("必须为正数，实际 {}", self.fix_rate_hz),
            ));
        }
        // 频率过低时定位间隔无法表示为 Duration
        if Duration::try_from_secs_f64(1.0 / self.fix_rate_hz).is_err() {
            return Err(ConfigError::invalid(
                "fix_rate_hz",
                format!("过小，定位间隔溢出，实际 {}", self.fix_rate_hz),
            ));
        }
        if self.solver_max_iterations < 1 {
            return Err(ConfigError::invalid("solver_max_iterations", "必须至少为 1"));
        }
        Ok(())
    }

    pub fn rssi_model(&self) -> RSSIModel {
        RSSIModel::new(self.reference_rssi_at_1m, self.path_loss_exponent)
    }

    pub fn filter_params(&self) -> FilterParams {
        FilterParams {
            window_size: self.median_window_size,
            q: self.kalman_q,
            r: self.kalman_r,
        }
    }

    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            max_iterations: self.solver_max_iterations,
            ..SolverOptions::default()
        }
    }

    /// 两次定位之间的最小间隔；未经校验的配置溢出时视为永不到期
    pub fn fix_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.fix_rate_hz).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PipelineConfig::from_json_str(r#"{"path_loss_exponent": 2.5, "fix_rate_hz": 4}"#).unwrap();
        assert_eq!(config.path_loss_exponent, 2.5);
        assert_eq!(config.fix_interval(), Duration::from_millis(250));
        assert_eq!(config.median_window_size, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            r#"{"path_loss_exponent": 0}"#,
            r#"{"median_window_size": 0}"#,
            r#"{"kalman_r": 0}"#,
            r#"{"kalman_q": -0.1}"#,
            r#"{"beacon_selection_count": 2}"#,
            r#"{"fix_rate_hz": 0}"#,
            r#"{"fix_rate_hz": 1e-300}"#,
            r#"{"median_window_size": 18446744073709551615}"#,
            r#"{"median_window_size": 1001}"#,
        ];
        for json in cases {
            assert!(
                matches!(PipelineConfig::from_json_str(json), Err(ConfigError::Invalid { .. })),
                "{} should be rejected",
                json
            );
        }
    }

    #[test]
    fn test_low_fix_rate_interval() {
        let slow = PipelineConfig {
            fix_rate_hz: 0.001,
            ..PipelineConfig::default()
        };
        assert!(slow.validate().is_ok());
        assert_eq!(slow.fix_interval(), Duration::from_secs(1000));

        let unchecked = PipelineConfig {
            fix_rate_hz: 1e-300,
            ..PipelineConfig::default()
        };
        assert_eq!(unchecked.fix_interval(), Duration::MAX);
    }

    #[test]
    fn test_largest_window_accepted() {
        let config = PipelineConfig {
            median_window_size: MAX_MEDIAN_WINDOW_SIZE,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            PipelineConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
