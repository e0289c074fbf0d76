/// RSSI 到距离转换模型
///
/// 对数距离路径损耗模型:
///   RSSI(d) = A - 10 * n * log10(d)
/// 反解:
///   d = 10 ^ ((A - RSSI) / (10 * n))
///
/// 其中 A 为 1 米处的参考 RSSI，n 为路径损耗指数，距离单位为米。

use crate::error::ConfigError;
use std::fmt;

/// 由滤波后的 RSSI 计算距离（米）
///
/// 纯函数，`path_loss_exponent` 必须为正，由调用方在配置边界保证。
pub fn rssi_to_distance(filtered_rssi: f64, reference_rssi_at_1m: f64, path_loss_exponent: f64) -> f64 {
    10_f64.powf((reference_rssi_at_1m - filtered_rssi) / (10.0 * path_loss_exponent))
}

/// RSSI 转距离模型参数
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RSSIModel {
    /// 1 米处的参考功率 (dBm)
    pub reference_rssi: f64,
    /// 路径损耗指数 n
    pub path_loss_exponent: f64,
}

impl RSSIModel {
    /// 创建对数距离模型
    pub fn new(reference_rssi: f64, path_loss_exponent: f64) -> Self {
        RSSIModel {
            reference_rssi,
            path_loss_exponent,
        }
    }

    /// 根据 RSSI 计算距离（米）
    pub fn distance(&self, rssi: f64) -> f64 {
        rssi_to_distance(rssi, self.reference_rssi, self.path_loss_exponent)
    }

    /// 根据距离计算 RSSI
    pub fn distance_to_rssi(&self, distance: f64) -> f64 {
        if distance <= 0.0 {
            return f64::INFINITY;
        }
        self.reference_rssi - 10.0 * self.path_loss_exponent * distance.log10()
    }

    /// 验证模型参数
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.reference_rssi.is_finite() {
            return Err(ConfigError::invalid("reference_rssi_at_1m", "必须为有限值"));
        }
        if !(self.path_loss_exponent > 0.0) || !self.path_loss_exponent.is_finite() {
            return Err(ConfigError::invalid(
                "path_loss_exponent",
                format!("必须为正数，实际 {}", self.path_loss_exponent),
            ));
        }
        Ok(())
    }
}

impl Default for RSSIModel {
    fn default() -> Self {
        RSSIModel::new(-59.0, 2.0)
    }
}

impl fmt::Display for RSSIModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RSSI模型 - A={:.2} dBm, n={:.2}",
            self.reference_rssi, self.path_loss_exponent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_rssi_is_one_meter() {
        let model = RSSIModel::new(-59.0, 2.0);
        assert!((model.distance(-59.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_known_distances() {
        // 每增加 10*n dB 衰减，距离乘 10
        assert!((rssi_to_distance(-79.0, -59.0, 2.0) - 10.0).abs() < 1e-9);
        assert!((rssi_to_distance(-84.0, -54.0, 3.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_to_rssi_inverse() {
        let model = RSSIModel::new(-60.0, 2.5);
        let rssi = model.distance_to_rssi(4.0);
        assert!((model.distance(rssi) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_non_positive_exponent() {
        assert!(RSSIModel::new(-59.0, 0.0).validate().is_err());
        assert!(RSSIModel::new(-59.0, -1.0).validate().is_err());
        assert!(RSSIModel::new(-59.0, f64::NAN).validate().is_err());
        assert!(RSSIModel::default().validate().is_ok());
    }
}
