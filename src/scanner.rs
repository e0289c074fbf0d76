/// 蓝牙信标扫描
///
/// 周期性扫描，按广播名称白名单（正则）过滤，每个扫描窗口向定位服务
/// 提交一批 `名称 → RSSI`。定位服务关闭后扫描结束。

use crate::error::{PipelineError, ScanError};
use crate::pipeline::PipelineHandle;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use chrono::Utc;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;

/// 默认信标名称白名单
pub const DEFAULT_NAME_PATTERN: &str = r"^beacon_\d+$";

/// 扫描参数
#[derive(Clone, Debug)]
pub struct ScannerConfig {
    /// 广播名称白名单
    pub name_pattern: Regex,
    /// 每个扫描窗口时长
    pub scan_window: Duration,
    /// 两次扫描之间的间隔
    pub pause: Duration,
}

impl ScannerConfig {
    pub fn new(name_pattern: Regex) -> Self {
        ScannerConfig {
            name_pattern,
            scan_window: Duration::from_millis(350),
            pause: Duration::from_millis(500),
        }
    }
}

/// 从外设广播信息中筛选白名单信标
///
/// 输入为 (广播名称, RSSI)；没有名称或没有 RSSI 的外设被忽略，
/// 同名信标保留最强的一次。
pub fn collect_batch<I>(adverts: I, pattern: &Regex) -> HashMap<String, f64>
where
    I: IntoIterator<Item = (Option<String>, Option<i16>)>,
{
    let mut batch: HashMap<String, f64> = HashMap::new();
    for (name, rssi) in adverts {
        let (Some(name), Some(rssi)) = (name, rssi) else {
            continue;
        };
        if !pattern.is_match(&name) {
            continue;
        }
        let rssi = f64::from(rssi);
        batch
            .entry(name)
            .and_modify(|current| *current = current.max(rssi))
            .or_insert(rssi);
    }
    batch
}

/// 基于 btleplug 的信标扫描器，使用第一个蓝牙适配器
pub struct BleScanner {
    config: ScannerConfig,
}

impl BleScanner {
    pub fn new(config: ScannerConfig) -> Self {
        BleScanner { config }
    }

    async fn first_adapter() -> Result<Adapter, ScanError> {
        let manager = Manager::new().await?;
        manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(ScanError::NoAdapter)
    }

    /// 扫描一个窗口，返回白名单信标
    async fn scan_once(&self, adapter: &Adapter) -> Result<HashMap<String, f64>, ScanError> {
        adapter.start_scan(ScanFilter::default()).await?;
        sleep(self.config.scan_window).await;

        let mut adverts = Vec::new();
        for peripheral in adapter.peripherals().await? {
            if let Ok(Some(props)) = peripheral.properties().await {
                adverts.push((props.local_name, props.rssi));
            }
        }

        if let Err(e) = adapter.stop_scan().await {
            warn!("停止扫描失败: {}", e);
        }
        Ok(collect_batch(adverts, &self.config.name_pattern))
    }

    /// 持续扫描直到定位服务关闭，返回提交的批次数
    pub async fn run(&self, handle: PipelineHandle) -> Result<usize, ScanError> {
        let adapter = Self::first_adapter().await?;
        info!("开始扫描信标，白名单: {}", self.config.name_pattern);

        let mut submitted = 0;
        loop {
            let batch = self.scan_once(&adapter).await?;
            if batch.is_empty() {
                debug!("本次扫描未发现白名单信标");
            } else {
                debug!("扫描到 {} 个信标", batch.len());
                match handle.submit_scan(batch, Utc::now()).await {
                    Ok(()) => submitted += 1,
                    Err(PipelineError::Closed) => break,
                    Err(e) => warn!("提交扫描失败: {}", e),
                }
            }
            sleep(self.config.pause).await;
        }

        info!("扫描结束，共提交 {} 批", submitted);
        Ok(submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> Regex {
        Regex::new(DEFAULT_NAME_PATTERN).unwrap()
    }

    #[test]
    fn test_whitelist_filter() {
        let batch = collect_batch(
            vec![
                (Some("beacon_1".to_string()), Some(-60)),
                (Some("RFstar_C5D6".to_string()), Some(-50)),
                (Some("beacon_2".to_string()), None),
                (None, Some(-40)),
                (Some("beacon_12".to_string()), Some(-75)),
            ],
            &pattern(),
        );
        assert_eq!(batch.len(), 2);
        assert_eq!(batch["beacon_1"], -60.0);
        assert_eq!(batch["beacon_12"], -75.0);
    }

    #[test]
    fn test_duplicate_names_keep_strongest() {
        let batch = collect_batch(
            vec![
                (Some("beacon_1".to_string()), Some(-80)),
                (Some("beacon_1".to_string()), Some(-62)),
                (Some("beacon_1".to_string()), Some(-70)),
            ],
            &pattern(),
        );
        assert_eq!(batch["beacon_1"], -62.0);
    }

    #[test]
    fn test_custom_pattern() {
        let re = Regex::new("^RFstar").unwrap();
        let batch = collect_batch(vec![(Some("RFstar_0CF1".to_string()), Some(-66))], &re);
        assert!(batch.contains_key("RFstar_0CF1"));
    }
}
