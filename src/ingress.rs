/// 传输层扫描负载解析
///
/// 支持两种格式：
/// - 消息总线格式：`{"beacon_1": -65, "beacon_2": -71}`
/// - HTTP 格式：`{"scans": [{"name": "beacon_1", "rssi": -65}]}`

use crate::algorithms::RawReading;
use crate::error::IngressError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct ScanEntry {
    name: String,
    rssi: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScanPayload {
    Scans { scans: Vec<ScanEntry> },
    Flat(HashMap<String, f64>),
}

/// 解析一条扫描负载，得到 beacon_id → RSSI 映射
///
/// 同一信标在一条负载中出现多次时保留最后一次。
pub fn parse_scan_payload(payload: &str) -> Result<HashMap<String, f64>, IngressError> {
    let parsed: ScanPayload = serde_json::from_str(payload)?;
    Ok(match parsed {
        ScanPayload::Scans { scans } => scans.into_iter().map(|s| (s.name, s.rssi)).collect(),
        ScanPayload::Flat(map) => map,
    })
}

/// 把一批扫描映射转换为原始读数（按信标 ID 排序）
pub fn to_raw_readings(scan: HashMap<String, f64>, arrival_time: DateTime<Utc>) -> Vec<RawReading> {
    let mut readings: Vec<RawReading> = scan
        .into_iter()
        .map(|(beacon_id, rssi)| RawReading::new(beacon_id, rssi, arrival_time))
        .collect();
    readings.sort_by(|a, b| a.beacon_id.cmp(&b.beacon_id));
    readings
}
