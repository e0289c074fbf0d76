/// 会话启动测试：信标表文件 → 配置 → 传输层负载 → 定位事件

use rssinav::ingress::parse_scan_payload;
use rssinav::registry::load_registry;
use rssinav::{PipelineConfig, PositionPipeline, RegistryError};
use chrono::{TimeDelta, Utc};
use std::path::PathBuf;
use std::sync::Arc;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("rssinav_{}_{}", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_session_from_files_and_payloads() {
    let registry_path = write_temp(
        "standart.beacons",
        "Name;X;Y\nbeacon_1;0;0\nbeacon_2;8;0\nbeacon_3;0;6\nbeacon_4;8;6\n",
    );
    let config_path = write_temp(
        "config.json",
        r#"{"reference_rssi_at_1m": -54.0, "path_loss_exponent": 2.0, "median_window_size": 3}"#,
    );

    let registry = load_registry(&registry_path).unwrap();
    let config = PipelineConfig::from_json_file(&config_path).unwrap();
    let mut pipeline = PositionPipeline::new(Arc::new(registry));

    let t0 = Utc::now();
    // 消息总线格式，包含一个未知设备
    let bus = parse_scan_payload(r#"{"beacon_1": -60, "beacon_2": -70, "beacon_3": -66, "phone": -30}"#).unwrap();
    let first = pipeline.submit_scan(bus, t0, &config);
    assert_eq!(first.live_signals.len(), 3);
    assert!(first.fix.is_some());

    // HTTP 格式，1 秒内不再定位
    let http = parse_scan_payload(
        r#"{"scans": [{"name": "beacon_1", "rssi": -61}, {"name": "beacon_4", "rssi": -72}]}"#,
    )
    .unwrap();
    let second = pipeline.submit_scan(http, t0 + TimeDelta::milliseconds(300), &config);
    assert_eq!(second.live_signals.len(), 2);
    assert!(second.fix.is_none());

    let _ = std::fs::remove_file(registry_path);
    let _ = std::fs::remove_file(config_path);
}

#[test]
fn test_registry_with_two_beacons_fails_startup() {
    let path = write_temp("small.beacons", "Name;X;Y\nbeacon_1;0;0\nbeacon_2;8;0\n");
    assert!(matches!(load_registry(&path), Err(RegistryError::TooFewBeacons(2))));
    let _ = std::fs::remove_file(path);
}
