/// 信标表加载
///
/// 文本格式，每行 `name;x;y`，首行为表头：
///
/// ```text
/// Name;X;Y
/// beacon_1;3.0;-2.4
/// beacon_2;0;0
/// ```

use crate::algorithms::{Beacon, BeaconSet};
use crate::error::RegistryError;
use log::{info, warn};
use std::path::Path;

/// 会话至少需要的已知信标数
pub const MIN_REGISTRY_BEACONS: usize = 3;

/// 解析信标表文本
///
/// 空行跳过；字段数不是 3 的行记录警告后跳过；
/// 坐标无法解析、ID 重复或信标不足 3 个时报错。
pub fn parse_registry(text: &str) -> Result<BeaconSet, RegistryError> {
    let mut set = BeaconSet::new();

    for (idx, line) in text.lines().enumerate().skip(1) {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split(';').map(str::trim).collect();
        let [name, x, y] = parts.as_slice() else {
            warn!("信标表第 {} 行字段数为 {}，已跳过: {:?}", line_no, parts.len(), line);
            continue;
        };

        let x = parse_coordinate(x, line_no)?;
        let y = parse_coordinate(y, line_no)?;
        set.add_beacon(Beacon::new(*name, x, y))
            .map_err(|id| RegistryError::DuplicateId { line: line_no, id })?;
    }

    if set.len() < MIN_REGISTRY_BEACONS {
        return Err(RegistryError::TooFewBeacons(set.len()));
    }
    Ok(set)
}

fn parse_coordinate(value: &str, line: usize) -> Result<f64, RegistryError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RegistryError::BadCoordinate {
            line,
            value: value.to_string(),
        })
}

/// 从文件加载信标表
pub fn load_registry(path: impl AsRef<Path>) -> Result<BeaconSet, RegistryError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let set = parse_registry(&text)?;
    info!("从 {} 加载了 {} 个信标", path.display(), set.len());
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_header() {
        let set = parse_registry("Name;X;Y\nbeacon_1;3.0;-2.4\nbeacon_2;0;0\nbeacon_3;5;5\n").unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("beacon_1").unwrap().coordinates(), (3.0, -2.4));
    }

    #[test]
    fn test_header_is_never_a_beacon() {
        // 表头即使形如数据也被跳过
        let set = parse_registry("h;1;1\na;0;0\nb;1;0\nc;0;1").unwrap();
        assert!(!set.contains("h"));
    }

    #[test]
    fn test_wrong_field_count_skipped() {
        let set = parse_registry("Name;X;Y\na;0;0\nbroken;1\n\nb;1;0\nc;0;1;extra\nd;0;1").unwrap();
        assert_eq!(set.len(), 3);
        assert!(!set.contains("broken"));
        assert!(!set.contains("c"));
    }

    #[test]
    fn test_bad_coordinate_is_fatal() {
        let err = parse_registry("Name;X;Y\na;0;0\nb;one;0\nc;0;1").unwrap_err();
        assert!(matches!(err, RegistryError::BadCoordinate { line: 3, .. }));
    }

    #[test]
    fn test_duplicate_is_fatal() {
        let err = parse_registry("Name;X;Y\na;0;0\nb;1;0\na;0;1").unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateId { line: 4, .. }));
    }

    #[test]
    fn test_too_few_beacons() {
        let err = parse_registry("Name;X;Y\na;0;0\nb;1;0").unwrap_err();
        assert!(matches!(err, RegistryError::TooFewBeacons(2)));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_registry("/nonexistent/standart.beacons"),
            Err(RegistryError::Io(_))
        ));
    }
}
