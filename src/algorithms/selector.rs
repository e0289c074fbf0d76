/// 信标选择器
///
/// 按滤波后信号强度从强到弱排序，取前 N 个送入求解器。
/// 强信号的测距误差更小，同时把求解规模限制在固定的小维度。

use crate::algorithms::beacon::BeaconSet;
use crate::algorithms::conditioner::ConditionedSignal;

/// 一次定位所需的最少信标数
pub const MIN_BEACONS_FOR_FIX: usize = 3;

/// 信标子集选择策略
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeaconSelector {
    count: usize,
}

impl BeaconSelector {
    /// `count` 小于 3 时按 3 处理
    pub fn new(count: usize) -> Self {
        BeaconSelector {
            count: count.max(MIN_BEACONS_FOR_FIX),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// 选出最强的 N 个已知信标，按滤波 RSSI 降序
    ///
    /// 同等强度按信标 ID 排序，保证结果确定。
    pub fn select<'a, I>(&self, signals: I, registry: &BeaconSet) -> Vec<&'a ConditionedSignal>
    where
        I: IntoIterator<Item = &'a ConditionedSignal>,
    {
        let mut heard: Vec<&ConditionedSignal> = signals
            .into_iter()
            .filter(|s| registry.contains(&s.beacon_id))
            .collect();

        heard.sort_by(|a, b| {
            b.filtered_rssi
                .total_cmp(&a.filtered_rssi)
                .then_with(|| a.beacon_id.cmp(&b.beacon_id))
        });
        heard.truncate(self.count);
        heard
    }

    /// 同 `select`，但幸存信标不足 3 个时返回 None，本周期不尝试定位
    pub fn select_for_fix<'a, I>(&self, signals: I, registry: &BeaconSet) -> Option<Vec<&'a ConditionedSignal>>
    where
        I: IntoIterator<Item = &'a ConditionedSignal>,
    {
        let selected = self.select(signals, registry);
        if selected.len() < MIN_BEACONS_FOR_FIX {
            return None;
        }
        Some(selected)
    }
}

impl Default for BeaconSelector {
    fn default() -> Self {
        BeaconSelector::new(MIN_BEACONS_FOR_FIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::beacon::Beacon;

    fn signal(id: &str, filtered: f64) -> ConditionedSignal {
        ConditionedSignal {
            beacon_id: id.to_string(),
            filtered_rssi: filtered,
            raw_rssi: filtered,
        }
    }

    fn registry(ids: &[&str]) -> BeaconSet {
        BeaconSet::from_vec(
            ids.iter()
                .enumerate()
                .map(|(i, id)| Beacon::new(*id, i as f64, (i * i) as f64))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_top_n_sorted_descending() {
        let reg = registry(&["a", "b", "c", "d", "e"]);
        let signals = vec![
            signal("a", -80.0),
            signal("b", -55.0),
            signal("c", -70.0),
            signal("d", -60.0),
            signal("e", -90.0),
        ];

        let selected = BeaconSelector::new(3).select(&signals, &reg);
        let ids: Vec<_> = selected.iter().map(|s| s.beacon_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "c"]);
    }

    #[test]
    fn test_count_below_minimum_is_raised() {
        assert_eq!(BeaconSelector::new(1).count(), 3);
        assert_eq!(BeaconSelector::new(5).count(), 5);
    }

    #[test]
    fn test_gate_requires_three_known() {
        let reg = registry(&["a", "b", "c"]);
        let signals = vec![signal("a", -60.0), signal("b", -65.0), signal("x", -40.0)];

        let selector = BeaconSelector::default();
        assert!(selector.select_for_fix(&signals, &reg).is_none());
        assert_eq!(selector.select(&signals, &reg).len(), 2);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let reg = registry(&["a", "b", "c", "d"]);
        let signals = vec![
            signal("d", -60.0),
            signal("b", -60.0),
            signal("c", -60.0),
            signal("a", -60.0),
        ];
        let selected = BeaconSelector::new(3).select(&signals, &reg);
        let ids: Vec<_> = selected.iter().map(|s| s.beacon_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
