/// 信号调理器
///
/// 每个信标维护一份独立的 `FilterState`（中值窗口 → 卡尔曼），
/// 首次看到某个信标时按"查找，未命中则插入"的方式创建。
/// 不在信标表中的读数由调用方在进入调理器之前丢弃。

use crate::algorithms::filters::FilterState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// 原始读数，由传输层生成，只消费一次
#[derive(Clone, Debug, PartialEq)]
pub struct RawReading {
    pub beacon_id: String,
    pub rssi: f64,
    pub arrival_time: DateTime<Utc>,
}

impl RawReading {
    pub fn new(beacon_id: impl Into<String>, rssi: f64, arrival_time: DateTime<Utc>) -> Self {
        RawReading {
            beacon_id: beacon_id.into(),
            rssi,
            arrival_time,
        }
    }
}

/// 单次调理输出
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConditionedSignal {
    #[serde(skip_serializing)]
    pub beacon_id: String,
    pub filtered_rssi: f64,
    pub raw_rssi: f64,
}

/// 滤波参数快照，每批读数取一次
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterParams {
    pub window_size: usize,
    pub q: f64,
    pub r: f64,
}

/// 信号调理器，独占所有信标的滤波状态
#[derive(Clone, Debug, Default)]
pub struct SignalConditioner {
    states: HashMap<String, FilterState>,
}

impl SignalConditioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 调理一个读数
    ///
    /// 信标首次出现时创建滤波状态，卡尔曼估计以该原始值初始化。
    /// 修改 Q/R 只影响之后的增益计算，不会重置历史。
    pub fn condition(&mut self, beacon_id: &str, raw_rssi: f64, params: &FilterParams) -> ConditionedSignal {
        let state = self
            .states
            .entry(beacon_id.to_string())
            .or_insert_with(|| FilterState::new(raw_rssi, params.window_size));
        let filtered_rssi = state.update(raw_rssi, params.window_size, params.q, params.r);

        ConditionedSignal {
            beacon_id: beacon_id.to_string(),
            filtered_rssi,
            raw_rssi,
        }
    }

    /// 获取信标的滤波状态
    pub fn state(&self, beacon_id: &str) -> Option<&FilterState> {
        self.states.get(beacon_id)
    }

    /// 已有滤波状态的信标数量
    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// 清空所有信标的滤波状态
    pub fn clear(&mut self) {
        self.states.clear();
    }
}
