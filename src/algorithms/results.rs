/// 定位结果数据结构
///
/// 包含定位输出以及路径记录（消费端）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 一次被接受的定位结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// X 坐标（米）
    pub x: f64,
    /// Y 坐标（米）
    pub y: f64,
    /// 产生该结果的扫描批次到达时间
    pub timestamp: DateTime<Utc>,
    /// 参与定位的信标数量
    pub beacon_count: usize,
    /// 距离残差均方根（米）
    pub residual_rms: f64,
}

impl PositionFix {
    /// 与另一结果的 2D 距离
    pub fn distance_to(&self, other: &PositionFix) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for PositionFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}) [残差 {:.2} m, {} 个信标]",
            self.x, self.y, self.residual_rms, self.beacon_count
        )
    }
}

/// 路径记录器
///
/// 只追加，由开始/结束记录界定。开始新的记录会清空旧路径。
#[derive(Clone, Debug, Default)]
pub struct PathRecorder {
    path: Vec<PositionFix>,
    recording: bool,
}

impl PathRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始新路径
    pub fn start_recording(&mut self) {
        self.path.clear();
        self.recording = true;
    }

    /// 结束记录，已记录的路径保留
    pub fn stop_recording(&mut self) {
        self.recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// 记录中则追加定位结果，返回是否追加
    pub fn accept(&mut self, fix: &PositionFix) -> bool {
        if !self.recording {
            return false;
        }
        self.path.push(fix.clone());
        true
    }

    /// 获取所有结果
    pub fn path(&self) -> &[PositionFix] {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// 路径总长度（米）
    pub fn total_distance(&self) -> f64 {
        self.path.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
    }

    /// 导出为 `X;Y` 文本，每行一个点
    pub fn export(&self) -> String {
        let mut out = String::from("X;Y");
        for fix in &self.path {
            out.push('\n');
            out.push_str(&format!("{};{}", fix.x, fix.y));
        }
        out
    }
}
